//! PostgreSQL implementations of the persistence collaborators.

pub mod attachment;
pub mod job;
pub mod option;

pub use attachment::AttachmentRepository;
pub use job::{JobStore, PgJobStore};
pub use option::PgOptionStore;
