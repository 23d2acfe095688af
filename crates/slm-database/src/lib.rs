//! # slm-database
//!
//! PostgreSQL connection management, migrations, and the persistence
//! collaborators of the accounting service. The [`memory`] module holds
//! in-process equivalents for development and tests.

pub mod connection;
pub mod fs;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::{AttachmentRepository, JobStore, PgJobStore, PgOptionStore};
