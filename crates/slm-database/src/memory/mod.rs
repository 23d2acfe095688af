//! In-process stores with the same semantics as the PostgreSQL ones.
//!
//! Used by the server when no database is configured for development, and
//! by tests across the workspace. Each store can be switched into an
//! unavailable mode to exercise failure paths.

pub mod job;
pub mod object;
pub mod option;

pub use job::MemoryJobStore;
pub use object::MemoryObjectStore;
pub use option::MemoryOptionStore;
