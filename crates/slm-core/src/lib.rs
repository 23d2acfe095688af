//! # slm-core
//!
//! Core crate for the storage limit manager. Contains the collaborator
//! traits the accounting service is written against, configuration
//! schemas, typed usage events, pagination, and the unified error system.
//!
//! This crate has **no** internal dependencies on other workspace crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
