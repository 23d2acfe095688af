//! # slm-entity
//!
//! Value types of the storage limit manager. Persisted rows derive
//! `sqlx::FromRow`; everything else is a serde value object computed on
//! demand.

pub mod attachment;
pub mod job;
pub mod quota;
pub mod usage;
