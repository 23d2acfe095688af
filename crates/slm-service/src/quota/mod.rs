//! Upload admission against the storage quota.

pub mod guard;

pub use guard::QuotaGuard;
