//! # slm-cache
//!
//! Cache providers for the short-lived flags and leases of the
//! recalculation scheduler:
//!
//! - **memory**: in-process cache using [moka](https://crates.io/crates/moka),
//!   suitable for a single process
//! - **redis**: Redis-backed cache shared by every process of a deployment
//!
//! The provider is selected at runtime from the `[cache]` section.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
