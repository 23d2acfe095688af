//! Usage tracking and reporting.

pub mod stats;
pub mod store;

pub use stats::UsageStatsService;
pub use store::UsageStore;
