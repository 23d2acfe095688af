//! Storage usage models.

pub mod record;
pub mod report;
pub mod snapshot;

pub use record::UsageRecord;
pub use report::{FileStatistics, RecalculationReport};
pub use snapshot::{FormattedUsage, UsageSnapshot, UsageStatus};
