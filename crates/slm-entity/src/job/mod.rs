//! Durable background jobs.

pub mod model;
pub mod status;

pub use model::{CreateJob, Job};
pub use status::{JobPriority, JobStatus};

/// Job type of the debounced recalculation.
pub const DELAYED_RECALCULATION: &str = "slm_delayed_recalculation";

/// Job type of the periodic drift-correction rescan.
pub const PERIODIC_RECALCULATION: &str = "slm_periodic_recalculation";

/// Job type of the finished-job purge.
pub const JOB_CLEANUP: &str = "slm_job_cleanup";

/// Queue all accounting jobs run on.
pub const ACCOUNTING_QUEUE: &str = "accounting";
