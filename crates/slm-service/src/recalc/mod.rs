//! Authoritative rescans and their debounced scheduling.

pub mod engine;
pub mod scheduler;

pub use engine::RecalculationEngine;
pub use scheduler::RecalculationScheduler;
