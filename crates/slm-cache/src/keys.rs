//! Cache key builders.

/// Prefix applied to every cache key.
const PREFIX: &str = "slm";

/// Lease held while a debounced recalculation is pending.
pub fn pending_recalculation() -> String {
    format!("{PREFIX}:recalculation:pending")
}

/// Flag set after a debounced recalculation has run.
pub fn auto_recalculated() -> String {
    format!("{PREFIX}:recalculation:auto")
}
