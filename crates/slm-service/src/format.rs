//! Human-readable byte and percentage formatting.

/// Decimal places used when none are requested.
pub const DEFAULT_PRECISION: u32 = 2;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with binary multiples.
///
/// The value is divided by 1024 while it is strictly greater than 1024, so
/// exactly 1024 bytes stays `"1024 B"`. The result is rounded to
/// `precision` places and printed without trailing zeros.
pub fn format_bytes(bytes: u64, precision: u32) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value > 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let factor = 10f64.powi(precision.min(15) as i32);
    let rounded = (value * factor).round() / factor;
    format!("{rounded} {}", UNITS[unit])
}

/// Format a percentage with one decimal, e.g. `"95.0%"`.
pub fn format_percentage(percentage: f64) -> String {
    format!("{percentage:.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0, 2), "0 B");
        assert_eq!(format_bytes(1024, 2), "1024 B");
        assert_eq!(format_bytes(1536, 2), "1.5 KB");
        assert_eq!(format_bytes(1000 * 1024 * 1024, 2), "1000 MB");
        assert_eq!(format_bytes(1_000_000_000, 2), "953.67 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024 * 1024, 2), "5 TB");
    }

    #[test]
    fn test_terabytes_do_not_overflow_units() {
        assert_eq!(format_bytes(2048 * 1024 * 1024 * 1024 * 1024, 2), "2048 TB");
    }

    #[test]
    fn test_precision() {
        assert_eq!(format_bytes(1_000_000_000, 0), "954 MB");
        assert_eq!(format_bytes(1_000_000_000, 1), "953.7 MB");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(95.0), "95.0%");
        assert_eq!(format_percentage(0.0), "0.0%");
        assert_eq!(format_percentage(51.26), "51.3%");
    }
}
