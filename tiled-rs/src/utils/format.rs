//! Formatting utilities

use humansize::{DECIMAL, format_size};

/// Format file size in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a percentage
pub fn format_percentage(value: f64) -> String {
    format!("{value:.1}%")
}

/// Format the share of `part` in `total` as a percentage
pub fn format_ratio(part: usize, total: usize) -> String {
    if total == 0 {
        "N/A".to_string()
    } else {
        format_percentage(part as f64 / total as f64 * 100.0)
    }
}

/// Format a width/height pair
pub fn format_dimensions(width: u32, height: u32) -> String {
    format!("{width}x{height}")
}
