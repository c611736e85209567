pub mod batch;
pub mod config;
pub mod error;
pub mod mark;
pub mod pattern;
pub mod permutation;
pub mod platform;
pub mod primes;
pub mod report;
pub mod store;
pub mod sweep;
pub mod traversal;
pub mod two_level;

/// Convert number of bytes to formatted string
pub fn format_size(bytes: u64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const KB: f64 = 1024.0;

    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.2} GiB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes / KB)
    } else {
        format!("{:.2} B", bytes)
    }
}
