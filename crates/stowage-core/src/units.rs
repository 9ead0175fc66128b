//! Size and throughput helpers used in audit metadata and CLI output.

use std::time::Duration;

use crate::constants::BYTES_PER_MB;

/// Throughput in MB/s (`bytes / seconds / 1024 / 1024`). Zero elapsed time
/// yields 0.
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 / secs / BYTES_PER_MB
}

/// Human-readable size: `512 B`, `1.5 KB`, `2.0 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const SUFFIXES: &[u8] = b"KMGTPE";

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!(
        "{:.1} {}B",
        bytes as f64 / div as f64,
        SUFFIXES[exp] as char
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput() {
        let mbps = throughput_mbps(2 * 1024 * 1024, Duration::from_secs(2));
        assert!((mbps - 1.0).abs() < f64::EPSILON);
        assert_eq!(throughput_mbps(1024, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2.0 MB");
        assert_eq!(format_file_size(u64::MAX), "16.0 EB");
    }
}
