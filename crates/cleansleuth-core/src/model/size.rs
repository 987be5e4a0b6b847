/// Size helpers: byte-unit constants and human-readable formatting.
///
/// All internal sizes are `u64` bytes. Floating point is only used at the
/// display boundary and for growth rates (bytes per day).

pub const KIB: u64 = 1024;
pub const MIB: u64 = KIB * 1024;
pub const GIB: u64 = MIB * 1024;
pub const TIB: u64 = GIB * 1024;

/// Convert a megabyte count supplied by a caller (e.g. "files over 500 MB")
/// into bytes. Binary units, matching [`format_size`].
pub fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(MIB)
}

/// Format a byte count into a human-readable string with appropriate unit.
///
/// Uses binary units (KiB = 1024) but labels them with the short forms
/// (KB, MB, GB, TB) users expect from a disk tool.
pub fn format_size(bytes: u64) -> String {
    let b = bytes as f64;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KB", b / KIB as f64)
    } else if bytes < GIB {
        format!("{:.1} MB", b / MIB as f64)
    } else if bytes < TIB {
        format!("{:.2} GB", b / GIB as f64)
    } else {
        format!("{:.2} TB", b / TIB as f64)
    }
}

/// Format a signed growth rate in bytes/day, e.g. `+1.5 MB/day`.
pub fn format_rate(bytes_per_day: f64) -> String {
    let sign = if bytes_per_day < 0.0 { "-" } else { "+" };
    let magnitude = bytes_per_day.abs().round() as u64;
    format!("{sign}{}/day", format_size(magnitude))
}

/// Format an item count with thousand separators.
pub fn format_count(count: u64) -> String {
    let s = count.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_picks_unit() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(MIB), "1.0 MB");
        assert_eq!(format_size(GIB), "1.00 GB");
        assert_eq!(format_size(TIB), "1.00 TB");
    }

    #[test]
    fn mb_to_bytes_uses_binary_units() {
        assert_eq!(mb_to_bytes(0), 0);
        assert_eq!(mb_to_bytes(2), 2 * 1_048_576);
        assert_eq!(mb_to_bytes(u64::MAX), u64::MAX);
    }

    #[test]
    fn format_rate_keeps_sign() {
        assert_eq!(format_rate(50.0), "+50 B/day");
        assert_eq!(format_rate(-2048.0), "-2.0 KB/day");
    }

    #[test]
    fn format_count_groups_thousands() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }
}
