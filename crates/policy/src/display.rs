const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Percentage saved going from `original` to `compressed` bytes, e.g. `"37.5%"`.
///
/// Negative when the output grew. A zero-byte original yields `"0%"`.
pub fn format_compression_ratio(original: u64, compressed: u64) -> String {
    if original == 0 {
        return "0%".to_string();
    }
    let saved = (original as f64 - compressed as f64) / original as f64 * 100.0;
    format!("{saved:.1}%")
}

/// Human-readable size using 1024-based units: `"0 B"`, `"1.5 KB"`, `"2.86 MB"`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{rendered} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0 B")]
    #[case(1, "1 B")]
    #[case(1023, "1023 B")]
    #[case(1024, "1 KB")]
    #[case(1536, "1.5 KB")]
    #[case(3_000_000, "2.86 MB")]
    #[case(2 * 1024 * 1024, "2 MB")]
    #[case(5 * 1024 * 1024 * 1024, "5 GB")]
    #[case(3 * 1024 * 1024 * 1024 * 1024 * 1024, "3072 TB")]
    fn test_format_file_size(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_file_size(bytes), expected);
    }

    #[rstest]
    #[case(0, 0, "0%")]
    #[case(0, 100, "0%")]
    #[case(1000, 625, "37.5%")]
    #[case(1000, 1000, "0.0%")]
    #[case(1000, 0, "100.0%")]
    #[case(1000, 1050, "-5.0%")]
    fn test_format_compression_ratio(#[case] original: u64, #[case] compressed: u64, #[case] expected: &str) {
        assert_eq!(format_compression_ratio(original, compressed), expected);
    }
}
