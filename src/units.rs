//! Fixed-decimal amount parsing and display helpers.

use chrono::{DateTime, Utc};

/// Parse a decimal amount string into base units.
///
/// Accepts plain digits with at most one decimal point; the fractional part
/// may not exceed `decimals` digits. Returns `None` for anything malformed,
/// negative, or overflowing.
pub fn parse_units(input: &str, decimals: u32) -> Option<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut parts = trimmed.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let frac = parts.next().unwrap_or("");

    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if frac.len() > decimals as usize {
        return None;
    }

    let scale = 10u64.checked_pow(decimals)?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().ok()?
    };

    let mut frac_units = 0u64;
    if !frac.is_empty() {
        let padded = format!("{frac:0<width$}", width = decimals as usize);
        frac_units = padded.parse::<u64>().ok()?;
    }

    whole_units.checked_mul(scale)?.checked_add(frac_units)
}

/// Render base units as a full decimal string, trailing zeros trimmed but at
/// least one fractional digit kept (`1_000_000` at 6 decimals is `"1.0"`).
pub fn format_units(value: u64, decimals: u32) -> String {
    let scale = 10u64.pow(decimals);
    let whole = value / scale;
    let remainder = value % scale;
    let mut frac = format!("{remainder:0>width$}", width = decimals as usize);
    while frac.len() > 1 && frac.ends_with('0') {
        frac.pop();
    }
    format!("{whole}.{frac}")
}

/// Display form used by the balance cards: truncated (not rounded) to three
/// fractional digits, `"--"` when the value is still encrypted.
pub fn format_token_amount(value: Option<u64>, decimals: u32) -> String {
    let Some(value) = value else {
        return "--".to_string();
    };
    let full = format_units(value, decimals);
    let (whole, frac) = full.split_once('.').unwrap_or((full.as_str(), ""));
    let trimmed: String = frac.chars().take(3).collect();
    if trimmed.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{trimmed}")
    }
}

/// Render a unix timestamp as UTC. Zero and `None` mean "no lock set".
pub fn format_timestamp(value: Option<u64>) -> String {
    match value {
        None | Some(0) => "Not set".to_string(),
        Some(secs) => match DateTime::<Utc>::from_timestamp(secs as i64, 0) {
            Some(dt) => format!("{} UTC", dt.format("%Y-%m-%d %H:%M:%S")),
            None => "Not set".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("250.5", 6), Some(250_500_000));
        assert_eq!(parse_units("400", 6), Some(400_000_000));
        assert_eq!(parse_units("0", 6), Some(0));
        assert_eq!(parse_units("0.000001", 6), Some(1));
        assert_eq!(parse_units(".5", 6), Some(500_000));
        assert_eq!(parse_units("-1", 6), None);
        assert_eq!(parse_units("", 6), None);
        assert_eq!(parse_units(".", 6), None);
        assert_eq!(parse_units("1.2345678", 6), None);
        assert_eq!(parse_units("abc", 6), None);
        assert_eq!(parse_units("1e5", 6), None);
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(1_234_567, 6), "1.234567");
        assert_eq!(format_units(1_000_000, 6), "1.0");
        assert_eq!(format_units(1_500_000, 6), "1.5");
        assert_eq!(format_units(0, 6), "0.0");
    }

    #[test]
    fn test_format_token_amount_truncates() {
        // truncated, not rounded
        assert_eq!(format_token_amount(Some(1_234_567), 6), "1.234");
        assert_eq!(format_token_amount(Some(1_999_999), 6), "1.999");
        assert_eq!(format_token_amount(Some(1_000_000), 6), "1.0");
        assert_eq!(format_token_amount(None, 6), "--");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(None), "Not set");
        assert_eq!(format_timestamp(Some(0)), "Not set");
        assert_eq!(format_timestamp(Some(86_400)), "1970-01-02 00:00:00 UTC");
        assert_eq!(
            format_timestamp(Some(1_700_000_000)),
            "2023-11-14 22:13:20 UTC"
        );
    }
}
