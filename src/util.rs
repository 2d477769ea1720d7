// Utility helpers for parsing and formatting.
//
// This module centralizes all the "dirty" spreadsheet/number/date handling so
// the rest of the code can assume clean, typed values.
use chrono::{Days, NaiveDate};
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

// Day zero of the 1900 date system as office tools count it (the 1900 leap
// year bug is folded into the epoch).
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
const MAX_SERIAL: u64 = 2_958_465; // 9999-12-31

/// Parse a date cell. Each format is tried against the full cell and then
/// against the part before a time component (`2024-03-01 10:15:00`,
/// `2024-03-01T10:15`). Bare integers are read as spreadsheet serial dates.
pub fn parse_date_safe(s: Option<&str>, formats: &[String]) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let date_part = s.split([' ', 'T']).next().unwrap_or(s);
    for fmt in formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
        if date_part != s {
            if let Ok(d) = NaiveDate::parse_from_str(date_part, fmt) {
                return Some(d);
            }
        }
    }
    parse_serial_date(s)
}

fn parse_serial_date(s: &str) -> Option<NaiveDate> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u64 = s.parse().ok()?;
    if n == 0 || n > MAX_SERIAL {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(n))
}

/// Canonical text form of an item identifier.
///
/// Spreadsheet tools happily turn `100` into `100.0` when a column is typed
/// as numeric, so integral decimal renderings collapse to their integer part.
/// Anything else is kept verbatim (after trimming): `00100` stays distinct
/// from `100`.
pub fn canonical_item_id(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some((int_part, frac)) = s.split_once('.') {
        let int_ok = !int_part.is_empty() && int_part.bytes().all(|b| b.is_ascii_digit());
        let frac_zero = !frac.is_empty() && frac.bytes().all(|b| b == b'0');
        if int_ok && frac_zero {
            return Some(int_part.to_string());
        }
    }
    Some(s.to_string())
}

/// Round a shortfall to a whole order quantity.
///
/// Uses `f64::round` (half away from zero). Only non-negative values can
/// come out of here, so this is the same as round-half-up.
pub fn round_order_qty(shortfall: f64) -> u64 {
    if !shortfall.is_finite() || shortfall <= 0.0 {
        return 0;
    }
    shortfall.round() as u64
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let s = format!("{:.*}", decimals, n.abs());
    // `-0.00` reads badly in a report, so only keep the sign when the
    // rendered value is nonzero.
    let neg = n.is_sign_negative() && s.bytes().any(|b| (b'1'..=b'9').contains(&b));
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `9,855 rows read`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> Vec<String> {
        crate::config::TransactionColumns::default().date_formats
    }

    #[test]
    fn numbers_tolerate_separators_and_reject_text() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("-24")), Some(-24.0));
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn dates_in_common_export_shapes() {
        let want = NaiveDate::from_ymd_opt(2024, 3, 1);
        let f = formats();
        assert_eq!(parse_date_safe(Some("2024-03-01"), &f), want);
        assert_eq!(parse_date_safe(Some("2024-03-01 10:15:00"), &f), want);
        assert_eq!(parse_date_safe(Some("2024-03-01T10:15"), &f), want);
        assert_eq!(parse_date_safe(Some("03/01/2024"), &f), want);
        assert_eq!(parse_date_safe(Some("01.03.2024"), &f), want);
        assert_eq!(parse_date_safe(Some("45352"), &f), want);
        assert_eq!(parse_date_safe(Some("yesterday"), &f), None);
        assert_eq!(parse_date_safe(Some("2024-02-30"), &f), None);
        assert_eq!(parse_date_safe(Some("  "), &f), None);
    }

    #[test]
    fn item_ids_collapse_numeric_renderings_only() {
        assert_eq!(canonical_item_id(" 100 ").as_deref(), Some("100"));
        assert_eq!(canonical_item_id("100.0").as_deref(), Some("100"));
        assert_eq!(canonical_item_id("100.00").as_deref(), Some("100"));
        assert_eq!(canonical_item_id("100.5").as_deref(), Some("100.5"));
        assert_eq!(canonical_item_id("00100").as_deref(), Some("00100"));
        assert_eq!(canonical_item_id("AB-7.0").as_deref(), Some("AB-7.0"));
        assert_eq!(canonical_item_id("   "), None);
    }

    #[test]
    fn order_rounding_is_half_up_and_never_negative() {
        assert_eq!(round_order_qty(-4.0), 0);
        assert_eq!(round_order_qty(0.0), 0);
        assert_eq!(round_order_qty(0.5), 1);
        assert_eq!(round_order_qty(2.5), 3);
        assert_eq!(round_order_qty(4.49), 4);
        assert_eq!(round_order_qty(f64::NAN), 0);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_int(9855usize), "9,855");
    }
}
