//! Cell cleanup applied while loading.
//!
//! Every parser returns `None` for a value that cannot be turned into a
//! finite number or a valid date. The loader stores `None` as a null cell,
//! which the aggregations skip.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Currency symbols stripped from price strings.
const CURRENCY_SYMBOLS: &[char] = &['₹', '$'];

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Parse a number written with a comma decimal separator (`"261,96"`).
///
/// Commas are replaced by dots before parsing, so `"1.234,5"` becomes
/// `"1.234.5"` and is rejected rather than misread.
pub fn parse_locale_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', ".").parse::<f64>().ok().and_then(finite)
}

/// Parse a price such as `"₹1,099"`: the currency symbol and thousands
/// separators are removed before parsing.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().and_then(finite)
}

/// Parse a percentage such as `"64%"` into `64.0`.
pub fn parse_percentage(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    if number.is_empty() {
        return None;
    }
    number.parse::<f64>().ok().and_then(finite)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse an order date. Month-first `M/D/YYYY` wins over day-first when both
/// are valid.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Convert a spreadsheet serial day number (1900 date system) to a date.
///
/// Counting from 1899-12-30 absorbs the fictitious 1900-02-29.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // 2_958_465 is 9999-12-31, the last date a spreadsheet can hold
    if !serial.is_finite() || !(0.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Month number (1-12) of a date.
pub fn month_of(date: NaiveDate) -> u32 {
    date.month()
}

/// Discount ranges for the purchase dataset, in percent.
///
/// Ranges are right-open except the last, which includes 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DiscountBucket {
    #[serde(rename = "0-5%")]
    UpTo5,
    #[serde(rename = "5-10%")]
    UpTo10,
    #[serde(rename = "10-20%")]
    UpTo20,
    #[serde(rename = "20-30%")]
    UpTo30,
    #[serde(rename = "30-50%")]
    UpTo50,
    #[serde(rename = "50%+")]
    From50,
}

impl DiscountBucket {
    pub const ALL: [DiscountBucket; 6] = [
        DiscountBucket::UpTo5,
        DiscountBucket::UpTo10,
        DiscountBucket::UpTo20,
        DiscountBucket::UpTo30,
        DiscountBucket::UpTo50,
        DiscountBucket::From50,
    ];

    /// Bucket for a discount percentage, or `None` outside `[0, 100]`.
    pub fn classify(percent: f64) -> Option<Self> {
        if !(0.0..=100.0).contains(&percent) {
            return None;
        }
        Some(match percent {
            p if p < 5.0 => DiscountBucket::UpTo5,
            p if p < 10.0 => DiscountBucket::UpTo10,
            p if p < 20.0 => DiscountBucket::UpTo20,
            p if p < 30.0 => DiscountBucket::UpTo30,
            p if p < 50.0 => DiscountBucket::UpTo50,
            _ => DiscountBucket::From50,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            DiscountBucket::UpTo5 => "0-5%",
            DiscountBucket::UpTo10 => "5-10%",
            DiscountBucket::UpTo20 => "10-20%",
            DiscountBucket::UpTo30 => "20-30%",
            DiscountBucket::UpTo50 => "30-50%",
            DiscountBucket::From50 => "50%+",
        }
    }
}

impl std::fmt::Display for DiscountBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
