use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{ReportError, Result};

/// One cleaned line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesRecord {
    pub order_id: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub ciudad_cliente: Option<String>,
    pub quantity: u64,
    pub unit_price_cop: Option<Decimal>,
    pub ingreso_neto_item: Decimal,
    /// Cells of the non-required columns, in header order.
    pub extra: Vec<Option<String>>,
}

/// Trims a free-text cell. Blank cells are treated as missing.
pub fn clean_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses an order date. Ambiguous numeric dates such as `06/05/2024` are read
/// month first; day-first forms only match when the month-first reading is
/// impossible (`15/03/2024`). Datetimes are truncated to their date.
pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y",
    ];
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let trimmed = value.trim();
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed.date());
        }
    }
    Err(ReportError::FieldCoercion {
        column: "order_date",
        value: value.to_string(),
    })
}

/// Parses a plain or scientific decimal number. Blank cells and values such
/// as `NaN` or `inf` are rejected like any other unparseable text.
pub fn parse_decimal(value: &str, column: &'static str) -> Result<Decimal> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ReportError::FieldCoercion {
            column,
            value: value.to_string(),
        })
}

/// Replaces each missing date with the closest earlier date. Leading gaps
/// stay empty. Returns how many cells were filled.
pub fn forward_fill(dates: &mut [Option<NaiveDate>]) -> usize {
    let mut last_seen = None;
    let mut filled = 0;
    for slot in dates.iter_mut() {
        match *slot {
            Some(date) => last_seen = Some(date),
            None => {
                if let Some(previous) = last_seen {
                    *slot = Some(previous);
                    filled += 1;
                }
            }
        }
    }
    filled
}

/// Calendar-month label (`YYYY-MM`) that sorts chronologically as a string.
pub fn month_label(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a value with comma thousands separators, rounded to `scale`
/// fractional digits.
pub fn format_grouped(value: Decimal, scale: u32) -> String {
    let rounded = value.round_dp(scale);
    let text = format!("{:.*}", scale as usize, rounded.abs());
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };
    let mut grouped = String::with_capacity(text.len() + whole.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        grouped.push('-');
    }
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

pub fn format_currency(value: Decimal) -> String {
    if value.is_sign_negative() && !value.round_dp(0).is_zero() {
        format!("-${}", format_grouped(value.abs(), 0))
    } else {
        format!("${}", format_grouped(value.abs(), 0))
    }
}
