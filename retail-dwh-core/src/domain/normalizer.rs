// retail-dwh-core/src/domain/normalizer.rs

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::record::{AMOUNT_SCALE, NormalizedFields, RawRecord, WorkingRecord};

pub const UNKNOWN_PRODUCT: &str = "UNKNOWN PRODUCT";
pub const UNKNOWN_COUNTRY: &str = "UNKNOWN";

const DATETIME_FORMATS: [&str; 6] = [
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Type-coerces and standardizes raw records. Never fails: unparseable
/// numbers become 0, unparseable dates become `None`.
pub struct RecordNormalizer;

impl RecordNormalizer {
    pub fn normalize(raw: RawRecord) -> WorkingRecord {
        let quantity = raw.quantity.as_deref().map(parse_quantity).unwrap_or(0);
        let unit_price = raw
            .unit_price
            .as_deref()
            .map(parse_price)
            .unwrap_or(Decimal::ZERO);

        let fields = NormalizedFields {
            invoice_no: clean(raw.invoice_no.as_deref()).map(str::to_uppercase),
            stock_code: clean(raw.stock_code.as_deref()).map(str::to_uppercase),
            description: clean(raw.description.as_deref())
                .unwrap_or(UNKNOWN_PRODUCT)
                .to_string(),
            quantity,
            invoice_date: raw.invoice_date.as_deref().and_then(parse_timestamp),
            unit_price,
            customer_id: raw.customer_id.as_deref().and_then(parse_customer_id),
            country: clean(raw.country.as_deref())
                .map(title_case)
                .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
            line_total: Decimal::from(quantity).saturating_mul(unit_price),
        };

        WorkingRecord { raw, fields }
    }

    pub fn normalize_all(records: Vec<RawRecord>) -> Vec<WorkingRecord> {
        records.into_iter().map(Self::normalize).collect()
    }
}

/// Trims and treats whitespace-only cells as missing.
fn clean(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses the invoice timestamp layouts seen in retail exports.
/// Offsets are converted to UTC.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(ts) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(ts);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn parse_quantity(value: &str) -> i64 {
    let value = value.trim();
    if let Ok(q) = value.parse::<i64>() {
        return q;
    }
    match value.parse::<f64>() {
        // Truncates toward zero; out-of-range values saturate.
        Ok(q) if q.is_finite() => q.trunc() as i64,
        _ => 0,
    }
}

/// Prices are kept at the stored scale so `line_total` is computed from the
/// value that lands in the warehouse.
fn parse_price(value: &str) -> Decimal {
    let value = value.trim();
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map(|p| p.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::ZERO)
}

fn parse_customer_id(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(id) = value.parse::<i64>() {
        return Some(id);
    }
    match value.parse::<f64>() {
        Ok(id) if id.is_finite() => Some(id.trunc() as i64),
        _ => None,
    }
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the rest.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_word = false;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}
