// retail-dwh-core/src/domain/record.rs

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fractional digits kept on money amounts; staging columns are `DECIMAL(18,4)`.
pub const AMOUNT_SCALE: u32 = 4;

/// Largest magnitude a `DECIMAL(18,4)` column holds.
// 999_999_999_999_999_999 split into 32-bit words (`Decimal::new` is not const).
pub const MAX_STORED_AMOUNT: Decimal =
    Decimal::from_parts(0xA763_FFFF, 0x0DE0_B6B3, 0, false, AMOUNT_SCALE);

/// One row exactly as extracted from the source. Every field is untyped text;
/// `None` means the cell was empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "InvoiceNo")]
    pub invoice_no: Option<String>,
    #[serde(rename = "StockCode")]
    pub stock_code: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<String>,
    #[serde(rename = "InvoiceDate")]
    pub invoice_date: Option<String>,
    #[serde(rename = "UnitPrice")]
    pub unit_price: Option<String>,
    #[serde(rename = "CustomerID")]
    pub customer_id: Option<String>,
    #[serde(rename = "Country")]
    pub country: Option<String>,
}

impl RawRecord {
    /// Source column names, in extraction order.
    pub const COLUMNS: [&'static str; 8] = [
        "InvoiceNo",
        "StockCode",
        "Description",
        "Quantity",
        "InvoiceDate",
        "UnitPrice",
        "CustomerID",
        "Country",
    ];

    pub fn fields(&self) -> [Option<&str>; 8] {
        [
            self.invoice_no.as_deref(),
            self.stock_code.as_deref(),
            self.description.as_deref(),
            self.quantity.as_deref(),
            self.invoice_date.as_deref(),
            self.unit_price.as_deref(),
            self.customer_id.as_deref(),
            self.country.as_deref(),
        ]
    }

    /// True when no cell carries anything but whitespace.
    pub fn is_blank(&self) -> bool {
        self.fields()
            .into_iter()
            .all(|f| f.is_none_or(|v| v.trim().is_empty()))
    }
}

/// Typed view of a [`RawRecord`] produced by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFields {
    pub invoice_no: Option<String>,
    pub stock_code: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub invoice_date: Option<NaiveDateTime>,
    pub unit_price: Decimal,
    pub customer_id: Option<i64>,
    pub country: String,
    pub line_total: Decimal,
}

/// A record travelling through the rule engine: the original extraction
/// plus its normalized fields.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingRecord {
    pub raw: RawRecord,
    pub fields: NormalizedFields,
}

/// Business flags derived for a staged record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFlags {
    pub is_cancellation: bool,
    pub is_adjustment: bool,
    pub is_guest_purchase: bool,
    pub is_valid_sale: bool,
    pub is_return: bool,
}

/// Provenance stamped on every record accepted in a batch.
#[derive(Debug, Clone)]
pub struct LoadContext {
    pub batch_id: String,
    pub loaded_at: DateTime<Utc>,
    pub source_id: String,
}

/// A record accepted for the staging table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedRecord {
    pub invoice_no: String,
    pub stock_code: String,
    pub description: String,
    pub quantity: i64,
    pub invoice_date: NaiveDateTime,
    pub unit_price: Decimal,
    pub customer_id: Option<i64>,
    pub country: String,
    pub line_total: Decimal,
    #[serde(flatten)]
    pub flags: SaleFlags,
    pub loaded_at: DateTime<Utc>,
    pub batch_id: String,
    pub source_file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_record_detection() {
        let blank = RawRecord {
            description: Some("   ".into()),
            ..Default::default()
        };
        assert!(blank.is_blank());

        let filled = RawRecord {
            country: Some("France".into()),
            ..Default::default()
        };
        assert!(!filled.is_blank());
    }

    #[test]
    fn test_raw_record_serializes_with_source_column_names() -> anyhow::Result<()> {
        let raw = RawRecord {
            invoice_no: Some("536365".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&raw)?;
        assert_eq!(json["InvoiceNo"], "536365");
        assert!(json["CustomerID"].is_null());
        assert_eq!(json.as_object().map(|o| o.len()), Some(RawRecord::COLUMNS.len()));
        Ok(())
    }
}
