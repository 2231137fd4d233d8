// retail-dwh-core/src/domain/quality/tracker.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;
use crate::domain::record::WorkingRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    DataIntegrity,
    AnomalyDetection,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::DataIntegrity => "data_integrity",
            RuleCategory::AnomalyDetection => "anomaly_detection",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data_integrity" => Ok(RuleCategory::DataIntegrity),
            "anomaly_detection" => Ok(RuleCategory::AnomalyDetection),
            other => Err(DomainError::UnknownCategory(other.to_string())),
        }
    }
}

/// One row of the per-batch rule metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqMetric {
    pub batch_id: String,
    pub rule_name: String,
    pub category: RuleCategory,
    pub rows_processed: usize,
    pub rows_passed: usize,
    pub rows_quarantined: usize,
    pub rows_dropped: usize,
    pub executed_at: DateTime<Utc>,
    pub note: String,
}

/// A rejected record kept for investigation. Field values are the ones
/// extracted from the source, before any normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    pub batch_id: String,
    pub rule_name: String,
    pub reason: String,
    pub quarantined_at: DateTime<Utc>,
    pub original_invoice_no: Option<String>,
    pub original_stock_code: Option<String>,
    pub original_description: Option<String>,
    pub original_quantity: Option<String>,
    pub original_invoice_date: Option<String>,
    pub original_unit_price: Option<String>,
    pub original_customer_id: Option<String>,
    pub original_country: Option<String>,
    pub raw_row_json: String,
}

/// Per-batch accumulator for metrics and quarantined rows.
///
/// Owned by the orchestrator for the lifetime of one batch, lent mutably to
/// the rule engine, then consumed by [`QualityTracker::drain`].
#[derive(Debug)]
pub struct QualityTracker {
    batch_id: String,
    metrics: Vec<DqMetric>,
    quarantine: Vec<QuarantineEntry>,
}

impl QualityTracker {
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            metrics: Vec::new(),
            quarantine: Vec::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_metric(
        &mut self,
        rule_name: &str,
        category: RuleCategory,
        rows_processed: usize,
        rows_passed: usize,
        rows_quarantined: usize,
        rows_dropped: usize,
        note: &str,
    ) {
        self.metrics.push(DqMetric {
            batch_id: self.batch_id.clone(),
            rule_name: rule_name.to_string(),
            category,
            rows_processed,
            rows_passed,
            rows_quarantined,
            rows_dropped,
            executed_at: Utc::now(),
            note: note.to_string(),
        });
    }

    pub fn quarantine(&mut self, records: &[WorkingRecord], rule_name: &str, reason: &str) {
        let quarantined_at = Utc::now();
        self.quarantine.extend(records.iter().map(|rec| {
            let raw = &rec.raw;
            QuarantineEntry {
                batch_id: self.batch_id.clone(),
                rule_name: rule_name.to_string(),
                reason: reason.to_string(),
                quarantined_at,
                original_invoice_no: raw.invoice_no.clone(),
                original_stock_code: raw.stock_code.clone(),
                original_description: raw.description.clone(),
                original_quantity: raw.quantity.clone(),
                original_invoice_date: raw.invoice_date.clone(),
                original_unit_price: raw.unit_price.clone(),
                original_customer_id: raw.customer_id.clone(),
                original_country: raw.country.clone(),
                raw_row_json: snapshot(rec),
            }
        }));
    }

    pub fn metrics(&self) -> &[DqMetric] {
        &self.metrics
    }

    pub fn quarantined(&self) -> &[QuarantineEntry] {
        &self.quarantine
    }

    pub fn quarantined_count(&self) -> usize {
        self.quarantine.len()
    }

    /// Hands the accumulated collections over for persistence.
    pub fn drain(self) -> (Vec<DqMetric>, Vec<QuarantineEntry>) {
        (self.metrics, self.quarantine)
    }
}

/// Null-safe JSON of every extracted column.
fn snapshot(rec: &WorkingRecord) -> String {
    let raw = &rec.raw;
    serde_json::json!({
        "InvoiceNo": raw.invoice_no,
        "StockCode": raw.stock_code,
        "Description": raw.description,
        "Quantity": raw.quantity,
        "InvoiceDate": raw.invoice_date,
        "UnitPrice": raw.unit_price,
        "CustomerID": raw.customer_id,
        "Country": raw.country,
    })
    .to_string()
}
