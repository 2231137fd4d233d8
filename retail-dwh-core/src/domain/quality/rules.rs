// retail-dwh-core/src/domain/quality/rules.rs

use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::domain::quality::policy::QualityPolicy;
use crate::domain::quality::tracker::{QualityTracker, RuleCategory};
use crate::domain::record::{MAX_STORED_AMOUNT, RawRecord, WorkingRecord};

/// What happens to the records a rule rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Soft reject: kept in the quarantine table with an audit trail.
    Quarantine,
    /// Hard reject: counted in the metrics, not retained.
    Drop,
}

/// A named data-quality predicate applied once per batch.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn category(&self) -> RuleCategory;
    fn default_disposition(&self) -> Disposition;
    /// Reason code plus description, e.g. `AN002: Quantity = 0`.
    fn reason(&self) -> &'static str;

    /// Per-record predicate. `true` rejects the record.
    fn rejects(&self, record: &WorkingRecord) -> bool;

    /// Splits the working set into (passed, rejected), preserving order.
    fn partition(&self, records: Vec<WorkingRecord>) -> (Vec<WorkingRecord>, Vec<WorkingRecord>) {
        records.into_iter().partition(|r| !self.rejects(r))
    }
}

pub struct UnparseableDates;

impl Rule for UnparseableDates {
    fn name(&self) -> &'static str {
        "unparseable_dates"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::DataIntegrity
    }
    fn default_disposition(&self) -> Disposition {
        Disposition::Drop
    }
    fn reason(&self) -> &'static str {
        "DQ004: Unparseable InvoiceDate"
    }
    fn rejects(&self, record: &WorkingRecord) -> bool {
        record.fields.invoice_date.is_none()
    }
}

pub struct SuspiciousUnitPrice {
    pub price_threshold: Decimal,
    pub quantity_limit: i64,
}

impl Rule for SuspiciousUnitPrice {
    fn name(&self) -> &'static str {
        "suspicious_unit_price"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::AnomalyDetection
    }
    fn default_disposition(&self) -> Disposition {
        Disposition::Quarantine
    }
    fn reason(&self) -> &'static str {
        "AN001: Unit price above threshold with low quantity"
    }
    fn rejects(&self, record: &WorkingRecord) -> bool {
        record.fields.unit_price > self.price_threshold
            && record.fields.quantity.saturating_abs() < self.quantity_limit
    }
}

pub struct ZeroQuantity;

impl Rule for ZeroQuantity {
    fn name(&self) -> &'static str {
        "zero_quantity"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::AnomalyDetection
    }
    fn default_disposition(&self) -> Disposition {
        Disposition::Quarantine
    }
    fn reason(&self) -> &'static str {
        "AN002: Quantity = 0"
    }
    fn rejects(&self, record: &WorkingRecord) -> bool {
        record.fields.quantity == 0
    }
}

pub struct NegativeUnitPrice;

impl Rule for NegativeUnitPrice {
    fn name(&self) -> &'static str {
        "negative_unit_price"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::AnomalyDetection
    }
    fn default_disposition(&self) -> Disposition {
        Disposition::Quarantine
    }
    fn reason(&self) -> &'static str {
        "AN003: Negative unit price"
    }
    fn rejects(&self, record: &WorkingRecord) -> bool {
        record.fields.unit_price < Decimal::ZERO
    }
}

pub struct AllNullRow;

impl Rule for AllNullRow {
    fn name(&self) -> &'static str {
        "all_null_row"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::DataIntegrity
    }
    fn default_disposition(&self) -> Disposition {
        Disposition::Drop
    }
    fn reason(&self) -> &'static str {
        "DQ001: Completely empty row"
    }
    fn rejects(&self, record: &WorkingRecord) -> bool {
        record.raw.is_blank()
    }
}

/// Rejects every repeat of a record already seen earlier in the batch.
/// Equality covers every extracted column; the normalized fields are a pure
/// function of those, so this is equality on the full record tuple.
pub struct ExactDuplicate;

impl Rule for ExactDuplicate {
    fn name(&self) -> &'static str {
        "exact_duplicate"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::DataIntegrity
    }
    fn default_disposition(&self) -> Disposition {
        Disposition::Drop
    }
    fn reason(&self) -> &'static str {
        "DQ002: Exact duplicate row"
    }
    fn rejects(&self, _record: &WorkingRecord) -> bool {
        // Duplicates are a property of the set, see `partition`.
        false
    }

    fn partition(&self, records: Vec<WorkingRecord>) -> (Vec<WorkingRecord>, Vec<WorkingRecord>) {
        let mut seen: HashSet<RawRecord> = HashSet::with_capacity(records.len());
        let mut passed = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();
        for rec in records {
            if seen.contains(&rec.raw) {
                rejected.push(rec);
            } else {
                seen.insert(rec.raw.clone());
                passed.push(rec);
            }
        }
        (passed, rejected)
    }
}

pub struct MissingCriticalField;

impl Rule for MissingCriticalField {
    fn name(&self) -> &'static str {
        "missing_critical_field"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::DataIntegrity
    }
    fn default_disposition(&self) -> Disposition {
        Disposition::Drop
    }
    fn reason(&self) -> &'static str {
        "DQ003: Missing InvoiceNo/StockCode/Date/Qty/Price"
    }
    fn rejects(&self, record: &WorkingRecord) -> bool {
        // Quantity and unit price are coerced to 0, never null, once normalized.
        let f = &record.fields;
        f.invoice_no.is_none() || f.stock_code.is_none() || f.invoice_date.is_none()
    }
}

/// Rejects amounts the staging columns cannot hold, so one extreme row is
/// audited instead of failing the load.
pub struct AmountOutOfRange;

impl Rule for AmountOutOfRange {
    fn name(&self) -> &'static str {
        "amount_out_of_range"
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::DataIntegrity
    }
    fn default_disposition(&self) -> Disposition {
        Disposition::Quarantine
    }
    fn reason(&self) -> &'static str {
        "DQ005: UnitPrice or line total exceeds DECIMAL(18,4)"
    }
    fn rejects(&self, record: &WorkingRecord) -> bool {
        record.fields.unit_price.abs() > MAX_STORED_AMOUNT
            || record.fields.line_total.abs() > MAX_STORED_AMOUNT
    }
}

/// Result of running every rule over a batch.
#[derive(Debug, Default)]
pub struct RuleEngineOutput {
    pub passed: Vec<WorkingRecord>,
    pub quarantined: usize,
    pub dropped: usize,
}

/// Ordered, single-pass pipeline of rules.
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
    quarantine_hard_failures: bool,
}

impl RuleEngine {
    /// The standard catalog, in evaluation order.
    pub fn standard(policy: &QualityPolicy) -> Self {
        Self {
            rules: vec![
                Box::new(UnparseableDates),
                Box::new(SuspiciousUnitPrice {
                    price_threshold: policy.suspicious_price_threshold,
                    quantity_limit: policy.suspicious_quantity_limit,
                }),
                Box::new(ZeroQuantity),
                Box::new(NegativeUnitPrice),
                Box::new(AllNullRow),
                Box::new(ExactDuplicate),
                Box::new(MissingCriticalField),
                Box::new(AmountOutOfRange),
            ],
            quarantine_hard_failures: policy.quarantine_hard_failures,
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>, quarantine_hard_failures: bool) -> Self {
        Self {
            rules,
            quarantine_hard_failures,
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    fn disposition_of(&self, rule: &dyn Rule) -> Disposition {
        match rule.default_disposition() {
            Disposition::Drop if self.quarantine_hard_failures => Disposition::Quarantine,
            d => d,
        }
    }

    /// Runs the rules in order. Rejected records leave the working set
    /// immediately; a metric is recorded only for rules that rejected rows.
    pub fn run(&self, records: Vec<WorkingRecord>, tracker: &mut QualityTracker) -> RuleEngineOutput {
        let mut working = records;
        let mut output = RuleEngineOutput::default();

        for rule in &self.rules {
            let before = working.len();
            let (passed, rejected) = rule.partition(working);
            debug_assert_eq!(before, passed.len() + rejected.len());
            working = passed;

            if rejected.is_empty() {
                debug!(rule = rule.name(), rows = before, "rule passed every row");
                continue;
            }

            let count = rejected.len();
            match self.disposition_of(rule.as_ref()) {
                Disposition::Quarantine => {
                    tracker.quarantine(&rejected, rule.name(), rule.reason());
                    tracker.record_metric(
                        rule.name(),
                        rule.category(),
                        before,
                        working.len(),
                        count,
                        0,
                        rule.reason(),
                    );
                    output.quarantined += count;
                    info!(rule = rule.name(), rows = count, "quarantined");
                }
                Disposition::Drop => {
                    tracker.record_metric(
                        rule.name(),
                        rule.category(),
                        before,
                        working.len(),
                        0,
                        count,
                        rule.reason(),
                    );
                    output.dropped += count;
                    info!(rule = rule.name(), rows = count, "dropped");
                }
            }
        }

        output.passed = working;
        output
    }
}
