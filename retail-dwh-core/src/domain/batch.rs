// retail-dwh-core/src/domain/batch.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;
use crate::domain::record::StagedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Read the whole source and refresh staging.
    Full,
    /// Read only records newer than the last successful batch.
    Incremental,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::Full => f.write_str("full"),
            LoadMode::Incremental => f.write_str("incremental"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Pending,
    Extracting,
    Transforming,
    Loading,
    Success,
    SuccessNoData,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "PENDING",
            BatchStatus::Extracting => "EXTRACTING",
            BatchStatus::Transforming => "TRANSFORMING",
            BatchStatus::Loading => "LOADING",
            BatchStatus::Success => "SUCCESS",
            BatchStatus::SuccessNoData => "SUCCESS_NO_DATA",
            BatchStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Success | BatchStatus::SuccessNoData | BatchStatus::Failed
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchStatus::Success | BatchStatus::SuccessNoData)
    }

    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        use BatchStatus::*;
        matches!(
            (self, next),
            (Pending, Extracting)
                | (Extracting, Transforming)
                | (Extracting, SuccessNoData)
                | (Transforming, Loading)
                | (Loading, Success)
                | (Pending | Extracting | Transforming | Loading, Failed)
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use BatchStatus::*;
        [
            Pending,
            Extracting,
            Transforming,
            Loading,
            Success,
            SuccessNoData,
            Failed,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
        .ok_or_else(|| DomainError::UnknownStatus(s.to_string()))
    }
}

/// One end-to-end run of the pipeline, as written to the batch log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub mode: LoadMode,
    pub status: BatchStatus,
    pub batch_start: DateTime<Utc>,
    pub batch_end: Option<DateTime<Utc>>,
    pub rows_extracted: usize,
    pub rows_staged: usize,
    pub rows_quarantined: usize,
    pub rows_dropped: usize,
    pub error_message: Option<String>,
    pub duration_seconds: Option<i64>,
}

impl Batch {
    /// Batch ids are the UTC start instant down to the millisecond.
    pub fn batch_id_for(start: DateTime<Utc>) -> String {
        start.format("%Y%m%d_%H%M%S_%3f").to_string()
    }

    pub fn start(mode: LoadMode, batch_start: DateTime<Utc>) -> Self {
        Self {
            batch_id: Self::batch_id_for(batch_start),
            mode,
            status: BatchStatus::Pending,
            batch_start,
            batch_end: None,
            rows_extracted: 0,
            rows_staged: 0,
            rows_quarantined: 0,
            rows_dropped: 0,
            error_message: None,
            duration_seconds: None,
        }
    }

    /// Moves to a non-terminal state.
    pub fn advance(&mut self, next: BatchStatus) -> Result<(), DomainError> {
        if next.is_terminal() {
            return self.finish(next, None, Utc::now());
        }
        self.transition(next)
    }

    fn transition(&mut self, next: BatchStatus) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::BatchAlreadyFinalized(self.batch_id.clone()));
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Moves to a terminal state and stamps the end time. Happens once.
    pub fn finish(
        &mut self,
        terminal: BatchStatus,
        error_message: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !terminal.is_terminal() {
            return Err(DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: terminal.to_string(),
            });
        }
        self.transition(terminal)?;
        self.batch_end = Some(at);
        self.duration_seconds = Some((at - self.batch_start).num_seconds());
        self.error_message = error_message;
        Ok(())
    }

    /// Records a failure from whatever state the batch reached.
    pub fn fail(&mut self, message: impl Into<String>, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.finish(BatchStatus::Failed, Some(message.into()), at)
    }

    /// `extracted == staged + quarantined + dropped`.
    pub fn check_conservation(&self) -> Result<(), DomainError> {
        if self.rows_extracted == self.rows_staged + self.rows_quarantined + self.rows_dropped {
            Ok(())
        } else {
            Err(DomainError::ConservationViolated {
                extracted: self.rows_extracted,
                staged: self.rows_staged,
                quarantined: self.rows_quarantined,
                dropped: self.rows_dropped,
            })
        }
    }
}

/// Totals reported at the end of a successful batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub rows_extracted: usize,
    pub rows_staged: usize,
    pub rows_quarantined: usize,
    pub rows_dropped: usize,
    pub valid_sales: usize,
    pub cancellations: usize,
    pub returns: usize,
    pub guest_purchases: usize,
    /// Sum of `line_total` over valid sales.
    pub total_revenue: Decimal,
    /// Share of extracted rows that reached staging, in percent.
    pub retention_rate: f64,
    pub duration_seconds: i64,
}

impl BatchSummary {
    pub fn from_staged(batch: &Batch, staged: &[StagedRecord]) -> Self {
        let mut summary = Self {
            rows_extracted: batch.rows_extracted,
            rows_staged: batch.rows_staged,
            rows_quarantined: batch.rows_quarantined,
            rows_dropped: batch.rows_dropped,
            retention_rate: retention(batch.rows_staged, batch.rows_extracted),
            duration_seconds: batch.duration_seconds.unwrap_or_default(),
            ..Default::default()
        };
        for rec in staged {
            let flags = &rec.flags;
            if flags.is_valid_sale {
                summary.valid_sales += 1;
                summary.total_revenue = summary.total_revenue.saturating_add(rec.line_total);
            }
            summary.cancellations += usize::from(flags.is_cancellation);
            summary.returns += usize::from(flags.is_return);
            summary.guest_purchases += usize::from(flags.is_guest_purchase);
        }
        summary
    }
}

fn retention(staged: usize, extracted: usize) -> f64 {
    if extracted == 0 {
        return 0.0;
    }
    staged as f64 / extracted as f64 * 100.0
}
