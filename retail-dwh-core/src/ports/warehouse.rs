// retail-dwh-core/src/ports/warehouse.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::batch::{Batch, LoadMode};
use crate::domain::quality::{DqMetric, QuarantineEntry};
use crate::domain::record::StagedRecord;
use crate::error::EtlError;

/// Everything one batch writes in its loading phase.
#[derive(Debug, Clone, Copy)]
pub struct BatchLoad<'a> {
    pub batch_id: &'a str,
    pub mode: LoadMode,
    pub staged: &'a [StagedRecord],
    pub quarantine: &'a [QuarantineEntry],
    pub metrics: &'a [DqMetric],
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Creates the schema and tables if they do not exist yet.
    async fn provision(&self) -> Result<(), EtlError>;

    /// Claims the single in-flight slot of the target schema.
    /// Fails with `EtlError::BatchInProgress` if another live batch holds it.
    async fn acquire_lease(&self, batch_id: &str, now: DateTime<Utc>) -> Result<(), EtlError>;

    async fn release_lease(&self, batch_id: &str) -> Result<(), EtlError>;

    /// Latest invoice timestamp loaded by a `SUCCESS` batch, if any.
    async fn last_loaded_timestamp(&self) -> Result<Option<NaiveDateTime>, EtlError>;

    /// Writes staging, quarantine and metrics atomically.
    async fn persist(&self, load: BatchLoad<'_>) -> Result<(), EtlError>;

    /// Appends the terminal batch record to the batch log.
    async fn record_batch(&self, batch: &Batch) -> Result<(), EtlError>;

    /// Batch log, newest first.
    async fn recent_batches(&self, limit: usize) -> Result<Vec<Batch>, EtlError>;

    async fn metrics_for_batch(&self, batch_id: &str) -> Result<Vec<DqMetric>, EtlError>;

    fn engine_name(&self) -> &str;
}
