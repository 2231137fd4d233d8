// retail-dwh-core/src/application/pipeline.rs

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span, warn};

use crate::application::transform::Transformer;
use crate::domain::batch::{Batch, BatchStatus, BatchSummary, LoadMode};
use crate::domain::normalizer::parse_timestamp;
use crate::domain::quality::{QualityPolicy, QualityTracker};
use crate::domain::record::LoadContext;
use crate::error::EtlError;
use crate::ports::source::RecordSource;
use crate::ports::warehouse::{BatchLoad, Warehouse};

/// What one call to [`run_batch`] produced. A `FAILED` batch is still a
/// report; only an unwritable batch log is an `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch: Batch,
    /// Mode actually used: incremental falls back to full without a watermark.
    pub effective_mode: LoadMode,
    pub watermark: Option<NaiveDateTime>,
    pub summary: Option<BatchSummary>,
}

impl BatchReport {
    pub fn succeeded(&self) -> bool {
        self.batch.status.is_success()
    }
}

enum Outcome {
    NoData,
    Loaded(BatchSummary),
}

struct Execution {
    effective_mode: LoadMode,
    watermark: Option<NaiveDateTime>,
}

/// Runs one batch end to end and writes its terminal record to the batch log.
pub async fn run_batch(
    source: &dyn RecordSource,
    warehouse: &dyn Warehouse,
    policy: &QualityPolicy,
    mode: LoadMode,
) -> Result<BatchReport, EtlError> {
    let mut batch = Batch::start(mode, Utc::now());
    let span = info_span!("batch", batch_id = %batch.batch_id, %mode);

    async move {
        info!(source = source.source_id(), engine = warehouse.engine_name(), "Batch started");
        let mut exec = Execution {
            effective_mode: mode,
            watermark: None,
        };

        batch.advance(BatchStatus::Extracting)?;
        let leased = match warehouse.acquire_lease(&batch.batch_id, batch.batch_start).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Could not acquire the batch lease");
                batch.fail(e.to_string(), Utc::now())?;
                false
            }
        };

        let mut summary = None;
        if leased {
            match execute(&mut batch, &mut exec, source, warehouse, policy).await {
                Ok(Outcome::NoData) => {
                    batch.finish(BatchStatus::SuccessNoData, None, Utc::now())?;
                    info!("No new records; nothing to load");
                    summary = Some(BatchSummary::from_staged(&batch, &[]));
                }
                Ok(Outcome::Loaded(s)) => {
                    batch.finish(BatchStatus::Success, None, Utc::now())?;
                    summary = Some(BatchSummary {
                        duration_seconds: batch.duration_seconds.unwrap_or_default(),
                        ..s
                    });
                }
                Err(e) => {
                    error!(error = %e, status = %batch.status, "Batch failed");
                    batch.fail(e.to_string(), Utc::now())?;
                }
            }
        }

        let recorded = warehouse.record_batch(&batch).await;

        if leased && let Err(e) = warehouse.release_lease(&batch.batch_id).await {
            warn!(error = %e, "Lease not released; it expires after its TTL");
        }
        recorded?;

        info!(
            status = %batch.status,
            extracted = batch.rows_extracted,
            staged = batch.rows_staged,
            quarantined = batch.rows_quarantined,
            dropped = batch.rows_dropped,
            duration_seconds = batch.duration_seconds,
            "Batch finished"
        );
        Ok(BatchReport {
            batch,
            effective_mode: exec.effective_mode,
            watermark: exec.watermark,
            summary,
        })
    }
    .instrument(span)
    .await
}

async fn execute(
    batch: &mut Batch,
    exec: &mut Execution,
    source: &dyn RecordSource,
    warehouse: &dyn Warehouse,
    policy: &QualityPolicy,
) -> Result<Outcome, EtlError> {
    // 1. EXTRACTING
    if batch.mode == LoadMode::Incremental {
        exec.watermark = warehouse.last_loaded_timestamp().await?;
        match exec.watermark {
            Some(mark) => info!(watermark = %mark, "Extracting records newer than the watermark"),
            None => {
                info!("No previous successful batch; extracting everything");
                exec.effective_mode = LoadMode::Full;
            }
        }
    }

    let mut records = source.extract().await?;
    if let Some(mark) = exec.watermark {
        records.retain(|r| {
            r.invoice_date
                .as_deref()
                .and_then(parse_timestamp)
                .is_some_and(|ts| ts > mark)
        });
    }
    batch.rows_extracted = records.len();
    if records.is_empty() {
        return Ok(Outcome::NoData);
    }

    // 2. TRANSFORMING
    batch.advance(BatchStatus::Transforming)?;
    let ctx = LoadContext {
        batch_id: batch.batch_id.clone(),
        loaded_at: batch.batch_start,
        source_id: source.source_id().to_string(),
    };
    let mut tracker = QualityTracker::new(batch.batch_id.as_str());
    let output = Transformer::new(policy).run(records, &ctx, &mut tracker);

    batch.rows_staged = output.staged.len();
    batch.rows_quarantined = output.quarantined;
    batch.rows_dropped = output.dropped;
    batch.check_conservation()?;

    // 3. LOADING
    batch.advance(BatchStatus::Loading)?;
    let (metrics, quarantine) = tracker.drain();
    warehouse
        .persist(BatchLoad {
            batch_id: &batch.batch_id,
            mode: exec.effective_mode,
            staged: &output.staged,
            quarantine: &quarantine,
            metrics: &metrics,
        })
        .await?;

    Ok(Outcome::Loaded(BatchSummary::from_staged(batch, &output.staged)))
}
