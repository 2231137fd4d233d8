// retail-dwh-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use duckdb::{Config, Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

// Hexagonal imports
use crate::domain::batch::{Batch, BatchStatus, LoadMode};
use crate::domain::quality::{DqMetric, RuleCategory};
use crate::error::EtlError;
use crate::infrastructure::config::is_identifier;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::warehouse::{BatchLoad, Warehouse};

pub const STAGING_TABLE: &str = "stg_retail_sales";
pub const QUARANTINE_TABLE: &str = "dq_quarantine_sales";
pub const METRICS_TABLE: &str = "dq_metrics";
pub const BATCH_LOG_TABLE: &str = "meta_etl_batch_log";
pub const LEASE_TABLE: &str = "meta_batch_lease";

const TS_WRITE: &str = "%Y-%m-%d %H:%M:%S%.6f";
const TS_READ: &str = "%Y-%m-%d %H:%M:%S%.f";

pub struct DuckDbWarehouse {
    conn: Arc<Mutex<Connection>>,
    schema: String,
    lease_ttl: Duration,
    chunk_size: usize,
}

impl DuckDbWarehouse {
    #[instrument(skip_all, fields(path = db_path, schema = schema))]
    pub fn open(db_path: &str, schema: &str, lease_ttl_secs: u32) -> Result<Self, InfrastructureError> {
        if !is_identifier(schema) {
            return Err(InfrastructureError::ConfigError(format!(
                "'{}' is not a valid schema name",
                schema
            )));
        }

        let config = Config::default();
        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            if let Some(parent) = Path::new(db_path).parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open_with_flags(db_path, config)?
        };
        debug!("DuckDB connection opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            schema: schema.to_string(),
            lease_ttl: Duration::seconds(i64::from(lease_ttl_secs)),
            chunk_size: 5000,
        })
    }

    /// Row interval between progress logs while loading.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, InfrastructureError> {
        self.conn
            .lock()
            .map_err(|_| InfrastructureError::Database(DatabaseError::Poisoned))
    }

    fn table(&self, name: &str) -> String {
        format!("\"{}\".{}", self.schema, name)
    }

    fn ddl(&self) -> String {
        format!(
            r#"
CREATE SCHEMA IF NOT EXISTS "{schema}";

CREATE TABLE IF NOT EXISTS {stg} (
    invoice_no VARCHAR NOT NULL,
    stock_code VARCHAR NOT NULL,
    description VARCHAR,
    quantity BIGINT NOT NULL,
    invoice_date TIMESTAMP NOT NULL,
    unit_price DECIMAL(18,4) NOT NULL,
    customer_id BIGINT,
    country VARCHAR,
    line_total DECIMAL(18,4) NOT NULL,
    is_cancellation BOOLEAN NOT NULL,
    is_adjustment BOOLEAN NOT NULL,
    is_guest_purchase BOOLEAN NOT NULL,
    is_valid_sale BOOLEAN NOT NULL,
    is_return BOOLEAN NOT NULL,
    loaded_at TIMESTAMP NOT NULL,
    batch_id VARCHAR NOT NULL,
    source_file VARCHAR
);

CREATE TABLE IF NOT EXISTS {quarantine} (
    batch_id VARCHAR NOT NULL,
    rule_name VARCHAR NOT NULL,
    reason VARCHAR,
    quarantined_at TIMESTAMP NOT NULL,
    original_invoice_no VARCHAR,
    original_stock_code VARCHAR,
    original_description VARCHAR,
    original_quantity VARCHAR,
    original_invoice_date VARCHAR,
    original_unit_price VARCHAR,
    original_customer_id VARCHAR,
    original_country VARCHAR,
    raw_row_json VARCHAR
);

CREATE TABLE IF NOT EXISTS {metrics} (
    batch_id VARCHAR NOT NULL,
    rule_name VARCHAR NOT NULL,
    category VARCHAR NOT NULL,
    rows_processed BIGINT NOT NULL,
    rows_passed BIGINT NOT NULL,
    rows_quarantined BIGINT NOT NULL,
    rows_dropped BIGINT NOT NULL,
    executed_at TIMESTAMP NOT NULL,
    note VARCHAR
);

CREATE TABLE IF NOT EXISTS {log} (
    batch_id VARCHAR PRIMARY KEY,
    mode VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    batch_start TIMESTAMP NOT NULL,
    batch_end TIMESTAMP,
    rows_extracted BIGINT NOT NULL,
    rows_staged BIGINT NOT NULL,
    rows_quarantined BIGINT NOT NULL,
    rows_dropped BIGINT NOT NULL,
    error_message VARCHAR,
    duration_seconds BIGINT
);

CREATE TABLE IF NOT EXISTS {lease} (
    lease_key VARCHAR PRIMARY KEY,
    batch_id VARCHAR NOT NULL,
    acquired_at TIMESTAMP NOT NULL
);
"#,
            schema = self.schema,
            stg = self.table(STAGING_TABLE),
            quarantine = self.table(QUARANTINE_TABLE),
            metrics = self.table(METRICS_TABLE),
            log = self.table(BATCH_LOG_TABLE),
            lease = self.table(LEASE_TABLE),
        )
    }
}

fn ts(value: &NaiveDateTime) -> String {
    value.format(TS_WRITE).to_string()
}

fn utc(value: &DateTime<Utc>) -> String {
    ts(&value.naive_utc())
}

fn parse_ts(column: &str, value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(value, TS_READ).map_err(|_| DatabaseError::Decode {
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn db_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn decode_mode(value: &str) -> Result<LoadMode, DatabaseError> {
    match value {
        "full" => Ok(LoadMode::Full),
        "incremental" => Ok(LoadMode::Incremental),
        other => Err(DatabaseError::Decode {
            column: "mode".into(),
            value: other.into(),
        }),
    }
}

struct BatchRow {
    batch_id: String,
    mode: String,
    status: String,
    batch_start: String,
    batch_end: Option<String>,
    rows: [i64; 4],
    error_message: Option<String>,
    duration_seconds: Option<i64>,
}

impl BatchRow {
    fn decode(self) -> Result<Batch, EtlError> {
        let batch_end = match self.batch_end.as_deref() {
            Some(v) => Some(parse_ts("batch_end", v)?.and_utc()),
            None => None,
        };
        Ok(Batch {
            mode: decode_mode(&self.mode)?,
            status: self.status.parse::<BatchStatus>()?,
            batch_start: parse_ts("batch_start", &self.batch_start)?.and_utc(),
            batch_end,
            rows_extracted: count(self.rows[0]),
            rows_staged: count(self.rows[1]),
            rows_quarantined: count(self.rows[2]),
            rows_dropped: count(self.rows[3]),
            error_message: self.error_message,
            duration_seconds: self.duration_seconds,
            batch_id: self.batch_id,
        })
    }
}

struct MetricRow {
    batch_id: String,
    rule_name: String,
    category: String,
    rows: [i64; 4],
    executed_at: String,
    note: Option<String>,
}

impl MetricRow {
    fn decode(self) -> Result<DqMetric, EtlError> {
        Ok(DqMetric {
            category: self.category.parse::<RuleCategory>()?,
            rows_processed: count(self.rows[0]),
            rows_passed: count(self.rows[1]),
            rows_quarantined: count(self.rows[2]),
            rows_dropped: count(self.rows[3]),
            executed_at: parse_ts("executed_at", &self.executed_at)?.and_utc(),
            note: self.note.unwrap_or_default(),
            batch_id: self.batch_id,
            rule_name: self.rule_name,
        })
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    #[instrument(skip(self), fields(schema = %self.schema))]
    async fn provision(&self) -> Result<(), EtlError> {
        let conn = self.lock()?;
        conn.execute_batch(&self.ddl())?;
        info!("Warehouse tables ready");
        Ok(())
    }

    #[instrument(skip(self, now), fields(schema = %self.schema))]
    async fn acquire_lease(&self, batch_id: &str, now: DateTime<Utc>) -> Result<(), EtlError> {
        let lease = self.table(LEASE_TABLE);
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let cutoff = now - self.lease_ttl;
        let reclaimed = tx.execute(
            &format!("DELETE FROM {lease} WHERE lease_key = ? AND acquired_at < CAST(? AS TIMESTAMP)"),
            params![self.schema, utc(&cutoff)],
        )?;
        if reclaimed > 0 {
            warn!(ttl_secs = self.lease_ttl.num_seconds(), "Reclaimed an abandoned batch lease");
        }

        let holders: Vec<String> = {
            let mut stmt = tx.prepare(&format!("SELECT batch_id FROM {lease} WHERE lease_key = ?"))?;
            stmt.query_map(params![self.schema], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?
        };
        if let Some(holder) = holders.into_iter().next() {
            return Err(EtlError::BatchInProgress {
                schema: self.schema.clone(),
                holder,
            });
        }

        tx.execute(
            &format!("INSERT INTO {lease} (lease_key, batch_id, acquired_at) VALUES (?, ?, CAST(? AS TIMESTAMP))"),
            params![self.schema, batch_id, utc(&now)],
        )?;
        tx.commit()?;
        debug!("Lease acquired");
        Ok(())
    }

    #[instrument(skip(self), fields(schema = %self.schema))]
    async fn release_lease(&self, batch_id: &str) -> Result<(), EtlError> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE lease_key = ? AND batch_id = ?",
                self.table(LEASE_TABLE)
            ),
            params![self.schema, batch_id],
        )?;
        debug!("Lease released");
        Ok(())
    }

    async fn last_loaded_timestamp(&self) -> Result<Option<NaiveDateTime>, EtlError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT CAST(MAX(s.invoice_date) AS VARCHAR) FROM {stg} s \
             JOIN {log} b ON s.batch_id = b.batch_id WHERE b.status = ?",
            stg = self.table(STAGING_TABLE),
            log = self.table(BATCH_LOG_TABLE),
        );
        let value: Option<String> = conn.query_row(
            &sql,
            params![BatchStatus::Success.as_str()],
            |row| row.get(0),
        )?;
        match value {
            Some(v) => Ok(Some(parse_ts("invoice_date", &v)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(batch_id = load.batch_id, mode = %load.mode))]
    async fn persist(&self, load: BatchLoad<'_>) -> Result<(), EtlError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if load.mode == LoadMode::Full {
            let removed = tx.execute(&format!("DELETE FROM {}", self.table(STAGING_TABLE)), [])?;
            debug!(rows = removed, "Staging table refreshed");
        }

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (invoice_no, stock_code, description, quantity, invoice_date, \
                 unit_price, customer_id, country, line_total, is_cancellation, is_adjustment, \
                 is_guest_purchase, is_valid_sale, is_return, loaded_at, batch_id, source_file) \
                 VALUES (?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS DECIMAL(18,4)), ?, ?, \
                 CAST(? AS DECIMAL(18,4)), ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), ?, ?)",
                self.table(STAGING_TABLE)
            ))?;
            for (i, rec) in load.staged.iter().enumerate() {
                stmt.execute(params![
                    rec.invoice_no,
                    rec.stock_code,
                    rec.description,
                    rec.quantity,
                    ts(&rec.invoice_date),
                    rec.unit_price.to_string(),
                    rec.customer_id,
                    rec.country,
                    rec.line_total.to_string(),
                    rec.flags.is_cancellation,
                    rec.flags.is_adjustment,
                    rec.flags.is_guest_purchase,
                    rec.flags.is_valid_sale,
                    rec.flags.is_return,
                    utc(&rec.loaded_at),
                    rec.batch_id,
                    rec.source_file,
                ])?;
                if (i + 1) % self.chunk_size == 0 {
                    debug!(rows = i + 1, total = load.staged.len(), "Staging rows written");
                }
            }
        }

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (batch_id, rule_name, reason, quarantined_at, original_invoice_no, \
                 original_stock_code, original_description, original_quantity, \
                 original_invoice_date, original_unit_price, original_customer_id, \
                 original_country, raw_row_json) \
                 VALUES (?, ?, ?, CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                self.table(QUARANTINE_TABLE)
            ))?;
            for entry in load.quarantine {
                stmt.execute(params![
                    entry.batch_id,
                    entry.rule_name,
                    entry.reason,
                    utc(&entry.quarantined_at),
                    entry.original_invoice_no,
                    entry.original_stock_code,
                    entry.original_description,
                    entry.original_quantity,
                    entry.original_invoice_date,
                    entry.original_unit_price,
                    entry.original_customer_id,
                    entry.original_country,
                    entry.raw_row_json,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (batch_id, rule_name, category, rows_processed, rows_passed, \
                 rows_quarantined, rows_dropped, executed_at, note) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), ?)",
                self.table(METRICS_TABLE)
            ))?;
            for metric in load.metrics {
                stmt.execute(params![
                    metric.batch_id,
                    metric.rule_name,
                    metric.category.as_str(),
                    db_count(metric.rows_processed),
                    db_count(metric.rows_passed),
                    db_count(metric.rows_quarantined),
                    db_count(metric.rows_dropped),
                    utc(&metric.executed_at),
                    metric.note,
                ])?;
            }
        }

        tx.commit()?;
        info!(
            staged = load.staged.len(),
            quarantined = load.quarantine.len(),
            metrics = load.metrics.len(),
            "Batch persisted"
        );
        Ok(())
    }

    #[instrument(skip_all, fields(batch_id = %batch.batch_id, status = %batch.status))]
    async fn record_batch(&self, batch: &Batch) -> Result<(), EtlError> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (batch_id, mode, status, batch_start, batch_end, rows_extracted, \
                 rows_staged, rows_quarantined, rows_dropped, error_message, duration_seconds) \
                 VALUES (?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?, ?)",
                self.table(BATCH_LOG_TABLE)
            ),
            params![
                batch.batch_id,
                batch.mode.to_string(),
                batch.status.as_str(),
                utc(&batch.batch_start),
                batch.batch_end.as_ref().map(utc),
                db_count(batch.rows_extracted),
                db_count(batch.rows_staged),
                db_count(batch.rows_quarantined),
                db_count(batch.rows_dropped),
                batch.error_message,
                batch.duration_seconds,
            ],
        )?;
        debug!("Batch record written");
        Ok(())
    }

    async fn recent_batches(&self, limit: usize) -> Result<Vec<Batch>, EtlError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT batch_id, mode, status, CAST(batch_start AS VARCHAR), CAST(batch_end AS VARCHAR), \
             rows_extracted, rows_staged, rows_quarantined, rows_dropped, error_message, duration_seconds \
             FROM {} ORDER BY batch_start DESC, batch_id DESC LIMIT {}",
            self.table(BATCH_LOG_TABLE),
            limit
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BatchRow {
                    batch_id: row.get(0)?,
                    mode: row.get(1)?,
                    status: row.get(2)?,
                    batch_start: row.get(3)?,
                    batch_end: row.get(4)?,
                    rows: [row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?],
                    error_message: row.get(9)?,
                    duration_seconds: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(BatchRow::decode).collect()
    }

    async fn metrics_for_batch(&self, batch_id: &str) -> Result<Vec<DqMetric>, EtlError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT batch_id, rule_name, category, rows_processed, rows_passed, rows_quarantined, \
             rows_dropped, CAST(executed_at AS VARCHAR), note \
             FROM {} WHERE batch_id = ? ORDER BY executed_at, rowid",
            self.table(METRICS_TABLE)
        ))?;
        let rows = stmt
            .query_map(params![batch_id], |row| {
                Ok(MetricRow {
                    batch_id: row.get(0)?,
                    rule_name: row.get(1)?,
                    category: row.get(2)?,
                    rows: [row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?],
                    executed_at: row.get(7)?,
                    note: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(MetricRow::decode).collect()
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::classifier::BusinessClassifier;
    use crate::domain::normalizer::RecordNormalizer;
    use crate::domain::quality::QualityTracker;
    use crate::domain::record::{LoadContext, RawRecord, StagedRecord};
    use anyhow::Result;

    fn warehouse() -> Result<DuckDbWarehouse> {
        Ok(DuckDbWarehouse::open(":memory:", "retail_dwh", 3600)?)
    }

    fn scalar(wh: &DuckDbWarehouse, sql: &str) -> i64 {
        let conn = wh.lock().unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    fn staged(batch_id: &str, invoice: &str, date: &str) -> StagedRecord {
        staged_priced(batch_id, invoice, date, "6", "2.55")
    }

    fn staged_priced(batch_id: &str, invoice: &str, date: &str, qty: &str, price: &str) -> StagedRecord {
        let record = RecordNormalizer::normalize(RawRecord {
            invoice_no: Some(invoice.into()),
            stock_code: Some("85123A".into()),
            description: Some("WHITE HANGING HEART".into()),
            quantity: Some(qty.into()),
            invoice_date: Some(date.into()),
            unit_price: Some(price.into()),
            customer_id: Some("17850".into()),
            country: Some("United Kingdom".into()),
        });
        let ctx = LoadContext {
            batch_id: batch_id.into(),
            loaded_at: Utc::now(),
            source_id: "online_retail.csv".into(),
        };
        BusinessClassifier::new("C").stage(record, &ctx).unwrap()
    }

    fn finished(batch_id: &str, status: BatchStatus, start: DateTime<Utc>) -> Batch {
        let mut batch = Batch::start(LoadMode::Full, start);
        batch.batch_id = batch_id.into();
        batch.status = status;
        batch.batch_end = Some(start + Duration::seconds(3));
        batch.duration_seconds = Some(3);
        batch
    }

    fn load<'a>(batch_id: &'a str, mode: LoadMode, staged: &'a [StagedRecord]) -> BatchLoad<'a> {
        BatchLoad {
            batch_id,
            mode,
            staged,
            quarantine: &[],
            metrics: &[],
        }
    }

    #[test]
    fn test_rejects_invalid_schema_name() {
        assert!(DuckDbWarehouse::open(":memory:", "bad; DROP", 60).is_err());
    }

    #[tokio::test]
    async fn test_provision_is_idempotent() -> Result<()> {
        let wh = warehouse()?;
        wh.provision().await?;
        wh.provision().await?;
        let tables = scalar(
            &wh,
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'retail_dwh'",
        );
        assert_eq!(tables, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_lease_is_exclusive_until_released() -> Result<()> {
        let wh = warehouse()?;
        wh.provision().await?;
        let now = Utc::now();

        wh.acquire_lease("b1", now).await?;
        let second = wh.acquire_lease("b2", now).await;
        match second {
            Err(EtlError::BatchInProgress { holder, schema }) => {
                assert_eq!(holder, "b1");
                assert_eq!(schema, "retail_dwh");
            }
            other => panic!("expected BatchInProgress, got {:?}", other.err()),
        }

        wh.release_lease("b1").await?;
        wh.acquire_lease("b2", now).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_abandoned_lease_is_reclaimed() -> Result<()> {
        let wh = DuckDbWarehouse::open(":memory:", "retail_dwh", 60)?;
        wh.provision().await?;
        let now = Utc::now();
        wh.acquire_lease("stale", now).await?;
        wh.acquire_lease("fresh", now + Duration::seconds(61)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_persist_full_refreshes_and_incremental_appends() -> Result<()> {
        let wh = warehouse()?;
        wh.provision().await?;

        let first = vec![
            staged("b1", "536365", "12/1/2010 8:26"),
            staged("b1", "536366", "12/1/2010 8:28"),
        ];
        wh.persist(load("b1", LoadMode::Full, &first)).await?;
        assert_eq!(scalar(&wh, "SELECT COUNT(*) FROM retail_dwh.stg_retail_sales"), 2);

        let second = vec![staged("b2", "536367", "12/1/2010 8:34")];
        wh.persist(load("b2", LoadMode::Incremental, &second)).await?;
        assert_eq!(scalar(&wh, "SELECT COUNT(*) FROM retail_dwh.stg_retail_sales"), 3);

        wh.persist(load("b3", LoadMode::Full, &second)).await?;
        assert_eq!(scalar(&wh, "SELECT COUNT(*) FROM retail_dwh.stg_retail_sales"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_persist_writes_quarantine_and_metrics() -> Result<()> {
        let wh = warehouse()?;
        wh.provision().await?;

        let raw = RawRecord {
            invoice_no: Some("100".into()),
            stock_code: Some("A1".into()),
            quantity: Some("0".into()),
            invoice_date: Some("2011-01-05 10:00:00".into()),
            unit_price: Some("5.00".into()),
            ..Default::default()
        };
        let mut tracker = QualityTracker::new("b1");
        tracker.quarantine(&[RecordNormalizer::normalize(raw)], "zero_quantity", "AN002");
        tracker.record_metric("zero_quantity", RuleCategory::AnomalyDetection, 1, 0, 1, 0, "AN002");
        let (metrics, quarantine) = tracker.drain();

        wh.persist(BatchLoad {
            batch_id: "b1",
            mode: LoadMode::Full,
            staged: &[],
            quarantine: &quarantine,
            metrics: &metrics,
        })
        .await?;

        assert_eq!(
            scalar(
                &wh,
                "SELECT COUNT(*) FROM retail_dwh.dq_quarantine_sales \
                 WHERE original_quantity = '0' AND original_customer_id IS NULL"
            ),
            1
        );
        let read = wh.metrics_for_batch("b1").await?;
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].rule_name, "zero_quantity");
        assert_eq!(read[0].category, RuleCategory::AnomalyDetection);
        assert_eq!(read[0].rows_quarantined, 1);
        assert!(wh.metrics_for_batch("other").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_watermark_only_counts_successful_batches() -> Result<()> {
        let wh = warehouse()?;
        wh.provision().await?;
        assert_eq!(wh.last_loaded_timestamp().await?, None);

        let ok = vec![staged("ok", "1", "2011-01-05 10:00:00")];
        wh.persist(load("ok", LoadMode::Incremental, &ok)).await?;
        wh.record_batch(&finished("ok", BatchStatus::Success, Utc::now())).await?;

        let failed = vec![staged("bad", "2", "2011-06-01 10:00:00")];
        wh.persist(load("bad", LoadMode::Incremental, &failed)).await?;
        wh.record_batch(&finished("bad", BatchStatus::Failed, Utc::now())).await?;

        let mark = wh.last_loaded_timestamp().await?;
        assert_eq!(mark.map(|m| m.to_string()), Some("2011-01-05 10:00:00".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_batch_log_round_trip_newest_first() -> Result<()> {
        let wh = warehouse()?;
        wh.provision().await?;
        let start = Utc::now();

        let mut failed = finished("older", BatchStatus::Failed, start - Duration::hours(1));
        failed.error_message = Some("source missing".into());
        wh.record_batch(&failed).await?;

        let mut ok = finished("newer", BatchStatus::SuccessNoData, start);
        ok.mode = LoadMode::Incremental;
        wh.record_batch(&ok).await?;

        let batches = wh.recent_batches(10).await?;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].batch_id, "newer");
        assert_eq!(batches[0].status, BatchStatus::SuccessNoData);
        assert_eq!(batches[0].mode, LoadMode::Incremental);
        assert_eq!(batches[1].error_message.as_deref(), Some("source missing"));
        assert_eq!(batches[1].duration_seconds, Some(3));

        assert_eq!(wh.recent_batches(1).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_persist_stores_amounts_at_column_bounds() -> Result<()> {
        let wh = warehouse()?;
        wh.provision().await?;

        let rows = vec![
            staged_priced("b1", "536365", "12/1/2010 8:26", "3", "0.33333"),
            staged_priced("b1", "536366", "12/1/2010 8:27", "1", "99999999999999.9999"),
            staged_priced("b1", "536367", "12/1/2010 8:28", "-1", "99999999999999.9999"),
        ];
        wh.persist(load("b1", LoadMode::Full, &rows)).await?;

        assert_eq!(scalar(&wh, "SELECT COUNT(*) FROM retail_dwh.stg_retail_sales"), 3);
        assert_eq!(
            scalar(
                &wh,
                "SELECT COUNT(*) FROM retail_dwh.stg_retail_sales \
                 WHERE line_total = quantity * unit_price"
            ),
            3
        );
        let conn = wh.lock().unwrap();
        let line_total: String = conn
            .query_row(
                "SELECT CAST(line_total AS VARCHAR) FROM retail_dwh.stg_retail_sales WHERE invoice_no = '536365'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(line_total, "0.9999");
        Ok(())
    }
}
