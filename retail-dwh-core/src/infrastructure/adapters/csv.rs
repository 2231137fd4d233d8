// retail-dwh-core/src/infrastructure/adapters/csv.rs

use async_trait::async_trait;
use duckdb::Connection;
use std::path::PathBuf;
use tracing::{info, instrument};

use crate::domain::record::RawRecord;
use crate::error::EtlError;
use crate::infrastructure::config::{SourceEncoding, SourceSettings};
use crate::infrastructure::error::InfrastructureError;
use crate::ports::source::RecordSource;

/// Reads the transaction export with DuckDB's CSV reader, every column as text.
pub struct CsvSource {
    path: PathBuf,
    encoding: SourceEncoding,
    source_id: String,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, encoding: SourceEncoding, source_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            encoding,
            source_id: source_id.into(),
        }
    }

    pub fn from_settings(settings: &SourceSettings) -> Self {
        Self::new(&settings.path, settings.encoding, settings.resolved_id())
    }

    fn query(&self) -> String {
        let columns = RawRecord::COLUMNS
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        // Single quotes are the only thing to escape inside a SQL string literal.
        let path = self.path.to_string_lossy().replace('\'', "''");
        format!(
            "SELECT {columns} FROM read_csv('{path}', header = true, all_varchar = true, encoding = '{encoding}')",
            encoding = self.encoding.as_str()
        )
    }
}

fn unreadable(path: &std::path::Path, err: duckdb::Error) -> EtlError {
    InfrastructureError::SourceUnreadable(format!("{}: {}", path.display(), err)).into()
}

#[async_trait]
impl RecordSource for CsvSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    #[instrument(skip(self), fields(path = %self.path.display(), encoding = self.encoding.as_str()))]
    async fn extract(&self) -> Result<Vec<RawRecord>, EtlError> {
        if !self.path.is_file() {
            return Err(InfrastructureError::SourceNotFound(self.path.display().to_string()).into());
        }

        let conn = Connection::open_in_memory()?;
        let mut stmt = conn
            .prepare(&self.query())
            .map_err(|e| unreadable(&self.path, e))?;
        let records = stmt
            .query_map([], |row| {
                Ok(RawRecord {
                    invoice_no: row.get(0)?,
                    stock_code: row.get(1)?,
                    description: row.get(2)?,
                    quantity: row.get(3)?,
                    invoice_date: row.get(4)?,
                    unit_price: row.get(5)?,
                    customer_id: row.get(6)?,
                    country: row.get(7)?,
                })
            })
            .map_err(|e| unreadable(&self.path, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| unreadable(&self.path, e))?;

        info!(rows = records.len(), "Source extracted");
        Ok(records)
    }
}
