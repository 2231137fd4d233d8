// retail-dwh-core/src/ports/source.rs

// What the pipeline needs from wherever the transactions live. The adapter
// decides how the bytes are read; the pipeline only ever sees RawRecords.

use crate::domain::record::RawRecord;
use crate::error::EtlError;
use async_trait::async_trait;

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Identifier stamped on staged rows as `source_file`.
    fn source_id(&self) -> &str;

    /// Reads every record, untyped. Fails when the source is absent or lacks
    /// one of the expected columns.
    async fn extract(&self) -> Result<Vec<RawRecord>, EtlError>;
}
