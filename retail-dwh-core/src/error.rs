// retail-dwh-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    // --- DOMAIN ERRORS (batch lifecycle, bookkeeping) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (DuckDB, IO, config) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- CONCURRENCY ---
    #[error("Batch '{holder}' is already in progress on schema '{schema}'")]
    BatchInProgress { schema: String, holder: String },

    // --- APPLICATION ---
    #[error("Unsafe path traversal detected: {0}")]
    UnsafePath(String),
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for EtlError {
    fn from(err: duckdb::Error) -> Self {
        EtlError::Infrastructure(InfrastructureError::from(err))
    }
}

impl From<DatabaseError> for EtlError {
    fn from(err: DatabaseError) -> Self {
        EtlError::Infrastructure(InfrastructureError::Database(err))
    }
}
