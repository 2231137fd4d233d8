// retail-dwh-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(retail_dwh::infra::database::duckdb),
        help("An error occurred inside the SQL engine.")
    )]
    DuckDB(#[from] duckdb::Error),

    #[error("DuckDB connection mutex poisoned")]
    #[diagnostic(code(retail_dwh::infra::database::poisoned))]
    Poisoned,

    #[error("Unexpected value in column '{column}': {value}")]
    #[diagnostic(code(retail_dwh::infra::database::decode))]
    Decode { column: String, value: String },
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(retail_dwh::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(retail_dwh::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(retail_dwh::infra::config_invalid))]
    Validation(#[from] validator::ValidationErrors),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Project configuration not found at '{0}'")]
    #[diagnostic(code(retail_dwh::infra::config_missing))]
    ConfigNotFound(String),

    // --- SOURCE ---
    #[error("Source file not found: {0}")]
    #[diagnostic(
        code(retail_dwh::infra::source_missing),
        help("Check `source.path` in the project file or RETAIL_DWH_SOURCE_PATH.")
    )]
    SourceNotFound(String),

    #[error("Source file could not be read: {0}")]
    #[diagnostic(
        code(retail_dwh::infra::source_unreadable),
        help("The CSV must carry InvoiceNo, StockCode, Description, Quantity, InvoiceDate, UnitPrice, CustomerID and Country columns.")
    )]
    SourceUnreadable(String),
}

// Manual implementation for shortcuts (e.g. `?` operator on duckdb calls)
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}
