// retail-dwh-core/src/infrastructure/adapters/mod.rs

pub mod csv;
pub mod duckdb;

pub use self::csv::CsvSource;
pub use self::duckdb::DuckDbWarehouse;
