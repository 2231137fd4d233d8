// retail-dwh-core/src/infrastructure/config/mod.rs

pub mod project;
pub mod settings;

pub use project::{apply_env_overrides, load_etl_config};
pub use settings::{EtlConfig, SourceEncoding, SourceSettings, WarehouseSettings, is_identifier};
