// retail-dwh/src/commands/mod.rs

pub mod batches;
pub mod clean;
pub mod provision;
pub mod quality;
pub mod run;

use anyhow::Context;
use retail_dwh_core::infrastructure::adapters::DuckDbWarehouse;
use retail_dwh_core::infrastructure::config::{EtlConfig, load_etl_config};

use crate::cli::ProjectArgs;

/// Loads the project configuration, rendering config problems as diagnostics.
pub fn load_config(project: &ProjectArgs) -> anyhow::Result<EtlConfig> {
    load_etl_config(&project.project_dir, project.config.as_deref()).map_err(|e| {
        eprintln!("{:?}", miette::Report::new(e));
        anyhow::anyhow!(
            "Failed to load project configuration from {:?}",
            project.project_dir
        )
    })
}

pub fn open_warehouse(config: &EtlConfig) -> anyhow::Result<DuckDbWarehouse> {
    let wh = &config.warehouse;
    let warehouse = DuckDbWarehouse::open(&wh.path, &wh.schema, wh.lease_ttl_secs)
        .with_context(|| format!("Failed to open DuckDB at {}", wh.path))?;
    Ok(warehouse.with_chunk_size(wh.chunk_size))
}
