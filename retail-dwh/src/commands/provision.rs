// retail-dwh/src/commands/provision.rs
//
// USE CASE: Create the warehouse schema and tables.

use anyhow::Context;
use retail_dwh_core::ports::Warehouse;

use crate::cli::ProjectArgs;
use crate::commands::{load_config, open_warehouse};

pub async fn execute(project: ProjectArgs) -> anyhow::Result<()> {
    let config = load_config(&project)?;
    let warehouse = open_warehouse(&config)?;
    warehouse
        .provision()
        .await
        .context("Failed to provision the warehouse")?;
    println!(
        "✅ Warehouse ready: {} (schema '{}')",
        config.warehouse.path,
        warehouse.schema()
    );
    Ok(())
}
