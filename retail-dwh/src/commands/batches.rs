// retail-dwh/src/commands/batches.rs
//
// USE CASE: Show the batch log.

use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use retail_dwh_core::ports::Warehouse;

use crate::cli::ProjectArgs;
use crate::commands::{load_config, open_warehouse};

pub async fn execute(project: ProjectArgs, limit: usize) -> anyhow::Result<()> {
    let config = load_config(&project)?;
    let warehouse = open_warehouse(&config)?;
    warehouse.provision().await?;

    let batches = warehouse.recent_batches(limit).await?;
    if batches.is_empty() {
        println!("No batch recorded yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Batch", "Mode", "Status", "Started", "Duration", "Extracted", "Staged", "Quarantined",
        "Dropped", "Error",
    ]);
    for b in &batches {
        table.add_row(vec![
            b.batch_id.clone(),
            b.mode.to_string(),
            b.status.to_string(),
            b.batch_start.format("%Y-%m-%d %H:%M:%S").to_string(),
            b.duration_seconds.map(|d| format!("{}s", d)).unwrap_or_default(),
            b.rows_extracted.to_string(),
            b.rows_staged.to_string(),
            b.rows_quarantined.to_string(),
            b.rows_dropped.to_string(),
            b.error_message.clone().unwrap_or_default(),
        ]);
    }
    println!("{table}");
    Ok(())
}
