// retail-dwh/src/commands/quality.rs
//
// USE CASE: Show the data-quality metrics of one batch.

use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use retail_dwh_core::ports::Warehouse;

use crate::cli::ProjectArgs;
use crate::commands::{load_config, open_warehouse};

pub async fn execute(project: ProjectArgs, batch_id: String) -> anyhow::Result<()> {
    let config = load_config(&project)?;
    let warehouse = open_warehouse(&config)?;
    warehouse.provision().await?;

    let metrics = warehouse.metrics_for_batch(&batch_id).await?;
    if metrics.is_empty() {
        println!("No rule rejected rows in batch '{}'.", batch_id);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Rule", "Category", "Processed", "Passed", "Quarantined", "Dropped", "Note",
    ]);
    for m in &metrics {
        table.add_row(vec![
            m.rule_name.clone(),
            m.category.to_string(),
            m.rows_processed.to_string(),
            m.rows_passed.to_string(),
            m.rows_quarantined.to_string(),
            m.rows_dropped.to_string(),
            m.note.clone(),
        ]);
    }
    println!("🔬 Data quality for batch {}", batch_id);
    println!("{table}");
    Ok(())
}
