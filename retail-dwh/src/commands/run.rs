// retail-dwh/src/commands/run.rs
//
// USE CASE: Run one ETL batch.

use anyhow::Context;
use retail_dwh_core::application::{BatchReport, run_batch, write_report};
use retail_dwh_core::domain::LoadMode;
use retail_dwh_core::infrastructure::adapters::CsvSource;
use retail_dwh_core::ports::Warehouse;

use crate::cli::ProjectArgs;
use crate::commands::{load_config, open_warehouse};

pub async fn execute(project: ProjectArgs, mode: LoadMode) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    // A. Load the Config (Infra)
    println!("⚙️  Loading configuration...");
    let config = load_config(&project)?;
    println!("   Project: {}", config.name);

    // B. Warehouse must exist before a batch can be recorded
    let warehouse = open_warehouse(&config)?;
    warehouse
        .provision()
        .await
        .context("Failed to provision the warehouse")?;
    println!(
        "   Warehouse: {} (schema '{}') 🦆",
        config.warehouse.path, config.warehouse.schema
    );

    // C. Run the batch (Application Layer)
    let source = CsvSource::from_settings(&config.source);
    println!("🚀 Running {} batch from {}", mode, config.source.path);
    let report = run_batch(&source, &warehouse, &config.quality, mode)
        .await
        .context("Batch could not be recorded in the batch log")?;

    let report_path = write_report(&config.target_dir(&project.project_dir), &report)
        .context("Failed to write the run report")?;

    print_report(&report);
    println!("   Report: {}", report_path.display());

    if report.succeeded() {
        println!("\n✨ {} in {:.2?}", report.batch.status, start.elapsed());
        Ok(())
    } else {
        eprintln!(
            "\n❌ FAILED: {}",
            report.batch.error_message.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }
}

fn print_report(report: &BatchReport) {
    let batch = &report.batch;
    println!("\n📊 Batch {}", batch.batch_id);
    println!("   Status:      {}", batch.status);
    println!("   Mode:        {} (effective: {})", batch.mode, report.effective_mode);
    if let Some(mark) = report.watermark {
        println!("   Watermark:   {}", mark);
    }

    let Some(summary) = &report.summary else {
        return;
    };
    println!("   Extracted:   {}", summary.rows_extracted);
    println!("   Staged:      {}", summary.rows_staged);
    println!("   Quarantined: {}", summary.rows_quarantined);
    println!("   Dropped:     {}", summary.rows_dropped);
    println!("   Retention:   {:.2}%", summary.retention_rate);
    println!("   Valid sales: {}", summary.valid_sales);
    println!("   Cancelled:   {}", summary.cancellations);
    println!("   Returns:     {}", summary.returns);
    println!("   Guests:      {}", summary.guest_purchases);
    println!("   Revenue:     {}", summary.total_revenue.round_dp(2));
    println!("   Duration:    {}s", summary.duration_seconds);
}
