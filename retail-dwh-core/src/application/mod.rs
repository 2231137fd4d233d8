// retail-dwh-core/src/application/mod.rs

pub mod clean;
pub mod pipeline;
pub mod report;
pub mod transform;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Lets the CLI write `use retail_dwh_core::application::{run_batch, clean_project};`

pub use clean::clean_project;
pub use pipeline::{BatchReport, run_batch};
pub use report::write_report;
pub use transform::Transformer;
