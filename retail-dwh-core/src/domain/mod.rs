// retail-dwh-core/src/domain/mod.rs

pub mod batch;
pub mod classifier;
pub mod error;
pub mod normalizer;
pub mod quality;
pub mod record;

// Re-exports to keep imports short elsewhere
pub use batch::{Batch, BatchStatus, BatchSummary, LoadMode};
pub use error::DomainError;
