// retail-dwh-core/src/ports/mod.rs

pub mod source;
pub mod warehouse;

pub use source::RecordSource;
pub use warehouse::{BatchLoad, Warehouse};
