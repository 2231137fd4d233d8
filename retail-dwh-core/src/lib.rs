// retail-dwh-core/src/lib.rs

#![allow(missing_docs)]
// Memory safety
#![deny(unsafe_code)]
// Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts for the record source and the warehouse.
pub mod ports;

// 2. Domain (business core)
// Normalizer, rule engine, classifier, quality tracker, batch lifecycle.
// Depends on nothing else in the crate (neither infra nor app).
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB warehouse, CSV source, config files, filesystem helpers.
pub mod infrastructure;

// 4. Application (Use Cases)
// Batch orchestration, transformation, reports, clean.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::EtlError;
