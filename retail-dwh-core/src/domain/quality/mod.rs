// retail-dwh-core/src/domain/quality/mod.rs

pub mod policy;
pub mod rules;
pub mod tracker;

pub use policy::QualityPolicy;
pub use rules::{Disposition, Rule, RuleEngine, RuleEngineOutput};
pub use tracker::{DqMetric, QualityTracker, QuarantineEntry, RuleCategory};
