// retail-dwh-core/src/application/transform.rs
//
// USE CASE: Turn one extracted batch into staging rows.
// normalize -> rule engine -> classify, with every rejection accounted for.

use tracing::{info, warn};

use crate::domain::classifier::BusinessClassifier;
use crate::domain::normalizer::RecordNormalizer;
use crate::domain::quality::{QualityPolicy, QualityTracker, RuleCategory, RuleEngine};
use crate::domain::record::{LoadContext, RawRecord, StagedRecord};

/// Metric name for records the classifier refused after every rule passed them.
pub const UNSTAGEABLE_RULE: &str = "unstageable_record";

#[derive(Debug, Default)]
pub struct TransformOutput {
    pub staged: Vec<StagedRecord>,
    pub quarantined: usize,
    pub dropped: usize,
}

pub struct Transformer {
    engine: RuleEngine,
    classifier: BusinessClassifier,
}

impl Transformer {
    pub fn new(policy: &QualityPolicy) -> Self {
        Self::with_engine(RuleEngine::standard(policy), policy)
    }

    pub fn with_engine(engine: RuleEngine, policy: &QualityPolicy) -> Self {
        Self {
            engine,
            classifier: BusinessClassifier::new(policy.cancellation_marker.clone()),
        }
    }

    pub fn run(
        &self,
        records: Vec<RawRecord>,
        ctx: &LoadContext,
        tracker: &mut QualityTracker,
    ) -> TransformOutput {
        let extracted = records.len();
        let working = RecordNormalizer::normalize_all(records);
        let checked = self.engine.run(working, tracker);
        let classified = checked.passed.len();

        let mut output = TransformOutput {
            staged: Vec::with_capacity(checked.passed.len()),
            quarantined: checked.quarantined,
            dropped: checked.dropped,
        };
        let mut unstageable = 0;
        for record in checked.passed {
            match self.classifier.stage(record, ctx) {
                Some(staged) => output.staged.push(staged),
                None => unstageable += 1,
            }
        }
        if unstageable > 0 {
            // Only reachable with a rule set lacking the identity/date checks.
            warn!(rows = unstageable, "Records without identity or timestamp reached staging; dropped");
            tracker.record_metric(
                UNSTAGEABLE_RULE,
                RuleCategory::DataIntegrity,
                classified,
                output.staged.len(),
                0,
                unstageable,
                "DQ003: Missing InvoiceNo/StockCode/Date at staging",
            );
            output.dropped += unstageable;
        }

        info!(
            extracted,
            staged = output.staged.len(),
            quarantined = output.quarantined,
            dropped = output.dropped,
            "Transformation complete"
        );
        output
    }
}
