// retail-dwh-core/src/domain/quality/policy.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Tunables for the rule engine and the classifier.
#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct QualityPolicy {
    /// Unit prices strictly above this are suspicious (with a low quantity).
    #[validate(custom(function = "validate_positive"))]
    #[serde(default = "default_price_threshold")]
    pub suspicious_price_threshold: Decimal,

    /// Quantities whose absolute value is below this count as "low".
    #[validate(range(min = 1))]
    #[serde(default = "default_quantity_limit")]
    pub suspicious_quantity_limit: i64,

    /// Prefix marking a cancelled invoice.
    #[validate(length(min = 1, max = 8, message = "Cancellation marker must be 1-8 characters"))]
    #[serde(default = "default_cancellation_marker")]
    pub cancellation_marker: String,

    /// Audit hard-integrity rejections in quarantine instead of dropping them.
    #[serde(default)]
    pub quarantine_hard_failures: bool,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            suspicious_price_threshold: default_price_threshold(),
            suspicious_quantity_limit: default_quantity_limit(),
            cancellation_marker: default_cancellation_marker(),
            quarantine_hard_failures: false,
        }
    }
}

fn default_price_threshold() -> Decimal {
    Decimal::from(10_000)
}

fn default_quantity_limit() -> i64 {
    100
}

fn default_cancellation_marker() -> String {
    "C".to_string()
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("suspicious_price_threshold_not_positive"))
    }
}
