// retail-dwh-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Illegal batch transition: {from} -> {to}")]
    #[diagnostic(
        code(retail_dwh::domain::batch_transition),
        help("Batches move PENDING -> EXTRACTING -> TRANSFORMING -> LOADING -> terminal.")
    )]
    InvalidTransition { from: String, to: String },

    #[error("Batch '{0}' is already finalized")]
    #[diagnostic(code(retail_dwh::domain::batch_finalized))]
    BatchAlreadyFinalized(String),

    #[error(
        "Row conservation violated: extracted {extracted} != staged {staged} + quarantined {quarantined} + dropped {dropped}"
    )]
    #[diagnostic(
        code(retail_dwh::domain::conservation),
        help("Every extracted record must end up staged, quarantined or dropped exactly once.")
    )]
    ConservationViolated {
        extracted: usize,
        staged: usize,
        quarantined: usize,
        dropped: usize,
    },

    #[error("Unknown batch status: {0}")]
    #[diagnostic(code(retail_dwh::domain::status))]
    UnknownStatus(String),

    #[error("Unknown rule category: {0}")]
    #[diagnostic(code(retail_dwh::domain::category))]
    UnknownCategory(String),
}
