use thiserror::Error;

use super::types::ContributionKind;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("contribution amount must be a finite number >= 0, got {amount}")]
    InvalidAmount { amount: f64 },

    /// `max` is expressed in the same representation as the rejected amount.
    #[error("{}", limit_message(.kind, .max))]
    LimitExceeded { kind: ContributionKind, max: f64 },

    #[error("invalid plan parameters: {0}")]
    InvalidPlanParameters(String),
}

fn limit_message(kind: &ContributionKind, max: &f64) -> String {
    match kind {
        ContributionKind::Percentage => {
            format!("contribution percentage cannot exceed {max:.2}%")
        }
        ContributionKind::FixedPerPaycheck => {
            format!("per-paycheck contribution cannot exceed ${max:.2}")
        }
    }
}
