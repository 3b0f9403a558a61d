use thiserror::Error as ThisError;

use super::PrizeId;

/// A catalog that cannot be saved.
///
/// Every variant is a user-facing message: validation failures are shown to the admin editing the
/// catalog and never reach the persistence collaborator.
#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum ValidationError {
    #[error("odds for \"{label}\" must be between 0 and 1 (got {odds})")]
    OddsOutOfRange { label: String, odds: f64 },
    #[error("probability for \"{label}\" must be between 0 and 100 (got {probability})")]
    ProbabilityOutOfRange { label: String, probability: f64 },
    #[error("Total probability must equal 100% (currently {}%)", percent(.total))]
    ProbabilitySum { total: f64 },
    #[error("a wheel must keep at least {min} segments")]
    SegmentFloor { min: usize },
    #[error("reward value for \"{label}\" must be a number (got \"{value}\")")]
    InvalidRewardValue { label: String, value: String },
    #[error("no prize with id {id}")]
    UnknownOutcome { id: PrizeId },
}

/// Formats a percentage rounded to hundredths without trailing zeros (`99`, `99.5`, `33.33`).
pub fn format_percent(total: f64) -> String {
    let rounded = (total * 100.0).round() / 100.0;
    format!("{rounded}")
}

fn percent(total: &f64) -> String {
    format_percent(*total)
}
