//! Odds and probability checks shared by the catalog editor and the server-side payload check.

use super::{ValidationError, PROBABILITY_SCALE, WHEEL_PROBABILITY_TOTAL};

pub fn check_odds(label: &str, odds: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&odds) {
        return Ok(());
    }
    Err(ValidationError::OddsOutOfRange {
        label: label.to_string(),
        odds,
    })
}

pub fn check_probability(label: &str, probability: f64) -> Result<(), ValidationError> {
    if (0.0..=WHEEL_PROBABILITY_TOTAL).contains(&probability) {
        return Ok(());
    }
    Err(ValidationError::ProbabilityOutOfRange {
        label: label.to_string(),
        probability,
    })
}

/// Sums the enabled (positive) probabilities and requires exactly 100, compared in hundredths.
pub fn check_probability_total(
    probabilities: impl IntoIterator<Item = f64>,
) -> Result<(), ValidationError> {
    let total: f64 = probabilities
        .into_iter()
        .filter(|probability| *probability > 0.0)
        .sum();
    let scaled = (total * PROBABILITY_SCALE).round();
    if scaled == (WHEEL_PROBABILITY_TOTAL * PROBABILITY_SCALE).round() {
        return Ok(());
    }
    Err(ValidationError::ProbabilitySum { total })
}
