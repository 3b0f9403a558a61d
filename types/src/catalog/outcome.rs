use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// What a winning outcome pays out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    Cash,
    Points,
    Prize,
    Lose,
}

impl RewardType {
    /// Whether the reward value is an amount (and must be coerced to a number on save).
    pub fn is_numeric(&self) -> bool {
        matches!(self, RewardType::Cash | RewardType::Points)
    }

    pub fn is_winning(&self) -> bool {
        !matches!(self, RewardType::Lose)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RewardType::Cash => "cash",
            RewardType::Points => "points",
            RewardType::Prize => "prize",
            RewardType::Lose => "lose",
        }
    }
}

impl fmt::Display for RewardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted reward value: a number for cash/points, opaque text otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RewardValue {
    Number(f64),
    Text(String),
}

impl RewardValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RewardValue::Number(value) => Some(*value),
            RewardValue::Text(_) => None,
        }
    }
}

impl fmt::Display for RewardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardValue::Number(value) => write!(f, "{value}"),
            RewardValue::Text(value) => f.write_str(value),
        }
    }
}

/// Coerces an edit-time reward value into its persisted form.
pub fn coerce_reward_value(
    label: &str,
    reward_type: RewardType,
    raw: &str,
) -> Result<RewardValue, ValidationError> {
    if !reward_type.is_numeric() {
        return Ok(RewardValue::Text(raw.to_string()));
    }
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(RewardValue::Number)
        .ok_or_else(|| ValidationError::InvalidRewardValue {
            label: label.to_string(),
            value: raw.to_string(),
        })
}

/// Identifier of one catalog entry.
///
/// Rows added while editing get a random identifier; the server keeps or replaces it on save.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrizeId(String);

impl PrizeId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PrizeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PrizeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PrizeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
