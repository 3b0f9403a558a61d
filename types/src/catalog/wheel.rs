use serde::{Deserialize, Serialize};

use super::{
    coerce_reward_value, rules, Catalog, Outcome, PrizeId, RewardType, RewardValue,
    ValidationError, DEFAULT_SEGMENT_LABEL, MIN_WHEEL_SEGMENTS,
};

/// Spin-wheel catalog: segment probabilities share one wheel and must sum to 100.
pub type WheelCatalog = Catalog<WheelSegment>;

#[derive(Clone, Debug, PartialEq)]
pub struct WheelSegment {
    pub id: PrizeId,
    pub label: String,
    pub reward_type: RewardType,
    pub reward_value: String,
    /// Share of the wheel in percent, `[0, 100]`. Zero disables the segment.
    pub probability: f64,
    /// Win cap; `None` is unlimited. See [crate::draw::ZeroCapPolicy] for `Some(0)`.
    pub max_wins: Option<u64>,
    pub current_wins: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WheelField {
    Label(String),
    RewardType(RewardType),
    RewardValue(String),
    Probability(f64),
    MaxWins(Option<u64>),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WheelSettings {
    /// Spins one user may take on this wheel; `None` is unlimited.
    pub max_spins_per_user: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelSegmentRecord {
    pub id: PrizeId,
    pub label: String,
    pub reward_type: RewardType,
    pub reward_value: RewardValue,
    pub probability: f64,
    pub max_wins: Option<u64>,
    #[serde(default)]
    pub current_wins: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelCatalogPayload {
    pub max_spins_per_user: Option<u32>,
    pub segments: Vec<WheelSegmentRecord>,
}

impl WheelCatalogPayload {
    /// Applies the editor's wheel rules to a received payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.segments.len() < MIN_WHEEL_SEGMENTS {
            return Err(ValidationError::SegmentFloor {
                min: MIN_WHEEL_SEGMENTS,
            });
        }
        for segment in &self.segments {
            rules::check_probability(&segment.label, segment.probability)?;
        }
        rules::check_probability_total(self.segments.iter().map(|segment| segment.probability))
    }
}

impl Outcome for WheelSegment {
    type Field = WheelField;
    type Settings = WheelSettings;
    type Record = WheelSegmentRecord;
    type Payload = WheelCatalogPayload;

    const MIN_ENTRIES: usize = MIN_WHEEL_SEGMENTS;

    fn with_defaults(id: PrizeId) -> Self {
        Self {
            id,
            label: DEFAULT_SEGMENT_LABEL.to_string(),
            reward_type: RewardType::Lose,
            reward_value: "0".to_string(),
            probability: 0.0,
            max_wins: None,
            current_wins: 0,
        }
    }

    fn id(&self) -> &PrizeId {
        &self.id
    }

    fn apply(&mut self, field: WheelField) {
        match field {
            WheelField::Label(label) => self.label = label,
            WheelField::RewardType(reward_type) => self.reward_type = reward_type,
            WheelField::RewardValue(value) => self.reward_value = value,
            WheelField::Probability(probability) => self.probability = probability,
            WheelField::MaxWins(max_wins) => self.max_wins = max_wins,
        }
    }

    fn check(entries: &[Self]) -> Result<(), ValidationError> {
        if entries.len() < MIN_WHEEL_SEGMENTS {
            return Err(ValidationError::SegmentFloor {
                min: MIN_WHEEL_SEGMENTS,
            });
        }
        for entry in entries {
            rules::check_probability(&entry.label, entry.probability)?;
        }
        rules::check_probability_total(entries.iter().map(|entry| entry.probability))
    }

    fn to_record(&self) -> Result<WheelSegmentRecord, ValidationError> {
        Ok(WheelSegmentRecord {
            id: self.id.clone(),
            label: self.label.clone(),
            reward_type: self.reward_type,
            reward_value: coerce_reward_value(&self.label, self.reward_type, &self.reward_value)?,
            probability: self.probability,
            max_wins: self.max_wins,
            current_wins: self.current_wins,
        })
    }

    fn payload(settings: &WheelSettings, records: Vec<WheelSegmentRecord>) -> WheelCatalogPayload {
        WheelCatalogPayload {
            max_spins_per_user: settings.max_spins_per_user,
            segments: records,
        }
    }
}

impl Default for Catalog<WheelSegment> {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog<WheelSegment> {
    /// A wheel split evenly between two default segments.
    pub fn new() -> Self {
        let half = 100.0 / MIN_WHEEL_SEGMENTS as f64;
        let segments = (0..MIN_WHEEL_SEGMENTS)
            .map(|_| WheelSegment {
                probability: half,
                ..WheelSegment::with_defaults(PrizeId::generate())
            })
            .collect();
        Self::from_parts(segments, WheelSettings::default())
    }

    pub fn max_spins_per_user(&self) -> Option<u32> {
        self.settings().max_spins_per_user
    }

    pub fn set_max_spins_per_user(&mut self, max_spins: Option<u32>) {
        self.settings_mut().max_spins_per_user = max_spins;
    }

    /// Sum of the enabled segment probabilities, as shown next to the save button.
    pub fn probability_total(&self) -> f64 {
        self.entries()
            .iter()
            .map(|segment| segment.probability)
            .filter(|probability| *probability > 0.0)
            .sum()
    }
}
