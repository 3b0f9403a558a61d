use serde::{Deserialize, Serialize};

use super::{
    coerce_reward_value, rules, Catalog, Outcome, PrizeId, RewardType, RewardValue,
    ValidationError, DEFAULT_PRIZE_LABEL,
};

/// Instant-win catalog: each prize carries independent odds.
pub type InstantCatalog = Catalog<InstantPrize>;

/// An instant-win prize as edited by an admin.
#[derive(Clone, Debug, PartialEq)]
pub struct InstantPrize {
    pub id: PrizeId,
    pub label: String,
    pub reward_type: RewardType,
    /// Edit-time representation; coerced on save.
    pub reward_value: String,
    /// Probability in `[0, 1]` that a single entry hits this prize.
    pub odds: f64,
    /// Supply cap; `None` is unlimited.
    pub quantity_available: Option<u64>,
    /// Server-authoritative counter.
    pub quantity_won: u64,
}

/// Editable fields of an [InstantPrize].
#[derive(Clone, Debug, PartialEq)]
pub enum InstantField {
    Label(String),
    RewardType(RewardType),
    RewardValue(String),
    Odds(f64),
    QuantityAvailable(Option<u64>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantPrizeRecord {
    pub id: PrizeId,
    pub label: String,
    pub reward_type: RewardType,
    pub reward_value: RewardValue,
    pub odds: f64,
    pub quantity_available: Option<u64>,
    #[serde(default)]
    pub quantity_won: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InstantCatalogPayload {
    pub prizes: Vec<InstantPrizeRecord>,
}

impl InstantCatalogPayload {
    /// Applies the editor's odds rule to a received payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for prize in &self.prizes {
            rules::check_odds(&prize.label, prize.odds)?;
        }
        Ok(())
    }
}

impl Outcome for InstantPrize {
    type Field = InstantField;
    type Settings = ();
    type Record = InstantPrizeRecord;
    type Payload = InstantCatalogPayload;

    const MIN_ENTRIES: usize = 0;

    fn with_defaults(id: PrizeId) -> Self {
        Self {
            id,
            label: DEFAULT_PRIZE_LABEL.to_string(),
            reward_type: RewardType::Cash,
            reward_value: "0".to_string(),
            odds: 0.0,
            quantity_available: None,
            quantity_won: 0,
        }
    }

    fn id(&self) -> &PrizeId {
        &self.id
    }

    fn apply(&mut self, field: InstantField) {
        match field {
            InstantField::Label(label) => self.label = label,
            InstantField::RewardType(reward_type) => self.reward_type = reward_type,
            InstantField::RewardValue(value) => self.reward_value = value,
            InstantField::Odds(odds) => self.odds = odds,
            InstantField::QuantityAvailable(quantity) => self.quantity_available = quantity,
        }
    }

    // Odds are independent per prize; there is no cross-entry constraint.
    fn check(entries: &[Self]) -> Result<(), ValidationError> {
        for entry in entries {
            rules::check_odds(&entry.label, entry.odds)?;
        }
        Ok(())
    }

    fn to_record(&self) -> Result<InstantPrizeRecord, ValidationError> {
        Ok(InstantPrizeRecord {
            id: self.id.clone(),
            label: self.label.clone(),
            reward_type: self.reward_type,
            reward_value: coerce_reward_value(&self.label, self.reward_type, &self.reward_value)?,
            odds: self.odds,
            quantity_available: self.quantity_available,
            quantity_won: self.quantity_won,
        })
    }

    fn payload(_: &(), records: Vec<InstantPrizeRecord>) -> InstantCatalogPayload {
        InstantCatalogPayload { prizes: records }
    }
}

impl Default for Catalog<InstantPrize> {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog<InstantPrize> {
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), ())
    }
}
