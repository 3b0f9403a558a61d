use serde::{Deserialize, Serialize};

use super::{InstantCatalogPayload, ValidationError, WheelCatalogPayload};

/// Body of a catalog save, tagged by game type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CatalogPayload {
    Instant(InstantCatalogPayload),
    Spin(WheelCatalogPayload),
}

impl CatalogPayload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            CatalogPayload::Instant(payload) => payload.validate(),
            CatalogPayload::Spin(payload) => payload.validate(),
        }
    }
}

impl From<InstantCatalogPayload> for CatalogPayload {
    fn from(value: InstantCatalogPayload) -> Self {
        CatalogPayload::Instant(value)
    }
}

impl From<WheelCatalogPayload> for CatalogPayload {
    fn from(value: WheelCatalogPayload) -> Self {
        CatalogPayload::Spin(value)
    }
}
