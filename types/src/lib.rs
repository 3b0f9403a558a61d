//! Common types used throughout ringtone: prize catalogs, award resolution, service payloads and
//! realtime events.

pub mod catalog;
pub mod draw;
pub mod events;
pub mod session;

pub use catalog::{
    CatalogPayload, InstantCatalog, InstantField, PrizeId, RewardType, RewardValue,
    ValidationError, WheelCatalog, WheelField,
};
pub use events::{CacheKey, ServerEvent};
