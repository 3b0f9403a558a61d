//! Realtime push notifications and the cached views each one makes stale.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

/// Client-side cached view that may be marked stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    Competitions,
    AdminCompetitions,
    SpinWheels,
    AdminSpinWheels,
    ScratchCards,
    AdminScratchCards,
    Orders,
    AdminOrders,
    Tickets,
    Transactions,
    Wallet,
    User,
    AdminUsers,
    Winners,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::Competitions => "competitions",
            CacheKey::AdminCompetitions => "admin-competitions",
            CacheKey::SpinWheels => "spin-wheels",
            CacheKey::AdminSpinWheels => "admin-spin-wheels",
            CacheKey::ScratchCards => "scratch-cards",
            CacheKey::AdminScratchCards => "admin-scratch-cards",
            CacheKey::Orders => "orders",
            CacheKey::AdminOrders => "admin-orders",
            CacheKey::Tickets => "tickets",
            CacheKey::Transactions => "transactions",
            CacheKey::Wallet => "wallet",
            CacheKey::User => "user",
            CacheKey::AdminUsers => "admin-users",
            CacheKey::Winners => "winners",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const COMPETITION_KEYS: &[CacheKey] = &[CacheKey::Competitions, CacheKey::AdminCompetitions];
const SPIN_KEYS: &[CacheKey] = &[CacheKey::SpinWheels, CacheKey::AdminSpinWheels];
const SCRATCH_KEYS: &[CacheKey] = &[CacheKey::ScratchCards, CacheKey::AdminScratchCards];
const ORDER_KEYS: &[CacheKey] = &[CacheKey::Orders, CacheKey::AdminOrders];
const TICKET_KEYS: &[CacheKey] = &[CacheKey::Tickets, CacheKey::Competitions];
const TRANSACTION_KEYS: &[CacheKey] = &[CacheKey::Transactions, CacheKey::Wallet];
const WALLET_KEYS: &[CacheKey] = &[CacheKey::Wallet, CacheKey::User];
const USER_KEYS: &[CacheKey] = &[CacheKey::User, CacheKey::AdminUsers];
const WINNER_KEYS: &[CacheKey] = &[
    CacheKey::Competitions,
    CacheKey::AdminCompetitions,
    CacheKey::Winners,
];

/// Identifier that may arrive as a JSON number or string.
///
/// Any other shape is kept as-is so it never blocks the event it rides on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(u64),
    Text(String),
    Other(serde_json::Value),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(id) => write!(f, "{id}"),
            EntityId::Text(id) => f.write_str(id),
            EntityId::Other(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId::Text(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        EntityId::Text(value)
    }
}

/// Identifiers carried alongside an event tag. Only used for logging.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventIds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competition_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<EntityId>,
}

impl EventIds {
    pub fn competition(id: impl Into<EntityId>) -> Self {
        Self {
            competition_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn order(id: impl Into<EntityId>) -> Self {
        Self {
            order_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn user(id: impl Into<EntityId>) -> Self {
        Self {
            user_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, id: impl Into<EntityId>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn with_order(mut self, id: impl Into<EntityId>) -> Self {
        self.order_id = Some(id.into());
        self
    }
}

/// A push notification, keyed by its `type` tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    CompetitionCreated(EventIds),
    CompetitionUpdated(EventIds),
    CompetitionDeleted(EventIds),
    SpinCreated(EventIds),
    SpinUpdated(EventIds),
    SpinDeleted(EventIds),
    ScratchCreated(EventIds),
    ScratchUpdated(EventIds),
    ScratchDeleted(EventIds),
    OrderUpdated(EventIds),
    TicketUpdated(EventIds),
    TransactionUpdated(EventIds),
    WalletUpdated(EventIds),
    UserUpdated(EventIds),
    WinnerDrawn(EventIds),
}

#[derive(Debug, ThisError)]
pub enum EventParseError {
    #[error("invalid event json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event has no string type tag")]
    MissingType,
}

impl ServerEvent {
    /// Every tag this client understands.
    pub const TAGS: [&'static str; 15] = [
        "competition_created",
        "competition_updated",
        "competition_deleted",
        "spin_created",
        "spin_updated",
        "spin_deleted",
        "scratch_created",
        "scratch_updated",
        "scratch_deleted",
        "order_updated",
        "ticket_updated",
        "transaction_updated",
        "wallet_updated",
        "user_updated",
        "winner_drawn",
    ];

    /// Parses one text frame.
    ///
    /// Returns `Ok(None)` for a well-formed message with a tag outside [Self::TAGS], so newer
    /// servers can add events without breaking older clients.
    pub fn parse(text: &str) -> Result<Option<Self>, EventParseError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let known = match value.get("type").and_then(serde_json::Value::as_str) {
            Some(tag) => Self::TAGS.contains(&tag),
            None => return Err(EventParseError::MissingType),
        };
        if !known {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ServerEvent::CompetitionCreated(_) => "competition_created",
            ServerEvent::CompetitionUpdated(_) => "competition_updated",
            ServerEvent::CompetitionDeleted(_) => "competition_deleted",
            ServerEvent::SpinCreated(_) => "spin_created",
            ServerEvent::SpinUpdated(_) => "spin_updated",
            ServerEvent::SpinDeleted(_) => "spin_deleted",
            ServerEvent::ScratchCreated(_) => "scratch_created",
            ServerEvent::ScratchUpdated(_) => "scratch_updated",
            ServerEvent::ScratchDeleted(_) => "scratch_deleted",
            ServerEvent::OrderUpdated(_) => "order_updated",
            ServerEvent::TicketUpdated(_) => "ticket_updated",
            ServerEvent::TransactionUpdated(_) => "transaction_updated",
            ServerEvent::WalletUpdated(_) => "wallet_updated",
            ServerEvent::UserUpdated(_) => "user_updated",
            ServerEvent::WinnerDrawn(_) => "winner_drawn",
        }
    }

    pub fn ids(&self) -> &EventIds {
        match self {
            ServerEvent::CompetitionCreated(ids)
            | ServerEvent::CompetitionUpdated(ids)
            | ServerEvent::CompetitionDeleted(ids)
            | ServerEvent::SpinCreated(ids)
            | ServerEvent::SpinUpdated(ids)
            | ServerEvent::SpinDeleted(ids)
            | ServerEvent::ScratchCreated(ids)
            | ServerEvent::ScratchUpdated(ids)
            | ServerEvent::ScratchDeleted(ids)
            | ServerEvent::OrderUpdated(ids)
            | ServerEvent::TicketUpdated(ids)
            | ServerEvent::TransactionUpdated(ids)
            | ServerEvent::WalletUpdated(ids)
            | ServerEvent::UserUpdated(ids)
            | ServerEvent::WinnerDrawn(ids) => ids,
        }
    }

    /// Cached views made stale by this event.
    pub fn invalidations(&self) -> &'static [CacheKey] {
        match self {
            ServerEvent::CompetitionCreated(_)
            | ServerEvent::CompetitionUpdated(_)
            | ServerEvent::CompetitionDeleted(_) => COMPETITION_KEYS,
            ServerEvent::SpinCreated(_)
            | ServerEvent::SpinUpdated(_)
            | ServerEvent::SpinDeleted(_) => SPIN_KEYS,
            ServerEvent::ScratchCreated(_)
            | ServerEvent::ScratchUpdated(_)
            | ServerEvent::ScratchDeleted(_) => SCRATCH_KEYS,
            ServerEvent::OrderUpdated(_) => ORDER_KEYS,
            ServerEvent::TicketUpdated(_) => TICKET_KEYS,
            ServerEvent::TransactionUpdated(_) => TRANSACTION_KEYS,
            ServerEvent::WalletUpdated(_) => WALLET_KEYS,
            ServerEvent::UserUpdated(_) => USER_KEYS,
            ServerEvent::WinnerDrawn(_) => WINNER_KEYS,
        }
    }
}
