//! Request and response bodies of the award-resolution service.

use serde::{Deserialize, Serialize};

use crate::catalog::{PrizeId, RewardType, RewardValue};

/// Reward as displayed to the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrizeSummary {
    #[serde(rename = "type")]
    pub reward_type: RewardType,
    pub value: RewardValue,
}

impl PrizeSummary {
    pub fn losing() -> Self {
        Self {
            reward_type: RewardType::Lose,
            value: RewardValue::Number(0.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub order_id: String,
}

/// Outcome locked in by the server at start; the client only animates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub success: bool,
    pub session_id: String,
    pub is_winner: bool,
    pub prize: PrizeSummary,
    pub tile_layout: Vec<u32>,
    #[serde(default)]
    pub prize_id: Option<PrizeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionRequest {
    pub order_id: String,
    pub prize_id: Option<PrizeId>,
    pub is_winner: bool,
}

impl CompleteSessionRequest {
    /// Echoes back what `start` returned.
    pub fn for_start(order_id: impl Into<String>, start: &StartSessionResponse) -> Self {
        Self {
            order_id: order_id.into(),
            prize_id: start.prize_id.clone(),
            is_winner: start.is_winner,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionResponse {
    pub success: bool,
    pub prize: PrizeSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_label: Option<String>,
    pub remaining_cards: u32,
    pub order_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequest {
    pub order_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    pub success: bool,
    pub segment_id: Option<PrizeId>,
    pub label: Option<String>,
    pub prize: PrizeSummary,
    pub spins_remaining: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub competition_id: String,
    pub user_id: String,
    pub cards: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawWinnerResponse {
    pub competition_id: String,
    pub order_id: String,
    pub user_id: String,
}

/// Error body returned with any non-success status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            message: None,
        }
    }

    /// The service's message, preferring `error` over `message`.
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}
