//! Local stand-in for the ringtone award-resolution service.
//!
//! Resolves scratch-card and wheel outcomes against admin-configured catalogs, credits wallets, and
//! pushes [ServerEvent]s to connected clients.

use ringtone_types::catalog::CatalogPayload;
use ringtone_types::draw::ZeroCapPolicy;
use ringtone_types::events::ServerEvent;
use ringtone_types::session::{
    CompleteSessionRequest, CompleteSessionResponse, CreateOrderRequest, CreateOrderResponse,
    DrawWinnerResponse, SpinResponse, StartSessionResponse,
};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

mod api;
pub use api::Api;

mod error;
pub use error::ApiError;

mod state;
pub use state::{
    tile_layout, Competition, Order, State, Wallet, MATCH_COUNT, SYMBOL_COUNT, TILE_COUNT,
};

pub const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SimulatorConfig {
    /// Seeds award resolution; entropy when unset.
    pub seed: Option<u64>,
    pub zero_cap_policy: ZeroCapPolicy,
    pub broadcast_capacity: Option<usize>,
}

impl SimulatorConfig {
    pub fn broadcast_capacity(&self) -> usize {
        self.broadcast_capacity
            .unwrap_or(DEFAULT_BROADCAST_CAPACITY)
            .max(1)
    }
}

pub struct Simulator {
    config: SimulatorConfig,
    state: Mutex<State>,
    events: broadcast::Sender<ServerEvent>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let (events, _) = broadcast::channel(config.broadcast_capacity());
        let state = State::new(config.seed, config.zero_cap_policy);
        Self {
            config,
            state: Mutex::new(state),
            events,
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Number of live push-channel subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn publish(&self, event: ServerEvent) {
        tracing::debug!(tag = event.tag(), "publishing event");
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Runs `op` under the state lock, then publishes whatever events it raised.
    async fn apply<T>(
        &self,
        op: impl FnOnce(&mut State) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut state = self.state.lock().await;
        let result = op(&mut state);
        for event in state.drain_events() {
            self.publish(event);
        }
        result
    }

    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ApiError> {
        self.apply(|state| state.create_order(request, true)).await
    }

    pub async fn start_session(&self, order_id: &str) -> Result<StartSessionResponse, ApiError> {
        self.apply(|state| state.start_session(order_id)).await
    }

    pub async fn complete_session(
        &self,
        session_id: &str,
        request: &CompleteSessionRequest,
    ) -> Result<CompleteSessionResponse, ApiError> {
        self.apply(|state| state.complete_session(session_id, request))
            .await
    }

    pub async fn save_catalog(
        &self,
        competition_id: &str,
        payload: CatalogPayload,
    ) -> Result<(), ApiError> {
        self.apply(|state| state.save_catalog(competition_id, payload))
            .await
    }

    pub async fn spin(
        &self,
        competition_id: &str,
        order_id: &str,
    ) -> Result<SpinResponse, ApiError> {
        self.apply(|state| state.spin(competition_id, order_id)).await
    }

    pub async fn draw_winner(&self, competition_id: &str) -> Result<DrawWinnerResponse, ApiError> {
        self.apply(|state| state.draw_winner(competition_id)).await
    }

    pub async fn seed_demo(&self, competition_id: &str) -> Result<(), ApiError> {
        self.apply(|state| state.seed_demo(competition_id)).await
    }

    pub async fn wallet(&self, user_id: &str) -> Wallet {
        self.state.lock().await.wallet(user_id)
    }

    pub async fn competition(&self, competition_id: &str) -> Option<Competition> {
        self.state.lock().await.competition(competition_id).cloned()
    }
}
