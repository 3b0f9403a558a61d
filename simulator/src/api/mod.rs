use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::Simulator;

mod http;
mod ws;

pub struct Api {
    simulator: Arc<Simulator>,
}

impl Api {
    pub fn new(simulator: Arc<Simulator>) -> Self {
        Self { simulator }
    }

    pub fn router(&self) -> Router {
        // Local development backend: any origin may call it.
        let cors = CorsLayer::permissive();

        Router::new()
            .route("/healthz", get(http::healthz))
            .route("/api/orders", post(http::create_order))
            .route("/api/scratch-session/start", post(http::start_session))
            .route(
                "/api/scratch-session/:session_id/complete",
                post(http::complete_session),
            )
            .route(
                "/api/admin/competitions/:competition_id/prizes",
                post(http::save_catalog),
            )
            .route(
                "/api/admin/competitions/:competition_id/draw",
                post(http::draw_winner),
            )
            .route(
                "/api/spin-wheel/:competition_id/spin",
                post(http::spin),
            )
            .route("/ws", get(ws::events_ws))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.simulator.clone())
    }
}
