use axum::{
    extract::{Path, State as AxumState},
    Json,
};
use ringtone_types::catalog::CatalogPayload;
use ringtone_types::session::{
    CompleteSessionRequest, CompleteSessionResponse, CreateOrderRequest, CreateOrderResponse,
    DrawWinnerResponse, SpinRequest, SpinResponse, StartSessionRequest, StartSessionResponse,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{ApiError, Simulator};

pub(super) async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub(super) async fn create_order(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    simulator.create_order(&request).await.map(Json)
}

pub(super) async fn start_session(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    simulator.start_session(&request.order_id).await.map(Json)
}

pub(super) async fn complete_session(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(session_id): Path<String>,
    Json(request): Json<CompleteSessionRequest>,
) -> Result<Json<CompleteSessionResponse>, ApiError> {
    simulator
        .complete_session(&session_id, &request)
        .await
        .map(Json)
}

pub(super) async fn save_catalog(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(competition_id): Path<String>,
    Json(payload): Json<CatalogPayload>,
) -> Result<Json<Value>, ApiError> {
    simulator.save_catalog(&competition_id, payload).await?;
    Ok(Json(json!({ "success": true, "competitionId": competition_id })))
}

pub(super) async fn spin(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(competition_id): Path<String>,
    Json(request): Json<SpinRequest>,
) -> Result<Json<SpinResponse>, ApiError> {
    simulator
        .spin(&competition_id, &request.order_id)
        .await
        .map(Json)
}

pub(super) async fn draw_winner(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(competition_id): Path<String>,
) -> Result<Json<DrawWinnerResponse>, ApiError> {
    simulator.draw_winner(&competition_id).await.map(Json)
}
