//! HTTP surface: the internal RPC endpoints consumed by peers' routers and
//! the client-facing propose/read operations.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use serde::Deserialize;

use crate::log::ReplicatedLog;
use crate::message::{
    LogRequest, PrepareRequest, PrepareResponse, ProposeRequest, ProposeResponse, Value,
};
use crate::node::Node;

#[derive(Debug, Deserialize)]
struct ProposeParams {
    value: Value,
}

/// Routes for a single-slot node.
pub fn node_app(node: Arc<Node>) -> axum::Router {
    axum::Router::new()
        .route("/internal/prepare", post(internal_prepare))
        .route("/internal/propose", post(internal_propose))
        .route("/internal/log", post(internal_log))
        .route("/propose", post(propose))
        .route("/committed", get(committed))
        .with_state(node)
}

async fn internal_prepare(
    State(node): State<Arc<Node>>,
    Json(request): Json<PrepareRequest>,
) -> Json<Option<PrepareResponse>> {
    Json(node.handle_prepare(request).await)
}

async fn internal_propose(
    State(node): State<Arc<Node>>,
    Json(request): Json<ProposeRequest>,
) -> Json<Option<ProposeResponse>> {
    Json(node.handle_propose(request).await)
}

async fn internal_log(State(node): State<Arc<Node>>, Json(request): Json<LogRequest>) {
    node.handle_log(request).await;
}

async fn propose(
    State(node): State<Arc<Node>>,
    Query(params): Query<ProposeParams>,
) -> Json<Value> {
    Json(node.propose(params.value).await)
}

async fn committed(State(node): State<Arc<Node>>) -> Json<Option<Value>> {
    Json(node.committed().await)
}

/// Routes for a replicated-log node; internal endpoints carry the slot.
pub fn log_app(log: Arc<ReplicatedLog>) -> axum::Router {
    axum::Router::new()
        .route("/internal/prepare/:slot", post(log_internal_prepare))
        .route("/internal/propose/:slot", post(log_internal_propose))
        .route("/internal/log/:slot", post(log_internal_log))
        .route("/propose", post(log_propose))
        .route("/read", get(log_read))
        .with_state(log)
}

async fn log_internal_prepare(
    State(log): State<Arc<ReplicatedLog>>,
    Path(slot): Path<u64>,
    Json(request): Json<PrepareRequest>,
) -> Json<Option<PrepareResponse>> {
    Json(log.handle_prepare(slot, request).await)
}

async fn log_internal_propose(
    State(log): State<Arc<ReplicatedLog>>,
    Path(slot): Path<u64>,
    Json(request): Json<ProposeRequest>,
) -> Json<Option<ProposeResponse>> {
    Json(log.handle_propose(slot, request).await)
}

async fn log_internal_log(
    State(log): State<Arc<ReplicatedLog>>,
    Path(slot): Path<u64>,
    Json(request): Json<LogRequest>,
) {
    log.handle_log(slot, request).await;
}

async fn log_propose(
    State(log): State<Arc<ReplicatedLog>>,
    Query(params): Query<ProposeParams>,
) -> Result<Json<Vec<Value>>, (StatusCode, String)> {
    log.propose(params.value)
        .await
        .map(Json)
        .map_err(|error| (StatusCode::INTERNAL_SERVER_ERROR, format!("{error:#}")))
}

async fn log_read(
    State(log): State<Arc<ReplicatedLog>>,
) -> Result<Json<Vec<Option<Value>>>, (StatusCode, String)> {
    log.read()
        .await
        .map(Json)
        .map_err(|error| (StatusCode::INTERNAL_SERVER_ERROR, format!("{error:#}")))
}
