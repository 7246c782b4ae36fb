//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crowdfunding::ErrorKind;

use crate::db::{self, Block, TransactionRecord};
use crate::errors::{GatewayError, Result};
use crate::peer::Peer;

pub struct ApiState {
    pub peer: Peer,
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub fcn: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Serialize)]
pub struct InvokeResponse {
    pub message: &'static str,
    pub result: SubmittedTx,
}

#[derive(Serialize)]
pub struct SubmittedTx {
    pub txid: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub result: Value,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::MvccConflict(_) => StatusCode::CONFLICT,
            GatewayError::Contract(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::InvalidState => StatusCode::CONFLICT,
                ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
                ErrorKind::Serialization | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            },
            GatewayError::Database(_)
            | GatewayError::Migrate(_)
            | GatewayError::Json(_)
            | GatewayError::Config(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }
        (
            status,
            Json(ErrorResponse {
                success: false,
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /invoke`
///
/// Simulates, validates and commits a state-changing contract call.
pub async fn invoke(
    State(state): State<Arc<ApiState>>,
    payload: std::result::Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<InvokeResponse>> {
    let Json(req) = payload?;
    let txid = state.peer.submit(&req.fcn, &req.args).await?;
    Ok(Json(InvokeResponse {
        message: "Transaction has been submitted",
        result: SubmittedTx { txid },
    }))
}

/// `POST /query`
///
/// Evaluates a read-only contract call against committed state.
pub async fn query(
    State(state): State<Arc<ApiState>>,
    payload: std::result::Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let Json(req) = payload?;
    let result = state.peer.evaluate(&req.fcn, &req.args).await?;
    Ok(Json(QueryResponse { result }))
}

/// `GET /transactions/:txid`
pub async fn get_transaction(
    State(state): State<Arc<ApiState>>,
    Path(txid): Path<String>,
) -> Result<Json<TransactionRecord>> {
    db::get_transaction(state.peer.pool(), &txid)
        .await?
        .map(Json)
        .ok_or_else(|| GatewayError::NotFound(format!("transaction {txid}")))
}

/// `GET /blocks/:number`
pub async fn get_block(
    State(state): State<Arc<ApiState>>,
    Path(number): Path<i64>,
) -> Result<Json<Block>> {
    db::get_block(state.peer.pool(), number)
        .await?
        .map(Json)
        .ok_or_else(|| GatewayError::NotFound(format!("block {number}")))
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/invoke", post(invoke))
        .route("/query", post(query))
        .route("/transactions/:txid", get(get_transaction))
        .route("/blocks/:number", get(get_block))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
