//! HTTP surface of the ledger.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::ledger::{LedgerError, SpendError};
use crate::model::{PayerBalance, Points, Transaction, parse_timestamp};
use crate::service::{LedgerHandle, ServiceError};

/// Health status reported while the ledger accepts commands.
pub const STATUS_IDLE: u8 = 0;
/// Health status reported once the ledger task has stopped.
pub const STATUS_NOT_RUNNING: u8 = 3;

/// Award request body.
///
/// Missing fields decode to empty values and are rejected by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AwardRequest {
    pub payer: String,
    pub points: Points,
    pub timestamp: String,
}

/// Spend request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpendRequest {
    pub points: Points,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheck {
    pub status: u8,
}

/// Errors returned to HTTP clients as `{"errors": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
    Unavailable,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(_)
            | LedgerError::Spend(SpendError::InsufficientPoints { .. }) => {
                ApiError::BadRequest(err.to_string())
            }
            LedgerError::Spend(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Ledger(err) => err.into(),
            ServiceError::Unavailable => ApiError::Unavailable,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Unavailable.to_string(),
            ),
        };
        error!(status = status.as_u16(), "{message}");
        (status, Json(serde_json::json!({ "errors": message }))).into_response()
    }
}

/// Build the router serving the ledger.
pub fn router(ledger: LedgerHandle) -> Router {
    Router::new()
        .route("/health-check", get(health_check))
        .route("/transaction", post(add_transaction))
        .route("/transactions", get(list_transactions))
        .route("/payer-points", get(payer_points))
        .route("/spend", post(spend_points))
        .with_state(ledger)
}

async fn health_check(State(ledger): State<LedgerHandle>) -> Json<HealthCheck> {
    let status = if ledger.is_closed() {
        STATUS_NOT_RUNNING
    } else {
        STATUS_IDLE
    };
    Json(HealthCheck { status })
}

async fn add_transaction(
    State(ledger): State<LedgerHandle>,
    body: Result<Json<AwardRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let Json(request) = body?;
    info!(?request, "award requested");

    let timestamp = parse_timestamp(&request.timestamp).map_err(LedgerError::from)?;
    let tx = ledger
        .award(request.payer, request.points, timestamp)
        .await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

async fn list_transactions(
    State(ledger): State<LedgerHandle>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(ledger.transactions().await?))
}

async fn payer_points(
    State(ledger): State<LedgerHandle>,
) -> Result<Json<Vec<PayerBalance>>, ApiError> {
    Ok(Json(ledger.balances().await?))
}

async fn spend_points(
    State(ledger): State<LedgerHandle>,
    body: Result<Json<SpendRequest>, JsonRejection>,
) -> Result<Json<Vec<PayerBalance>>, ApiError> {
    let Json(request) = body?;
    info!(points = request.points, "spend requested");

    Ok(Json(ledger.spend(request.points).await?))
}
