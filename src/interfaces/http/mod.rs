//! # HTTP API
//!
//! Builds the axum router serving the verification flow.
//!
//! | Method | Path             | Description                                  |
//! |--------|------------------|----------------------------------------------|
//! | POST   | `/api/ibancheck` | Start a bank verification                    |
//! | POST   | `/api/status`    | Poll a verification, returns a jwt on success |
//! | GET    | `/api/health`    | Liveness probe                               |
//!
//! Unknown `/api` paths and wrong methods get the usual error body. Every other path is
//! served from the static frontend directory, if configured.

pub mod error;

use crate::application::orchestrator::VerificationOrchestrator;
use crate::domain::transaction::{TransactionId, TransactionStatus};
use crate::error::IssuerError;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use error::ApiError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<VerificationOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: VerificationOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IbanCheckRequest {
    pub language: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IbanCheckResponse {
    pub transaction_id: TransactionId,
    pub issuer_authentication_url: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub transaction_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub transaction_status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Builds the router. When `static_dir` is set, unknown paths fall back to the frontend
/// build with `index.html` as the SPA entry point.
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/ibancheck", post(iban_check_handler))
        .route("/status", post(status_handler))
        .route("/health", get(health_handler))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(api_not_found);

    let router = Router::new().nest("/api", api);
    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => router,
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError(IssuerError::InvalidRequest(rejection.body_text()))
}

async fn iban_check_handler(
    State(state): State<AppState>,
    payload: Result<Json<IbanCheckRequest>, JsonRejection>,
) -> Result<Json<IbanCheckResponse>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let started = state.orchestrator.start_check(&request.language).await?;

    Ok(Json(IbanCheckResponse {
        transaction_id: started.transaction_id,
        issuer_authentication_url: started.issuer_authentication_url,
    }))
}

async fn status_handler(
    State(state): State<AppState>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;
    if request.transaction_id.trim().is_empty() {
        return Err(IssuerError::InvalidRequest("transaction_id is empty".into()).into());
    }

    let transaction_id = TransactionId::new(request.transaction_id);
    let outcome = state.orchestrator.poll_status(&transaction_id).await?;

    Ok(Json(StatusResponse {
        transaction_status: outcome.transaction_status,
        jwt: outcome.jwt,
    }))
}

async fn api_not_found() -> Response {
    error::envelope(StatusCode::NOT_FOUND, "not found")
}

async fn method_not_allowed() -> Response {
    error::envelope(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}
