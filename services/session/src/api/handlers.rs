use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::Deserialize;

use super::response::{ApiError, ApiResponse, TokenResponse};
use crate::error::TokenError;
use crate::jwt::decode_refresh;
use crate::metrics;
use crate::service::SessionService;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Issuance and rotation
    pub service: Arc<SessionService>,
}

/// Body of `POST /refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Compact access credential
    pub access_token: String,
    /// Refresh credential in wire form
    pub refresh_token: String,
}

/// `GET /login/:guid`
pub async fn login(
    State(state): State<AppState>,
    Path(guid): Path<String>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let pair = state.service.issue(&guid).await?;
    Ok(Json(ApiResponse::ok(pair.into())))
}

/// `POST /refresh`
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if request.access_token.is_empty() || request.refresh_token.is_empty() {
        return Err(ApiError::BadRequest("access_token and refresh_token are required".to_string()));
    }

    let refresh_token = decode_refresh(&request.refresh_token)?;
    let pair = state.service.rotate(&request.access_token, &refresh_token).await?;
    Ok(Json(ApiResponse::ok(pair.into())))
}

/// `GET /metrics`
pub async fn export_metrics() -> Result<impl IntoResponse, ApiError> {
    let body = metrics::render().map_err(|e| TokenError::internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
