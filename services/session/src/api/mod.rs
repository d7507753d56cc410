//! HTTP surface.
//!
//! - `GET /login/:guid` issues a pair for the subject `guid`
//! - `POST /refresh` rotates `{access_token, refresh_token}`
//! - `GET /metrics` exports Prometheus metrics
//!
//! Every request is traced and handler panics become 500 responses.

pub mod handlers;
pub mod response;

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::TokenError;
use crate::service::SessionService;

pub use handlers::AppState;
pub use response::{ApiError, ApiResponse, ErrorBody, TokenResponse};

/// Build the service router.
pub fn router(service: Arc<SessionService>) -> Router {
    Router::new()
        .route("/login/:guid", get(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/metrics", get(handlers::export_metrics))
        .with_state(AppState { service })
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

fn handle_panic(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("Request handler panicked");
    ApiError::from(TokenError::internal("handler panicked")).into_response()
}
