//! Response envelope and error mapping.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{ErrorClass, TokenError};
use crate::issuer::TokenPair;
use crate::jwt::encode_refresh;

/// Envelope wrapped around every JSON response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    /// Failure details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `result`.
    pub const fn ok(result: T) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(code: &str, msg: String) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(ErrorBody {
                code: code.to_string(),
                msg,
            }),
        }
    }
}

/// Error code and message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code
    pub code: String,
    /// Human-readable message
    pub msg: String,
}

/// Credentials handed to the caller.
///
/// `refresh_token` is in wire form and must be sent back unchanged.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Compact access credential
    pub access_token: String,
    /// Base64 wire form of the refresh credential
    pub refresh_token: String,
    /// Access expiry (Unix seconds)
    pub access_expires_at: i64,
    /// Refresh expiry (Unix seconds)
    pub refresh_expires_at: i64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            refresh_token: encode_refresh(&pair.refresh_token),
            access_token: pair.access_token,
            access_expires_at: pair.access_expires_at,
            refresh_expires_at: pair.refresh_expires_at,
        }
    }
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body or parameters could not be read
    #[error("Invalid request: {0}")]
    BadRequest(String),
    /// Issuance or rotation failed
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Token(err) => match (err.class(), err) {
                (ErrorClass::ClientInput, _) => StatusCode::BAD_REQUEST,
                (ErrorClass::Credential, _) => StatusCode::UNAUTHORIZED,
                (_, TokenError::ConcurrentRotation) => StatusCode::CONFLICT,
                (_, TokenError::PersistenceError(_)) => StatusCode::SERVICE_UNAVAILABLE,
                (ErrorClass::Infrastructure, _) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_REQUEST",
            Self::Token(err) => err.code(),
        }
    }

    // Infrastructure details stay in the logs.
    fn message(&self) -> String {
        match self {
            Self::Token(err) if err.class() == ErrorClass::Infrastructure => {
                error!(error = %err, code = err.code(), "Request failed");
                match err {
                    TokenError::PersistenceError(_) => "Session store unavailable, retry later".to_string(),
                    TokenError::ConcurrentRotation => {
                        "Another rotation for this session completed first".to_string()
                    }
                    _ => "An internal error occurred".to_string(),
                }
            }
            other => other.to_string(),
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Token(err) if err.is_retryable())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiResponse::failure(self.code(), self.message());

        let mut response = (status, Json(body)).into_response();
        if self.is_retryable() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}
