// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type shared by the CLI and the web front end.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot read private key .pem: {0}")]
    PrivateKey(String),

    #[error("JWT signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Network request failed ({method} {url}): {reason}")]
    Network {
        method: String,
        url: String,
        reason: String,
    },

    /// Non-200 reply from the bank API, body kept verbatim.
    #[error("{path} failed ({status}): {body}")]
    BankApi {
        path: String,
        status: u16,
        body: String,
    },

    #[error("{path} response has no `{field}`")]
    MissingField { path: String, field: &'static str },

    #[error("{path} response is not valid JSON: {reason}")]
    Decode { path: String, reason: String },

    /// The bank handed back a continuation key it had already given.
    #[error("{path} returned continuation_key '{key}' twice")]
    RepeatedContinuationKey { path: String, key: String },

    #[error("Cannot access {path}: {reason}")]
    LocalState { path: String, reason: String },

    #[error("{0}")]
    BadRequest(String),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Hint printed after a 422 from `/auth`.
    pub const UNPROCESSABLE_HINT: &'static str = "[422 hint]\n\
        - Check `valid_until` (ISO 8601 with offset, e.g. +00:00)\n\
        - Check `aspsp.name` and `aspsp.country`\n\
        - Check that `redirect_url` is whitelisted in the Control Panel";

    /// True when the bank rejected the request body as unprocessable (422).
    pub fn is_unprocessable(&self) -> bool {
        matches!(self, AppError::BankApi { status: 422, .. })
    }

    /// HTTP status returned by the bank, if this error came from one.
    pub fn bank_status(&self) -> Option<u16> {
        match self {
            AppError::BankApi { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::BankApi { .. }
            | AppError::MissingField { .. }
            | AppError::Decode { .. }
            | AppError::RepeatedContinuationKey { .. } => {
                (StatusCode::BAD_GATEWAY, "bank_error", Some(self.to_string()))
            }
            AppError::Network { .. } => {
                tracing::warn!(error = %self, "Bank API unreachable");
                (StatusCode::BAD_GATEWAY, "bank_unreachable", None)
            }
            other => {
                tracing::error!(error = %other, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
