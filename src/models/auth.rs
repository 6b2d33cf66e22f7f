// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Consent handshake payloads (`/auth` and `/sessions`).

use super::Account;
use crate::error::AppError;
use crate::time_utils::valid_until;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The bank (ASPSP) the user is sent to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aspsp {
    pub name: String,
    pub country: String,
}

/// Kind of PSU granting consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PsuType {
    Personal,
    Business,
}

/// Body of `POST /auth`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationRequest {
    pub aspsp: Aspsp,
    /// Must be whitelisted for the application in the Control Panel
    pub redirect_url: String,
    /// Consent expiry, ISO 8601 with offset
    pub valid_until: String,
    /// Echoed back to `redirect_url` as `?state=`
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psu_type: Option<PsuType>,
}

impl AuthorizationRequest {
    /// Build the body; fails when `valid_minutes` overflows the date range.
    pub fn new(
        bank_name: &str,
        country: &str,
        redirect_url: &str,
        state: String,
        now: DateTime<Utc>,
        valid_minutes: i64,
    ) -> Result<Self, AppError> {
        Ok(Self {
            aspsp: Aspsp {
                name: bank_name.trim().to_string(),
                country: country.trim().to_uppercase(),
            },
            redirect_url: redirect_url.trim().to_string(),
            valid_until: valid_until(now, valid_minutes)?,
            state,
            psu_type: None,
        })
    }

    pub fn with_psu_type(mut self, psu_type: Option<PsuType>) -> Self {
        self.psu_type = psu_type;
        self
    }
}

/// Reply to `POST /auth`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthorizationResponse {
    /// Bank page where the PSU grants consent
    pub url: String,
    #[serde(default)]
    pub authorization_id: Option<String>,
}

/// Reply to `POST /sessions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
