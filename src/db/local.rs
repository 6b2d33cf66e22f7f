// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local JSON state file used by the CLI.
//!
//! Remembers the session and accounts returned by `/sessions` so they do not
//! have to be typed again. Unknown keys in the file are preserved.

use crate::error::AppError;
use crate::models::{Account, SessionResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Cached session data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// When `/sessions` last succeeded (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LocalState {
    /// Merge a fresh `/sessions` reply over the cached state.
    pub fn record_session(&mut self, session: &SessionResponse, now: DateTime<Utc>) {
        self.session_id = session.session_id.clone();
        self.accounts = session.accounts.clone();
        self.updated_at = Some(now.to_rfc3339());
    }
}

/// File-backed [`LocalState`] store.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    path: PathBuf,
}

impl LocalStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state; a missing file is an empty state.
    pub fn load(&self) -> Result<LocalState, AppError> {
        if !self.path.exists() {
            return Ok(LocalState::default());
        }

        let raw = std::fs::read_to_string(&self.path).map_err(|e| self.error(e))?;
        serde_json::from_str(&raw).map_err(|e| self.error(e))
    }

    /// Write the state as pretty-printed JSON.
    pub fn save(&self, state: &LocalState) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(state).map_err(|e| self.error(e))?;
        std::fs::write(&self.path, json).map_err(|e| self.error(e))?;

        tracing::debug!(path = %self.path.display(), "Local state saved");
        Ok(())
    }

    fn error(&self, reason: impl std::fmt::Display) -> AppError {
        AppError::LocalState {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
