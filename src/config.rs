// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The application credentials are optional at load time so that commands
//! which never talk to the bank (such as listing cached accounts) work
//! without a private key. They are checked when a signer is built.

use crate::error::AppError;
use crate::services::jwt::{audience_from_api_base, JwtSigner};
use ring::rand::{SecureRandom, SystemRandom};
use std::env;
use std::path::PathBuf;

/// Production API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.enablebanking.com";

/// Where the CLI caches the accounts returned by `/sessions`.
pub const DEFAULT_STATE_PATH: &str = ".enable_budget_local.json";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

const SESSION_KEY_LEN: usize = 32;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable Banking application ID (UUID), sent as the JWT `kid`
    pub app_id: Option<String>,
    /// Path to the application's RSA private key (.pem)
    pub private_key_path: Option<PathBuf>,
    /// API base URL without trailing slash
    pub api_base: String,
    /// Local JSON cache used by the CLI
    pub state_path: PathBuf,
    /// Web listen address
    pub host: String,
    /// Web listen port
    pub port: u16,
    /// Externally visible base URL of the web front end, if behind a proxy
    pub public_url: Option<String>,
    /// HMAC key for browser session cookies (raw bytes)
    pub session_key: Option<Vec<u8>>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            app_id: Some("00000000-0000-0000-0000-000000000000".to_string()),
            private_key_path: None,
            api_base: DEFAULT_API_BASE.to_string(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            public_url: None,
            session_key: Some(b"test_session_key_32_bytes_long!!".to_vec()),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            app_id: non_empty_var("ENABLE_APP_ID"),
            private_key_path: non_empty_var("ENABLE_PRIVATE_KEY_PATH").map(PathBuf::from),
            api_base: normalize_api_base(
                &env::var("ENABLE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            ),
            state_path: non_empty_var("ENABLE_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
            host: non_empty_var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: match non_empty_var("PORT") {
                Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    name: "PORT",
                    reason: format!("'{}' is not a port number", raw),
                })?,
                None => DEFAULT_PORT,
            },
            public_url: non_empty_var("PUBLIC_URL").map(|url| url.trim_end_matches('/').to_string()),
            session_key: non_empty_var("WEB_SECRET_KEY").map(String::into_bytes),
        })
    }

    /// Session key for the web front end, random if none was configured.
    pub fn session_key_or_random(&self) -> Result<Vec<u8>, ConfigError> {
        match &self.session_key {
            Some(key) => Ok(key.clone()),
            None => random_key(),
        }
    }

    /// Replace the API base URL (command-line override).
    pub fn with_api_base(mut self, api_base: Option<&str>) -> Self {
        if let Some(base) = api_base {
            self.api_base = normalize_api_base(base);
        }
        self
    }

    /// Build the request signer from the configured credentials.
    ///
    /// The audience is derived from the API base host.
    pub fn signer(&self) -> Result<JwtSigner, AppError> {
        let app_id = self
            .app_id
            .as_deref()
            .ok_or(ConfigError::Missing("ENABLE_APP_ID"))?;
        let key_path = self
            .private_key_path
            .as_deref()
            .ok_or(ConfigError::Missing("ENABLE_PRIVATE_KEY_PATH"))?;

        JwtSigner::from_pem_file(app_id, key_path, &audience_from_api_base(&self.api_base))
    }
}

/// Strip whitespace and trailing slashes so paths can be appended directly.
pub fn normalize_api_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Sessions signed with a random key do not survive a restart.
fn random_key() -> Result<Vec<u8>, ConfigError> {
    let mut key = vec![0u8; SESSION_KEY_LEN];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| ConfigError::Invalid {
            name: "WEB_SECRET_KEY",
            reason: "system random generator unavailable".to_string(),
        })?;
    tracing::warn!("WEB_SECRET_KEY not set, using an ephemeral session key");
    Ok(key)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
