// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! RS256 application JWTs for the Enable Banking API.
//!
//! Every API call is authenticated with a short-lived token signed by the
//! application's private key. The key ID (`kid`) is the application ID.

use crate::error::AppError;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fixed issuer expected by the API.
pub const ISSUER: &str = "enablebanking.com";

/// Audience used when the API base URL has no usable host.
pub const DEFAULT_AUDIENCE: &str = "api.enablebanking.com";

/// Token lifetime (5 minutes).
pub const TOKEN_LIFETIME_SECS: i64 = 5 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Signs application JWTs with a key loaded once at startup.
#[derive(Clone)]
pub struct JwtSigner {
    app_id: String,
    audience: String,
    key: EncodingKey,
}

impl std::fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSigner")
            .field("app_id", &self.app_id)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl JwtSigner {
    /// Build a signer from PEM-encoded RSA key material (PKCS#1 or PKCS#8).
    pub fn from_pem(app_id: &str, pem: &[u8], audience: &str) -> Result<Self, AppError> {
        let key = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| AppError::PrivateKey(format!("invalid RSA key: {}", e)))?;

        Ok(Self {
            app_id: app_id.to_string(),
            audience: audience.to_string(),
            key,
        })
    }

    /// Read the private key from disk and build a signer.
    pub fn from_pem_file(app_id: &str, path: &Path, audience: &str) -> Result<Self, AppError> {
        let pem = std::fs::read(path)
            .map_err(|e| AppError::PrivateKey(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), audience, "Loaded application private key");
        Self::from_pem(app_id, &pem, audience)
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Mint a fresh token valid for [`TOKEN_LIFETIME_SECS`].
    pub fn sign(&self) -> Result<String, AppError> {
        self.sign_at(Utc::now().timestamp())
    }

    /// Mint a token issued at `now` (Unix seconds).
    pub fn sign_at(&self, now: i64) -> Result<String, AppError> {
        let claims = Claims {
            iss: ISSUER.to_string(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.app_id.clone());

        Ok(encode(&header, &claims, &self.key)?)
    }
}

/// Derive the JWT audience from the API base URL (`host[:port]`).
pub fn audience_from_api_base(api_base: &str) -> String {
    let Ok(url) = reqwest::Url::parse(api_base) else {
        return DEFAULT_AUDIENCE.to_string();
    };

    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => DEFAULT_AUDIENCE.to_string(),
    }
}
