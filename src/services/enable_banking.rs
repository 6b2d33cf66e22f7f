// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Enable Banking API client (read-only).
//!
//! Handles:
//! - Consent start (`POST /auth`) and code exchange (`POST /sessions`)
//! - Balance reads
//! - Transaction listing with continuation-key pagination
//!
//! Errors are surfaced verbatim. There is no retry: the first non-200 reply
//! ends the operation.

use crate::error::AppError;
use crate::models::{
    AuthorizationRequest, AuthorizationResponse, SessionResponse, TransactionQuery,
    TransactionsPage,
};
use crate::services::jwt::JwtSigner;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// Header carrying the session ID on account requests.
pub const SESSION_HEADER: &str = "X-EnableBanking-Session";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Enable Banking API client.
#[derive(Clone, Debug)]
pub struct BankClient {
    http: reqwest::Client,
    base_url: String,
    signer: JwtSigner,
}

impl BankClient {
    /// Create a client for `base_url` (no trailing slash).
    pub fn new(base_url: &str, signer: JwtSigner) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a consent: returns the bank URL the PSU must visit.
    pub async fn start_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationResponse, AppError> {
        /// `url` is checked separately so its absence is reported by name.
        #[derive(Deserialize)]
        struct RawAuthorization {
            #[serde(default)]
            url: Option<String>,
            #[serde(default)]
            authorization_id: Option<String>,
        }

        let path = "/auth";
        let builder = self.request(Method::POST, path, None)?.json(request);
        let raw: RawAuthorization = self.execute(Method::POST, path, builder).await?;

        let url = raw
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::MissingField {
                path: path.to_string(),
                field: "url",
            })?;

        tracing::info!(
            aspsp = %request.aspsp.name,
            country = %request.aspsp.country,
            "Consent started"
        );

        Ok(AuthorizationResponse {
            url,
            authorization_id: raw.authorization_id,
        })
    }

    /// Exchange the authorization code for a session and its accounts.
    pub async fn create_session(&self, code: &str) -> Result<SessionResponse, AppError> {
        let path = "/sessions";
        let body = serde_json::json!({ "code": code });
        let builder = self.request(Method::POST, path, None)?.json(&body);
        let session: SessionResponse = self.execute(Method::POST, path, builder).await?;

        tracing::info!(accounts = session.accounts.len(), "Session created");
        Ok(session)
    }

    /// Read the balances of one account (raw JSON).
    pub async fn balances(&self, uid: &str, session_id: Option<&str>) -> Result<Value, AppError> {
        let path = format!("/accounts/{}/balances", urlencoding::encode(uid));
        let builder = self.request(Method::GET, &path, session_id)?;
        self.execute(Method::GET, &path, builder).await
    }

    /// Fetch one page of transactions.
    ///
    /// The first page is selected by the date window; later pages only by
    /// the continuation key.
    pub async fn transactions_page(
        &self,
        uid: &str,
        query: &TransactionQuery,
        continuation_key: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<TransactionsPage, AppError> {
        let path = transactions_path(uid);
        let params = match continuation_key {
            Some(key) => vec![("continuation_key", key.to_string())],
            None => query.first_page_params(),
        };

        let builder = self.request(Method::GET, &path, session_id)?.query(&params);
        self.execute(Method::GET, &path, builder).await
    }

    /// Fetch every transaction in the window by draining all pages.
    pub async fn all_transactions(
        &self,
        uid: &str,
        query: &TransactionQuery,
        session_id: Option<&str>,
    ) -> Result<Vec<Value>, AppError> {
        let mut all = Vec::new();
        let mut continuation_key: Option<String> = None;
        let mut seen_keys = HashSet::new();
        let mut pages = 0u32;

        loop {
            let page = self
                .transactions_page(uid, query, continuation_key.as_deref(), session_id)
                .await?;
            pages += 1;

            let next = page.next_key().map(str::to_string);
            let items = page.into_items();
            tracing::debug!(uid, page = pages, count = items.len(), "Fetched transactions page");
            all.extend(items);

            match next {
                Some(key) => {
                    // A key seen before would loop forever
                    if !seen_keys.insert(key.clone()) {
                        tracing::warn!(uid, key = %key, pages, "Continuation key repeated");
                        return Err(AppError::RepeatedContinuationKey {
                            path: transactions_path(uid),
                            key,
                        });
                    }
                    continuation_key = Some(key);
                }
                None => break,
            }
        }

        tracing::info!(uid, pages, total = all.len(), "Fetched all transactions");
        Ok(all)
    }

    /// Start a request with a freshly signed JWT and the standard headers.
    fn request(
        &self,
        method: Method,
        path: &str,
        session_id: Option<&str>,
    ) -> Result<reqwest::RequestBuilder, AppError> {
        let token = self.signer.sign()?;
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        if let Some(sid) = session_id.filter(|s| !s.is_empty()) {
            builder = builder.header(SESSION_HEADER, sid);
        }

        Ok(builder)
    }

    /// Send the request and decode a 200 JSON reply.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        tracing::debug!(method = %method, path, "Calling bank API");

        let response = builder.send().await.map_err(|e| AppError::Network {
            method: method.to_string(),
            url: format!("{}{}", self.base_url, path),
            reason: e.to_string(),
        })?;

        check_response_json(path, response).await
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    let body = response.text().await.map_err(|e| AppError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    if status != StatusCode::OK {
        tracing::warn!(path, status = status.as_u16(), "Bank API returned an error");
        return Err(AppError::BankApi {
            path: path.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| AppError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn transactions_path(uid: &str) -> String {
    format!("/accounts/{}/transactions", urlencoding::encode(uid))
}

