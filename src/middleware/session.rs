// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Browser session middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Name of the signed session cookie.
pub const SESSION_COOKIE: &str = "enable_budget_session";

/// Session of the current browser, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct BrowserSession {
    pub id: String,
}

/// Attach a [`BrowserSession`] to every page request.
///
/// A missing, forged or expired cookie starts a new session and sets a fresh
/// cookie on the response.
pub async fn load_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let existing = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| state.sessions.verify(cookie.value()));

    let (id, is_new) = match existing {
        Some(id) => (id, false),
        None => (state.sessions.create()?, true),
    };

    request
        .extensions_mut()
        .insert(BrowserSession { id: id.clone() });

    let mut response = next.run(request).await;

    if is_new {
        let secure = state
            .config
            .public_url
            .as_deref()
            .is_some_and(|url| url.starts_with("https://"));

        let cookie = Cookie::build((SESSION_COOKIE, state.sessions.sign(&id)?))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .build();

        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid cookie header: {}", e)))?;
        response.headers_mut().append(header::SET_COOKIE, value);
    }

    Ok(response)
}
