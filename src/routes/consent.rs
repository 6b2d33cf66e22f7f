// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Consent flow: start page, `/auth` redirect, bank callback and logout.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use validator::Validate;

use super::flash_redirect;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::BrowserSession;
use crate::models::AuthorizationRequest;
use crate::services::{random_token, FlashLevel};
use crate::views;
use crate::AppState;

/// Consent validity requested by the web front end.
pub const CONSENT_VALID_MINUTES: i64 = 15;

const DEFAULT_COUNTRY: &str = "BE";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/start", post(start))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
}

/// Raw consent form fields as posted by the browser.
#[derive(Debug, Deserialize)]
pub struct StartForm {
    #[serde(default)]
    bank_name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    redirect_url: String,
}

/// Consent form after trimming and defaults.
#[derive(Debug, Validate)]
struct ConsentForm {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    bank_name: String,
    #[validate(length(equal = 2, message = "must be a two-letter country code"))]
    country: String,
    #[validate(url(message = "must be an absolute URL"))]
    redirect_url: String,
}

impl StartForm {
    fn normalize(self, default_redirect: &str) -> ConsentForm {
        let country = match self.country.trim() {
            "" => DEFAULT_COUNTRY.to_string(),
            other => other.to_uppercase(),
        };
        let redirect_url = match self.redirect_url.trim() {
            "" => default_redirect.to_string(),
            other => other.to_string(),
        };

        ConsentForm {
            bank_name: self.bank_name.trim().to_string(),
            country,
            redirect_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Callback URL offered as the default redirect.
///
/// Uses `PUBLIC_URL` when set, else the request's Host header.
pub fn callback_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(base) = &config.public_url {
        return format!("{}/callback", base);
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{}", config.port));
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .filter(|p| *p == "https")
        .unwrap_or("http");

    format!("{}://{}/callback", scheme, host)
}

/// Home page with the consent form.
async fn index(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<BrowserSession>,
    headers: HeaderMap,
) -> Html<String> {
    let flashes = state.sessions.take_flashes(&session.id);
    Html(views::index_page(
        &callback_url(&state.config, &headers),
        &flashes,
    ))
}

/// Post the consent request to `/auth` and send the browser to the bank.
async fn start(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<BrowserSession>,
    headers: HeaderMap,
    Form(form): Form<StartForm>,
) -> Result<Redirect> {
    if form.bank_name.trim().is_empty() {
        return Ok(flash_redirect(
            &state,
            &session,
            FlashLevel::Error,
            "Please enter the bank name (aspsp.name).",
            "/",
        ));
    }

    let form = form.normalize(&callback_url(&state.config, &headers));
    if let Err(errors) = form.validate() {
        return Ok(flash_redirect(
            &state,
            &session,
            FlashLevel::Error,
            format!("Invalid form: {}", errors),
            "/",
        ));
    }

    let consent_state = random_token()?;
    let request = AuthorizationRequest::new(
        &form.bank_name,
        &form.country,
        &form.redirect_url,
        consent_state.clone(),
        Utc::now(),
        CONSENT_VALID_MINUTES,
    )?;

    match state.bank.start_authorization(&request).await {
        Ok(auth) => {
            state
                .sessions
                .update(&session.id, |s| s.consent_state = Some(consent_state));
            Ok(Redirect::to(&auth.url))
        }
        Err(err) => {
            tracing::warn!(error = %err, "Consent start failed");
            Ok(flash_redirect(
                &state,
                &session,
                FlashLevel::Error,
                start_error_message(&err),
                "/",
            ))
        }
    }
}

fn start_error_message(err: &AppError) -> String {
    match err {
        AppError::BankApi { status: 422, .. } => {
            format!("{}\n\n{}", AppError::UNPROCESSABLE_HINT, err)
        }
        AppError::BankApi { .. } | AppError::MissingField { .. } => err.to_string(),
        other => format!("Local error: {}", other),
    }
}

/// Bank redirect target: exchange the code for a session.
async fn callback(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<BrowserSession>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
        let description = params.error_description.as_deref().unwrap_or_default();
        let message = format!("The bank returned an error: {} {}", error, description);
        return flash_redirect(&state, &session, FlashLevel::Error, message.trim_end(), "/")
            .into_response();
    }

    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        return flash_redirect(
            &state,
            &session,
            FlashLevel::Error,
            "Missing 'code' parameter in the redirect URL.",
            "/",
        )
        .into_response();
    };

    // The pending state is single use
    let mut expected = None;
    state
        .sessions
        .update(&session.id, |s| expected = s.consent_state.take());

    let state_matches = match (expected.as_deref(), params.state.as_deref()) {
        (Some(expected), Some(got)) => bool::from(expected.as_bytes().ct_eq(got.as_bytes())),
        _ => false,
    };
    if !state_matches {
        tracing::warn!("Consent callback with unknown or mismatched state");
        return flash_redirect(
            &state,
            &session,
            FlashLevel::Error,
            "Consent state mismatch. Please start again.",
            "/",
        )
        .into_response();
    }

    match state.bank.create_session(code).await {
        Ok(bank_session) => {
            let count = bank_session.accounts.len();
            state.sessions.update(&session.id, |s| {
                s.session_id = bank_session.session_id;
                s.accounts = bank_session.accounts;
            });
            flash_redirect(
                &state,
                &session,
                FlashLevel::Success,
                format!("Consent granted. {} account(s) available.", count),
                "/accounts",
            )
            .into_response()
        }
        Err(err) => {
            tracing::warn!(error = %err, "Code exchange failed");
            flash_redirect(&state, &session, FlashLevel::Error, err.to_string(), "/")
                .into_response()
        }
    }
}

/// Forget the bank session.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<BrowserSession>,
) -> Redirect {
    state.sessions.clear(&session.id);
    flash_redirect(&state, &session, FlashLevel::Success, "Signed out.", "/")
}
