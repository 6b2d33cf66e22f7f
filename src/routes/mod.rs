// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod accounts;
pub mod consent;

use crate::middleware::{load_session, BrowserSession};
use crate::services::FlashLevel;
use crate::AppState;
use axum::response::Redirect;
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Pages share the browser session; /health does not create one
    let pages = Router::new()
        .merge(consent::routes())
        .merge(accounts::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), load_session));

    Router::new()
        .route("/health", get(health_check))
        .merge(pages)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Queue a flash message for the next page and redirect (303).
pub(crate) fn flash_redirect(
    state: &AppState,
    session: &BrowserSession,
    level: FlashLevel,
    message: impl Into<String>,
    to: &str,
) -> Redirect {
    state.sessions.flash(&session.id, level, message);
    Redirect::to(to)
}
