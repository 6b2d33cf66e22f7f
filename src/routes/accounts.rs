// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account pages: list, balances, transactions and CSV download.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use super::flash_redirect;
use crate::error::Result;
use crate::export::{csv_filename, transactions_to_csv, Table};
use crate::middleware::BrowserSession;
use crate::models::TransactionQuery;
use crate::services::FlashLevel;
use crate::time_utils::{days_ago, parse_date};
use crate::views;
use crate::AppState;

/// Default transaction window when no `date_from` is given.
pub const DEFAULT_WINDOW_DAYS: i64 = 90;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/balances/{uid}", get(balances))
        .route("/transactions/{uid}", get(transactions))
        .route("/transactions/{uid}/csv", get(transactions_csv))
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionsParams {
    #[serde(default)]
    date_from: Option<String>,
    #[serde(default)]
    date_to: Option<String>,
}

impl TransactionsParams {
    /// Empty form fields count as absent.
    fn to_query(&self) -> Result<TransactionQuery> {
        let date_from = match non_blank(&self.date_from) {
            Some(raw) => parse_date("date_from", raw)?,
            None => days_ago(Utc::now(), DEFAULT_WINDOW_DAYS),
        };
        let date_to = non_blank(&self.date_to)
            .map(|raw| parse_date("date_to", raw))
            .transpose()?;

        Ok(TransactionQuery::new(date_from, date_to))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<BrowserSession>,
) -> Response {
    let accounts = state
        .sessions
        .get(&session.id)
        .map(|s| s.accounts)
        .unwrap_or_default();

    if accounts.is_empty() {
        return flash_redirect(
            &state,
            &session,
            FlashLevel::Error,
            "No accounts in session. Start a consent first.",
            "/",
        )
        .into_response();
    }

    let flashes = state.sessions.take_flashes(&session.id);
    Html(views::accounts_page(&accounts, &flashes)).into_response()
}

async fn balances(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<BrowserSession>,
    Path(uid): Path<String>,
) -> Response {
    let session_id = bank_session_id(&state, &session);

    match state.bank.balances(&uid, session_id.as_deref()).await {
        Ok(data) => {
            let flashes = state.sessions.take_flashes(&session.id);
            Html(views::balances_page(&uid, &data, &flashes)).into_response()
        }
        Err(err) => {
            tracing::warn!(uid = %uid, error = %err, "Balance read failed");
            flash_redirect(&state, &session, FlashLevel::Error, err.to_string(), "/accounts")
                .into_response()
        }
    }
}

async fn transactions(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<BrowserSession>,
    Path(uid): Path<String>,
    Query(params): Query<TransactionsParams>,
) -> Response {
    let result = fetch_transactions(&state, &session, &uid, &params).await;

    match result {
        Ok((query, all)) => {
            let table = Table::from_transactions(&all);
            let flashes = state.sessions.take_flashes(&session.id);
            Html(views::transactions_page(&uid, &query, &table, &flashes)).into_response()
        }
        Err(err) => {
            tracing::warn!(uid = %uid, error = %err, "Transaction read failed");
            flash_redirect(&state, &session, FlashLevel::Error, err.to_string(), "/accounts")
                .into_response()
        }
    }
}

async fn transactions_csv(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<BrowserSession>,
    Path(uid): Path<String>,
    Query(params): Query<TransactionsParams>,
) -> Response {
    let result = fetch_transactions(&state, &session, &uid, &params)
        .await
        .and_then(|(query, all)| Ok((query, transactions_to_csv(&all)?)));

    match result {
        Ok((query, csv)) => {
            let disposition = format!(
                "attachment; filename=\"{}\"",
                csv_filename(&uid, query.date_from)
            );
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                csv,
            )
                .into_response()
        }
        Err(err) => {
            tracing::warn!(uid = %uid, error = %err, "CSV export failed");
            flash_redirect(&state, &session, FlashLevel::Error, err.to_string(), "/accounts")
                .into_response()
        }
    }
}

async fn fetch_transactions(
    state: &AppState,
    session: &BrowserSession,
    uid: &str,
    params: &TransactionsParams,
) -> Result<(TransactionQuery, Vec<serde_json::Value>)> {
    let query = params.to_query()?;
    let session_id = bank_session_id(state, session);
    let all = state
        .bank
        .all_transactions(uid, &query, session_id.as_deref())
        .await?;
    Ok((query, all))
}

fn bank_session_id(state: &AppState, session: &BrowserSession) -> Option<String> {
    state.sessions.get(&session.id).and_then(|s| s.session_id)
}
