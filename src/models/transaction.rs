// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transaction listing payloads.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

/// Date window for a transaction listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionQuery {
    pub date_from: NaiveDate,
    pub date_to: Option<NaiveDate>,
}

impl TransactionQuery {
    pub fn new(date_from: NaiveDate, date_to: Option<NaiveDate>) -> Self {
        Self { date_from, date_to }
    }

    /// Query parameters for the first page.
    pub fn first_page_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("date_from", self.date_from.format("%Y-%m-%d").to_string())];
        if let Some(date_to) = self.date_to {
            params.push(("date_to", date_to.format("%Y-%m-%d").to_string()));
        }
        params
    }
}

/// One page of `GET /accounts/{uid}/transactions`.
///
/// Transactions are kept as raw JSON; the bank's schema varies per ASPSP.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionsPage {
    #[serde(default)]
    pub transactions: Option<Vec<Value>>,
    /// Some deployments return the list under `items`
    #[serde(default)]
    pub items: Option<Vec<Value>>,
    #[serde(default)]
    pub continuation_key: Option<String>,
}

impl TransactionsPage {
    /// Key for the next page, if any.
    pub fn next_key(&self) -> Option<&str> {
        self.continuation_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Items from `transactions`, falling back to `items` when that is empty.
    pub fn into_items(self) -> Vec<Value> {
        match self.transactions {
            Some(list) if !list.is_empty() => list,
            _ => self.items.unwrap_or_default(),
        }
    }
}
