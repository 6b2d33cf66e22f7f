// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account model as returned by `/sessions`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An account granted by the consent.
///
/// Only the fields used for display are typed; everything else the bank sends
/// is kept in `extra` so the cached JSON round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account UID used in `/accounts/{uid}/...` paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masked_pan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Nested account identification (`account_id.iban`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Account {
    /// UID or `-` when the bank omitted it.
    pub fn uid_or_dash(&self) -> &str {
        first_present(&[self.uid.as_deref()])
    }

    /// Human label: name, then nickname, then product.
    pub fn display_name(&self) -> &str {
        first_present(&[
            self.name.as_deref(),
            self.nickname.as_deref(),
            self.product.as_deref(),
        ])
    }

    /// IBAN (top level or under `account_id`), else the masked card number.
    pub fn identifier(&self) -> &str {
        first_present(&[
            self.iban.as_deref(),
            self.account_id.as_ref().and_then(|id| id.iban.as_deref()),
            self.masked_pan.as_deref(),
        ])
    }

    pub fn currency_or_dash(&self) -> &str {
        first_present(&[self.currency.as_deref()])
    }
}

fn first_present<'a>(candidates: &[Option<&'a str>]) -> &'a str {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|s| !s.is_empty())
        .unwrap_or("-")
}
