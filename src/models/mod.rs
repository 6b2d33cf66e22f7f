// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the bank API payloads and local state.

pub mod account;
pub mod auth;
pub mod transaction;

pub use account::{Account, AccountId};
pub use auth::{Aspsp, AuthorizationRequest, AuthorizationResponse, PsuType, SessionResponse};
pub use transaction::{TransactionQuery, TransactionsPage};
