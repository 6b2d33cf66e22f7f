// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - bank API access and browser sessions.

pub mod enable_banking;
pub mod jwt;
pub mod session_store;

pub use enable_banking::{BankClient, SESSION_HEADER};
pub use jwt::JwtSigner;
pub use session_store::{random_token, Flash, FlashLevel, SessionStore, WebSession};
