// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (browser sessions, security headers).

pub mod security;
pub mod session;

pub use session::{load_session, BrowserSession, SESSION_COOKIE};
