// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! enable-budget: read-only client for the Enable Banking aggregation API.
//!
//! This crate signs RS256 application JWTs, drives the consent handshake
//! (`/auth` then `/sessions`), and reads balances and transactions. It backs
//! both the `enable-budget` command-line tool and the `enable-budget-web`
//! front end.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod views;

use config::Config;
use services::{BankClient, SessionStore};

/// Shared application state for the web front end.
pub struct AppState {
    pub config: Config,
    pub bank: BankClient,
    pub sessions: SessionStore,
}
