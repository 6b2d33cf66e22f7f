// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! enable-budget web front end.
//!
//! Walks a browser through the bank consent and shows the granted accounts,
//! their balances and transactions, with CSV export.

use clap::Parser;
use enable_budget::{
    config::Config,
    services::{BankClient, SessionStore},
    AppState,
};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "enable-budget-web", version, about = "enable-budget web front end")]
struct Args {
    #[arg(long, help = "Listen address (HOST)")]
    host: Option<String>,
    #[arg(long, help = "Listen port (PORT)")]
    port: Option<u16>,
    #[arg(long, help = "Override the API base URL (ENABLE_API_BASE)")]
    api_base: Option<String>,
    #[arg(long, help = "Debug logging")]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize structured JSON logging
    enable_budget::logging::init_json(args.debug);

    // Load configuration from environment, flags win
    let mut config = Config::from_env()?.with_api_base(args.api_base.as_deref());
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    tracing::info!(port = config.port, api_base = %config.api_base, "Starting enable-budget web");

    // Credentials are checked before the listener opens
    let signer = config.signer()?;
    tracing::info!(app_id = %signer.app_id(), audience = %signer.audience(), "JWT signer ready");

    let bank = BankClient::new(&config.api_base, signer)?;
    let sessions = SessionStore::new(config.session_key_or_random()?);

    let addr = format!("{}:{}", config.host, config.port);

    // Build shared state
    let state = Arc::new(AppState {
        config,
        bank,
        sessions,
    });

    // Build router
    let app = enable_budget::routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
