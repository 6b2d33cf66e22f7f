// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracing subscriber setup for both binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Structured JSON logging for the web server.
pub fn init_json(debug: bool) {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let crate_level = if debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(filter(&format!("enable_budget={}", crate_level), "info"))
        .with(format)
        .init();
}

/// Compact logging on stderr for the CLI; stdout carries command output.
pub fn init_cli(verbose: bool) {
    let crate_level = if verbose { "debug" } else { "warn" };

    tracing_subscriber::registry()
        .with(filter(&format!("enable_budget={}", crate_level), "warn"))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// `RUST_LOG` wins; otherwise fall back to the given directives.
fn filter(crate_directive: &str, default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{}", default_level, crate_directive)))
}
