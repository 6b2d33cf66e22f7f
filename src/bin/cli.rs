// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! enable-budget command-line client.
//!
//! Read-only access to balances and transactions through the Enable Banking
//! API. Credentials come from `ENABLE_APP_ID` and `ENABLE_PRIVATE_KEY_PATH`.

use clap::{CommandFactory, Parser};
use enable_budget::commands::{report_error, run, Cli};
use enable_budget::config::Config;
use enable_budget::logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };

    let mut config = match Config::from_env() {
        Ok(config) => config.with_api_base(cli.api_base.as_deref()),
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = cli.state_file {
        config.state_path = path;
    }

    let mut stdout = std::io::stdout().lock();
    match run(command, &config, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            let _ = report_error(&err, &mut std::io::stderr());
            ExitCode::FAILURE
        }
    }
}
