// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Command-line interface: argument definitions and command handlers.
//!
//! Handlers write to any `io::Write` so they can be exercised in tests.

use crate::config::Config;
use crate::db::LocalStateStore;
use crate::error::{AppError, Result};
use crate::export::transactions_to_csv;
use crate::models::{Account, AuthorizationRequest, PsuType, TransactionQuery};
use crate::services::{random_token, BankClient};
use crate::time_utils::parse_date;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Default consent lifetime for `auth-url`.
pub const DEFAULT_VALID_MINUTES: i64 = 15;

/// Longest consent lifetime accepted by `auth-url` (one year).
pub const MAX_VALID_MINUTES: i64 = 525_600;

#[derive(Parser, Debug)]
#[command(
    name = "enable-budget",
    version,
    about = "enable-budget CLI (read-only: balances & transactions)"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Override the API base URL (ENABLE_API_BASE)")]
    pub api_base: Option<String>,
    #[arg(long, global = true, help = "Local state file (ENABLE_STATE_PATH)")]
    pub state_file: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Log debug output to stderr")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a consent and print the bank authorization URL
    AuthUrl(AuthUrlArgs),
    /// Exchange the authorization code for a session and list its accounts
    ExchangeCode {
        #[arg(long, help = "Authorization code (UUID) from the redirect URL")]
        code: String,
    },
    /// List the accounts remembered from the last session
    ListAccounts,
    /// Read the balances of an account
    Balances {
        #[arg(long, help = "Account UID")]
        account_uid: String,
    },
    /// Read the transactions of an account (pagination is automatic)
    Transactions(TransactionsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AuthUrlArgs {
    #[arg(long, help = "Bank name (aspsp.name)")]
    pub bank_name: String,
    #[arg(long, help = "Bank country (aspsp.country), e.g. BE")]
    pub country: String,
    #[arg(
        long,
        help = "Whitelisted redirect URL (https or custom scheme). For testing: https://httpbin.org/anything"
    )]
    pub redirect_url: String,
    #[arg(long, default_value_t = DEFAULT_VALID_MINUTES, value_parser = clap::value_parser!(i64).range(1..=MAX_VALID_MINUTES), help = "Consent validity in minutes")]
    pub valid_minutes: i64,
    #[arg(long, value_enum, help = "PSU type")]
    pub psu_type: Option<PsuType>,
}

#[derive(Args, Debug, Clone)]
pub struct TransactionsArgs {
    #[arg(long, help = "Account UID")]
    pub account_uid: String,
    #[arg(long, value_parser = parse_cli_date, help = "YYYY-MM-DD")]
    pub date_from: NaiveDate,
    #[arg(long, value_parser = parse_cli_date, help = "YYYY-MM-DD (optional upper bound)")]
    pub date_to: Option<NaiveDate>,
    #[arg(long, help = "Write a flattened CSV to this file instead of printing JSON")]
    pub csv: Option<PathBuf>,
}

fn parse_cli_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    parse_date("date", raw).map_err(|e| e.to_string())
}

/// Dispatch a command. Only `list-accounts` works without credentials.
pub async fn run<W: Write>(command: Commands, config: &Config, out: &mut W) -> Result<()> {
    let store = LocalStateStore::new(&config.state_path);

    if let Commands::ListAccounts = command {
        return list_accounts(&store, out);
    }

    let client = BankClient::new(&config.api_base, config.signer()?)?;

    match command {
        Commands::AuthUrl(args) => auth_url(&client, &args, Utc::now(), out).await,
        Commands::ExchangeCode { code } => {
            exchange_code(&client, &store, &code, Utc::now(), out).await
        }
        Commands::Balances { account_uid } => balances(&client, &account_uid, out).await,
        Commands::Transactions(args) => transactions(&client, &args, out).await,
        Commands::ListAccounts => list_accounts(&store, out),
    }
}

/// `POST /auth` and print the consent URL.
pub async fn auth_url<W: Write>(
    client: &BankClient,
    args: &AuthUrlArgs,
    now: DateTime<Utc>,
    out: &mut W,
) -> Result<()> {
    let request = AuthorizationRequest::new(
        &args.bank_name,
        &args.country,
        &args.redirect_url,
        random_token()?,
        now,
        args.valid_minutes,
    )?
    .with_psu_type(args.psu_type);

    let response = client.start_authorization(&request).await?;

    writeln!(out, "\nOpen this link in a browser to grant consent:\n")?;
    writeln!(out, "{}", response.url)?;
    writeln!(
        out,
        "\nWhen done, copy the ?code=... parameter from the redirect URL.\n"
    )?;
    Ok(())
}

/// `POST /sessions`, remember the result and list the accounts.
pub async fn exchange_code<W: Write>(
    client: &BankClient,
    store: &LocalStateStore,
    code: &str,
    now: DateTime<Utc>,
    out: &mut W,
) -> Result<()> {
    let session = client.create_session(code).await?;

    let mut state = store.load()?;
    state.record_session(&session, now);
    store.save(&state)?;

    writeln!(out, "\nSession created. Available accounts:\n")?;
    for (idx, account) in session.accounts.iter().enumerate() {
        writeln!(
            out,
            "{:02}. uid={} | name={} | iban/pan={}",
            idx + 1,
            account.uid_or_dash(),
            account.display_name(),
            account.identifier()
        )?;
    }
    writeln!(
        out,
        "\nTip: use --account-uid <uid> for balances/transactions.\n"
    )?;
    Ok(())
}

/// Print the accounts cached by `exchange-code`.
pub fn list_accounts<W: Write>(store: &LocalStateStore, out: &mut W) -> Result<()> {
    let state = store.load()?;
    if state.accounts.is_empty() {
        return Err(AppError::BadRequest(
            "No accounts remembered. Run first: exchange-code --code ...".to_string(),
        ));
    }

    writeln!(out, "\nRemembered accounts:\n")?;
    for (idx, account) in state.accounts.iter().enumerate() {
        writeln!(out, "{}", account_line(idx, account))?;
    }
    Ok(())
}

fn account_line(idx: usize, account: &Account) -> String {
    format!(
        "{:02}. uid={} | {} | {} | {}",
        idx + 1,
        account.uid_or_dash(),
        account.display_name(),
        account.identifier(),
        account.currency_or_dash()
    )
}

/// `GET /accounts/{uid}/balances` printed as JSON.
pub async fn balances<W: Write>(client: &BankClient, uid: &str, out: &mut W) -> Result<()> {
    let data = client.balances(uid, None).await?;

    writeln!(out, "\nBalances:\n")?;
    print_json(out, &data)
}

/// Drain `GET /accounts/{uid}/transactions` and print or export.
pub async fn transactions<W: Write>(
    client: &BankClient,
    args: &TransactionsArgs,
    out: &mut W,
) -> Result<()> {
    let query = TransactionQuery::new(args.date_from, args.date_to);
    let all = client.all_transactions(&args.account_uid, &query, None).await?;

    if let Some(path) = &args.csv {
        let csv = transactions_to_csv(&all)?;
        std::fs::write(path, csv).map_err(|e| AppError::LocalState {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        writeln!(
            out,
            "Wrote {} transactions since {} to {}",
            all.len(),
            args.date_from,
            path.display()
        )?;
        return Ok(());
    }

    writeln!(
        out,
        "\nTransactions since {} (total: {}):\n",
        args.date_from,
        all.len()
    )?;
    print_json(out, &all)
}

fn print_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| AppError::Internal(e.into()))?;
    writeln!(out, "{}", text)?;
    Ok(())
}

/// Print an error the way the CLI reports it.
///
/// A 422 from `/auth` shows the raw body and a checklist instead of the
/// one-line message.
pub fn report_error<W: Write>(err: &AppError, stderr: &mut W) -> std::io::Result<()> {
    match err {
        AppError::BankApi { path, status: 422, body } if path == "/auth" => {
            writeln!(stderr, "422 response from /auth:\n{}", body)?;
            writeln!(stderr, "\n{}\n", AppError::UNPROCESSABLE_HINT)
        }
        other => writeln!(stderr, "Error: {}", other),
    }
}
