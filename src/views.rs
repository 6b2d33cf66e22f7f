// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-rendered HTML pages for the web front end.
//!
//! Every interpolated value goes through [`escape`].

use crate::export::Table;
use crate::models::{Account, TransactionQuery};
use crate::services::Flash;
use serde_json::Value;
use std::fmt::Write as _;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 72rem; margin: 2rem auto; padding: 0 1rem; color: #222; }
nav a { margin-right: 1rem; }
.flash { padding: .6rem .9rem; border-radius: 4px; margin: .5rem 0; white-space: pre-wrap; }
.flash.success { background: #e6f4ea; border: 1px solid #34a853; }
.flash.error { background: #fce8e6; border: 1px solid #d93025; }
table { border-collapse: collapse; width: 100%; font-size: .9rem; }
th, td { border: 1px solid #ddd; padding: .3rem .5rem; text-align: left; vertical-align: top; }
th { background: #f5f5f5; }
pre { background: #f7f7f7; padding: 1rem; overflow-x: auto; }
label { display: block; margin-top: .6rem; }
input { padding: .3rem; min-width: 20rem; }
button { margin-top: 1rem; padding: .4rem 1rem; }
"#;

/// Escape text for HTML element content and quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(title: &str, flashes: &[Flash], body: &str) -> String {
    let mut flash_html = String::new();
    for flash in flashes {
        let _ = write!(
            flash_html,
            r#"<div class="flash {}">{}</div>"#,
            flash.level.as_str(),
            escape(&flash.message)
        );
    }

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · enable-budget</title>
<style>{style}</style>
</head>
<body>
<nav><a href="/">Home</a><a href="/accounts">Accounts</a><a href="/logout">Log out</a></nav>
<h1>{title}</h1>
{flashes}
{body}
</body>
</html>
"#,
        title = escape(title),
        style = STYLE,
        flashes = flash_html,
        body = body,
    )
}

/// Consent form.
pub fn index_page(callback_url: &str, flashes: &[Flash]) -> String {
    let body = format!(
        r#"<p>Read-only access to your balances and transactions.</p>
<form method="post" action="/start">
<label>Bank name (aspsp.name)
<input name="bank_name" required maxlength="100"></label>
<label>Country (aspsp.country)
<input name="country" value="BE" maxlength="2"></label>
<label>Redirect URL (must be whitelisted)
<input name="redirect_url" value="{callback}"></label>
<button type="submit">Start consent</button>
</form>"#,
        callback = escape(callback_url)
    );
    layout("Connect a bank", flashes, &body)
}

/// Accounts granted by the current session.
pub fn accounts_page(accounts: &[Account], flashes: &[Flash]) -> String {
    let mut rows = String::new();
    for account in accounts {
        let uid = account.uid_or_dash();
        let href_uid = escape(&urlencoding::encode(uid));
        let _ = write!(
            rows,
            r#"<tr><td>{name}</td><td>{identifier}</td><td>{currency}</td><td><code>{uid}</code></td>
<td><a href="/balances/{href}">Balances</a> · <a href="/transactions/{href}">Transactions</a> · <a href="/transactions/{href}/csv">CSV</a></td></tr>
"#,
            name = escape(account.display_name()),
            identifier = escape(account.identifier()),
            currency = escape(account.currency_or_dash()),
            uid = escape(uid),
            href = href_uid,
        );
    }

    let body = format!(
        r#"<table>
<thead><tr><th>Name</th><th>IBAN / PAN</th><th>Currency</th><th>UID</th><th></th></tr></thead>
<tbody>
{rows}</tbody>
</table>"#
    );
    layout("Accounts", flashes, &body)
}

/// Balances of one account: a table when the reply has a `balances` list,
/// always followed by the raw JSON.
pub fn balances_page(uid: &str, balances: &Value, flashes: &[Flash]) -> String {
    let mut body = String::new();

    if let Some(list) = balances.get("balances").and_then(Value::as_array) {
        body.push_str(&table_html(&Table::from_transactions(list)));
    }

    let raw = serde_json::to_string_pretty(balances).unwrap_or_else(|_| balances.to_string());
    let _ = write!(body, "<h2>Raw response</h2>\n<pre>{}</pre>", escape(&raw));

    layout(&format!("Balances of {}", uid), flashes, &body)
}

/// Transactions of one account with a date filter and CSV link.
pub fn transactions_page(
    uid: &str,
    query: &TransactionQuery,
    table: &Table,
    flashes: &[Flash],
) -> String {
    let href_uid = escape(&urlencoding::encode(uid));
    let date_from = query.date_from.format("%Y-%m-%d").to_string();
    let date_to = query
        .date_to
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    let mut csv_query = format!("date_from={}", date_from);
    if !date_to.is_empty() {
        let _ = write!(csv_query, "&date_to={}", date_to);
    }

    let body = format!(
        r#"<form method="get" action="/transactions/{href}">
<label>From <input type="date" name="date_from" value="{from}"></label>
<label>To <input type="date" name="date_to" value="{to}"></label>
<button type="submit">Refresh</button>
</form>
<p>{count} transactions · <a href="/transactions/{href}/csv?{csv}">Download CSV</a></p>
{table}"#,
        href = href_uid,
        from = escape(&date_from),
        to = escape(&date_to),
        count = table.rows.len(),
        csv = escape(&csv_query),
        table = table_html(table),
    );

    layout(&format!("Transactions of {}", uid), flashes, &body)
}

fn table_html(table: &Table) -> String {
    if table.rows.is_empty() {
        return "<p>No rows.</p>".to_string();
    }

    let mut html = String::from("<table>\n<thead><tr>");
    for header in &table.headers {
        let _ = write!(html, "<th>{}</th>", escape(header));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in &table.rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape(cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}
