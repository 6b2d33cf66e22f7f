// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Web front end tests.
//!
//! These tests verify that:
//! 1. The consent flow (start, callback, accounts) works end to end
//! 2. Failures flash a message and redirect instead of erroring
//! 3. The consent `state` must match the one issued to this browser
//! 4. Session cookies are signed and security headers are set
//! 5. Cookie-less traffic cannot grow the session store past its cap

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use enable_budget::services::SessionStore;
use tower::ServiceExt;

mod common;
use common::{body_text, create_test_app, create_test_app_with_store, session_cookie, FakeBank};

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    form: Option<&str>,
) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "127.0.0.1:5000");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let body = match form {
        Some(form) => {
            builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            Body::from(form.to_string())
        }
        None => Body::empty(),
    };

    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

/// Open the home page and return the new session cookie.
async fn new_session(app: &Router) -> String {
    let response = send(app, Method::GET, "/", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response).expect("session cookie")
}

/// Run start + callback and return the cookie of a session with accounts.
async fn consented_session(app: &Router) -> String {
    let cookie = new_session(app).await;

    let response = send(
        app,
        Method::POST,
        "/start",
        Some(&cookie),
        Some("bank_name=KBC&country=be&redirect_url="),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let state = location(&response)
        .split("state=")
        .nth(1)
        .unwrap()
        .to_string();

    let response = send(
        app,
        Method::GET,
        &format!("/callback?code={}&state={}", common::GOOD_CODE, state),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/accounts");

    cookie
}

#[tokio::test]
async fn test_index_sets_cookie_and_shows_callback() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);

    let response = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let html = body_text(response).await;
    assert!(html.contains(r#"action="/start""#));
    assert!(html.contains("http://127.0.0.1:5000/callback"));
}

#[tokio::test]
async fn test_full_consent_flow() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = consented_session(&app).await;

    // /auth got the default callback and an uppercased country
    let auth = &bank.requests()[0];
    let body = auth.body.as_ref().unwrap();
    assert_eq!(body["aspsp"]["country"], "BE");
    assert_eq!(body["redirect_url"], "http://127.0.0.1:5000/callback");

    let response = send(&app, Method::GET, "/accounts", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Consent granted. 2 account(s) available."));
    assert!(html.contains("<td>Main</td><td>BE68539007547034</td><td>EUR</td>"));
    assert!(html.contains(r#"href="/transactions/acc-1/csv""#));

    // Flash is shown once
    let html = body_text(send(&app, Method::GET, "/accounts", Some(&cookie), None).await).await;
    assert!(!html.contains("Consent granted"));
}

#[tokio::test]
async fn test_balances_and_transactions_pages() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = consented_session(&app).await;

    let response = send(&app, Method::GET, "/balances/acc-1", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("<td>123.45</td>"));

    let response = send(
        &app,
        Method::GET,
        "/transactions/acc-1?date_from=2024-01-01&date_to=",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("3 transactions"));
    assert!(html.contains("<td>Coffee; Shop</td>"));
    assert!(html.contains(r#"value="2024-01-01""#));

    // Account calls carry the bank session
    let requests = bank.requests();
    let account_calls: Vec<_> = requests
        .iter()
        .filter(|r| r.path.starts_with("/accounts/"))
        .collect();
    assert_eq!(account_calls.len(), 3);
    assert!(account_calls
        .iter()
        .all(|r| r.session_header.as_deref() == Some("sess-1")));
    assert!(!account_calls[1].query.contains_key("date_to"));
}

#[tokio::test]
async fn test_csv_download() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = consented_session(&app).await;

    let response = send(
        &app,
        Method::GET,
        "/transactions/acc-1/csv?date_from=2024-01-01",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"transactions_acc-1_2024-01-01.csv\""
    );

    let csv = body_text(response).await;
    assert!(csv.starts_with("entry_reference,transaction_amount.amount"));
    assert_eq!(csv.lines().count(), 4);
}

#[tokio::test]
async fn test_default_window_when_no_dates() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = consented_session(&app).await;

    send(&app, Method::GET, "/transactions/acc-1", Some(&cookie), None).await;

    let expected = enable_budget::time_utils::days_ago(chrono::Utc::now(), 90)
        .format("%Y-%m-%d")
        .to_string();
    let first_page = bank
        .requests()
        .into_iter()
        .find(|r| r.path == "/accounts/acc-1/transactions")
        .unwrap();
    assert_eq!(first_page.query.get("date_from"), Some(&expected));
}

#[tokio::test]
async fn test_state_mismatch_rejected() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = new_session(&app).await;

    send(
        &app,
        Method::POST,
        "/start",
        Some(&cookie),
        Some("bank_name=KBC&country=BE&redirect_url="),
    )
    .await;

    let response = send(
        &app,
        Method::GET,
        "/callback?code=good-code&state=forged",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let html = body_text(send(&app, Method::GET, "/", Some(&cookie), None).await).await;
    assert!(html.contains("Consent state mismatch"));

    // No code exchange happened
    assert!(bank.requests().iter().all(|r| r.path != "/sessions"));
}

#[tokio::test]
async fn test_callback_without_pending_consent() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = new_session(&app).await;

    let response = send(
        &app,
        Method::GET,
        "/callback?code=good-code&state=anything",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(location(&response), "/");
    assert!(bank.requests().is_empty());
}

#[tokio::test]
async fn test_callback_missing_code_and_bank_error() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = new_session(&app).await;

    let response = send(&app, Method::GET, "/callback", Some(&cookie), None).await;
    assert_eq!(location(&response), "/");
    let html = body_text(send(&app, Method::GET, "/", Some(&cookie), None).await).await;
    assert!(html.contains("Missing &#x27;code&#x27; parameter"));

    let response = send(
        &app,
        Method::GET,
        "/callback?error=access_denied&error_description=User+cancelled",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(location(&response), "/");
    let html = body_text(send(&app, Method::GET, "/", Some(&cookie), None).await).await;
    assert!(html.contains("access_denied User cancelled"));
}

#[tokio::test]
async fn test_bad_code_flashes_bank_error() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = new_session(&app).await;

    let response = send(
        &app,
        Method::POST,
        "/start",
        Some(&cookie),
        Some("bank_name=KBC&country=BE&redirect_url="),
    )
    .await;
    let state = location(&response).split("state=").nth(1).unwrap().to_string();

    let response = send(
        &app,
        Method::GET,
        &format!("/callback?code=wrong&state={}", state),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(location(&response), "/");

    let html = body_text(send(&app, Method::GET, "/", Some(&cookie), None).await).await;
    assert!(html.contains("/sessions failed (400)"));
}

#[tokio::test]
async fn test_start_requires_bank_name() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = new_session(&app).await;

    let response = send(
        &app,
        Method::POST,
        "/start",
        Some(&cookie),
        Some("bank_name=++&country=BE&redirect_url="),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let html = body_text(send(&app, Method::GET, "/", Some(&cookie), None).await).await;
    assert!(html.contains("Please enter the bank name"));
    assert!(bank.requests().is_empty());
}

#[tokio::test]
async fn test_start_rejects_invalid_country() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = new_session(&app).await;

    let response = send(
        &app,
        Method::POST,
        "/start",
        Some(&cookie),
        Some("bank_name=KBC&country=Belgium&redirect_url="),
    )
    .await;
    assert_eq!(location(&response), "/");

    let html = body_text(send(&app, Method::GET, "/", Some(&cookie), None).await).await;
    assert!(html.contains("Invalid form"));
    assert!(bank.requests().is_empty());
}

#[tokio::test]
async fn test_start_422_shows_hint() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = new_session(&app).await;

    let response = send(
        &app,
        Method::POST,
        "/start",
        Some(&cookie),
        Some("bank_name=Unknown&country=BE&redirect_url=https%3A%2F%2Fhttpbin.org%2Fanything"),
    )
    .await;
    assert_eq!(location(&response), "/");

    let html = body_text(send(&app, Method::GET, "/", Some(&cookie), None).await).await;
    assert!(html.contains("[422 hint]"));
    assert!(html.contains("ASPSP not found"));
}

#[tokio::test]
async fn test_accounts_without_consent_redirects_home() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);

    let response = send(&app, Method::GET, "/accounts", None, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_bank_errors_flash_on_accounts() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = consented_session(&app).await;
    // Drop the success flash
    send(&app, Method::GET, "/accounts", Some(&cookie), None).await;

    let response = send(&app, Method::GET, "/balances/missing", Some(&cookie), None).await;
    assert_eq!(location(&response), "/accounts");
    let html = body_text(send(&app, Method::GET, "/accounts", Some(&cookie), None).await).await;
    assert!(html.contains("/accounts/missing/balances failed (404): account not found"));

    let response = send(&app, Method::GET, "/transactions/broken", Some(&cookie), None).await;
    assert_eq!(location(&response), "/accounts");
    let html = body_text(send(&app, Method::GET, "/accounts", Some(&cookie), None).await).await;
    assert!(html.contains("upstream exploded"));

    let response = send(
        &app,
        Method::GET,
        "/transactions/acc-1/csv?date_from=yesterday",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(location(&response), "/accounts");
    let html = body_text(send(&app, Method::GET, "/accounts", Some(&cookie), None).await).await;
    assert!(html.contains("expected YYYY-MM-DD"));
}

#[tokio::test]
async fn test_logout_forgets_accounts() {
    let bank = FakeBank::start().await;
    let (app, state) = create_test_app(&bank);
    let cookie = consented_session(&app).await;

    let response = send(&app, Method::GET, "/logout", Some(&cookie), None).await;
    assert_eq!(location(&response), "/");

    let response = send(&app, Method::GET, "/accounts", Some(&cookie), None).await;
    assert_eq!(location(&response), "/");
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn test_tampered_cookie_gets_new_session() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);
    let cookie = consented_session(&app).await;

    let (name_and_id, _) = cookie.rsplit_once('.').unwrap();
    let forged = format!("{}.{}", name_and_id, "00".repeat(32));

    let response = send(&app, Method::GET, "/accounts", Some(&forged), None).await;
    assert_eq!(location(&response), "/");
    let fresh = session_cookie(&response).expect("new cookie");
    assert_ne!(fresh, cookie);
}

#[tokio::test]
async fn test_health_has_no_session() {
    let bank = FakeBank::start().await;
    let (app, state) = create_test_app(&bank);

    let response = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert!(state.sessions.is_empty());
}

#[tokio::test]
async fn test_security_headers_on_pages() {
    let bank = FakeBank::start().await;
    let (app, _) = create_test_app(&bank);

    let response = send(&app, Method::GET, "/", None, None).await;
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .contains("frame-ancestors 'none'"));
}

#[tokio::test]
async fn test_cookieless_requests_stay_under_session_cap() {
    let bank = FakeBank::start().await;
    let store = SessionStore::with_max_sessions(b"test_key".to_vec(), 20);
    let (app, state) = create_test_app_with_store(&bank, store);

    let mut last = None;
    for _ in 0..200 {
        let response = send(&app, Method::GET, "/", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        last = session_cookie(&response);
        assert!(state.sessions.len() <= 20);
    }
    assert_eq!(state.sessions.len(), 20);

    // The most recent browser still has a working session
    let cookie = last.unwrap();
    let response = send(&app, Method::GET, "/", Some(&cookie), None).await;
    assert!(session_cookie(&response).is_none());
}
