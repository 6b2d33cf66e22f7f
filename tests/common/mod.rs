// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test helpers: a local fake of the bank API and a wired test app.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use enable_budget::config::Config;
use enable_budget::routes::create_router;
use enable_budget::services::{BankClient, JwtSigner, SessionStore, SESSION_HEADER};
use enable_budget::AppState;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const TEST_APP_ID: &str = "11111111-2222-3333-4444-555555555555";

/// Code the fake bank accepts on `/sessions`.
pub const GOOD_CODE: &str = "good-code";

/// Bank name the fake bank rejects with 422.
pub const UNKNOWN_BANK: &str = "Unknown";

/// Bank name for which `/auth` replies without a `url`.
pub const NO_URL_BANK: &str = "NoUrl";

#[allow(dead_code)]
pub fn private_key_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/test_private_key.pem")
}

#[allow(dead_code)]
pub fn public_key_pem() -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/test_public_key.pem");
    std::fs::read(path).expect("public key fixture")
}

/// One request as seen by the fake bank.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub query: HashMap<String, String>,
    pub session_header: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone)]
struct FakeBankState {
    audience: String,
    key: DecodingKey,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeBankState {
    /// Reject requests without a valid application JWT.
    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let unauthorized = |msg: &str| (StatusCode::UNAUTHORIZED, msg.to_string()).into_response();

        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| unauthorized("missing bearer token"))?;

        let jwt_header = decode_header(token).map_err(|_| unauthorized("bad jwt header"))?;
        if jwt_header.alg != Algorithm::RS256 || jwt_header.kid.as_deref() != Some(TEST_APP_ID) {
            return Err(unauthorized("bad kid or alg"));
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&["enablebanking.com"]);
        decode::<Value>(token, &self.key, &validation).map_err(|_| unauthorized("bad jwt"))?;
        Ok(())
    }

    fn record(
        &self,
        method: &'static str,
        path: String,
        query: HashMap<String, String>,
        headers: &HeaderMap,
        body: Option<Value>,
    ) {
        let session_header = headers
            .get(SESSION_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        self.requests
            .lock()
            .expect("requests lock")
            .push(RecordedRequest {
                method,
                path,
                query,
                session_header,
                body,
            });
    }
}

fn transaction(reference: &str, amount: &str, info: &[&str]) -> Value {
    json!({
        "entry_reference": reference,
        "transaction_amount": {"amount": amount, "currency": "EUR"},
        "remittance_information": info,
        "booking_date": "2024-01-03"
    })
}

async fn auth(
    State(bank): State<FakeBankState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = bank.authorize(&headers) {
        return rejection;
    }
    bank.record("POST", "/auth".to_string(), HashMap::new(), &headers, Some(body.clone()));

    let name = body["aspsp"]["name"].as_str().unwrap_or_default();
    let state = body["state"].as_str().unwrap_or_default();

    match name {
        UNKNOWN_BANK => (
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":"ASPSP not found"}"#,
        )
            .into_response(),
        NO_URL_BANK => Json(json!({"authorization_id": "auth-2"})).into_response(),
        _ => Json(json!({
            "url": format!("https://bank.example/consent?state={}", state),
            "authorization_id": "auth-1"
        }))
        .into_response(),
    }
}

async fn sessions(
    State(bank): State<FakeBankState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = bank.authorize(&headers) {
        return rejection;
    }
    bank.record("POST", "/sessions".to_string(), HashMap::new(), &headers, Some(body.clone()));

    if body["code"] != GOOD_CODE {
        return (StatusCode::BAD_REQUEST, r#"{"error":"invalid code"}"#).into_response();
    }

    Json(json!({
        "session_id": "sess-1",
        "accounts": [
            {
                "uid": "acc-1",
                "name": "Main",
                "account_id": {"iban": "BE68539007547034"},
                "currency": "EUR"
            },
            {
                "uid": "acc-2",
                "product": "Card",
                "masked_pan": "1234********5678",
                "currency": "EUR"
            }
        ],
        "access": {"valid_until": "2024-04-01T00:00:00+00:00"}
    }))
    .into_response()
}

async fn balances(
    State(bank): State<FakeBankState>,
    headers: HeaderMap,
    Path(uid): Path<String>,
) -> Response {
    if let Err(rejection) = bank.authorize(&headers) {
        return rejection;
    }
    bank.record(
        "GET",
        format!("/accounts/{}/balances", uid),
        HashMap::new(),
        &headers,
        None,
    );

    if uid == "missing" {
        return (StatusCode::NOT_FOUND, "account not found").into_response();
    }

    Json(json!({"balances": [
        {"name": "Booked", "balance_type": "CLBD", "balance_amount": {"amount": "123.45", "currency": "EUR"}}
    ]}))
    .into_response()
}

async fn transactions(
    State(bank): State<FakeBankState>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = bank.authorize(&headers) {
        return rejection;
    }
    bank.record(
        "GET",
        format!("/accounts/{}/transactions", uid),
        query.clone(),
        &headers,
        None,
    );

    if uid == "items-only" {
        return Json(json!({"items": [transaction("i1", "5.00", &["Refund"])]})).into_response();
    }

    match query.get("continuation_key").map(String::as_str) {
        None => Json(json!({
            "transactions": [
                transaction("e1", "-12.50", &["Coffee", "Shop"]),
                transaction("e2", "-40.00", &["Groceries"])
            ],
            "continuation_key": "page-2"
        }))
        .into_response(),
        Some("page-2") if uid == "broken" => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
        }
        // Hands back the same key forever
        Some("page-2") if uid == "looping" => Json(json!({
            "transactions": [transaction("e3", "1.00", &[])],
            "continuation_key": "page-2"
        }))
        .into_response(),
        Some("page-2") => {
            let mut late = transaction("e3", "1500.00", &[]);
            late["note"] = json!("salary");
            Json(json!({"transactions": [late], "continuation_key": ""})).into_response()
        }
        Some(_) => (StatusCode::BAD_REQUEST, "unknown continuation key").into_response(),
    }
}

/// A fake bank API listening on an ephemeral localhost port.
pub struct FakeBank {
    pub base_url: String,
    pub audience: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[allow(dead_code)]
impl FakeBank {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake bank");
        let addr = listener.local_addr().expect("fake bank addr");
        let audience = format!("127.0.0.1:{}", addr.port());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let state = FakeBankState {
            audience: audience.clone(),
            key: DecodingKey::from_rsa_pem(&public_key_pem()).expect("public key"),
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/auth", post(auth))
            .route("/sessions", post(sessions))
            .route("/accounts/{uid}/balances", get(balances))
            .route("/accounts/{uid}/transactions", get(transactions))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake bank server");
        });

        Self {
            base_url: format!("http://{}", addr),
            audience,
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Config pointing at this fake bank with the test key pair.
    pub fn config(&self) -> Config {
        Config {
            app_id: Some(TEST_APP_ID.to_string()),
            private_key_path: Some(private_key_path()),
            api_base: self.base_url.clone(),
            ..Config::default()
        }
    }

    pub fn client(&self) -> BankClient {
        let signer = self.config().signer().expect("test signer");
        BankClient::new(&self.base_url, signer).expect("test client")
    }
}

/// Signer for the test key pair with an explicit audience.
#[allow(dead_code)]
pub fn test_signer(audience: &str) -> JwtSigner {
    JwtSigner::from_pem_file(TEST_APP_ID, &private_key_path(), audience).expect("test signer")
}

/// Create a web app wired to the fake bank.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(bank: &FakeBank) -> (Router, Arc<AppState>) {
    let key = bank.config().session_key_or_random().expect("session key");
    create_test_app_with_store(bank, SessionStore::new(key))
}

/// Like `create_test_app`, with a caller-built session store.
#[allow(dead_code)]
pub fn create_test_app_with_store(
    bank: &FakeBank,
    sessions: SessionStore,
) -> (Router, Arc<AppState>) {
    let config = bank.config();
    let state = Arc::new(AppState {
        bank: bank.client(),
        sessions,
        config,
    });

    (create_router(state.clone()), state)
}

/// `name=value` of the session cookie set by a response, if any.
#[allow(dead_code)]
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(enable_budget::middleware::SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Read a response body as UTF-8 text.
#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
