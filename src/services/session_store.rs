// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side browser sessions for the web front end.
//!
//! The browser only holds an opaque ID signed with HMAC-SHA256. The bank
//! session ID, the accounts and pending flash messages stay in memory.

use crate::error::AppError;
use crate::models::Account;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Idle sessions older than this are dropped.
const SESSION_IDLE_HOURS: i64 = 24;

/// Default cap on live sessions; the least recently seen one is evicted past it.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Idle sessions are swept once every this many creations.
const PRUNE_EVERY: u64 = 256;

const TOKEN_BYTES: usize = 32;

/// Random URL-safe token (session IDs, consent `state`).
pub fn random_token() -> Result<String, AppError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System random generator failed")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Error,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Error => "error",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Per-browser state.
#[derive(Debug, Clone)]
pub struct WebSession {
    /// Bank session ID from `/sessions`
    pub session_id: Option<String>,
    pub accounts: Vec<Account>,
    /// `state` sent with the pending `/auth` request
    pub consent_state: Option<String>,
    pub flashes: Vec<Flash>,
    pub last_seen: DateTime<Utc>,
}

impl Default for WebSession {
    fn default() -> Self {
        Self {
            session_id: None,
            accounts: Vec::new(),
            consent_state: None,
            flashes: Vec::new(),
            last_seen: Utc::now(),
        }
    }
}

/// In-memory session store shared by all handlers.
///
/// Holds at most `max_sessions` entries.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, WebSession>>,
    key: Arc<Vec<u8>>,
    max_sessions: usize,
    created: Arc<AtomicU64>,
}

impl SessionStore {
    pub fn new(key: Vec<u8>) -> Self {
        Self::with_max_sessions(key, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_max_sessions(key: Vec<u8>, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            key: Arc::new(key),
            max_sessions: max_sessions.max(1),
            created: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create an empty session and return its ID.
    ///
    /// When the store is full, idle sessions are swept first and then the
    /// least recently seen session is evicted.
    pub fn create(&self) -> Result<String, AppError> {
        let now = Utc::now();
        let created = self.created.fetch_add(1, Ordering::Relaxed) + 1;

        if created % PRUNE_EVERY == 0 || self.sessions.len() >= self.max_sessions {
            self.prune_idle(now);
        }
        while self.sessions.len() >= self.max_sessions {
            if !self.evict_least_recent() {
                break;
            }
        }

        let id = random_token()?;
        self.sessions.insert(id.clone(), WebSession::default());
        tracing::debug!(active = self.sessions.len(), "Browser session created");
        Ok(id)
    }

    /// Drop sessions idle for longer than a day. Returns how many went.
    pub fn prune_idle(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        let cutoff = now - Duration::hours(SESSION_IDLE_HOURS);
        self.sessions.retain(|_, s| s.last_seen > cutoff);

        let pruned = before.saturating_sub(self.sessions.len());
        if pruned > 0 {
            tracing::debug!(pruned, "Idle browser sessions pruned");
        }
        pruned
    }

    /// Cookie value: `id.signature_hex`.
    pub fn sign(&self, id: &str) -> Result<String, AppError> {
        Ok(format!("{}.{}", id, hex::encode(self.mac(id)?)))
    }

    /// Verify a cookie value and return the session ID if it is still live.
    pub fn verify(&self, cookie_value: &str) -> Option<String> {
        let (id, signature_hex) = cookie_value.rsplit_once('.')?;
        let signature = hex::decode(signature_hex).ok()?;
        let expected = self.mac(id).ok()?;

        if !bool::from(expected.as_slice().ct_eq(signature.as_slice())) {
            tracing::warn!("Session cookie signature mismatch");
            return None;
        }

        let mut session = self.sessions.get_mut(id)?;
        session.last_seen = Utc::now();
        Some(id.to_string())
    }

    /// Snapshot of a session.
    pub fn get(&self, id: &str) -> Option<WebSession> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    /// Mutate a session in place. Unknown IDs are ignored.
    pub fn update<F>(&self, id: &str, f: F)
    where
        F: FnOnce(&mut WebSession),
    {
        if let Some(mut session) = self.sessions.get_mut(id) {
            f(session.value_mut());
        }
    }

    pub fn flash(&self, id: &str, level: FlashLevel, message: impl Into<String>) {
        let message = message.into();
        self.update(id, |s| s.flashes.push(Flash { level, message }));
    }

    /// Remove and return pending flashes.
    pub fn take_flashes(&self, id: &str) -> Vec<Flash> {
        self.sessions
            .get_mut(id)
            .map(|mut s| std::mem::take(&mut s.flashes))
            .unwrap_or_default()
    }

    /// Forget the bank session but keep the browser session.
    pub fn clear(&self, id: &str) {
        self.update(id, |s| {
            s.session_id = None;
            s.accounts.clear();
            s.consent_state = None;
        });
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_least_recent(&self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.value().last_seen)
            .map(|entry| entry.key().clone());

        match oldest {
            Some(id) => {
                self.sessions.remove(&id);
                tracing::debug!("Session store full, evicted least recent session");
                true
            }
            None => false,
        }
    }

    fn mac(&self, id: &str) -> Result<Vec<u8>, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(id.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
