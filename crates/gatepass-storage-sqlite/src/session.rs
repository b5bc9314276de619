//! Session bookkeeping in the secret store
//!
//! Everything here is best-effort: a failing secret store reads as
//! "nothing remembered" and write failures are logged and dropped.

use crate::secret_store::{keys, SecretStore};

/// Default login recency window (24 hours)
pub const DEFAULT_RECENCY_MS: i64 = 24 * 60 * 60 * 1000;

/// Remembered email, login recency and session token
pub struct SessionStore<'a> {
    secrets: &'a dyn SecretStore,
    recency_ms: i64,
}

impl<'a> SessionStore<'a> {
    /// Create new session store with the default recency window
    pub fn new(secrets: &'a dyn SecretStore) -> Self {
        Self {
            secrets,
            recency_ms: DEFAULT_RECENCY_MS,
        }
    }

    /// Override the recency window
    pub fn with_recency_ms(mut self, recency_ms: i64) -> Self {
        self.recency_ms = recency_ms;
        self
    }

    /// Remember `email` and stamp the login time (epoch ms)
    pub fn remember_email(&self, email: &str, now_ms: i64) {
        self.write(keys::REMEMBERED_EMAIL, email);
        self.write(keys::LAST_LOGIN_TIME, &now_ms.to_string());
    }

    /// Email remembered at the last login
    pub fn remembered_email(&self) -> Option<String> {
        self.read(keys::REMEMBERED_EMAIL)
    }

    /// Forget the email and its login time
    pub fn clear_remembered_email(&self) {
        self.remove(keys::REMEMBERED_EMAIL);
        self.remove(keys::LAST_LOGIN_TIME);
    }

    /// Last login time in epoch ms, if one is stored and parseable
    pub fn last_login_ms(&self) -> Option<i64> {
        let raw = self.read(keys::LAST_LOGIN_TIME)?;
        match raw.trim().parse() {
            Ok(ms) => Some(ms),
            Err(_) => {
                tracing::warn!("Ignoring unparseable last login time {:?}", raw);
                None
            }
        }
    }

    /// Whether the last login falls inside the recency window
    pub fn is_recent_login(&self, now_ms: i64) -> bool {
        match self.last_login_ms() {
            Some(last) => now_ms.saturating_sub(last) < self.recency_ms,
            None => false,
        }
    }

    /// Store the opaque session token
    pub fn store_token(&self, token: &str) {
        self.write(keys::USER_TOKEN, token);
    }

    /// Opaque session token, if any
    pub fn token(&self) -> Option<String> {
        self.read(keys::USER_TOKEN)
    }

    /// Drop the session token
    pub fn clear_token(&self) {
        self.remove(keys::USER_TOKEN);
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.secrets.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("Secret store read of {} failed: {}", key, e);
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.secrets.set(key, value) {
            tracing::warn!("Secret store write of {} failed: {}", key, e);
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.secrets.delete(key) {
            tracing::warn!("Secret store delete of {} failed: {}", key, e);
        }
    }
}
