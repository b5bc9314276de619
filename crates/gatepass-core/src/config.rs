//! GatePass configuration
//!
//! The shared secret and the application constant ship as embedded demo
//! values. Deployments override them here; the signing and obfuscation code
//! only ever sees what this struct hands it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Embedded shared secret used to sign QR payloads
pub const DEFAULT_SHARED_SECRET: &str = "GatePass-QR-Shared-Secret-2024";

/// Embedded constant the seed obfuscation key is derived from
pub const DEFAULT_APP_CONSTANT: &str = "GatePass-Demo-Seed-Constant";

/// Payload version tag
pub const DEFAULT_TOKEN_VERSION: &str = "2.0";

/// Longest accepted duration setting (one year), seconds
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// GatePass configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatePassConfig {
    /// Secret appended to the payload before hashing
    pub shared_secret: String,
    /// Constant mixed into the seed obfuscation key
    pub app_constant: String,
    /// Payload lifetime (soft expiry), seconds
    pub token_ttl_secs: u64,
    /// Envelope verification window (hard expiry), seconds
    pub verification_window_secs: u64,
    /// Window in which a remembered login counts as recent, seconds
    pub login_recency_secs: u64,
    /// Version tag stamped into every payload
    pub token_version: String,
}

impl Default for GatePassConfig {
    fn default() -> Self {
        Self {
            shared_secret: DEFAULT_SHARED_SECRET.to_string(),
            app_constant: DEFAULT_APP_CONSTANT.to_string(),
            token_ttl_secs: 60 * 60,
            verification_window_secs: 24 * 60 * 60,
            login_recency_secs: 24 * 60 * 60,
            token_version: DEFAULT_TOKEN_VERSION.to_string(),
        }
    }
}

impl GatePassConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<()> {
        if self.shared_secret.is_empty() {
            return Err(Error::Config("shared_secret cannot be empty".to_string()));
        }
        if self.app_constant.is_empty() {
            return Err(Error::Config("app_constant cannot be empty".to_string()));
        }
        if self.token_ttl_secs == 0 {
            return Err(Error::Config("token_ttl_secs must be positive".to_string()));
        }
        for (name, secs) in [
            ("token_ttl_secs", self.token_ttl_secs),
            ("verification_window_secs", self.verification_window_secs),
            ("login_recency_secs", self.login_recency_secs),
        ] {
            if secs > MAX_DURATION_SECS {
                return Err(Error::Config(format!(
                    "{} ({}) exceeds {}",
                    name, secs, MAX_DURATION_SECS
                )));
            }
        }
        if self.verification_window_secs < self.token_ttl_secs {
            return Err(Error::Config(format!(
                "verification_window_secs ({}) shorter than token_ttl_secs ({})",
                self.verification_window_secs, self.token_ttl_secs
            )));
        }
        if self.token_version.is_empty() {
            return Err(Error::Config("token_version cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Payload lifetime in milliseconds
    pub fn token_ttl_ms(&self) -> i64 {
        secs_to_ms(self.token_ttl_secs)
    }

    /// Verification window in milliseconds
    pub fn verification_window_ms(&self) -> i64 {
        secs_to_ms(self.verification_window_secs)
    }

    /// Login recency window in milliseconds
    pub fn login_recency_ms(&self) -> i64 {
        secs_to_ms(self.login_recency_secs)
    }
}

fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000)
}
