//! Reversible obfuscation for the seed dataset
//!
//! WARNING: this is not encryption. The "key" is SHA-256 of a fixed
//! application constant and a salt that is stored next to the blob, so
//! anyone holding the constant can recover the plaintext. It only keeps the
//! demo dataset from sitting in the secret store as readable JSON.
//!
//! Stored form: `salt ":" base64(plaintext "::" key[..32])` where `salt` is
//! 16 random bytes in hex and `key = hex(sha256(constant + salt))`.

use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes drawn per encoding
pub const SALT_LEN: usize = 16;

/// Key characters appended to the plaintext as an integrity marker
pub const KEY_FRAGMENT_LEN: usize = 32;

const SALT_SEPARATOR: char = ':';
const MARKER_SEPARATOR: &str = "::";

/// Hex SHA-256 of a UTF-8 string
pub fn hash_sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Generate a fresh hex-encoded salt
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    hex::encode(salt)
}

/// Seed blob encoder/decoder bound to an application constant
#[derive(Debug, Clone)]
pub struct SeedObfuscator {
    app_constant: String,
}

impl SeedObfuscator {
    /// Create an obfuscator for `app_constant`
    pub fn new(app_constant: impl Into<String>) -> Self {
        Self {
            app_constant: app_constant.into(),
        }
    }

    fn key_fragment(&self, salt: &str) -> String {
        let key = hash_sha256_hex(&format!("{}{}", self.app_constant, salt));
        key[..KEY_FRAGMENT_LEN].to_string()
    }

    /// Encode with a fresh random salt
    pub fn encode(&self, plaintext: &str) -> String {
        self.encode_with_salt(plaintext, &generate_salt())
    }

    /// Encode with a caller-chosen salt (must not contain `:`)
    pub fn encode_with_salt(&self, plaintext: &str, salt: &str) -> String {
        let marked = format!("{}{}{}", plaintext, MARKER_SEPARATOR, self.key_fragment(salt));
        format!("{}{}{}", salt, SALT_SEPARATOR, STANDARD.encode(marked.as_bytes()))
    }

    /// Recover the plaintext of a blob produced by [`encode`](Self::encode)
    pub fn decode(&self, blob: &str) -> Result<String> {
        let (salt, encoded) = blob
            .split_once(SALT_SEPARATOR)
            .ok_or_else(|| Error::Obfuscation("missing salt separator".to_string()))?;

        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| Error::Obfuscation(format!("invalid base64: {}", e)))?;
        let marked = String::from_utf8(bytes)
            .map_err(|e| Error::Obfuscation(format!("invalid UTF-8: {}", e)))?;

        // The fragment never contains the separator, so the last one is ours
        let (plaintext, fragment) = marked
            .rsplit_once(MARKER_SEPARATOR)
            .ok_or_else(|| Error::Obfuscation("missing key marker".to_string()))?;

        if fragment != self.key_fragment(salt) {
            return Err(Error::Obfuscation("key marker mismatch".to_string()));
        }

        Ok(plaintext.to_string())
    }
}
