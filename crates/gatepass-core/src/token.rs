//! Signed, time-bound QR access tokens
//!
//! Wire format (JSON text embedded in the QR symbol):
//!
//! ```text
//! { "data": "<serialized QrPayload>", "signature": "<hex>", "issuedAt": <ms> }
//! ```
//!
//! `signature = hex(sha256(data + shared_secret))`. The verifier hashes the
//! transmitted `data` string as-is, so any change to it (including a
//! re-serialization with different spacing or key order) is a tamper.
//!
//! Two expiry horizons apply: the envelope is dead once the verification
//! window (24 hours by default) has passed since `issuedAt`, and the payload
//! is dead after its own `expiresAt` (1 hour after issue by default).

use crate::config::GatePassConfig;
use crate::Result;
use gatepass_storage_sqlite::{hash_sha256_hex, UserRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Inner payload binding a user record to a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    /// Record ID
    pub user_id: i64,
    /// Record email
    pub email: String,
    /// Display name
    pub name: String,
    /// Access level at issue time
    pub access_level: String,
    /// Permitted areas at issue time
    pub allowed_areas: Vec<String>,
    /// Issue time, epoch ms
    pub issued_at: i64,
    /// Soft expiry, epoch ms
    pub expires_at: i64,
    /// Fingerprint of the issuing device
    pub device_fingerprint: String,
    /// Payload format version
    pub version: String,
}

/// Outer envelope carried in the QR symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrEnvelope {
    /// Serialized [`QrPayload`]
    pub data: String,
    /// `hex(sha256(data + shared_secret))`
    pub signature: String,
    /// Issue time, epoch ms (drives the hard window)
    pub issued_at: i64,
}

impl QrEnvelope {
    /// Serialize for embedding in a QR symbol
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Envelope lacks `data`, `signature` or `issuedAt`
    Malformed,
    /// Envelope is older than the verification window
    ExpiredHard,
    /// Signature does not match `data`
    Tampered,
    /// Payload is past its `expiresAt`
    ExpiredSoft,
    /// Text or payload is not parseable
    InvalidData,
}

impl Rejection {
    /// Human-readable reason shown on a rejected scan
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::Malformed => "Invalid QR format",
            Rejection::ExpiredHard | Rejection::ExpiredSoft => "QR code expired",
            Rejection::Tampered => "QR code tampered",
            Rejection::InvalidData => "Invalid QR data",
        }
    }

    /// Whether either expiry horizon was crossed
    pub fn is_expired(&self) -> bool {
        matches!(self, Rejection::ExpiredHard | Rejection::ExpiredSoft)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Outcome of verifying a scanned token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Signature and both expiry checks passed
    Valid(QrPayload),
    /// Rejected; never retried, only reissued
    Invalid(Rejection),
}

impl Verification {
    /// Whether the token was accepted
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid(_))
    }

    /// Accepted payload, if any
    pub fn payload(&self) -> Option<&QrPayload> {
        match self {
            Verification::Valid(payload) => Some(payload),
            Verification::Invalid(_) => None,
        }
    }

    /// Rejection, if any
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Verification::Valid(_) => None,
            Verification::Invalid(rejection) => Some(*rejection),
        }
    }
}

/// Issues and verifies QR tokens with a shared secret
#[derive(Debug, Clone)]
pub struct TokenSigner {
    shared_secret: String,
    ttl_ms: i64,
    window_ms: i64,
    version: String,
}

impl TokenSigner {
    /// Create from config
    pub fn new(config: &GatePassConfig) -> Self {
        Self {
            shared_secret: config.shared_secret.clone(),
            ttl_ms: config.token_ttl_ms(),
            window_ms: config.verification_window_ms(),
            version: config.token_version.clone(),
        }
    }

    /// Signature over a serialized payload
    pub fn sign(&self, data: &str) -> String {
        hash_sha256_hex(&format!("{}{}", data, self.shared_secret))
    }

    /// Build the payload for `user` as issued at `now_ms`
    pub fn payload_for(&self, user: &UserRecord, fingerprint: &str, now_ms: i64) -> QrPayload {
        QrPayload {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            access_level: user.access_level.clone(),
            allowed_areas: user.allowed_areas.clone(),
            issued_at: now_ms,
            expires_at: now_ms.saturating_add(self.ttl_ms),
            device_fingerprint: fingerprint.to_string(),
            version: self.version.clone(),
        }
    }

    /// Sign an arbitrary payload into an envelope
    pub fn seal(&self, payload: &QrPayload) -> Result<QrEnvelope> {
        let data = serde_json::to_string(payload)?;
        let signature = self.sign(&data);
        Ok(QrEnvelope {
            data,
            signature,
            issued_at: payload.issued_at,
        })
    }

    /// Issue a token for `user` on the device with `fingerprint`
    pub fn issue(&self, user: &UserRecord, fingerprint: &str, now_ms: i64) -> Result<QrEnvelope> {
        let envelope = self.seal(&self.payload_for(user, fingerprint, now_ms))?;
        tracing::debug!("Issued QR token for user {} at {}", user.id, now_ms);
        Ok(envelope)
    }

    /// Verify scanned envelope text at `now_ms`. Never fails.
    pub fn verify(&self, text: &str, now_ms: i64) -> Verification {
        match self.check(text, now_ms) {
            Ok(payload) => Verification::Valid(payload),
            Err(rejection) => {
                tracing::debug!("Rejected QR token: {}", rejection);
                Verification::Invalid(rejection)
            }
        }
    }

    fn check(&self, text: &str, now_ms: i64) -> std::result::Result<QrPayload, Rejection> {
        let envelope = parse_envelope(text)?;

        if now_ms.saturating_sub(envelope.issued_at) > self.window_ms {
            return Err(Rejection::ExpiredHard);
        }

        if self.sign(&envelope.data) != envelope.signature {
            return Err(Rejection::Tampered);
        }

        let payload: QrPayload =
            serde_json::from_str(&envelope.data).map_err(|_| Rejection::InvalidData)?;

        if now_ms > payload.expires_at {
            return Err(Rejection::ExpiredSoft);
        }

        Ok(payload)
    }
}

// Empty strings and a zero timestamp count as missing
fn parse_envelope(text: &str) -> std::result::Result<QrEnvelope, Rejection> {
    let value: Value = serde_json::from_str(text).map_err(|_| Rejection::InvalidData)?;

    let data = value
        .get("data")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());
    let signature = value
        .get("signature")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());
    let issued_at = value
        .get("issuedAt")
        .and_then(Value::as_i64)
        .filter(|t| *t != 0);

    match (data, signature, issued_at) {
        (Some(data), Some(signature), Some(issued_at)) => Ok(QrEnvelope {
            data: data.to_string(),
            signature: signature.to_string(),
            issued_at,
        }),
        _ => Err(Rejection::Malformed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;
    const HOUR: i64 = 60 * 60 * 1000;

    fn user() -> UserRecord {
        UserRecord {
            id: 7,
            email: "john.athlete@sports.com".to_string(),
            name: "John Athlete".to_string(),
            phone: "+1-555-0101".to_string(),
            access_level: "General".to_string(),
            allowed_areas: vec!["Main Arena".to_string(), "Food Court".to_string()],
            is_active: true,
        }
    }

    fn signer() -> TokenSigner {
        TokenSigner::new(&GatePassConfig::default())
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer();
        let envelope = signer.issue(&user(), "fp", NOW).unwrap();
        assert_eq!(envelope.issued_at, NOW);

        let result = signer.verify(&envelope.to_json().unwrap(), NOW);
        let payload = result.payload().expect("valid").clone();
        assert_eq!(payload, signer.payload_for(&user(), "fp", NOW));
        assert_eq!(payload.expires_at, NOW + HOUR);
        assert_eq!(payload.version, "2.0");
        assert_eq!(payload.device_fingerprint, "fp");
    }

    #[test]
    fn test_wire_field_names() {
        let envelope = signer().issue(&user(), "fp", NOW).unwrap();
        let value: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert!(value.get("issuedAt").is_some());
        let inner: Value = serde_json::from_str(&envelope.data).unwrap();
        for field in [
            "userId",
            "email",
            "name",
            "accessLevel",
            "allowedAreas",
            "issuedAt",
            "expiresAt",
            "deviceFingerprint",
            "version",
        ] {
            assert!(inner.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_signature_is_sha256_of_data_and_secret() {
        let signer = signer();
        let envelope = signer.issue(&user(), "fp", NOW).unwrap();
        let expected = hash_sha256_hex(&format!(
            "{}{}",
            envelope.data,
            crate::config::DEFAULT_SHARED_SECRET
        ));
        assert_eq!(envelope.signature, expected);
    }

    #[test]
    fn test_tampered_data() {
        let signer = signer();
        let mut envelope = signer.issue(&user(), "fp", NOW).unwrap();
        envelope.data = envelope.data.replace("General", "VIP");

        assert_eq!(
            signer.verify(&envelope.to_json().unwrap(), NOW).rejection(),
            Some(Rejection::Tampered)
        );
    }

    #[test]
    fn test_reserialized_data_is_tampered() {
        let signer = signer();
        let mut envelope = signer.issue(&user(), "fp", NOW).unwrap();
        let value: Value = serde_json::from_str(&envelope.data).unwrap();
        envelope.data = serde_json::to_string_pretty(&value).unwrap();

        assert_eq!(
            signer.verify(&envelope.to_json().unwrap(), NOW).rejection(),
            Some(Rejection::Tampered)
        );
    }

    #[test]
    fn test_wrong_secret_is_tampered() {
        let envelope = signer().issue(&user(), "fp", NOW).unwrap();
        let other = TokenSigner::new(&GatePassConfig {
            shared_secret: "another".to_string(),
            ..Default::default()
        });
        assert_eq!(
            other.verify(&envelope.to_json().unwrap(), NOW).rejection(),
            Some(Rejection::Tampered)
        );
    }

    #[test]
    fn test_hard_window() {
        let signer = signer();
        let envelope = signer.issue(&user(), "fp", NOW - 25 * HOUR).unwrap();
        let result = signer.verify(&envelope.to_json().unwrap(), NOW);
        assert_eq!(result.rejection(), Some(Rejection::ExpiredHard));
        assert_eq!(result.rejection().unwrap().reason(), "QR code expired");

        // Exactly at the window edge is still inside it
        let envelope = signer.issue(&user(), "fp", NOW - 24 * HOUR).unwrap();
        assert_eq!(
            signer.verify(&envelope.to_json().unwrap(), NOW).rejection(),
            Some(Rejection::ExpiredSoft)
        );
    }

    #[test]
    fn test_hard_window_checked_before_signature() {
        let signer = signer();
        let mut envelope = signer.issue(&user(), "fp", NOW - 25 * HOUR).unwrap();
        envelope.signature = "forged".to_string();
        assert_eq!(
            signer.verify(&envelope.to_json().unwrap(), NOW).rejection(),
            Some(Rejection::ExpiredHard)
        );
    }

    #[test]
    fn test_soft_window_with_skewed_payload() {
        let signer = signer();
        let issued = NOW - 10 * 60 * 1000;
        let mut payload = signer.payload_for(&user(), "fp", issued);
        payload.expires_at = NOW - 1;
        let envelope = signer.seal(&payload).unwrap();

        let result = signer.verify(&envelope.to_json().unwrap(), NOW);
        assert_eq!(result.rejection(), Some(Rejection::ExpiredSoft));
        assert_eq!(result.rejection().unwrap().to_string(), "QR code expired");

        // Still valid at the expiry instant itself
        assert!(signer.verify(&envelope.to_json().unwrap(), NOW - 1).is_valid());
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let signer = signer();
        let cases = [
            json!({ "signature": "abc", "issuedAt": NOW }),
            json!({ "data": "{}", "issuedAt": NOW }),
            json!({ "data": "{}", "signature": "abc" }),
            json!({ "data": "", "signature": "abc", "issuedAt": NOW }),
            json!({ "data": "{}", "signature": "abc", "issuedAt": 0 }),
            json!({ "data": 5, "signature": "abc", "issuedAt": NOW }),
            json!([1, 2, 3]),
            json!("just a string"),
        ];
        for case in cases {
            let result = signer.verify(&case.to_string(), NOW);
            assert_eq!(result.rejection(), Some(Rejection::Malformed), "{case}");
            assert_eq!(result.rejection().unwrap().reason(), "Invalid QR format");
        }
    }

    #[test]
    fn test_unparseable_text_is_invalid_data() {
        let signer = signer();
        for text in ["", "not json", "{\"data\":", "https://example.com/ticket"] {
            let result = signer.verify(text, NOW);
            assert_eq!(result.rejection(), Some(Rejection::InvalidData), "{text}");
            assert_eq!(result.rejection().unwrap().reason(), "Invalid QR data");
        }
    }

    #[test]
    fn test_signed_garbage_payload_is_invalid_data() {
        let signer = signer();
        let data = "{\"not\":\"a payload\"}";
        let text = json!({
            "data": data,
            "signature": signer.sign(data),
            "issuedAt": NOW,
        })
        .to_string();
        assert_eq!(
            signer.verify(&text, NOW).rejection(),
            Some(Rejection::InvalidData)
        );
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let signer = TokenSigner::new(&GatePassConfig {
            token_ttl_secs: u64::MAX,
            verification_window_secs: u64::MAX,
            ..Default::default()
        });
        let payload = signer.payload_for(&user(), "fp", NOW);
        assert_eq!(payload.expires_at, i64::MAX);

        let envelope = signer.seal(&payload).unwrap();
        assert!(signer.verify(&envelope.to_json().unwrap(), NOW).is_valid());
    }

    #[test]
    fn test_extreme_issued_at_does_not_overflow() {
        let signer = signer();
        let text = json!({ "data": "{}", "signature": "abc", "issuedAt": i64::MIN }).to_string();
        assert_eq!(
            signer.verify(&text, NOW).rejection(),
            Some(Rejection::ExpiredHard)
        );
    }
}
