//! End-to-end token tests over a seeded store
//!
//! Tests cover:
//! - Issue/verify round trip for seeded users
//! - Tamper detection on the transmitted data
//! - Hard (24h) and soft (1h) expiry horizons
//! - Cross-service verification with a shared secret

use gatepass_core::storage::{Database, FileSecretStore, MemorySecretStore};
use gatepass_core::{
    AccessService, DeviceInfo, GatePassConfig, ManualClock, QrEnvelope, Rejection, StaticDevice,
};
use std::sync::Arc;

const NOW: i64 = 1_750_000_000_000;
const MINUTE: i64 = 60 * 1000;
const HOUR: i64 = 60 * MINUTE;

fn service_at(clock: Arc<ManualClock>, config: GatePassConfig) -> AccessService {
    let service = AccessService::new(
        Database::open_in_memory().unwrap(),
        Arc::new(MemorySecretStore::new()),
        config,
    )
    .unwrap()
    .with_device(Arc::new(StaticDevice(DeviceInfo::new(
        "BUILD-1",
        "Gate Phone",
        "Android 14",
    ))))
    .with_clock(clock);
    service.initialize().unwrap();
    service
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn test_every_seeded_user_round_trips() {
    let clock = Arc::new(ManualClock::new(NOW));
    let service = service_at(clock, GatePassConfig::default());

    for user in service.list_users().unwrap() {
        let envelope = service.issue_token(&user).unwrap();
        let verification = service.verify_token(&envelope.to_json().unwrap());
        let payload = verification.payload().expect("fresh token is valid");

        assert_eq!(payload.user_id, user.id);
        assert_eq!(payload.email, user.email);
        assert_eq!(payload.access_level, user.access_level);
        assert_eq!(payload.allowed_areas, user.allowed_areas);
        assert_eq!(payload.issued_at, NOW);
        assert_eq!(payload.expires_at, NOW + HOUR);
        assert_eq!(payload.version, "2.0");
    }
}

#[test]
fn test_scanner_with_same_secret_accepts() {
    let issuer = service_at(Arc::new(ManualClock::new(NOW)), GatePassConfig::default());
    let scanner = service_at(
        Arc::new(ManualClock::new(NOW + 5 * MINUTE)),
        GatePassConfig::default(),
    );

    let user = issuer.find_user("lisa.security@sports.com").unwrap().unwrap();
    let text = issuer.issue_token(&user).unwrap().to_json().unwrap();
    assert!(scanner.verify_token(&text).is_valid());
}

#[test]
fn test_scanner_with_other_secret_rejects() {
    let issuer = service_at(Arc::new(ManualClock::new(NOW)), GatePassConfig::default());
    let scanner = service_at(
        Arc::new(ManualClock::new(NOW)),
        GatePassConfig {
            shared_secret: "rotated-secret".to_string(),
            ..Default::default()
        },
    );

    let user = issuer.find_user("lisa.security@sports.com").unwrap().unwrap();
    let text = issuer.issue_token(&user).unwrap().to_json().unwrap();
    assert_eq!(
        scanner.verify_token(&text).rejection(),
        Some(Rejection::Tampered)
    );
}

// =============================================================================
// Expiry
// =============================================================================

#[test]
fn test_token_issued_25_hours_ago_is_hard_expired() {
    let clock = Arc::new(ManualClock::new(NOW - 25 * HOUR));
    let service = service_at(clock.clone(), GatePassConfig::default());
    let user = service.find_user("john.athlete@sports.com").unwrap().unwrap();
    let text = service.issue_token(&user).unwrap().to_json().unwrap();

    clock.set(NOW);
    let verification = service.verify_token(&text);
    assert_eq!(verification.rejection(), Some(Rejection::ExpiredHard));
    assert_eq!(verification.rejection().unwrap().reason(), "QR code expired");
}

#[test]
fn test_token_is_soft_expired_after_an_hour() {
    let clock = Arc::new(ManualClock::new(NOW));
    let service = service_at(clock.clone(), GatePassConfig::default());
    let user = service.find_user("emma.fan@sports.com").unwrap().unwrap();
    let text = service.issue_token(&user).unwrap().to_json().unwrap();

    clock.set(NOW + HOUR);
    assert!(service.verify_token(&text).is_valid());

    clock.set(NOW + HOUR + 1);
    assert_eq!(
        service.verify_token(&text).rejection(),
        Some(Rejection::ExpiredSoft)
    );
}

#[test]
fn test_custom_ttl_from_config() {
    let clock = Arc::new(ManualClock::new(NOW));
    let service = service_at(
        clock.clone(),
        GatePassConfig {
            token_ttl_secs: 60,
            ..Default::default()
        },
    );
    let user = service.find_user("emma.fan@sports.com").unwrap().unwrap();
    let text = service.issue_token(&user).unwrap().to_json().unwrap();

    clock.advance_ms(2 * MINUTE);
    assert!(service.verify_token(&text).rejection().unwrap().is_expired());
}

// =============================================================================
// Tampering
// =============================================================================

#[test]
fn test_upgraded_access_level_is_tampered() {
    let clock = Arc::new(ManualClock::new(NOW));
    let service = service_at(clock, GatePassConfig::default());
    let user = service.find_user("john.athlete@sports.com").unwrap().unwrap();
    let envelope = service.issue_token(&user).unwrap();

    let forged = QrEnvelope {
        data: envelope
            .data
            .replace("\"accessLevel\":\"General\"", "\"accessLevel\":\"Management\""),
        ..envelope
    };
    assert_ne!(forged.data, service.issue_token(&user).unwrap().data);
    assert_eq!(
        service.verify_token(&forged.to_json().unwrap()).rejection(),
        Some(Rejection::Tampered)
    );
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_session_survives_restart_with_file_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("gatepass.db");
    let secrets_path = dir.path().join("secrets.json");
    let clock = Arc::new(ManualClock::new(NOW));

    {
        let service = AccessService::new(
            Database::open(&db_path).unwrap(),
            Arc::new(FileSecretStore::new(&secrets_path)),
            GatePassConfig::default(),
        )
        .unwrap()
        .with_clock(clock.clone());
        service.initialize().unwrap();
        service.login("david.manager@sports.com").unwrap().unwrap();
    }

    let service = AccessService::new(
        Database::open(&db_path).unwrap(),
        Arc::new(FileSecretStore::new(&secrets_path)),
        GatePassConfig::default(),
    )
    .unwrap()
    .with_clock(clock);
    service.initialize().unwrap();

    let user = service.restore_session().expect("session restored");
    assert_eq!(user.access_level, "Management");
}
