//! Command handlers
//!
//! Each handler writes human-readable output to `out` so it can be tested
//! without a terminal.

use anyhow::{bail, Context};
use gatepass_core::storage::{SeedOutcome, UserRecord};
use gatepass_core::{AccessService, Verification};
use std::io::{Read, Write};

fn describe(outcome: SeedOutcome) -> String {
    match outcome {
        SeedOutcome::AlreadyPopulated => "Access store already populated".to_string(),
        SeedOutcome::Restored { inserted } => {
            format!("Restored {} users from stored seed", inserted)
        }
        SeedOutcome::Generated { inserted } => format!("Seeded {} demo users", inserted),
    }
}

fn write_user(out: &mut impl Write, user: &UserRecord) -> anyhow::Result<()> {
    writeln!(
        out,
        "{:>3}  {:<28} {:<16} {:<11} {}",
        user.id,
        user.email,
        user.name,
        user.access_level,
        user.allowed_areas.join(", ")
    )?;
    Ok(())
}

/// Seed on first run and report what happened
pub fn init(service: &AccessService, out: &mut impl Write) -> anyhow::Result<()> {
    let outcome = service.initialize().context("initializing access store")?;
    writeln!(out, "{}", describe(outcome))?;
    Ok(())
}

/// Wipe and reseed
pub fn reset(service: &AccessService, out: &mut impl Write) -> anyhow::Result<()> {
    let outcome = service.reset().context("resetting access store")?;
    writeln!(out, "{}", describe(outcome))?;
    Ok(())
}

/// List active users
pub fn users(service: &AccessService, json: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let users = service.list_users()?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&users)?)?;
        return Ok(());
    }
    for user in &users {
        write_user(out, user)?;
    }
    Ok(())
}

/// List distinct access levels
pub fn levels(service: &AccessService, out: &mut impl Write) -> anyhow::Result<()> {
    for level in service.access_levels() {
        writeln!(out, "{}", level)?;
    }
    Ok(())
}

/// List distinct areas
pub fn areas(service: &AccessService, out: &mut impl Write) -> anyhow::Result<()> {
    for area in service.areas() {
        writeln!(out, "{}", area)?;
    }
    Ok(())
}

/// Log in by email
pub fn login(service: &AccessService, email: &str, out: &mut impl Write) -> anyhow::Result<()> {
    match service.login(email)? {
        Some(user) => {
            writeln!(out, "Logged in as {} ({})", user.name, user.access_level)?;
            Ok(())
        }
        None => bail!("no active user with email {}", email.trim()),
    }
}

/// End the current session
pub fn logout(service: &AccessService, forget: bool, out: &mut impl Write) -> anyhow::Result<()> {
    service.logout(forget);
    writeln!(out, "Logged out")?;
    Ok(())
}

/// Show the user of the current session
pub fn whoami(service: &AccessService, out: &mut impl Write) -> anyhow::Result<()> {
    match service.restore_session() {
        Some(user) => write_user(out, &user),
        None => {
            writeln!(out, "Not logged in")?;
            Ok(())
        }
    }
}

/// Issue a token for `email`, or for the session user
pub fn issue(service: &AccessService, email: Option<&str>, out: &mut impl Write) -> anyhow::Result<()> {
    let user = match email {
        Some(email) => service.find_user(email)?,
        None => service.restore_session(),
    };
    let Some(user) = user else {
        bail!("no user to issue for; log in or pass --email");
    };

    let envelope = service.issue_token(&user)?;
    writeln!(out, "{}", envelope.to_json()?)?;
    Ok(())
}

/// Verify envelope text. Returns whether the token was accepted.
pub fn verify(service: &AccessService, text: &str, out: &mut impl Write) -> anyhow::Result<bool> {
    match service.verify_token(text.trim()) {
        Verification::Valid(payload) => {
            writeln!(out, "VALID  {} <{}>", payload.name, payload.email)?;
            writeln!(out, "  access level: {}", payload.access_level)?;
            writeln!(out, "  areas:        {}", payload.allowed_areas.join(", "))?;
            writeln!(out, "  expires at:   {}", payload.expires_at)?;
            Ok(true)
        }
        Verification::Invalid(rejection) => {
            writeln!(out, "REJECTED  {}", rejection.reason())?;
            Ok(false)
        }
    }
}

/// Print the device fingerprint
pub fn fingerprint(service: &AccessService, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "{}", service.device_fingerprint())?;
    Ok(())
}

/// Read a token from stdin
pub fn read_stdin() -> anyhow::Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("reading token from stdin")?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatepass_core::storage::{Database, MemorySecretStore};
    use gatepass_core::{DeviceInfo, GatePassConfig, StaticDevice};
    use std::sync::Arc;

    fn fresh_service() -> AccessService {
        AccessService::new(
            Database::open_in_memory().unwrap(),
            Arc::new(MemorySecretStore::new()),
            GatePassConfig::default(),
        )
        .unwrap()
        .with_device(Arc::new(StaticDevice(DeviceInfo::new("id", "desk", "linux"))))
    }

    fn service() -> AccessService {
        let service = fresh_service();
        service.initialize().unwrap();
        service
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_users_table_and_json() {
        let service = service();
        let table = output(|out| users(&service, false, out));
        assert_eq!(table.lines().count(), 10);
        assert!(table.contains("john.athlete@sports.com"));

        let json = output(|out| users(&service, true, out));
        let parsed: Vec<UserRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 10);
    }

    #[test]
    fn test_login_issue_verify_flow() {
        let service = service();
        let text = output(|out| login(&service, "Sarah.VIP@sports.com", out));
        assert!(text.contains("Sarah Johnson"));

        let token = output(|out| issue(&service, None, out));
        let mut buf = Vec::new();
        assert!(verify(&service, &token, &mut buf).unwrap());
        assert!(String::from_utf8(buf).unwrap().starts_with("VALID"));
    }

    #[test]
    fn test_verify_rejection_reason() {
        let service = service();
        let mut buf = Vec::new();
        assert!(!verify(&service, "{}", &mut buf).unwrap());
        assert_eq!(String::from_utf8(buf).unwrap().trim(), "REJECTED  Invalid QR format");
    }

    #[test]
    fn test_issue_without_session_fails() {
        let service = service();
        let mut buf = Vec::new();
        assert!(issue(&service, None, &mut buf).is_err());
        assert!(login(&service, "nobody@sports.com", &mut buf).is_err());
    }

    #[test]
    fn test_levels_and_whoami() {
        let service = service();
        let listed = output(|out| levels(&service, out));
        assert_eq!(listed.lines().next(), Some("General"));

        assert_eq!(output(|out| whoami(&service, out)).trim(), "Not logged in");
        output(|out| login(&service, "mike.staff@sports.com", out));
        assert!(output(|out| whoami(&service, out)).contains("mike.staff@sports.com"));

        output(|out| logout(&service, true, out));
        assert_eq!(output(|out| whoami(&service, out)).trim(), "Not logged in");
    }

    #[test]
    fn test_init_reports_seeding_once() {
        let service = fresh_service();
        assert_eq!(output(|out| init(&service, out)).trim(), "Seeded 10 demo users");
        assert_eq!(
            output(|out| init(&service, out)).trim(),
            "Access store already populated"
        );
    }

    #[test]
    fn test_reset_on_fresh_store_seeds_once() {
        let service = fresh_service();
        assert_eq!(output(|out| reset(&service, out)).trim(), "Seeded 10 demo users");
        assert_eq!(service.list_users().unwrap().len(), 10);
    }
}
