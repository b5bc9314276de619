//! Access service
//!
//! One handle owning the record store. Callers construct it with the secret
//! store, device source and clock it should use.

use crate::clock::{Clock, SystemClock};
use crate::config::GatePassConfig;
use crate::device::{DeviceInfoSource, HostDevice};
use crate::token::{QrEnvelope, TokenSigner, Verification};
use crate::Result;
use gatepass_storage_sqlite::{
    normalize_email, Database, SecretStore, SeedObfuscator, SeedOutcome, SeedProvisioner,
    SessionStore, UserRecord, UserStorage,
};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;

/// Session token length in random bytes
const SESSION_TOKEN_BYTES: usize = 32;

/// Record store, seeding, sessions and QR tokens behind one handle
pub struct AccessService {
    db: Database,
    secrets: Arc<dyn SecretStore>,
    device: Arc<dyn DeviceInfoSource>,
    clock: Arc<dyn Clock>,
    config: GatePassConfig,
    signer: TokenSigner,
    obfuscator: SeedObfuscator,
}

impl AccessService {
    /// Create a service on the host device and system clock
    pub fn new(db: Database, secrets: Arc<dyn SecretStore>, config: GatePassConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            db,
            secrets,
            device: Arc::new(HostDevice),
            clock: Arc::new(SystemClock),
            signer: TokenSigner::new(&config),
            obfuscator: SeedObfuscator::new(config.app_constant.clone()),
            config,
        })
    }

    /// Use a different device identity source
    pub fn with_device(mut self, device: Arc<dyn DeviceInfoSource>) -> Self {
        self.device = device;
        self
    }

    /// Use a different clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &GatePassConfig {
        &self.config
    }

    /// Record store view
    pub fn users(&self) -> UserStorage<'_> {
        UserStorage::new(&self.db)
    }

    /// Session bookkeeping view
    pub fn session(&self) -> SessionStore<'_> {
        SessionStore::new(self.secrets.as_ref()).with_recency_ms(self.config.login_recency_ms())
    }

    fn provisioner(&self) -> SeedProvisioner<'_> {
        SeedProvisioner::new(&self.db, self.secrets.as_ref(), &self.obfuscator)
    }

    /// Ensure the schema exists and seed the store on first run.
    ///
    /// Fails only when the store itself is unusable.
    pub fn initialize(&self) -> Result<SeedOutcome> {
        self.users().initialize()?;
        let outcome = self.provisioner().ensure_seeded()?;
        tracing::info!("Access store ready: {:?}", outcome);
        Ok(outcome)
    }

    /// Delete every record and the stored seed, then regenerate
    pub fn reset(&self) -> Result<SeedOutcome> {
        tracing::warn!("Resetting access store to demo data");
        Ok(self.provisioner().reset()?)
    }

    /// Look up an active user; the email is normalized first
    pub fn find_user(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self.users().find_by_email(&normalize_email(email))?)
    }

    /// All active users
    pub fn list_users(&self) -> Result<Vec<UserRecord>> {
        Ok(self.users().list_active()?)
    }

    /// Sorted distinct access levels (fallback list if unreadable)
    pub fn access_levels(&self) -> Vec<String> {
        self.users().distinct_access_levels()
    }

    /// Sorted distinct areas (fallback list if unreadable)
    pub fn areas(&self) -> Vec<String> {
        self.users().distinct_areas()
    }

    /// Log in by email.
    ///
    /// On a hit the email and login time are remembered and a fresh session
    /// token is stored. Returns `None` for unknown or inactive users.
    pub fn login(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = normalize_email(email);
        let Some(user) = self.users().find_by_email(&email)? else {
            tracing::info!("Login refused for unknown email");
            return Ok(None);
        };

        let session = self.session();
        session.remember_email(&user.email, self.clock.now_ms());
        session.store_token(&new_session_token());
        tracing::info!("User {} logged in", user.id);
        Ok(Some(user))
    }

    /// Drop the session token; optionally forget the remembered email too
    pub fn logout(&self, forget_email: bool) {
        let session = self.session();
        session.clear_token();
        if forget_email {
            session.clear_remembered_email();
        }
    }

    /// User of the remembered session, if it is recent and still holds a
    /// token. Store failures read as "no session".
    pub fn restore_session(&self) -> Option<UserRecord> {
        let session = self.session();
        session.token()?;
        if !session.is_recent_login(self.clock.now_ms()) {
            return None;
        }
        let email = session.remembered_email()?;

        match self.users().find_by_email(&email) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Could not restore session: {}", e);
                None
            }
        }
    }

    /// Fingerprint of the current device
    pub fn device_fingerprint(&self) -> String {
        crate::device::compute_device_fingerprint(self.device.as_ref())
    }

    /// Issue a signed QR token for `user` on this device, now
    pub fn issue_token(&self, user: &UserRecord) -> Result<QrEnvelope> {
        self.signer.issue(user, &self.device_fingerprint(), self.clock.now_ms())
    }

    /// Verify scanned envelope text against the current time
    pub fn verify_token(&self, text: &str) -> Verification {
        self.signer.verify(text, self.clock.now_ms())
    }
}

fn new_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
