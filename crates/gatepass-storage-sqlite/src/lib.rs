//! SQLite storage for GatePass
//!
//! Local persistence for venue access records plus the secret-store backed
//! pieces that sit next to it.
//!
//! ## Contents
//!
//! - **Record store**: `users` table with a JSON list column; inactive rows
//!   never leave the store
//! - **Seed provisioning**: first-run demo dataset, kept in the secret store
//!   as a reversibly obfuscated blob (not encryption)
//! - **Session bookkeeping**: remembered email, login recency, session token
//! - **Secret store**: trait over the platform secure storage with memory
//!   and JSON-file implementations

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod database;
pub mod error;
pub mod migrations;
pub mod models;
pub mod obfuscation;
pub mod secret_store;
pub mod seed;
pub mod session;
pub mod users;

pub use database::Database;
pub use error::{Error, Result};
pub use models::{normalize_email, NewUserRecord, UserRecord};
pub use obfuscation::{generate_salt, hash_sha256_hex, SeedObfuscator};
pub use secret_store::{keys, FileSecretStore, MemorySecretStore, SecretStore};
pub use seed::{demo_users, SeedOutcome, SeedProvisioner};
pub use session::{SessionStore, DEFAULT_RECENCY_MS};
pub use users::{UserStorage, FALLBACK_ACCESS_LEVELS, FALLBACK_AREAS};
