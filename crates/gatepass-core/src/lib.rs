//! GatePass Core - credential and QR token logic
//!
//! This crate provides:
//! - Device fingerprinting from platform identity signals
//! - Signed, time-bound QR access tokens (issue and verify)
//! - The [`AccessService`] handle tying store, sessions and tokens together
//! - Configuration of the embedded secrets and expiry horizons

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod service;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GatePassConfig;
pub use device::{compute_device_fingerprint, DeviceInfo, DeviceInfoSource, HostDevice, StaticDevice};
pub use error::{Error, Result};
pub use service::AccessService;
pub use token::{QrEnvelope, QrPayload, Rejection, TokenSigner, Verification};

pub use gatepass_storage_sqlite as storage;
