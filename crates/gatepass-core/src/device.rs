//! Device identity and fingerprinting
//!
//! The fingerprint binds an issued QR payload to the device that showed it.
//! It is `hex(sha256("{device_id}-{device_name}-{os_version}"))`, with each
//! missing signal replaced by `unknown`. It is never persisted.

use gatepass_storage_sqlite::hash_sha256_hex;

/// Placeholder for an unavailable device signal
pub const UNKNOWN: &str = "unknown";

/// Raw device identity signals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Platform build / installation ID
    pub device_id: Option<String>,
    /// User-visible device name
    pub device_name: Option<String>,
    /// OS version string
    pub os_version: Option<String>,
}

impl DeviceInfo {
    /// Create from all three signals
    pub fn new(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        os_version: impl Into<String>,
    ) -> Self {
        Self {
            device_id: Some(device_id.into()),
            device_name: Some(device_name.into()),
            os_version: Some(os_version.into()),
        }
    }

    /// Hash the signals into a fingerprint
    pub fn fingerprint(&self) -> String {
        fn signal(value: &Option<String>) -> &str {
            match value.as_deref() {
                Some(v) if !v.trim().is_empty() => v,
                _ => UNKNOWN,
            }
        }

        let material = format!(
            "{}-{}-{}",
            signal(&self.device_id),
            signal(&self.device_name),
            signal(&self.os_version)
        );
        hash_sha256_hex(&material)
    }
}

/// Provides the current device's identity signals
pub trait DeviceInfoSource: Send + Sync {
    /// Read the signals; unavailable ones are `None`
    fn device_info(&self) -> DeviceInfo;
}

/// Fixed device identity (tests, embedding hosts that already know it)
#[derive(Debug, Clone, Default)]
pub struct StaticDevice(pub DeviceInfo);

impl DeviceInfoSource for StaticDevice {
    fn device_info(&self) -> DeviceInfo {
        self.0.clone()
    }
}

/// Identity of the machine this process runs on
#[derive(Debug, Clone, Copy, Default)]
pub struct HostDevice;

impl HostDevice {
    fn machine_id() -> Option<String> {
        ["/etc/machine-id", "/var/lib/dbus/machine-id"]
            .iter()
            .find_map(|path| std::fs::read_to_string(path).ok())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
    }

    fn host_name() -> Option<String> {
        std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .ok()
            .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    }

    fn os_version() -> Option<String> {
        let release = std::fs::read_to_string("/proc/sys/kernel/osrelease")
            .ok()
            .map(|r| r.trim().to_string());
        Some(match release {
            Some(r) if !r.is_empty() => format!("{} {}", std::env::consts::OS, r),
            _ => std::env::consts::OS.to_string(),
        })
    }
}

impl DeviceInfoSource for HostDevice {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            device_id: Self::machine_id(),
            device_name: Self::host_name(),
            os_version: Self::os_version(),
        }
    }
}

/// Fingerprint of whatever device `source` describes
pub fn compute_device_fingerprint(source: &dyn DeviceInfoSource) -> String {
    source.device_info().fingerprint()
}
