//! Device identity.
//!
//! Every activation request carries a stable per-install identifier so the
//! server can tell a returning device from a new one. The identifier is
//! created once, on the first activation attempt, and never regenerated
//! while a non-blank one is persisted.

use crate::status::ActivationStatus;
use codegate_types::DeviceId;
use sha2::{Digest, Sha256};
use tracing::info;

type PlatformSource = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Produces the device identity, creating it on first use.
pub struct DeviceIdentity {
    platform: PlatformSource,
}

impl DeviceIdentity {
    /// Uses the OS machine id as the stable platform identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(platform_device_id)
    }

    /// Uses a custom platform identifier source.
    pub fn with_source<F>(source: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Self {
            platform: Box::new(source),
        }
    }

    /// Returns the persisted identity, or creates one and writes it into
    /// `status`.
    ///
    /// The caller must save `status` before using a newly created id.
    /// Returns the id and whether it was created by this call.
    pub fn get_or_create(&self, status: &mut ActivationStatus) -> (DeviceId, bool) {
        if let Ok(existing) = DeviceId::parse(&status.device_id) {
            return (existing, false);
        }

        let id = (self.platform)()
            .and_then(|raw| DeviceId::parse(&raw).ok())
            .unwrap_or_else(|| {
                info!("No platform device id available, using a random one");
                DeviceId::random()
            });

        info!("Created device identity {}", id.redacted());
        status.device_id = id.as_str().to_string();
        (id, true)
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIdentity").finish_non_exhaustive()
    }
}

/// Files holding the systemd/dbus machine id, in lookup order.
#[cfg(target_os = "linux")]
const MACHINE_ID_FILES: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Derives a device id from the OS machine id.
///
/// Returns `None` when the platform exposes no machine id.
#[must_use]
pub fn platform_device_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    let raw = MACHINE_ID_FILES
        .iter()
        .find_map(|path| std::fs::read_to_string(path).ok());

    // ioreg prints `"IOPlatformUUID" = "XXXXXXXX-..."` for the platform expert.
    #[cfg(target_os = "macos")]
    let raw = std::process::Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .and_then(|text| {
            text.lines()
                .filter(|line| line.contains("IOPlatformUUID"))
                .find_map(|line| line.rsplit_once('='))
                .map(|(_, value)| value.trim().trim_matches('"').to_string())
        });

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    let raw: Option<String> = None;

    raw.as_deref().and_then(device_id_from_machine_id)
}

/// Hashes a raw machine id into a device id, so the raw value never leaves
/// the device. Blank input yields `None`.
#[must_use]
pub fn device_id_from_machine_id(machine_id: &str) -> Option<String> {
    let machine_id = machine_id.trim();
    if machine_id.is_empty() {
        return None;
    }

    let mut hasher = Sha256::new();
    hasher.update(b"codegate-device|");
    hasher.update(machine_id.as_bytes());
    let hash = hasher.finalize();

    Some(hex::encode(&hash[..16]))
}
