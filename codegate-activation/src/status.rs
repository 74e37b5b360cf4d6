//! Persisted activation status.
//!
//! The status record is loaded once when the activator is built and saved on
//! every mutation. Field names on disk match the keys the app settings have
//! always used (`authCode`, `authDeviceId`, ...).

use crate::error::{ActivationError, ActivationResult};
use chrono::{DateTime, Utc};
use codegate_types::ProfileId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// File name used by [`JsonStatusStore::default_path`].
pub const STATUS_FILE_NAME: &str = "activation.json";

/// Persisted activation state for this installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationStatus {
    /// Last code the user entered, successful or not. Used only to prefill
    /// the input on re-entry.
    #[serde(rename = "authCode")]
    pub last_code: String,
    /// Device identity. Blank means "not yet created".
    #[serde(rename = "authDeviceId")]
    pub device_id: String,
    /// Set once a credential has been turned into a profile.
    #[serde(rename = "authActivated")]
    pub activated: bool,
    /// Profile created by the last successful activation.
    #[serde(rename = "selectedProxyId")]
    pub selected_profile_id: Option<ProfileId>,
    /// Profile the host should treat as current.
    #[serde(rename = "currentProfileId")]
    pub current_profile_id: Option<ProfileId>,
    /// When activation succeeded.
    #[serde(rename = "activatedAt")]
    pub activated_at: Option<DateTime<Utc>>,
}

impl ActivationStatus {
    /// Returns the selected profile if it is a real (non-zero) id.
    #[must_use]
    pub fn selected_profile(&self) -> Option<ProfileId> {
        self.selected_profile_id.filter(ProfileId::is_valid)
    }

    /// The profile left by a completed activation, if any.
    #[must_use]
    pub fn activated_profile(&self) -> Option<ProfileId> {
        self.selected_profile().filter(|_| self.activated)
    }

    /// True when activation completed and left a usable profile behind.
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.activated_profile().is_some()
    }

    /// Records a successful activation.
    pub fn mark_activated(&mut self, profile_id: ProfileId) {
        self.selected_profile_id = Some(profile_id);
        self.current_profile_id = Some(profile_id);
        self.activated = true;
        self.activated_at = Some(Utc::now());
    }
}

/// Load/save backend for [`ActivationStatus`].
pub trait StatusStore: Send + Sync {
    /// Loads the status. A store with nothing saved yet returns the default.
    fn load(&self) -> ActivationResult<ActivationStatus>;

    /// Replaces the stored status with `status` as a single write.
    fn save(&self, status: &ActivationStatus) -> ActivationResult<()>;
}

/// Status stored as a JSON file.
///
/// Saves go to a sibling temp file which is then renamed over the target, so a
/// crash mid-write leaves the previous status intact.
#[derive(Debug, Clone)]
pub struct JsonStatusStore {
    path: PathBuf,
}

impl JsonStatusStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Opens the store in `dir` under [`STATUS_FILE_NAME`].
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATUS_FILE_NAME))
    }

    /// Returns the platform data directory for codegate, e.g.
    /// `~/.local/share/codegate` on Linux.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("codegate"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| STATUS_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatusStore for JsonStatusStore {
    fn load(&self) -> ActivationResult<ActivationStatus> {
        if !self.path.exists() {
            debug!("No activation status at {:?}, starting fresh", self.path);
            return Ok(ActivationStatus::default());
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            ActivationError::Storage(format!("failed to read {}: {e}", self.path.display()))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, status: &ActivationStatus) -> ActivationResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(status)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory status store, for hosts that persist elsewhere and for tests.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    status: Mutex<ActivationStatus>,
    saves: Mutex<usize>,
}

impl MemoryStatusStore {
    #[must_use]
    pub fn new(status: ActivationStatus) -> Self {
        Self {
            status: Mutex::new(status),
            saves: Mutex::new(0),
        }
    }

    /// Returns the last saved status.
    #[must_use]
    pub fn snapshot(&self) -> ActivationStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatusStore for MemoryStatusStore {
    fn load(&self) -> ActivationResult<ActivationStatus> {
        Ok(self.snapshot())
    }

    fn save(&self, status: &ActivationStatus) -> ActivationResult<()> {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status.clone();
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
