//! Activation configuration.

use crate::error::{ActivationError, ActivationResult};
use codegate_types::GroupId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Timeout budgets for the activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportTimeouts {
    /// Whole call, from connect to the last body byte.
    pub call_secs: u64,
    /// Connection establishment (TCP + TLS).
    pub connect_secs: u64,
    /// Idle time between reads of the response.
    pub read_secs: u64,
}

impl TransportTimeouts {
    #[must_use]
    pub fn call(&self) -> Duration {
        Duration::from_secs(self.call_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    #[must_use]
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        Self {
            call_secs: 15,
            connect_secs: 10,
            read_secs: 15,
        }
    }
}

/// Configuration for the activation flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// Activation endpoint, e.g. `https://auth.example.com/login`.
    pub endpoint: String,
    /// Group that newly activated profiles are created in.
    pub default_group: GroupId,
    /// Request timeouts.
    pub timeouts: TransportTimeouts,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            default_group: GroupId::default(),
            timeouts: TransportTimeouts::default(),
        }
    }
}

impl ActivationConfig {
    /// Creates a config for the given endpoint with default timeouts.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Loads a config from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ActivationError::Config`] if the file cannot be read or is
    /// not valid JSON.
    pub fn load(path: &Path) -> ActivationResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ActivationError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ActivationError::Config(format!("invalid config {}: {e}", path.display()))
        })
    }

    /// Checks that the endpoint is set and uses http(s), and that no timeout
    /// is zero.
    ///
    /// # Errors
    ///
    /// Returns [`ActivationError::Config`] describing the first problem found.
    pub fn validate(&self) -> ActivationResult<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ActivationError::Config("endpoint is not set".to_string()));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ActivationError::Config(format!(
                "endpoint must be an http(s) URL: {endpoint}"
            )));
        }
        let t = &self.timeouts;
        if t.call_secs == 0 || t.connect_secs == 0 || t.read_secs == 0 {
            return Err(ActivationError::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
