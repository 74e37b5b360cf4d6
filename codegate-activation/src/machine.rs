//! Activation state machine.
//!
//! `Idle → InFlight → {Activated, Idle}`. A failed attempt drops back to
//! `Idle`; every attempt is started explicitly by the caller.
//!
//! Persistence always happens before a result is returned: the entered code
//! and any newly created device id are saved before the request is sent, and
//! the activated flag is saved only after the profile exists.

use crate::config::ActivationConfig;
use crate::device::DeviceIdentity;
use crate::error::{ActivationError, ActivationResult};
use crate::host::{LinkParser, ProfileStore};
use crate::status::{ActivationStatus, StatusStore};
use crate::transport::{ActivationRequest, ActivationTransport};
use codegate_types::{DeviceId, ProfileId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Observable state of the activator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// Ready for an attempt.
    Idle,
    /// An attempt is running.
    InFlight,
    /// Activation completed; the status holds a usable profile.
    Activated,
}

/// Runs the activation flow and owns the persisted [`ActivationStatus`].
pub struct Activator {
    config: ActivationConfig,
    identity: DeviceIdentity,
    transport: Arc<dyn ActivationTransport>,
    parser: Arc<dyn LinkParser>,
    profiles: Arc<dyn ProfileStore>,
    store: Arc<dyn StatusStore>,
    status: Mutex<ActivationStatus>,
    in_flight: AtomicBool,
}

/// Releases the single-flight flag when an attempt ends, including when the
/// future is dropped mid-await.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Activator {
    /// Builds an activator, loading the status from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be loaded.
    pub fn new(
        config: ActivationConfig,
        transport: Arc<dyn ActivationTransport>,
        parser: Arc<dyn LinkParser>,
        profiles: Arc<dyn ProfileStore>,
        store: Arc<dyn StatusStore>,
    ) -> ActivationResult<Self> {
        let status = store.load()?;
        debug!(
            "Loaded activation status (activated: {}, has device id: {})",
            status.activated,
            !status.device_id.trim().is_empty()
        );
        Ok(Self {
            config,
            identity: DeviceIdentity::new(),
            transport,
            parser,
            profiles,
            store,
            status: Mutex::new(status),
            in_flight: AtomicBool::new(false),
        })
    }

    /// Replaces the device identity source.
    #[must_use]
    pub fn with_identity(mut self, identity: DeviceIdentity) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ActivationConfig {
        &self.config
    }

    /// Returns a snapshot of the persisted status.
    #[must_use]
    pub fn status(&self) -> ActivationStatus {
        self.lock_status().clone()
    }

    #[must_use]
    pub fn state(&self) -> ActivationState {
        if self.in_flight.load(Ordering::Acquire) {
            ActivationState::InFlight
        } else if self.is_activated() {
            ActivationState::Activated
        } else {
            ActivationState::Idle
        }
    }

    /// True when a previous activation left a usable profile.
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.lock_status().is_activated()
    }

    /// The last entered code, for prefilling input.
    #[must_use]
    pub fn prefill_code(&self) -> String {
        self.lock_status().last_code.clone()
    }

    /// Returns the device identity, creating and saving it if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a newly created identity cannot be saved.
    pub fn device_id(&self) -> ActivationResult<DeviceId> {
        self.mutate(|status| self.identity.get_or_create(status))
    }

    /// Exchanges `code` for a credential and turns it into a profile.
    ///
    /// Returns the id of the created profile. If this installation is
    /// already activated the existing profile is returned and no request is
    /// sent.
    ///
    /// # Errors
    ///
    /// - [`ActivationError::Validation`] for a blank code (nothing is sent).
    /// - [`ActivationError::InFlight`] if another attempt is running.
    /// - Transport, server, protocol, empty-result and storage failures, with
    ///   the activated flag left untouched.
    pub async fn activate(&self, code: &str) -> ActivationResult<ProfileId> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ActivationError::Validation);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Activation already in flight, rejecting new attempt");
            return Err(ActivationError::InFlight);
        }
        let _guard = FlightGuard(&self.in_flight);

        let existing = self.lock_status().activated_profile();
        if let Some(profile_id) = existing {
            info!("Already activated with profile {}, skipping request", profile_id);
            return Ok(profile_id);
        }

        let device_id = self.mutate(|status| {
            status.last_code = code.to_string();
            let (id, _) = self.identity.get_or_create(status);
            (id, true)
        })?;

        let request = ActivationRequest::new(code, device_id)?;
        let link = match self.transport.exchange(&self.config.endpoint, &request).await {
            Ok(link) => link,
            Err(e) => {
                warn!("Activation request failed: {}", e);
                return Err(e);
            }
        };

        let descriptor = self
            .parser
            .parse(link.as_str())
            .into_iter()
            .next()
            .ok_or_else(|| {
                warn!("Credential link yielded no proxies");
                ActivationError::EmptyResult
            })?;

        let profile_id = self
            .profiles
            .create_profile(self.config.default_group, descriptor)
            .await?;
        if !profile_id.is_valid() {
            return Err(ActivationError::Storage(
                "profile store returned an invalid profile id".to_string(),
            ));
        }

        self.mutate(|status| {
            status.mark_activated(profile_id);
            ((), true)
        })?;

        info!("Activation succeeded, profile {}", profile_id);
        Ok(profile_id)
    }

    fn lock_status(&self) -> MutexGuard<'_, ActivationStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `f` to a copy of the status and, when `f` reports a change,
    /// saves it before committing it in memory. On save failure the in-memory
    /// status is left as it was.
    fn mutate<T>(&self, f: impl FnOnce(&mut ActivationStatus) -> (T, bool)) -> ActivationResult<T> {
        let mut guard = self.lock_status();
        let mut next = guard.clone();
        let (value, changed) = f(&mut next);
        if changed {
            self.store.save(&next)?;
            *guard = next;
        }
        Ok(value)
    }
}

impl std::fmt::Debug for Activator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Activator")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
