//! Mediates between an interactive caller and the [`Activator`].
//!
//! The controller owns no business logic. It guards against double
//! submission, runs each attempt on a background task and reports progress
//! as [`ControllerEvent`]s on a channel the caller drains on its own
//! (foreground) context.

use crate::error::{ActivationError, ActivationResult, ErrorKind};
use crate::machine::Activator;
use codegate_types::ProfileId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

/// Progress reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Input should be disabled while `true`.
    Busy(bool),
    /// Activation is complete. `auto_connect` is false when the device was
    /// already activated before the controller opened.
    Activated {
        profile_id: ProfileId,
        auto_connect: bool,
    },
    /// The attempt failed; `message` is shown to the user as-is.
    Failed { message: String, kind: ErrorKind },
}

/// What [`ActivationController::submit`] did with a code.
#[derive(Debug)]
pub enum Submission {
    /// An attempt was started in the background.
    Started,
    /// Ignored: an attempt is in flight or activation already completed.
    Ignored,
    /// Rejected locally without contacting the server.
    Rejected(ActivationError),
}

struct Shared {
    busy: AtomicBool,
    finished: AtomicBool,
    events: UnboundedSender<ControllerEvent>,
}

impl Shared {
    fn emit(&self, event: ControllerEvent) {
        // The caller may have stopped listening; nothing to do then.
        let _ = self.events.send(event);
    }

    fn complete(&self, result: ActivationResult<ProfileId>) {
        match result {
            Ok(profile_id) => {
                self.finished.store(true, Ordering::Release);
                self.busy.store(false, Ordering::Release);
                self.emit(ControllerEvent::Activated {
                    profile_id,
                    auto_connect: true,
                });
            }
            Err(e) => {
                self.busy.store(false, Ordering::Release);
                self.emit(ControllerEvent::Failed {
                    message: e.to_string(),
                    kind: e.kind(),
                });
            }
        }
        self.emit(ControllerEvent::Busy(false));
    }
}

/// Drives activation attempts for one caller.
pub struct ActivationController {
    activator: Arc<Activator>,
    shared: Arc<Shared>,
}

impl ActivationController {
    /// Opens a controller and returns it with its event stream.
    ///
    /// If the device is already activated with a usable profile, an
    /// [`ControllerEvent::Activated`] with `auto_connect: false` is queued
    /// immediately and every later submission is ignored.
    pub fn open(activator: Arc<Activator>) -> (Self, UnboundedReceiver<ControllerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            busy: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            events: tx,
        });

        if let Some(profile_id) = activator.status().activated_profile() {
            info!("Already activated, skipping activation flow");
            shared.finished.store(true, Ordering::Release);
            shared.emit(ControllerEvent::Activated {
                profile_id,
                auto_connect: false,
            });
        }

        (Self { activator, shared }, rx)
    }

    /// Submits a code.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, code: &str) -> Submission {
        if self.is_finished() {
            debug!("Activation already completed, ignoring submission");
            return Submission::Ignored;
        }
        if self.is_busy() {
            debug!("Activation in flight, ignoring submission");
            return Submission::Ignored;
        }

        let code = code.trim();
        if code.is_empty() {
            return Submission::Rejected(ActivationError::Validation);
        }

        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Activation in flight, ignoring submission");
            return Submission::Ignored;
        }
        self.shared.emit(ControllerEvent::Busy(true));

        let activator = Arc::clone(&self.activator);
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let code = code.to_string();
        tokio::spawn(async move {
            let result = activator.activate(&code).await;
            match shared.upgrade() {
                Some(shared) => shared.complete(result),
                None => debug!("Controller closed, discarding activation result"),
            }
        });

        Submission::Started
    }

    /// True while an attempt is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// True once activation has completed (or was already complete on open).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    /// The last entered code, for prefilling input.
    #[must_use]
    pub fn prefill(&self) -> String {
        self.activator.prefill_code()
    }

    #[must_use]
    pub fn activator(&self) -> &Arc<Activator> {
        &self.activator
    }
}
