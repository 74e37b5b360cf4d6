//! Device activation for codegate.
//!
//! This crate handles:
//! - Stable per-install device identity
//! - The activation request exchange with the authorization server
//! - Turning the returned credential link into a stored profile
//! - Persisting activation status across restarts
//!
//! # Flow
//!
//! A caller submits an activation code through an [`ActivationController`],
//! which runs the [`Activator`] on a background task. The activator sends
//! `{"auth_code", "device_id"}` to the configured endpoint, hands the
//! `vless://` link it gets back to the host's [`LinkParser`], creates a
//! profile through the host's [`ProfileStore`] and only then records the
//! installation as activated.
//!
//! Nothing is retried automatically. Every failure leaves the flow ready for
//! another user-initiated attempt.

mod config;
mod controller;
mod device;
mod error;
mod host;
mod machine;
mod status;
mod transport;

pub use config::{ActivationConfig, TransportTimeouts};
pub use controller::{ActivationController, ControllerEvent, Submission};
pub use device::{device_id_from_machine_id, platform_device_id, DeviceIdentity};
pub use error::{ActivationError, ActivationResult, ErrorKind};
pub use host::{LinkParser, ProfileStore};
pub use machine::{ActivationState, Activator};
pub use status::{
    ActivationStatus, JsonStatusStore, MemoryStatusStore, StatusStore, STATUS_FILE_NAME,
};
pub use transport::{
    classify_response, ActivationRequest, ActivationTransport, HttpTransport, JSON_CONTENT_TYPE,
};
