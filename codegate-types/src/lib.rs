//! Core type definitions for codegate.
//!
//! This crate defines the small set of types shared between the activation
//! core and its hosts:
//! - Device, profile and group identifiers
//! - Credential links returned by the authorization server
//! - Profile descriptors produced by a link parser
//!
//! Parsing links into descriptors and storing profiles belong to the host,
//! not here.

mod ids;
mod link;

pub use ids::{DeviceId, GroupId, ProfileId};
pub use link::{CredentialLink, ProfileDescriptor, VLESS_SCHEME};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("device id must not be blank")]
    BlankDeviceId,

    #[error("invalid credential link: {0}")]
    InvalidLink(String),
}
