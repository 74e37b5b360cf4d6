//! Credential links and the descriptors parsed from them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Error;

/// Scheme prefix every credential link must start with.
pub const VLESS_SCHEME: &str = "vless://";

/// A credential link returned by the authorization server.
///
/// Only the scheme prefix is checked; the rest of the link is opaque and is
/// interpreted by a host-side link parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialLink(String);

impl CredentialLink {
    /// Parses a raw response body into a credential link.
    ///
    /// Surrounding whitespace is trimmed before the prefix check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLink`] if the trimmed body does not start with
    /// [`VLESS_SCHEME`].
    pub fn parse(body: &str) -> crate::Result<Self> {
        let trimmed = body.trim();
        if !trimmed.starts_with(VLESS_SCHEME) {
            return Err(Error::InvalidLink(format!(
                "expected `{VLESS_SCHEME}` prefix"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CredentialLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A connectable proxy configuration parsed from a credential link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDescriptor {
    /// Display name (usually the link fragment).
    pub name: String,
    /// The single-proxy link this descriptor was parsed from.
    pub link: String,
}

impl ProfileDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
        }
    }
}
