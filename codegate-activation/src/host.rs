//! Collaborators provided by the host application.

use crate::error::ActivationResult;
use async_trait::async_trait;
use codegate_types::{GroupId, ProfileDescriptor, ProfileId};

/// Turns a credential link into proxy descriptors.
pub trait LinkParser: Send + Sync {
    /// Parses `link`. An empty result means the link held nothing usable.
    fn parse(&self, link: &str) -> Vec<ProfileDescriptor>;
}

/// Persists connectable profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Creates a profile in `group` and returns its id.
    ///
    /// The returned id is treated as opaque but must be non-zero.
    async fn create_profile(
        &self,
        group: GroupId,
        descriptor: ProfileDescriptor,
    ) -> ActivationResult<ProfileId>;
}
