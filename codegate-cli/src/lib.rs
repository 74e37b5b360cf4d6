//! Host-side collaborators for the codegate command-line client.
//!
//! The activation core only defines the [`LinkParser`] and [`ProfileStore`]
//! seams; this crate provides small file-backed versions so the flow can run
//! outside the app.

use async_trait::async_trait;
use codegate_activation::{ActivationError, ActivationResult, LinkParser, ProfileStore};
use codegate_types::{GroupId, ProfileDescriptor, ProfileId, VLESS_SCHEME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// File name of the profile list inside the data directory.
pub const PROFILES_FILE_NAME: &str = "profiles.json";

/// Splits a credential body into `vless://` links, one descriptor each.
///
/// The display name is the URL-decoded `#fragment`, falling back to the
/// server host.
#[derive(Debug, Clone, Copy, Default)]
pub struct UriLinkParser;

impl LinkParser for UriLinkParser {
    fn parse(&self, link: &str) -> Vec<ProfileDescriptor> {
        link.split_whitespace()
            .filter(|token| token.starts_with(VLESS_SCHEME))
            .map(|token| ProfileDescriptor::new(display_name(token), token))
            .collect()
    }
}

fn display_name(link: &str) -> String {
    if let Some((_, fragment)) = link.split_once('#') {
        if !fragment.is_empty() {
            return urlencoding::decode(fragment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| fragment.to_string());
        }
    }

    // vless://<uuid>@<host>:<port>?<params>
    let rest = &link[VLESS_SCHEME.len()..];
    let authority = rest.split(['?', '#', '/']).next().unwrap_or_default();
    let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = host.rsplit_once(':').map_or(host, |(h, _)| h);
    if host.is_empty() {
        "Imported".to_string()
    } else {
        host.to_string()
    }
}

/// A profile saved by [`JsonProfileStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProfile {
    pub id: ProfileId,
    pub group: GroupId,
    pub name: String,
    pub link: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileFile {
    profiles: Vec<StoredProfile>,
}

/// Profiles kept in a JSON file. Ids are allocated sequentially from 1.
#[derive(Debug)]
pub struct JsonProfileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonProfileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(PROFILES_FILE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns every stored profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn list(&self) -> ActivationResult<Vec<StoredProfile>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.profiles)
    }

    async fn read(&self) -> ActivationResult<ProfileFile> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProfileFile::default()),
            Err(e) => Err(ActivationError::Storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write(&self, file: &ProfileFile) -> ActivationResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(file)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for JsonProfileStore {
    async fn create_profile(
        &self,
        group: GroupId,
        descriptor: ProfileDescriptor,
    ) -> ActivationResult<ProfileId> {
        let _guard = self.lock.lock().await;
        let mut file = self.read().await?;

        let next = file
            .profiles
            .iter()
            .map(|p| p.id.get())
            .max()
            .unwrap_or(0)
            + 1;
        let id = ProfileId::new(next);

        debug!("Creating profile {} in group {}", id, group);
        file.profiles.push(StoredProfile {
            id,
            group,
            name: descriptor.name,
            link: descriptor.link,
        });
        self.write(&file).await?;

        info!("Stored profile {}", id);
        Ok(id)
    }
}
