//! Resource manifest model.
//!
//! The build pipeline emits a manifest mapping every static asset key to a
//! 32-character lowercase hex content hash, plus the core shell list of keys
//! that must be staged before the agent can serve anything offline. The
//! manifest is regenerated wholesale on each build; hash changes iff the
//! underlying file content changed.

pub mod diff;
pub mod key;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Error;

pub use diff::compute_stale_keys;
pub use key::{ROOT_KEY, normalize_key, request_url, strip_version_suffix};

/// Ordered mapping from normalized request key to content hash.
///
/// The origin root is represented by the sentinel key `/`. Immutable once
/// generated; upgrades replace the whole manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceManifest {
    entries: BTreeMap<String, String>,
}

impl ResourceManifest {
    /// Build a manifest from key/hash pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { entries: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Whether the manifest lists the given key.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Content hash recorded for the given key.
    pub fn hash_for(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterate over manifest keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate that every hash is 32-character lowercase hex.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidManifest` naming the offending key.
    pub fn validate(&self) -> Result<(), Error> {
        for (key, hash) in &self.entries {
            if !is_content_hash(hash) {
                return Err(Error::InvalidManifest(format!(
                    "key {key:?} has malformed content hash {hash:?} (expected 32 lowercase hex chars)"
                )));
            }
        }
        Ok(())
    }
}

/// The generated build artifact: full resource manifest plus the core shell
/// list required for offline bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Key → content hash for every static asset.
    pub resources: ResourceManifest,

    /// Manifest keys that must be staged during install, in order.
    #[serde(default)]
    pub core: Vec<String>,
}

impl BuildManifest {
    /// Parse a build manifest from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidManifest` on malformed JSON or failed validation.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let manifest: Self = serde_json::from_str(json).map_err(|e| Error::InvalidManifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate hash formats and that the core shell list is a subset of the
    /// resource keys.
    pub fn validate(&self) -> Result<(), Error> {
        self.resources.validate()?;

        for key in &self.core {
            if !self.resources.contains(key) {
                return Err(Error::InvalidManifest(format!("core shell entry {key:?} is not a manifest resource")));
            }
        }

        Ok(())
    }
}

fn is_content_hash(hash: &str) -> bool {
    hash.len() == 32 && hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
