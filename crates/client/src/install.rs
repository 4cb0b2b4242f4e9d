//! Install-time shell staging.
//!
//! Fetches every core shell entry with a cache-bypassing request and
//! populates the temporary store. Staging is all-or-nothing: every fetch
//! must succeed with an HTTP-ok response before anything is written, so a
//! partial shell is never promoted at activation.

use appshell_core::cache::TEMP_STORE;
use appshell_core::manifest::request_url;
use appshell_core::{CacheDb, CachedResponse, Error};

use crate::fetch::Fetch;

/// Stages core shell files into the temporary store during install.
pub struct ShellLoader<'a, F: Fetch> {
    db: &'a CacheDb,
    fetcher: &'a F,
    origin: &'a str,
}

impl<'a, F: Fetch> ShellLoader<'a, F> {
    pub fn new(db: &'a CacheDb, fetcher: &'a F, origin: &'a str) -> Self {
        Self { db, fetcher, origin }
    }

    /// Fetch and stage every core shell entry.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallAborted` if any fetch fails or returns non-ok;
    /// in that case the temporary store is left untouched and the install
    /// must be retried from scratch.
    pub async fn stage(&self, core: &[String]) -> Result<(), Error> {
        let mut staged: Vec<CachedResponse> = Vec::with_capacity(core.len());

        for key in core {
            let url = request_url(self.origin, key);
            let resource = self
                .fetcher
                .get_fresh(&url)
                .await
                .map_err(|e| Error::InstallAborted(format!("failed to stage {key}: {e}")))?;

            if !resource.is_ok() {
                return Err(Error::InstallAborted(format!("failed to stage {key}: status {}", resource.status)));
            }

            staged.push(resource.into_cached());
        }

        for entry in &staged {
            self.db.put(TEMP_STORE, entry).await?;
        }

        tracing::info!(count = staged.len(), "shell files staged into temporary store");
        Ok(())
    }
}
