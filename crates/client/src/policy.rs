//! Request interception policies.
//!
//! Every GET for a manifest-listed resource is answered from the durable
//! store or the network:
//!
//! - the root sentinel key (the entry document) is online-first, so a
//!   connected client always sees the latest deploy
//! - every other manifest key is cache-first with lazy fill
//! - anything else (non-GET, foreign origin, non-manifest key) is declined
//!   and falls through to default handling

use appshell_core::cache::DURABLE_STORE;
use appshell_core::manifest::{ROOT_KEY, normalize_key, strip_version_suffix};
use appshell_core::{CacheDb, CachedResponse, Error, ResourceManifest};

use crate::fetch::Fetch;

/// Routes intercepted requests to the serving policy for their key.
pub struct Interceptor<'a, F: Fetch> {
    db: &'a CacheDb,
    fetcher: &'a F,
    origin: &'a str,
    manifest: &'a ResourceManifest,
}

impl<'a, F: Fetch> Interceptor<'a, F> {
    pub fn new(db: &'a CacheDb, fetcher: &'a F, origin: &'a str, manifest: &'a ResourceManifest) -> Self {
        Self { db, fetcher, origin, manifest }
    }

    /// Handle an intercepted request.
    ///
    /// Returns `Ok(None)` when the request is declined (non-GET, outside the
    /// origin, or not a manifest resource); the caller lets default network
    /// handling proceed.
    pub async fn handle(&self, method: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        if method != "GET" {
            return Ok(None);
        }

        let Some(key) = normalize_key(self.origin, url) else {
            return Ok(None);
        };
        // A cache-busted root request ("/?v=...") normalizes to just the
        // suffix; after stripping it the empty key is the root again.
        let key = match strip_version_suffix(&key) {
            "" => ROOT_KEY,
            stripped => stripped,
        };

        if !self.manifest.contains(key) {
            return Ok(None);
        }

        let response = if key == ROOT_KEY { self.online_first(url).await? } else { self.cache_first(url).await? };
        Ok(Some(response))
    }

    /// Serve from the durable store if present; otherwise fetch and cache
    /// only HTTP-ok responses. A non-ok response is returned as-is without
    /// being cached, so error pages never poison the store.
    async fn cache_first(&self, url: &str) -> Result<CachedResponse, Error> {
        if let Some(cached) = self.db.get(DURABLE_STORE, url).await? {
            tracing::debug!("cache hit for {}", url);
            return Ok(cached);
        }

        let entry = self.fetcher.get(url).await?.into_cached();
        if entry.is_ok() {
            self.db.put(DURABLE_STORE, &entry).await?;
        }
        Ok(entry)
    }

    /// Attempt a live fetch first; cache and return it on transport success.
    /// On network failure fall back to the durable store, and only when
    /// nothing is cached propagate the original error.
    async fn online_first(&self, url: &str) -> Result<CachedResponse, Error> {
        match self.fetcher.get(url).await {
            Ok(resource) => {
                let entry = resource.into_cached();
                self.db.put(DURABLE_STORE, &entry).await?;
                Ok(entry)
            }
            Err(err) => {
                if let Some(cached) = self.db.get(DURABLE_STORE, url).await? {
                    tracing::debug!("network failed for {}, serving cached entry", url);
                    return Ok(cached);
                }
                Err(err)
            }
        }
    }
}
