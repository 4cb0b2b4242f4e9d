//! Eager offline pre-population.
//!
//! The `downloadOffline` control signal asks the agent to fetch and cache
//! every manifest resource not already present in the durable store, so the
//! whole application works offline rather than filling lazily.

use appshell_core::cache::DURABLE_STORE;
use appshell_core::manifest::{normalize_key, request_url};
use appshell_core::{CacheDb, CachedResponse, Error, ResourceManifest};

use crate::fetch::Fetch;

/// Fetch and cache every manifest resource missing from the durable store.
///
/// The batch is atomic: every missing resource must fetch with an HTTP-ok
/// response before anything is written. On failure nothing is added, and
/// resources cached before the call remain cached. Returns the number of
/// entries added.
pub async fn download_offline<F: Fetch>(
    db: &CacheDb, fetcher: &F, origin: &str, manifest: &ResourceManifest,
) -> Result<u64, Error> {
    let cached: Vec<String> = db
        .keys(DURABLE_STORE)
        .await?
        .iter()
        .filter_map(|url| normalize_key(origin, url))
        .collect();

    let missing: Vec<&str> = manifest.keys().filter(|key| !cached.iter().any(|c| c == key)).collect();

    let mut batch: Vec<CachedResponse> = Vec::with_capacity(missing.len());
    for key in &missing {
        let url = request_url(origin, key);
        let resource = fetcher
            .get(&url)
            .await
            .map_err(|e| Error::PrecacheFailed(format!("failed to fetch {key}: {e}")))?;

        if !resource.is_ok() {
            return Err(Error::PrecacheFailed(format!("failed to fetch {key}: status {}", resource.status)));
        }

        batch.push(resource.into_cached());
    }

    for entry in &batch {
        db.put(DURABLE_STORE, entry).await?;
    }

    tracing::info!(added = batch.len(), "offline pre-population complete");
    Ok(batch.len() as u64)
}
