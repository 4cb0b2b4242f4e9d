//! Activation-time cache reconciliation.
//!
//! Brings the durable store into agreement with the current manifest while
//! preserving byte-identical resources across upgrades, then atomically
//! swaps in the freshly staged shell files from the temporary store and
//! persists the new manifest.

use super::connection::CacheDb;
use super::{DURABLE_STORE, MANIFEST_STORE, TEMP_STORE};
use crate::Error;
use crate::manifest::{ResourceManifest, compute_stale_keys, normalize_key};

/// How a reconciliation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// First-ever activation: no prior manifest record existed, the durable
    /// store was rebuilt from the temporary store alone.
    ColdStart,
    /// Upgrade path completed: stale entries evicted, shell promoted.
    Completed,
    /// A step failed; all three stores were deleted and the agent now runs
    /// without a cache. The next activation behaves as a cold start.
    WipedAfterError,
}

/// Reconciles the named stores against the current manifest once per
/// activation.
pub struct Reconciler<'a> {
    db: &'a CacheDb,
    origin: &'a str,
    current: &'a ResourceManifest,
}

impl<'a> Reconciler<'a> {
    pub fn new(db: &'a CacheDb, origin: &'a str, current: &'a ResourceManifest) -> Self {
        Self { db, origin, current }
    }

    /// Run reconciliation.
    ///
    /// Any failure inside the run is logged and answered by deleting all
    /// three stores unconditionally: a partially reconciled cache cannot be
    /// distinguished from a consistent one and could serve arbitrarily stale
    /// mixed content, so no cache is strictly better. Only a failure of the
    /// wipe itself surfaces as `Err`.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, Error> {
        match self.run().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::error!(error = %err, "cache reconciliation failed, deleting all stores");
                self.db.delete_store(DURABLE_STORE).await?;
                self.db.delete_store(TEMP_STORE).await?;
                self.db.delete_store(MANIFEST_STORE).await?;
                Ok(ReconcileOutcome::WipedAfterError)
            }
        }
    }

    async fn run(&self) -> Result<ReconcileOutcome, Error> {
        let Some(old_manifest) = self.db.read_manifest_record().await? else {
            // No prior manifest: anything already in the durable store
            // predates manifest tracking and cannot be verified. Start cold.
            self.db.delete_store(DURABLE_STORE).await?;
            self.promote_temp().await?;
            self.db.write_manifest_record(self.current).await?;
            tracing::info!("cold start: durable store rebuilt from staged shell");
            return Ok(ReconcileOutcome::ColdStart);
        };

        let cached_urls = self.db.keys(DURABLE_STORE).await?;
        let mut keyed: Vec<(String, String)> = Vec::with_capacity(cached_urls.len());
        for url in cached_urls {
            match normalize_key(self.origin, &url) {
                Some(key) => keyed.push((url, key)),
                // Entries outside the origin have no manifest key; evict.
                None => self.db.delete(DURABLE_STORE, &url).await?,
            }
        }

        let stale = compute_stale_keys(&old_manifest, self.current, keyed.iter().map(|(_, k)| k.as_str()));
        let mut evicted = 0u64;
        for (url, key) in &keyed {
            if stale.contains(key) {
                self.db.delete(DURABLE_STORE, url).await?;
                evicted += 1;
            }
        }

        // Shell files always reflect the newest build, overwriting any
        // same-key survivor.
        let promoted = self.promote_temp().await?;
        self.db.write_manifest_record(self.current).await?;

        tracing::debug!(evicted, promoted, "reconciliation complete");
        Ok(ReconcileOutcome::Completed)
    }

    /// Copy every temporary entry into the durable store, then delete the
    /// temporary store.
    async fn promote_temp(&self) -> Result<u64, Error> {
        let mut promoted = 0u64;
        for key in self.db.keys(TEMP_STORE).await? {
            if let Some(entry) = self.db.get(TEMP_STORE, &key).await? {
                self.db.put(DURABLE_STORE, &entry).await?;
                promoted += 1;
            }
        }
        self.db.delete_store(TEMP_STORE).await?;
        Ok(promoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachedResponse, MANIFEST_KEY};

    const ORIGIN: &str = "https://app.example.com";
    const H1: &str = "11111111111111111111111111111111";
    const H2: &str = "22222222222222222222222222222222";
    const H3: &str = "33333333333333333333333333333333";

    fn entry(url: &str, body: &[u8]) -> CachedResponse {
        CachedResponse {
            key: url.to_string(),
            status: 200,
            content_type: None,
            body: body.to_vec(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    async fn stage_temp(db: &CacheDb, key: &str, body: &[u8]) {
        let url = crate::manifest::request_url(ORIGIN, key);
        db.put(TEMP_STORE, &entry(&url, body)).await.unwrap();
    }

    #[tokio::test]
    async fn test_cold_start_promotes_shell_and_records_manifest() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let current = ResourceManifest::from_entries([("index.html", H1), ("main.dart.js", H2)]);

        // Pre-manifest garbage that must not survive a cold start.
        db.put(DURABLE_STORE, &entry("https://app.example.com/old.js", b"old")).await.unwrap();

        stage_temp(&db, "index.html", b"<html>").await;
        stage_temp(&db, "main.dart.js", b"js").await;

        let outcome = Reconciler::new(&db, ORIGIN, &current).reconcile().await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::ColdStart);

        let keys = db.keys(DURABLE_STORE).await.unwrap();
        assert_eq!(
            keys,
            vec![
                "https://app.example.com/index.html".to_string(),
                "https://app.example.com/main.dart.js".to_string()
            ]
        );
        assert_eq!(db.store_len(TEMP_STORE).await.unwrap(), 0);
        assert_eq!(db.read_manifest_record().await.unwrap().unwrap(), current);
    }

    #[tokio::test]
    async fn test_upgrade_keeps_unchanged_evicts_stale_promotes_staged() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = ResourceManifest::from_entries([("a.js", H1), ("b.js", H2)]);
        let current = ResourceManifest::from_entries([("a.js", H1), ("c.js", H3)]);

        db.write_manifest_record(&old).await.unwrap();
        db.put(DURABLE_STORE, &entry("https://app.example.com/a.js", b"aaa")).await.unwrap();
        db.put(DURABLE_STORE, &entry("https://app.example.com/b.js", b"bbb")).await.unwrap();
        stage_temp(&db, "c.js", b"ccc").await;

        let outcome = Reconciler::new(&db, ORIGIN, &current).reconcile().await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Completed);

        // a.js untouched (same bytes), b.js evicted, c.js promoted from temp.
        let a = db.get(DURABLE_STORE, "https://app.example.com/a.js").await.unwrap().unwrap();
        assert_eq!(a.body, b"aaa");
        assert!(db.get(DURABLE_STORE, "https://app.example.com/b.js").await.unwrap().is_none());
        let c = db.get(DURABLE_STORE, "https://app.example.com/c.js").await.unwrap().unwrap();
        assert_eq!(c.body, b"ccc");

        assert_eq!(db.read_manifest_record().await.unwrap().unwrap(), current);
        assert_eq!(db.store_len(TEMP_STORE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upgrade_staged_shell_overwrites_survivor() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = ResourceManifest::from_entries([("index.html", H1)]);
        let current = ResourceManifest::from_entries([("index.html", H1)]);

        db.write_manifest_record(&old).await.unwrap();
        db.put(DURABLE_STORE, &entry("https://app.example.com/index.html", b"stale shell")).await.unwrap();
        stage_temp(&db, "index.html", b"fresh shell").await;

        Reconciler::new(&db, ORIGIN, &current).reconcile().await.unwrap();

        let got = db.get(DURABLE_STORE, "https://app.example.com/index.html").await.unwrap().unwrap();
        assert_eq!(got.body, b"fresh shell");
    }

    #[tokio::test]
    async fn test_hash_change_evicts_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = ResourceManifest::from_entries([("a.js", H1)]);
        let current = ResourceManifest::from_entries([("a.js", H2)]);

        db.write_manifest_record(&old).await.unwrap();
        db.put(DURABLE_STORE, &entry("https://app.example.com/a.js", b"aaa")).await.unwrap();

        Reconciler::new(&db, ORIGIN, &current).reconcile().await.unwrap();
        assert!(db.get(DURABLE_STORE, "https://app.example.com/a.js").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_foreign_origin_entry_evicted_on_upgrade() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = ResourceManifest::from_entries([("a.js", H1)]);
        let current = old.clone();

        db.write_manifest_record(&old).await.unwrap();
        db.put(DURABLE_STORE, &entry("https://cdn.example.net/lib.js", b"x")).await.unwrap();

        Reconciler::new(&db, ORIGIN, &current).reconcile().await.unwrap();
        assert!(db.get(DURABLE_STORE, "https://cdn.example.net/lib.js").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_manifest_record_wipes_all_stores() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let current = ResourceManifest::from_entries([("a.js", H1)]);

        db.put(DURABLE_STORE, &entry("https://app.example.com/a.js", b"aaa")).await.unwrap();
        stage_temp(&db, "a.js", b"aaa").await;
        db.put(
            MANIFEST_STORE,
            &CachedResponse {
                key: MANIFEST_KEY.to_string(),
                status: 200,
                content_type: None,
                body: b"{broken".to_vec(),
                fetched_at: chrono::Utc::now().to_rfc3339(),
            },
        )
        .await
        .unwrap();

        let outcome = Reconciler::new(&db, ORIGIN, &current).reconcile().await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::WipedAfterError);

        assert_eq!(db.store_len(DURABLE_STORE).await.unwrap(), 0);
        assert_eq!(db.store_len(TEMP_STORE).await.unwrap(), 0);
        assert_eq!(db.store_len(MANIFEST_STORE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_activation_after_wipe_behaves_as_cold_start() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let current = ResourceManifest::from_entries([("index.html", H1)]);

        // Simulate the post-wipe state: everything empty.
        stage_temp(&db, "index.html", b"<html>").await;
        let outcome = Reconciler::new(&db, ORIGIN, &current).reconcile().await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::ColdStart);
        assert_eq!(db.store_len(DURABLE_STORE).await.unwrap(), 1);
    }
}
