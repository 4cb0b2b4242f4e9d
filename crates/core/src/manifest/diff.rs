//! Manifest diffing for upgrade reconciliation.

use std::collections::BTreeSet;

use super::ResourceManifest;

/// Compute which cached keys must be evicted when upgrading from `old` to
/// `current`.
///
/// A key survives only when both manifests record the same hash for it:
/// keys dropped from the current manifest, keys whose hash changed, and keys
/// the old manifest never recorded (pre-manifest leftovers) are all stale.
/// Unchanged keys are left untouched so their bytes are reused across
/// versions without a re-download.
pub fn compute_stale_keys<'a, I>(old: &ResourceManifest, current: &ResourceManifest, cached_keys: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    cached_keys
        .into_iter()
        .filter(|key| {
            match (current.hash_for(key), old.hash_for(key)) {
                (Some(new_hash), Some(old_hash)) => new_hash != old_hash,
                _ => true,
            }
        })
        .map(str::to_string)
        .collect()
}
