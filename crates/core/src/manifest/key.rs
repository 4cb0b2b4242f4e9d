//! Request-key normalization.
//!
//! Cache stores are keyed by absolute request URL; the manifest is keyed by
//! path relative to the origin, with the origin root collapsed to the
//! sentinel `/`. These helpers map between the two.

/// Sentinel manifest key for the origin root (the entry document).
pub const ROOT_KEY: &str = "/";

/// Normalize an absolute request URL to a manifest key.
///
/// The origin prefix is stripped; a bare origin, an empty path, or a
/// same-page fragment navigation all collapse to [`ROOT_KEY`]. Returns
/// `None` for URLs outside the origin — those requests are never ours.
pub fn normalize_key(origin: &str, url: &str) -> Option<String> {
    let origin = origin.trim_end_matches('/');

    if url == origin {
        return Some(ROOT_KEY.to_string());
    }

    let rest = url.strip_prefix(origin)?.strip_prefix('/')?;

    if rest.is_empty() || rest.starts_with('#') {
        return Some(ROOT_KEY.to_string());
    }

    Some(rest.to_string())
}

/// Drop a `?v=` cache-busting suffix from a key, if present.
pub fn strip_version_suffix(key: &str) -> &str {
    match key.split_once("?v=") {
        Some((base, _)) => base,
        None => key,
    }
}

/// Absolute request URL for a manifest key on the given origin.
pub fn request_url(origin: &str, key: &str) -> String {
    let origin = origin.trim_end_matches('/');
    if key == ROOT_KEY { format!("{origin}/") } else { format!("{origin}/{key}") }
}
