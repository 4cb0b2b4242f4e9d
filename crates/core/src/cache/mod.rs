//! SQLite-backed cache stores for the offline agent.
//!
//! This module provides the three named stores the agent owns, backed by a
//! single SQLite database with async access via tokio-rusqlite:
//!
//! - the durable store that persists across activations and versions
//! - the temporary store populated during install and drained at activation
//! - the manifest-record store holding the single persisted manifest entry
//!
//! Entries are keyed by `(store, request URL)`; deleting a store deletes its
//! rows, matching the lifecycle of the browser-style named caches this
//! mirrors.

pub mod connection;
pub mod entries;
pub mod migrations;
pub mod reconcile;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedResponse;
pub use reconcile::{ReconcileOutcome, Reconciler};

/// Durable store: survives activations, holds served responses.
pub const DURABLE_STORE: &str = "appshell-app-cache";

/// Temporary store: staged shell files awaiting activation.
pub const TEMP_STORE: &str = "appshell-temp-cache";

/// Manifest-record store: exactly one entry, the persisted manifest.
pub const MANIFEST_STORE: &str = "appshell-app-manifest";

/// Key of the single entry in the manifest-record store.
pub const MANIFEST_KEY: &str = "manifest";
