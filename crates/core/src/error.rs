//! Unified error types for appshell.

use tokio_rusqlite::rusqlite;

/// Unified error types for the appshell cache agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// The persisted manifest record could not be decoded.
    #[error("CACHE_ERROR: corrupt manifest record: {0}")]
    CorruptManifestRecord(String),

    /// The build manifest failed validation.
    #[error("MANIFEST_ERROR: {0}")]
    InvalidManifest(String),

    /// Network-level fetch failure (DNS, connect, timeout, body read).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Shell staging aborted; nothing was written to the temporary store.
    #[error("INSTALL_ABORTED: {0}")]
    InstallAborted(String),

    /// Eager pre-population batch failed; the durable store is unchanged.
    #[error("PRECACHE_FAILED: {0}")]
    PrecacheFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
