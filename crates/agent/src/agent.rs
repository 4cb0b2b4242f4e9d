//! Agent lifecycle and control-channel handling.
//!
//! Mirrors the install → activate → serve lifecycle: install stages the
//! core shell into the temporary store, activation reconciles the stores
//! against the current manifest, and only then does the agent claim its
//! clients by publishing a new generation. Two out-of-band control signals
//! are understood: `skipWaiting` forces a waiting instance to activate, and
//! `downloadOffline` eagerly pre-populates the durable store.

use tokio::sync::watch;

use appshell_client::fetch::Fetch;
use appshell_client::{Interceptor, ShellLoader, download_offline};
use appshell_core::cache::{CacheDb, CachedResponse, ReconcileOutcome, Reconciler};
use appshell_core::{BuildManifest, Error};

/// Out-of-band control signals from the owning page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Force a waiting instance to activate immediately.
    SkipWaiting,
    /// Eagerly fetch and cache every manifest resource not yet cached.
    DownloadOffline,
}

impl ControlMessage {
    /// Parse a literal control message. Unknown messages are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "skipWaiting" => Some(Self::SkipWaiting),
            "downloadOffline" => Some(Self::DownloadOffline),
            _ => None,
        }
    }
}

/// Lifecycle state of the agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Not yet installed; nothing staged.
    Idle,
    /// Shell staged, awaiting activation.
    Waiting,
    /// Reconciled and serving.
    Active,
}

/// The cache agent: owns the stores, the fetcher, and the current manifest.
pub struct Agent<F: Fetch> {
    db: CacheDb,
    fetcher: F,
    origin: String,
    manifest: BuildManifest,
    state: Lifecycle,
    generation: watch::Sender<u64>,
}

impl<F: Fetch> Agent<F> {
    pub fn new(db: CacheDb, fetcher: F, origin: String, manifest: BuildManifest) -> Self {
        let (generation, _) = watch::channel(0);
        Self { db, fetcher, origin, manifest, state: Lifecycle::Idle, generation }
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    /// Observe activations: the value bumps once per successful activation,
    /// the counterpart of the new version claiming open clients.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Install: stage every core shell file into the temporary store.
    ///
    /// All-or-nothing; on failure the agent stays idle and install can be
    /// retried.
    pub async fn install(&mut self) -> Result<(), Error> {
        ShellLoader::new(&self.db, &self.fetcher, &self.origin)
            .stage(&self.manifest.core)
            .await?;
        self.state = Lifecycle::Waiting;
        tracing::info!("install complete, instance waiting");
        Ok(())
    }

    /// Activate: reconcile the stores against the current manifest, then
    /// claim clients. The instance is not active until reconciliation has
    /// finished, so no request of the new generation sees a half-reconciled
    /// store. A reconciliation that had to wipe the stores still activates
    /// the instance but does not claim clients.
    pub async fn activate(&mut self) -> Result<ReconcileOutcome, Error> {
        let outcome = Reconciler::new(&self.db, &self.origin, &self.manifest.resources)
            .reconcile()
            .await?;

        self.state = Lifecycle::Active;
        if outcome == ReconcileOutcome::WipedAfterError {
            tracing::warn!("activation finished after store wipe, clients not claimed");
        } else {
            self.generation.send_modify(|g| *g += 1);
            tracing::info!(?outcome, "activation complete, clients claimed");
        }
        Ok(outcome)
    }

    /// Serve an intercepted request.
    ///
    /// Returns `Ok(None)` when the request is declined and default network
    /// handling should proceed.
    pub async fn handle_request(&self, method: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        Interceptor::new(&self.db, &self.fetcher, &self.origin, &self.manifest.resources)
            .handle(method, url)
            .await
    }

    /// Dispatch a control message.
    pub async fn handle_message(&mut self, message: ControlMessage) -> Result<(), Error> {
        match message {
            ControlMessage::SkipWaiting => {
                if self.state == Lifecycle::Waiting {
                    self.activate().await?;
                }
                Ok(())
            }
            ControlMessage::DownloadOffline => {
                download_offline(&self.db, &self.fetcher, &self.origin, &self.manifest.resources).await?;
                Ok(())
            }
        }
    }
}
