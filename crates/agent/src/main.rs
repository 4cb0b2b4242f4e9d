//! appshell agent entry point.
//!
//! Boots the cache agent: loads configuration and the generated build
//! manifest, stages the shell, activates, then listens for control messages
//! on stdin (one literal per line). Logging goes to stderr so stdout stays
//! free for the owning process.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use appshell_agent::{Agent, ControlMessage};
use appshell_client::{FetchClient, FetchConfig};
use appshell_core::{AgentConfig, BuildManifest, CacheDb};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AgentConfig::load().context("failed to load configuration")?;

    let manifest_json = tokio::fs::read_to_string(&config.manifest_path)
        .await
        .with_context(|| format!("failed to read build manifest {}", config.manifest_path.display()))?;
    let manifest = BuildManifest::from_json(&manifest_json)?;

    tracing::info!(
        origin = %config.origin,
        resources = manifest.resources.len(),
        shell = manifest.core.len(),
        "starting appshell agent"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    })?;

    let mut agent = Agent::new(db, fetcher, config.origin.clone(), manifest);
    agent.install().await?;
    agent.activate().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match ControlMessage::parse(line.trim()) {
            Some(message) => {
                if let Err(err) = agent.handle_message(message).await {
                    tracing::error!(error = %err, ?message, "control message failed");
                }
            }
            None if line.trim().is_empty() => {}
            None => tracing::warn!(message = %line.trim(), "ignoring unknown control message"),
        }
    }

    Ok(())
}
