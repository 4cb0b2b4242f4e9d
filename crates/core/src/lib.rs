//! Core types and shared functionality for appshell.
//!
//! This crate provides:
//! - The resource manifest model and request-key normalization
//! - SQLite-backed cache stores and the activation-time reconciler
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;

pub use cache::{CacheDb, CachedResponse, ReconcileOutcome, Reconciler};
pub use config::AgentConfig;
pub use error::Error;
pub use manifest::{BuildManifest, ResourceManifest};
