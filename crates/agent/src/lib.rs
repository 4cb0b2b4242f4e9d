//! Agent lifecycle wiring for appshell.
//!
//! Exposes the [`Agent`] state machine and control-message handling; the
//! `appshell` binary drives it over stdio.

pub mod agent;

pub use agent::{Agent, ControlMessage, Lifecycle};
