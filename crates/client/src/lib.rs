//! Client code for appshell.
//!
//! This crate provides the HTTP fetch client, the request interception
//! policies (cache-first-with-lazy-fill and online-first), install-time
//! shell staging, and eager offline pre-population.

pub mod fetch;
pub mod install;
pub mod offline;
pub mod policy;

pub use fetch::{Fetch, FetchClient, FetchConfig, FetchedResource};
pub use install::ShellLoader;
pub use offline::download_offline;
pub use policy::Interceptor;
