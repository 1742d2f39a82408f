//! Vigil daemon library.
//!
//! Exposes the daemon internals for integration testing.
//! In production, `vigil-daemon` is used as a binary (main.rs).

pub mod api;
pub mod cli;
pub mod daemon;
pub mod health;
pub mod logging;
pub mod metrics_server;
pub mod pid;

pub use daemon::Daemon;
