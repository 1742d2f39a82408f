//! Vigil CLI library.
//!
//! Exposes the command handlers for integration testing.
//! In production, `vigil` is used as a binary (main.rs).

pub mod cli;
pub mod client;
pub mod commands;
pub mod error;
pub mod output;
