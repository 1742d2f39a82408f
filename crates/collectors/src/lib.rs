#![doc = include_str!("../README.md")]

pub mod conversation;
pub mod error;
pub mod generation;
mod http;
pub mod notify;
pub mod scan;
pub mod storage;
pub mod wiring;

pub use conversation::HttpConversationService;
pub use error::CollectorError;
pub use generation::ChatCompletionClient;
pub use notify::EmailNotifier;
pub use scan::HttpScanBackend;
pub use storage::{FileSnapshotStore, HttpSnapshotStore};
pub use wiring::orchestrator_from_config;
