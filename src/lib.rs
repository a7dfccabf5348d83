// ABOUTME: Root library module exposing the Slack adapter and the deferred runner
// ABOUTME: Re-exports the platform-agnostic cache, synchronizer, and client from machine-core

// Slack-specific modules (stay local)
pub mod scheduler;
pub mod slack;

// Re-export platform-agnostic modules from machine-core
pub use machine_core::cache;
pub use machine_core::client;
pub use machine_core::config;
pub use machine_core::error;
pub use machine_core::events;
pub use machine_core::metrics;
pub use machine_core::models;
pub use machine_core::pagination;
pub use machine_core::paths;
pub use machine_core::scheduled;
pub use machine_core::sync;
pub use machine_core::traits;

pub use machine_core::{EntityCache, EventSynchronizer, MachineClient, SlackEvent, SyncOptions};
