// ABOUTME: Slack entity cache and event-driven synchronization for chat bots
// ABOUTME: Provides the user/channel cache, the lifecycle synchronizer, and the outbound client facade

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod models;
pub mod pagination;
pub mod paths;
pub mod scheduled;
pub mod sync;
pub mod testing;
pub mod traits;

pub use cache::EntityCache;
pub use client::{AsChannelId, AsUserId, MachineClient};
pub use error::{DeserializationError, EventError, FetchError, SyncError};
pub use events::SlackEvent;
pub use models::{BotInfo, Channel, Profile, User};
pub use scheduled::{DeferredExecutor, JobId, ScheduledAction, ScheduledJob};
pub use sync::{EventSynchronizer, SyncOptions};

// Re-export the Web API seam and the message types that cross it
pub use traits::{Attachment, Listing, MessageReceipt, OutgoingMessage, SlackApi};
