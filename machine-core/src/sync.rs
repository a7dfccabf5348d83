// ABOUTME: Event synchronizer that keeps the entity cache consistent with the remote workspace
// ABOUTME: Full sync on connection-opened, then one cache mutation per lifecycle event, strictly in order

use crate::client::MachineClient;
use crate::error::SyncError;
use crate::events::SlackEvent;
use crate::metrics;
use crate::models::BotInfo;
use crate::pagination::fetch_listing;
use crate::traits::Listing;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Also bulk-fetch channels at connect time (users are always fetched)
    pub sync_channels: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sync_channels: true,
        }
    }
}

/// Applies lifecycle events to the cache owned by a `MachineClient`.
///
/// Handlers never run concurrently: `run` awaits each one before taking the
/// next event, which is what makes "last event wins" hold per entity.
pub struct EventSynchronizer {
    client: Arc<MachineClient>,
    options: SyncOptions,
}

impl EventSynchronizer {
    pub fn new(client: Arc<MachineClient>, options: SyncOptions) -> Self {
        Self { client, options }
    }

    /// Consume events until the sender side closes.
    ///
    /// A failed event is logged and dropped; only a failed full sync stops the loop.
    pub async fn run(&self, mut events: mpsc::Receiver<SlackEvent>) -> Result<(), SyncError> {
        tracing::info!("Event synchronizer started");
        while let Some(event) = events.recv().await {
            let kind = event.kind();
            if let Err(e) = self.handle(event).await {
                if e.is_fatal() {
                    tracing::error!(event = kind, error = %e, "Synchronization aborted");
                    return Err(e);
                }
                tracing::warn!(event = kind, error = %e, "Dropped lifecycle event");
            }
        }
        tracing::info!("Event stream closed, synchronizer stopping");
        Ok(())
    }

    /// Apply a single event to the cache
    pub async fn handle(&self, event: SlackEvent) -> Result<(), SyncError> {
        let kind = event.kind();
        tracing::debug!(event = kind, "Handling lifecycle event");

        let result = self.apply(event).await;

        let cache = self.client.cache();
        metrics::record_event(kind, result.is_ok());
        metrics::record_cache_sizes(cache.user_count(), cache.channel_count());
        result
    }

    async fn apply(&self, event: SlackEvent) -> Result<(), SyncError> {
        match event {
            SlackEvent::ConnectionOpened { bot } => self.full_sync(bot).await,
            SlackEvent::UserJoinedTeam { user } | SlackEvent::UserChanged { user } => {
                let user = self.client.cache().register_user(&user)?;
                tracing::debug!(user_id = %user.id, name = %user.name, "User registered");
                Ok(())
            }
            SlackEvent::ChannelCreated { channel_id }
            | SlackEvent::ChannelRenamed { channel_id }
            | SlackEvent::ChannelArchived { channel_id }
            | SlackEvent::ChannelUnarchived { channel_id } => {
                self.refresh_channel(&channel_id).await
            }
            SlackEvent::ChannelDeleted { channel_id } => {
                if self.client.cache().remove_channel(&channel_id).is_none() {
                    tracing::debug!(channel_id = %channel_id, "Deleted channel was not cached");
                }
                Ok(())
            }
        }
    }

    async fn full_sync(&self, bot: BotInfo) -> Result<(), SyncError> {
        tracing::info!(bot_id = %bot.id, "Connection opened, starting full sync");
        let started = Instant::now();
        self.client.set_bot_info(bot);

        let api = self.client.api();
        let cache = self.client.cache();

        let users = fetch_listing(api, Listing::Users)
            .await
            .map_err(|source| SyncError::FullSync {
                listing: Listing::Users.as_str(),
                source,
            })?;
        let stored_users = cache.register_users(&users);

        let mut stored_channels = 0;
        if self.options.sync_channels {
            let channels = fetch_listing(api, Listing::Channels)
                .await
                .map_err(|source| SyncError::FullSync {
                    listing: Listing::Channels.as_str(),
                    source,
                })?;
            stored_channels = cache.register_channels(&channels);
        }

        metrics::record_full_sync(started.elapsed().as_secs_f64());
        tracing::info!(
            users = stored_users,
            channels = stored_channels,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Full sync complete"
        );
        Ok(())
    }

    /// Channel events carry partial data, so the cache is filled from a fresh detail fetch
    async fn refresh_channel(&self, channel_id: &str) -> Result<(), SyncError> {
        let detail = self
            .client
            .api()
            .channel_info(channel_id)
            .await
            .map_err(|source| SyncError::ChannelFetch {
                channel_id: channel_id.to_string(),
                source,
            })?;
        let channel = self.client.cache().register_channel(&detail)?;
        tracing::debug!(channel_id = %channel.id, name = %channel.name, "Channel refreshed");
        Ok(())
    }
}
