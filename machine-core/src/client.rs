// ABOUTME: Facade bundling bot identity, cache accessors, and outbound Slack actions
// ABOUTME: Resolves "who/where" arguments from raw IDs or cached entities before calling the Web API

use crate::cache::EntityCache;
use crate::metrics;
use crate::models::{BotInfo, Channel, User};
use crate::scheduled::{DeferredExecutor, JobId, ScheduledAction, ScheduledJob};
use crate::traits::{Attachment, MessageReceipt, OutgoingMessage, SlackApi};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};

// =============================================================================
// ID resolution
// =============================================================================

/// Anything that names a user: a raw ID string or a user entity
pub trait AsUserId {
    fn user_id(&self) -> &str;
}

/// Anything that names a channel: a raw ID string or a channel entity
pub trait AsChannelId {
    fn channel_id(&self) -> &str;
}

impl AsUserId for str {
    fn user_id(&self) -> &str {
        self
    }
}

impl AsUserId for String {
    fn user_id(&self) -> &str {
        self
    }
}

impl AsUserId for User {
    fn user_id(&self) -> &str {
        &self.id
    }
}

impl AsUserId for Arc<User> {
    fn user_id(&self) -> &str {
        &self.id
    }
}

impl<T: AsUserId + ?Sized> AsUserId for &T {
    fn user_id(&self) -> &str {
        (**self).user_id()
    }
}

impl AsChannelId for str {
    fn channel_id(&self) -> &str {
        self
    }
}

impl AsChannelId for String {
    fn channel_id(&self) -> &str {
        self
    }
}

impl AsChannelId for Channel {
    fn channel_id(&self) -> &str {
        &self.id
    }
}

impl AsChannelId for Arc<Channel> {
    fn channel_id(&self) -> &str {
        &self.id
    }
}

impl<T: AsChannelId + ?Sized> AsChannelId for &T {
    fn channel_id(&self) -> &str {
        (**self).channel_id()
    }
}

/// Reaction names are accepted with or without surrounding colons
fn emoji_name(emoji: &str) -> &str {
    emoji.trim_matches(':')
}

// =============================================================================
// MachineClient
// =============================================================================

/// Outward-facing client. Constructed once by the composition root and
/// shared by reference; the synchronizer fills in the bot identity.
pub struct MachineClient {
    api: Arc<dyn SlackApi>,
    cache: Arc<EntityCache>,
    bot_info: RwLock<Option<BotInfo>>,
    scheduler: Option<Arc<dyn DeferredExecutor>>,
}

impl MachineClient {
    pub fn new(api: Arc<dyn SlackApi>, cache: Arc<EntityCache>) -> Self {
        Self {
            api,
            cache,
            bot_info: RwLock::new(None),
            scheduler: None,
        }
    }

    /// Attach the collaborator that runs `send_scheduled` / `send_dm_scheduled` jobs
    pub fn with_scheduler(mut self, scheduler: Arc<dyn DeferredExecutor>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn api(&self) -> &dyn SlackApi {
        self.api.as_ref()
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// Bot identity, known once the live connection has opened
    pub fn bot_info(&self) -> Option<BotInfo> {
        self.bot_info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_bot_info(&self, bot: BotInfo) {
        *self.bot_info.write().unwrap_or_else(PoisonError::into_inner) = Some(bot);
    }

    /// The bot's own user entry, if the full sync has seen it
    pub fn bot_user(&self) -> Option<Arc<User>> {
        self.bot_info().and_then(|bot| self.cache.get_user(&bot.id))
    }

    pub fn users(&self) -> Vec<Arc<User>> {
        self.cache.users()
    }

    pub fn channels(&self) -> Vec<Arc<Channel>> {
        self.cache.channels()
    }

    // ─── Outbound actions ───────────────────────────────────────────

    /// Post to a channel. Messages carrying `ephemeral_user` are only shown to that user.
    pub async fn send(
        &self,
        channel: impl AsChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageReceipt> {
        let channel_id = channel.channel_id();
        let result = match message.ephemeral_user.as_deref() {
            Some(user_id) => {
                self.api
                    .post_ephemeral(channel_id, user_id, &message)
                    .await
            }
            None => self.api.post_message(channel_id, &message, false).await,
        };
        let action = if message.ephemeral_user.is_some() {
            "send_ephemeral"
        } else {
            "send"
        };
        metrics::record_outbound(action, result.is_ok());
        result
    }

    pub async fn react(&self, channel: impl AsChannelId, ts: &str, emoji: &str) -> Result<()> {
        let result = self
            .api
            .add_reaction(channel.channel_id(), ts, emoji_name(emoji))
            .await;
        metrics::record_outbound("react", result.is_ok());
        result
    }

    /// Open a direct-message conversation with a user and return its channel ID
    pub async fn open_im(&self, user: impl AsUserId) -> Result<String> {
        let result = self.api.open_im(user.user_id()).await;
        metrics::record_outbound("open_im", result.is_ok());
        result
    }

    /// Open a DM with the user and post to it as the bot user
    pub async fn send_dm(
        &self,
        user: impl AsUserId,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<MessageReceipt> {
        let user_id = user.user_id();
        let dm_channel = self
            .open_im(user_id)
            .await
            .with_context(|| format!("Failed to open DM with {}", user_id))?;

        let message = OutgoingMessage::text(text).with_attachments(attachments);
        let result = self.api.post_message(&dm_channel, &message, true).await;
        metrics::record_outbound("send_dm", result.is_ok());
        result
    }

    // ─── Deferred actions ───────────────────────────────────────────

    pub async fn send_scheduled(
        &self,
        when: DateTime<Utc>,
        channel: impl AsChannelId,
        message: OutgoingMessage,
    ) -> Result<JobId> {
        let action = ScheduledAction::Send {
            channel_id: channel.channel_id().to_string(),
            message,
        };
        self.schedule(when, action).await
    }

    pub async fn send_dm_scheduled(
        &self,
        when: DateTime<Utc>,
        user: impl AsUserId,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<JobId> {
        let action = ScheduledAction::SendDm {
            user_id: user.user_id().to_string(),
            text: text.to_string(),
            attachments,
        };
        self.schedule(when, action).await
    }

    async fn schedule(&self, when: DateTime<Utc>, action: ScheduledAction) -> Result<JobId> {
        let scheduler = self
            .scheduler
            .as_ref()
            .context("No deferred executor configured for scheduled sends")?;
        if when <= Utc::now() {
            anyhow::bail!("Scheduled time {} is not in the future", when.to_rfc3339());
        }

        let kind = action.kind();
        let id = scheduler.schedule(ScheduledJob::new(when, action)).await?;
        tracing::info!(job_id = %id, action = kind, run_at = %when.to_rfc3339(), "Scheduled outbound action");
        Ok(id)
    }

    /// Run a previously scheduled action now. Entry point for deferred executors.
    pub async fn execute(&self, action: &ScheduledAction) -> Result<MessageReceipt> {
        match action {
            ScheduledAction::Send {
                channel_id,
                message,
            } => self.send(channel_id, message.clone()).await,
            ScheduledAction::SendDm {
                user_id,
                text,
                attachments,
            } => self.send_dm(user_id, text, attachments.clone()).await,
        }
    }
}
