// ABOUTME: Remote capability interface the core needs from the Slack Web API
// ABOUTME: Also defines the outbound message types passed across that interface

use crate::models::BotInfo;
use crate::pagination::PageRequest;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Outbound message types
// =============================================================================

/// Legacy secondary attachment rendered under a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl Attachment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A message to post. Holds plain data only so it can be stored for deferred delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// When set, the message is posted ephemerally, visible only to this user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_user: Option<String>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    pub fn ephemeral_to(mut self, user_id: impl Into<String>) -> Self {
        self.ephemeral_user = Some(user_id.into());
        self
    }
}

/// Where a posted message landed.
///
/// `ts` is `None` for ephemeral posts: `chat.postEphemeral` does not hand
/// back a timestamp the bot can later thread on or react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}

// =============================================================================
// Listings
// =============================================================================

/// Cursor-paginated listings used for the full sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listing {
    Users,
    Channels,
}

impl Listing {
    /// Response field that holds the page's items
    pub fn items_field(self) -> &'static str {
        match self {
            Self::Users => "members",
            Self::Channels => "channels",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Channels => "channels",
        }
    }
}

// =============================================================================
// Remote capability
// =============================================================================

/// The Slack Web API calls the core relies on.
///
/// Implementations surface transport and API errors unchanged; nothing in
/// the core retries a failed call.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Identity of the token's bot user
    async fn auth_test(&self) -> Result<BotInfo>;

    /// One page of a listing. The response is a JSON object holding
    /// `listing.items_field()` and `response_metadata.next_cursor`.
    async fn list_page(&self, listing: Listing, page: PageRequest) -> Result<Value>;

    /// Full detail of one channel, as the bare channel object
    async fn channel_info(&self, channel_id: &str) -> Result<Value>;

    async fn post_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
        as_user: bool,
    ) -> Result<MessageReceipt>;

    async fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        message: &OutgoingMessage,
    ) -> Result<MessageReceipt>;

    async fn add_reaction(&self, channel_id: &str, ts: &str, emoji: &str) -> Result<()>;

    /// Open (or reuse) a direct-message conversation and return its channel ID
    async fn open_im(&self, user_id: &str) -> Result<String>;
}
