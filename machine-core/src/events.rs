// ABOUTME: Closed set of lifecycle events the synchronizer reacts to
// ABOUTME: Parses raw push-event payloads by their `type` field and normalizes channel references

use crate::error::EventError;
use crate::models::BotInfo;
use serde_json::Value;

/// A lifecycle event from the live connection.
///
/// Channel events carry only the channel ID: Slack sends either a bare ID
/// string or a partial object depending on the event type, and the
/// synchronizer re-fetches full detail anyway.
#[derive(Debug, Clone, PartialEq)]
pub enum SlackEvent {
    /// The live connection is up and the bot identity is known
    ConnectionOpened { bot: BotInfo },
    UserJoinedTeam { user: Value },
    UserChanged { user: Value },
    ChannelCreated { channel_id: String },
    ChannelRenamed { channel_id: String },
    ChannelArchived { channel_id: String },
    ChannelUnarchived { channel_id: String },
    ChannelDeleted { channel_id: String },
}

impl SlackEvent {
    /// Map a push-event body onto a lifecycle event.
    ///
    /// Returns `Ok(None)` for event types the cache does not care about
    /// (messages, reactions, ...).
    pub fn from_payload(payload: &Value) -> Result<Option<Self>, EventError> {
        let event_type = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingType)?;

        let event = match event_type {
            "team_join" => Self::UserJoinedTeam {
                user: user_payload(payload, "team_join")?,
            },
            "user_change" => Self::UserChanged {
                user: user_payload(payload, "user_change")?,
            },
            "channel_created" => Self::ChannelCreated {
                channel_id: channel_id(payload, "channel_created")?,
            },
            "channel_rename" => Self::ChannelRenamed {
                channel_id: channel_id(payload, "channel_rename")?,
            },
            "channel_archive" => Self::ChannelArchived {
                channel_id: channel_id(payload, "channel_archive")?,
            },
            "channel_unarchive" => Self::ChannelUnarchived {
                channel_id: channel_id(payload, "channel_unarchive")?,
            },
            "channel_deleted" => Self::ChannelDeleted {
                channel_id: channel_id(payload, "channel_deleted")?,
            },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Stable name for logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionOpened { .. } => "connection_opened",
            Self::UserJoinedTeam { .. } => "team_join",
            Self::UserChanged { .. } => "user_change",
            Self::ChannelCreated { .. } => "channel_created",
            Self::ChannelRenamed { .. } => "channel_rename",
            Self::ChannelArchived { .. } => "channel_archive",
            Self::ChannelUnarchived { .. } => "channel_unarchive",
            Self::ChannelDeleted { .. } => "channel_deleted",
        }
    }
}

fn user_payload(payload: &Value, event_type: &'static str) -> Result<Value, EventError> {
    payload
        .get("user")
        .filter(|user| user.is_object())
        .cloned()
        .ok_or(EventError::MissingField {
            event_type,
            field: "user",
        })
}

fn channel_id(payload: &Value, event_type: &'static str) -> Result<String, EventError> {
    let id = match payload.get("channel") {
        Some(Value::String(id)) => Some(id.as_str()),
        Some(Value::Object(channel)) => channel.get("id").and_then(Value::as_str),
        _ => None,
    };
    id.filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(EventError::MissingField {
            event_type,
            field: "channel",
        })
}
