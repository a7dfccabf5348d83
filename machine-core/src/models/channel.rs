// ABOUTME: Slack channel entity type
// ABOUTME: Decoded from conversations.list items and conversations.info responses

use super::decode;
use crate::error::DeserializationError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A conversation as mirrored in the entity cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_channel: Option<bool>,
    #[serde(default)]
    pub is_group: Option<bool>,
    #[serde(default)]
    pub is_im: Option<bool>,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub is_general: Option<bool>,
    #[serde(default)]
    pub is_member: Option<bool>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default, deserialize_with = "text_value")]
    pub topic: Option<String>,
    #[serde(default, deserialize_with = "text_value")]
    pub purpose: Option<String>,
    #[serde(default)]
    pub num_members: Option<i64>,
}

impl Channel {
    pub fn from_payload(payload: &Value) -> Result<Self, DeserializationError> {
        decode::from_value("channel", payload)
    }

    /// `#name` form used when addressing the channel in text
    pub fn mention_name(&self) -> String {
        format!("#{}", self.name)
    }
}

#[derive(Deserialize)]
struct TextValue {
    #[serde(default)]
    value: Option<String>,
}

/// Topic and purpose arrive as `{ "value": "...", "creator": ..., "last_set": ... }`
fn text_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<TextValue>::deserialize(deserializer)?.and_then(|text| text.value))
}
