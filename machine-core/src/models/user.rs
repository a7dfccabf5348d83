// ABOUTME: Slack user and profile entity types
// ABOUTME: Decoded from users.list items and team_join/user_change event payloads

use super::decode::{self, null_as_default};
use crate::error::DeserializationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Profile block nested in a user payload. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub avatar_hash: Option<String>,
    pub status_text: Option<String>,
    pub status_emoji: Option<String>,
    pub status_expiration: Option<i64>,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub real_name: Option<String>,
    pub display_name: Option<String>,
    pub real_name_normalized: Option<String>,
    pub display_name_normalized: Option<String>,
    pub email: Option<String>,
    pub image_original: Option<String>,
    pub image_24: Option<String>,
    pub image_32: Option<String>,
    pub image_48: Option<String>,
    pub image_72: Option<String>,
    pub image_192: Option<String>,
    pub image_512: Option<String>,
    pub team: Option<String>,
}

/// A workspace member as mirrored in the entity cache.
///
/// Only `id` and `name` are required. `deleted`, `is_bot` and `is_app_user`
/// are omitted by Slack when false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub team_id: Option<String>,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deleted: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub tz: Option<String>,
    #[serde(default)]
    pub tz_label: Option<String>,
    #[serde(default)]
    pub tz_offset: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub profile: Profile,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub is_owner: Option<bool>,
    #[serde(default)]
    pub is_primary_owner: Option<bool>,
    #[serde(default)]
    pub is_restricted: Option<bool>,
    #[serde(default)]
    pub is_ultra_restricted: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_bot: bool,
    #[serde(default)]
    pub is_stranger: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_app_user: bool,
    #[serde(default)]
    pub has_2fa: Option<bool>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub updated: Option<i64>,
}

impl User {
    pub fn from_payload(payload: &Value) -> Result<Self, DeserializationError> {
        decode::from_value("user", payload)
    }

    /// Best human-facing name: profile display name, then real name, then handle
    pub fn display_name(&self) -> &str {
        [
            self.profile.display_name.as_deref(),
            self.profile.real_name.as_deref(),
            self.real_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
        .unwrap_or(&self.name)
    }

    /// Whether the account has any admin-level role
    pub fn is_workspace_admin(&self) -> bool {
        self.is_admin.unwrap_or(false)
            || self.is_owner.unwrap_or(false)
            || self.is_primary_owner.unwrap_or(false)
    }
}
