// ABOUTME: Entity model for mirrored Slack users and channels plus the bot identity
// ABOUTME: Entities derive Deserialize and decode through a path-aware serde entry point

mod channel;
pub(crate) mod decode;
mod user;

pub use channel::Channel;
pub use user::{Profile, User};

use crate::error::DeserializationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of the bot account, captured when the live connection opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
}

impl BotInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            team_id: None,
        }
    }

    pub fn from_payload(payload: &Value) -> Result<Self, DeserializationError> {
        decode::from_value("bot", payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bot_info_from_payload() {
        let bot = BotInfo::from_payload(&json!({"id": "B1"})).unwrap();
        assert_eq!(bot, BotInfo::new("B1"));
    }

    #[test]
    fn test_bot_info_requires_id() {
        assert!(BotInfo::from_payload(&json!({"name": "machine"})).is_err());
    }
}
