// ABOUTME: Serializable descriptions of deferred outbound actions and the executor interface
// ABOUTME: Actions hold IDs and plain data only so they can be replayed by a restarted process

use crate::traits::{Attachment, OutgoingMessage};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to send and to whom, with every entity reduced to its ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScheduledAction {
    Send {
        channel_id: String,
        message: OutgoingMessage,
    },
    SendDm {
        user_id: String,
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attachments: Vec<Attachment>,
    },
}

impl ScheduledAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Send { .. } => "send",
            Self::SendDm { .. } => "send_dm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A deferred action together with its due time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: JobId,
    pub run_at: DateTime<Utc>,
    pub action: ScheduledAction,
}

impl ScheduledJob {
    pub fn new(run_at: DateTime<Utc>, action: ScheduledAction) -> Self {
        Self {
            id: JobId::new(),
            run_at,
            action,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.run_at <= now
    }
}

/// Deferred execution collaborator: accepts a job now and arranges for its
/// action to be run through `MachineClient::execute` once `run_at` passes.
#[async_trait]
pub trait DeferredExecutor: Send + Sync {
    async fn schedule(&self, job: ScheduledJob) -> Result<JobId>;
}
