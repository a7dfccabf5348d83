// ABOUTME: In-memory SlackApi implementation for tests
// ABOUTME: Serves scripted listing pages and channel details, and records every call it receives

use crate::models::BotInfo;
use crate::pagination::PageRequest;
use crate::traits::{Listing, MessageReceipt, OutgoingMessage, SlackApi};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A call observed by `MockSlackApi`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    AuthTest,
    ListPage {
        listing: Listing,
        limit: u16,
        cursor: Option<String>,
    },
    ChannelInfo(String),
    PostMessage {
        channel: String,
        text: String,
        as_user: bool,
    },
    PostEphemeral {
        channel: String,
        user: String,
        text: String,
    },
    AddReaction {
        channel: String,
        ts: String,
        emoji: String,
    },
    OpenIm(String),
}

enum ScriptedPage {
    Page { items: Vec<Value>, next_cursor: Option<String> },
    Fail(String),
}

#[derive(Default)]
struct MockState {
    pages: HashMap<Listing, VecDeque<ScriptedPage>>,
    channels: HashMap<String, Value>,
    failing_channels: HashSet<String>,
    ims: HashMap<String, String>,
    failing_posts: bool,
    calls: Vec<RecordedCall>,
    posted: Vec<OutgoingMessage>,
    next_ts: u64,
}

/// Scriptable fake of the Slack Web API.
///
/// Listing pages are served in the order they were added; once a listing's
/// script runs out it answers with an empty final page.
pub struct MockSlackApi {
    bot: BotInfo,
    state: Mutex<MockState>,
}

impl Default for MockSlackApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSlackApi {
    pub fn new() -> Self {
        Self {
            bot: BotInfo::new("B1"),
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_bot(mut self, bot: BotInfo) -> Self {
        self.bot = bot;
        self
    }

    /// Queue one page of a listing; `next_cursor: None` marks the last page
    pub fn with_page(self, listing: Listing, items: Vec<Value>, next_cursor: Option<&str>) -> Self {
        self.state()
            .pages
            .entry(listing)
            .or_default()
            .push_back(ScriptedPage::Page {
                items,
                next_cursor: next_cursor.map(str::to_string),
            });
        self
    }

    pub fn with_page_error(self, listing: Listing, message: &str) -> Self {
        self.state()
            .pages
            .entry(listing)
            .or_default()
            .push_back(ScriptedPage::Fail(message.to_string()));
        self
    }

    /// Detail returned by `channel_info` for the payload's `id`
    pub fn with_channel(self, detail: Value) -> Self {
        let id = detail
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.state().channels.insert(id, detail);
        self
    }

    pub fn with_failing_channel(self, channel_id: &str) -> Self {
        self.state().failing_channels.insert(channel_id.to_string());
        self
    }

    pub fn with_im(self, user_id: &str, channel_id: &str) -> Self {
        self.state()
            .ims
            .insert(user_id.to_string(), channel_id.to_string());
        self
    }

    /// Make every post fail with an API error
    pub fn with_failing_posts(self) -> Self {
        self.state().failing_posts = true;
        self
    }

    /// Replace a channel's detail after construction (e.g. to simulate a rename)
    pub fn set_channel(&self, detail: Value) {
        if let Some(id) = detail.get("id").and_then(Value::as_str) {
            self.state().channels.insert(id.to_string(), detail.clone());
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Messages passed to `post_message` / `post_ephemeral`, in call order
    pub fn posted(&self) -> Vec<OutgoingMessage> {
        self.state().posted.clone()
    }

    pub fn list_calls(&self, listing: Listing) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, RecordedCall::ListPage { listing: l, .. } if *l == listing))
            .count()
    }

    fn receipt(state: &mut MockState, channel: &str) -> MessageReceipt {
        state.next_ts += 1;
        MessageReceipt {
            channel: channel.to_string(),
            ts: Some(format!("1700000000.{:06}", state.next_ts)),
        }
    }
}

fn page_response(listing: Listing, items: Vec<Value>, next_cursor: String) -> Value {
    let mut response = Map::new();
    response.insert("ok".to_string(), Value::Bool(true));
    response.insert(listing.items_field().to_string(), Value::Array(items));
    response.insert(
        "response_metadata".to_string(),
        json!({ "next_cursor": next_cursor }),
    );
    Value::Object(response)
}

#[async_trait]
impl SlackApi for MockSlackApi {
    async fn auth_test(&self) -> Result<BotInfo> {
        self.state().calls.push(RecordedCall::AuthTest);
        Ok(self.bot.clone())
    }

    async fn list_page(&self, listing: Listing, page: PageRequest) -> Result<Value> {
        let mut state = self.state();
        state.calls.push(RecordedCall::ListPage {
            listing,
            limit: page.limit,
            cursor: page.cursor,
        });
        let scripted = state.pages.get_mut(&listing).and_then(VecDeque::pop_front);
        match scripted {
            Some(ScriptedPage::Page { items, next_cursor }) => Ok(page_response(
                listing,
                items,
                next_cursor.unwrap_or_default(),
            )),
            Some(ScriptedPage::Fail(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(page_response(listing, Vec::new(), String::new())),
        }
    }

    async fn channel_info(&self, channel_id: &str) -> Result<Value> {
        let mut state = self.state();
        state
            .calls
            .push(RecordedCall::ChannelInfo(channel_id.to_string()));
        if state.failing_channels.contains(channel_id) {
            anyhow::bail!("channel_not_found");
        }
        state
            .channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("channel_not_found"))
    }

    async fn post_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
        as_user: bool,
    ) -> Result<MessageReceipt> {
        let mut state = self.state();
        state.calls.push(RecordedCall::PostMessage {
            channel: channel_id.to_string(),
            text: message.text.clone(),
            as_user,
        });
        if state.failing_posts {
            anyhow::bail!("not_in_channel");
        }
        state.posted.push(message.clone());
        Ok(Self::receipt(&mut state, channel_id))
    }

    async fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        message: &OutgoingMessage,
    ) -> Result<MessageReceipt> {
        let mut state = self.state();
        state.calls.push(RecordedCall::PostEphemeral {
            channel: channel_id.to_string(),
            user: user_id.to_string(),
            text: message.text.clone(),
        });
        if state.failing_posts {
            anyhow::bail!("not_in_channel");
        }
        state.posted.push(message.clone());
        Ok(MessageReceipt {
            channel: channel_id.to_string(),
            ts: None,
        })
    }

    async fn add_reaction(&self, channel_id: &str, ts: &str, emoji: &str) -> Result<()> {
        self.state().calls.push(RecordedCall::AddReaction {
            channel: channel_id.to_string(),
            ts: ts.to_string(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn open_im(&self, user_id: &str) -> Result<String> {
        let mut state = self.state();
        state.calls.push(RecordedCall::OpenIm(user_id.to_string()));
        Ok(state
            .ims
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| format!("D{}", user_id.trim_start_matches('U'))))
    }
}
