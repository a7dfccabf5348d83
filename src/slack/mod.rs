// ABOUTME: Slack Web API adapter backed by slack-morphism
// ABOUTME: Implements the core SlackApi trait and hands the shared hyper client to the Socket Mode listener

pub mod listener;

use anyhow::{Context, Result};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::proxy::Tunnel;
use hyper_util::client::legacy::connect::HttpConnector;
use machine_core::config::SlackConfig;
use machine_core::models::BotInfo;
use machine_core::pagination::PageRequest;
use machine_core::traits::{Attachment, Listing, MessageReceipt, OutgoingMessage, SlackApi};
use serde::Serialize;
use serde_json::{json, Map, Value};
use slack_morphism::prelude::*;
use std::sync::Arc;

/// Web API connector that reaches Slack through an HTTP CONNECT proxy
pub type SlackProxiedConnector = SlackClientHyperConnector<HttpsConnector<Tunnel<HttpConnector>>>;

/// Slack Web API client authenticated with the bot token
pub struct SlackWebApi<C = SlackClientHyperHttpsConnector>
where
    C: SlackClientHttpConnector + Send + Sync,
{
    /// Shared Slack client for API calls
    client: Arc<SlackClient<C>>,
    /// Bot OAuth token (xoxb-...) for Web API calls
    bot_token: SlackApiToken,
}

impl SlackWebApi {
    /// Direct connection to slack.com
    pub fn new(bot_token: &str) -> Result<Self> {
        let connector =
            SlackClientHyperConnector::new().context("Failed to create Slack HTTP connector")?;
        Ok(Self::with_connector(connector, bot_token))
    }
}

impl SlackWebApi<SlackProxiedConnector> {
    /// Tunnel every Web API call through `proxy_url` (`http://host:port`)
    pub fn with_proxy(bot_token: &str, proxy_url: &str) -> Result<Self> {
        let connector = proxied_connector(proxy_url)?;
        Ok(Self::with_connector(
            SlackClientHyperConnector::with_connector(connector),
            bot_token,
        ))
    }
}

impl<C> SlackWebApi<C>
where
    C: SlackClientHttpConnector + Send + Sync,
{
    fn with_connector(connector: C, bot_token: &str) -> Self {
        Self {
            client: Arc::new(SlackClient::new(connector)),
            bot_token: SlackApiToken::new(SlackApiTokenValue(bot_token.to_string())),
        }
    }

    fn content(message: &OutgoingMessage) -> Result<SlackMessageContent> {
        let mut content = SlackMessageContent::new().with_text(message.text.clone());
        if !message.attachments.is_empty() {
            content = content.with_attachments(slack_attachments(&message.attachments)?);
        }
        Ok(content)
    }
}

/// Build the Web API adapter for `config`, proxied when `http_proxy` is set
pub fn web_api(config: &SlackConfig) -> Result<Arc<dyn SlackApi>> {
    match config.http_proxy.as_deref() {
        Some(proxy_url) => {
            tracing::info!("Routing Slack Web API calls through HTTP proxy");
            Ok(Arc::new(SlackWebApi::with_proxy(&config.bot_token, proxy_url)?))
        }
        None => Ok(Arc::new(SlackWebApi::new(&config.bot_token)?)),
    }
}

fn proxied_connector(proxy_url: &str) -> Result<HttpsConnector<Tunnel<HttpConnector>>> {
    let proxy: http::Uri = proxy_url
        .parse()
        .with_context(|| format!("Invalid HTTP proxy URL {}", proxy_url))?;
    if proxy.scheme_str() != Some("http") || proxy.host().is_none() {
        anyhow::bail!("HTTP proxy must be an http://host:port URL, got {}", proxy_url);
    }
    if proxy.authority().is_some_and(|authority| authority.as_str().contains('@')) {
        anyhow::bail!("HTTP proxy credentials are not supported");
    }

    let tunnel = Tunnel::new(proxy, HttpConnector::new());
    Ok(hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .context("Failed to load native TLS roots")?
        .https_only()
        .enable_http1()
        .wrap_connector(tunnel))
}

/// Attachments only carry plain optional strings, so they map field-for-field
fn slack_attachments(attachments: &[Attachment]) -> Result<Vec<SlackMessageAttachment>> {
    attachments
        .iter()
        .map(|attachment| {
            serde_json::to_value(attachment)
                .and_then(serde_json::from_value)
                .context("Failed to convert message attachment")
        })
        .collect()
}

/// Shape a typed listing response back into the wire page the core paginates over
fn listing_page<T: Serialize>(
    listing: Listing,
    items: &[T],
    metadata: Option<&SlackResponseMetadata>,
) -> Result<Value> {
    let next_cursor = metadata
        .and_then(|m| m.next_cursor.as_ref())
        .map(|cursor| cursor.0.clone())
        .unwrap_or_default();

    let mut page = Map::new();
    page.insert(
        listing.items_field().to_string(),
        serde_json::to_value(items).context("Failed to encode listing page")?,
    );
    page.insert(
        "response_metadata".to_string(),
        json!({ "next_cursor": next_cursor }),
    );
    Ok(Value::Object(page))
}

#[async_trait]
impl<C> SlackApi for SlackWebApi<C>
where
    C: SlackClientHttpConnector + Send + Sync + 'static,
{
    async fn auth_test(&self) -> Result<BotInfo> {
        let session = self.client.open_session(&self.bot_token);
        let auth_response = session
            .auth_test()
            .await
            .context("Failed to call Slack auth.test, check bot_token")?;

        tracing::info!(
            bot_user = %auth_response.user_id,
            team = %auth_response.team,
            "Slack bot authenticated"
        );

        Ok(BotInfo {
            id: auth_response.user_id.to_string(),
            name: auth_response.user.as_ref().map(|user| user.to_string()),
            team_id: Some(auth_response.team_id.to_string()),
        })
    }

    async fn list_page(&self, listing: Listing, page: PageRequest) -> Result<Value> {
        let session = self.client.open_session(&self.bot_token);
        let cursor = page.cursor.map(SlackCursorId);

        match listing {
            Listing::Users => {
                let mut req = SlackApiUsersListRequest::new().with_limit(page.limit);
                req.cursor = cursor;
                let resp = session
                    .users_list(&req)
                    .await
                    .context("Failed to call Slack users.list")?;
                listing_page(listing, &resp.members, resp.response_metadata.as_ref())
            }
            Listing::Channels => {
                let mut req = SlackApiConversationsListRequest::new()
                    .with_limit(page.limit)
                    .with_exclude_archived(false)
                    .with_types(vec![
                        SlackConversationType::Public,
                        SlackConversationType::Private,
                    ]);
                req.cursor = cursor;
                let resp = session
                    .conversations_list(&req)
                    .await
                    .context("Failed to call Slack conversations.list")?;
                listing_page(listing, &resp.channels, resp.response_metadata.as_ref())
            }
        }
    }

    async fn channel_info(&self, channel_id: &str) -> Result<Value> {
        let session = self.client.open_session(&self.bot_token);

        let req = SlackApiConversationsInfoRequest::new(channel_id.into());
        let resp = session
            .conversations_info(&req)
            .await
            .with_context(|| format!("Failed to get Slack channel info for {}", channel_id))?;

        serde_json::to_value(&resp.channel).context("Failed to encode channel info")
    }

    async fn post_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
        as_user: bool,
    ) -> Result<MessageReceipt> {
        let session = self.client.open_session(&self.bot_token);

        let mut req = SlackApiChatPostMessageRequest::new(channel_id.into(), Self::content(message)?);
        if let Some(thread_ts) = &message.thread_ts {
            req = req.with_thread_ts(thread_ts.clone().into());
        }
        if as_user {
            req = req.with_as_user(true);
        }

        let resp = session
            .chat_post_message(&req)
            .await
            .context("Failed to send Slack message")?;

        Ok(MessageReceipt {
            channel: resp.channel.to_string(),
            ts: Some(resp.ts.to_string()),
        })
    }

    async fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        message: &OutgoingMessage,
    ) -> Result<MessageReceipt> {
        let session = self.client.open_session(&self.bot_token);

        let mut req = SlackApiChatPostEphemeralRequest::new(
            channel_id.into(),
            user_id.into(),
            Self::content(message)?,
        );
        if let Some(thread_ts) = &message.thread_ts {
            req = req.with_thread_ts(thread_ts.clone().into());
        }

        session
            .chat_post_ephemeral(&req)
            .await
            .context("Failed to send ephemeral Slack message")?;

        Ok(MessageReceipt {
            channel: channel_id.to_string(),
            ts: None,
        })
    }

    async fn add_reaction(&self, channel_id: &str, ts: &str, emoji: &str) -> Result<()> {
        let session = self.client.open_session(&self.bot_token);

        session
            .reactions_add(&SlackApiReactionsAddRequest {
                channel: SlackChannelId(channel_id.to_string()),
                name: SlackReactionName(emoji.to_string()),
                timestamp: SlackTs(ts.to_string()),
            })
            .await
            .context("Failed to add Slack reaction")?;

        Ok(())
    }

    async fn open_im(&self, user_id: &str) -> Result<String> {
        let session = self.client.open_session(&self.bot_token);

        let req = SlackApiConversationsOpenRequest::new().with_users(vec![user_id.into()]);
        let resp = session
            .conversations_open(&req)
            .await
            .context("Failed to open Slack DM")?;

        Ok(resp.channel.id.to_string())
    }
}
