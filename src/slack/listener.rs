// ABOUTME: Socket Mode listener that feeds lifecycle events to the synchronizer
// ABOUTME: Re-encodes push event bodies as JSON, maps them to SlackEvent, and forwards them over mpsc

use anyhow::{Context, Result};
use machine_core::events::SlackEvent;
use machine_core::models::BotInfo;
use serde_json::Value;
use slack_morphism::prelude::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// State shared with Socket Mode callback functions via user state storage.
/// Callbacks are fn pointers, so the sender is registered with
/// `with_user_state()` and looked up inside each callback.
#[derive(Clone)]
struct ListenerState {
    tx: mpsc::Sender<SlackEvent>,
}

/// Map a push event body onto a lifecycle event, logging the ones that cannot be used
fn lifecycle_event(body: &Value) -> Option<SlackEvent> {
    match SlackEvent::from_payload(body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed push event");
            None
        }
    }
}

async fn forward(tx: &mpsc::Sender<SlackEvent>, event: SlackEvent) {
    let kind = event.kind();
    if tx.send(event).await.is_err() {
        tracing::warn!(event = kind, "Synchronizer stopped, dropping event");
    }
}

/// Handle push events from Socket Mode
async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = {
        let guard = states.read().await;
        guard
            .get_user_state::<ListenerState>()
            .cloned()
            .ok_or("ListenerState not found in user state")?
    };

    let body = serde_json::to_value(&event.event)?;
    if let Some(lifecycle) = lifecycle_event(&body) {
        tracing::debug!(event = lifecycle.kind(), "Lifecycle event received");
        forward(&state.tx, lifecycle).await;
    }
    Ok(())
}

/// Socket Mode error handler
fn socket_mode_error_handler(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    tracing::error!(error = %err, "Socket Mode error");
    HttpStatusCode::OK
}

/// Open the Socket Mode connection and serve it on a background task.
///
/// `ConnectionOpened` carrying `bot` is sent first so the synchronizer runs
/// its full sync before any delta event. The listener keeps its own direct
/// client; Web API calls go through whatever adapter the caller built.
pub async fn start_listener(
    app_token: &str,
    bot: BotInfo,
    tx: mpsc::Sender<SlackEvent>,
) -> Result<JoinHandle<()>> {
    let client = Arc::new(SlackClient::new(
        SlackClientHyperConnector::new().context("Failed to create Slack HTTP connector")?,
    ));
    let socket_mode_callbacks =
        SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_event);

    let listener_environment = Arc::new(
        SlackClientEventsListenerEnvironment::new(client)
            .with_error_handler(socket_mode_error_handler)
            .with_user_state(ListenerState { tx: tx.clone() }),
    );

    let socket_mode_listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        listener_environment,
        socket_mode_callbacks,
    );

    // Queued ahead of listen_for so no push event can overtake the full sync
    let bot_id = bot.id.clone();
    forward(&tx, SlackEvent::ConnectionOpened { bot }).await;

    let app_token = SlackApiToken::new(SlackApiTokenValue(app_token.to_string()));
    socket_mode_listener
        .listen_for(&app_token)
        .await
        .context("Failed to start Socket Mode listener, check app_token")?;
    tracing::info!(bot_id = %bot_id, "Socket Mode connected");

    Ok(tokio::spawn(async move {
        // serve() blocks until the listener is shut down
        socket_mode_listener.serve().await;
        tracing::info!("Socket Mode listener stopped");
    }))
}
