//! Socket Mode listener.
//!
//! Receives events over WebSocket without a public HTTP endpoint. The
//! transport envelope is acknowledged when the push callback returns, so
//! the business chain runs in its own task: a slow resume never delays
//! the delivery-confirmation deadline and never blocks later events.

use std::sync::Arc;

use {
    anyhow::{Context, Result},
    backchannel_common::{InboundEvent, InboundSink},
    secrecy::{ExposeSecret, Secret},
    slack_morphism::prelude::*,
    tracing::{debug, info},
};

/// Shared state for socket mode callbacks.
#[derive(Clone)]
struct SocketModeState {
    sink: Arc<dyn InboundSink>,
}

/// Connect and serve Socket Mode events until the connection ends.
pub async fn run_socket_mode(
    app_token: &Secret<String>,
    sink: Arc<dyn InboundSink>,
) -> Result<()> {
    let client = Arc::new(SlackClient::new(
        SlackClientHyperConnector::new().context("failed to build slack connector")?,
    ));
    let app_token = SlackApiToken::new(app_token.expose_secret().into());

    let callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_events);
    let listener_env = Arc::new(
        SlackClientEventsListenerEnvironment::new(client)
            .with_user_state(SocketModeState { sink }),
    );
    let socket_listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        listener_env,
        callbacks,
    );

    info!("socket mode listener connecting");
    socket_listener
        .listen_for(&app_token)
        .await
        .map_err(|e| anyhow::anyhow!("socket mode connect failed: {e}"))?;
    socket_listener.serve().await;
    info!("socket mode listener stopped");
    Ok(())
}

/// Handle push events (messages, etc.)
async fn handle_push_events(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let guard = states.read().await;
    let state = guard
        .get_user_state::<SocketModeState>()
        .ok_or("missing socket mode state")?;

    match event.event {
        SlackEventCallbackBody::Message(message) => {
            let Some(inbound) = normalize_message_event(&message) else {
                debug!("message event without channel, ignoring");
                return Ok(());
            };
            let sink = Arc::clone(&state.sink);
            tokio::spawn(async move { sink.dispatch(inbound).await });
        },
        _ => {
            debug!("ignoring event callback type");
        },
    }
    Ok(())
}

/// Flatten a Slack message event into the router's normalized shape.
/// Returns `None` for events with no channel to route on.
fn normalize_message_event(event: &SlackMessageEvent) -> Option<InboundEvent> {
    let channel = event.origin.channel.as_ref()?.to_string();
    let channel_type = Some(channel_type_for(&channel).to_string());
    let text = event
        .content
        .as_ref()
        .and_then(|content| content.text.clone())
        .unwrap_or_default();

    Some(InboundEvent {
        channel_type,
        ts: event.origin.ts.to_string(),
        thread_ts: event.origin.thread_ts.as_ref().map(ToString::to_string),
        text,
        user: event.sender.user.as_ref().map(ToString::to_string),
        bot_id: event.sender.bot_id.as_ref().map(ToString::to_string),
        subtype: event.subtype.as_ref().map(subtype_label),
        channel,
    })
}

/// Slack direct-message channel ids start with `D`.
fn channel_type_for(channel: &str) -> &'static str {
    if channel.starts_with('D') { "im" } else { "channel" }
}

fn subtype_label(subtype: &SlackMessageEventType) -> String {
    serde_json::to_value(subtype)
        .ok()
        .and_then(|value| value.as_str().map(str::to_owned))
        .unwrap_or_else(|| "unknown".to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dm_channels_are_im() {
        assert_eq!(channel_type_for("D0123ABC"), "im");
        assert_eq!(channel_type_for("C0123ABC"), "channel");
        assert_eq!(channel_type_for("G0123ABC"), "channel");
    }
}
