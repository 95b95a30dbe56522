//! Web API messenger with bounded retries.

use std::{future::Future, sync::Arc};

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    backchannel_common::ThreadMessenger,
    secrecy::{ExposeSecret, Secret},
    slack_morphism::prelude::*,
    tracing::{debug, warn},
};

use crate::markdown::markdown_to_mrkdwn;

/// Attempts per Web API call. Transient failures are retried immediately,
/// with no backoff, before the error surfaces to the caller.
const MAX_API_ATTEMPTS: usize = 2;

/// Slack-backed [`ThreadMessenger`].
pub struct SlackMessenger {
    client: Arc<SlackHyperClient>,
    token: SlackApiToken,
}

impl SlackMessenger {
    pub fn new(bot_token: &Secret<String>) -> Result<Self> {
        let client = Arc::new(SlackClient::new(
            SlackClientHyperConnector::new().context("failed to build slack connector")?,
        ));
        let token = SlackApiToken::new(bot_token.expose_secret().into());
        Ok(Self { client, token })
    }

    async fn with_retry<T, F, Fut>(&self, label: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut last_error = None;
        for attempt in 1..=MAX_API_ATTEMPTS {
            debug!(label, attempt, "slack api call");
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(label, attempt, error = %e, "slack api call failed");
                    last_error = Some(e);
                },
            }
        }
        match last_error {
            Some(e) => {
                Err(anyhow::Error::new(e)).with_context(|| format!("slack api call: {label}"))
            },
            None => anyhow::bail!("slack api call: {label}"),
        }
    }
}

#[async_trait]
impl ThreadMessenger for SlackMessenger {
    async fn open_dm(&self, user_id: &str) -> Result<String> {
        let client = Arc::clone(&self.client);
        let token = self.token.clone();
        let request =
            SlackApiConversationsOpenRequest::new().with_users(vec![SlackUserId(user_id.into())]);

        let response = self
            .with_retry("conversations.open", move || {
                let client = Arc::clone(&client);
                let token = token.clone();
                let request = request.clone();
                async move {
                    let session = client.open_session(&token);
                    session.conversations_open(&request).await
                }
            })
            .await?;
        Ok(response.channel.id.to_string())
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<String> {
        let client = Arc::clone(&self.client);
        let token = self.token.clone();
        let request = SlackApiChatPostMessageRequest::new(
            SlackChannelId(channel.into()),
            SlackMessageContent::new().with_text(text.into()),
        );
        debug!(channel, text_len = text.len(), "posting parent message");

        let response = self
            .with_retry("chat.postMessage", move || {
                let client = Arc::clone(&client);
                let token = token.clone();
                let request = request.clone();
                async move {
                    let session = client.open_session(&token);
                    session.chat_post_message(&request).await
                }
            })
            .await?;
        Ok(response.ts.to_string())
    }

    async fn post_thread_reply(
        &self,
        channel: &str,
        thread_ts: &str,
        text: &str,
    ) -> Result<String> {
        let client = Arc::clone(&self.client);
        let token = self.token.clone();
        let request = SlackApiChatPostMessageRequest::new(
            SlackChannelId(channel.into()),
            SlackMessageContent::new().with_text(text.into()),
        )
        .with_thread_ts(SlackTs(thread_ts.into()));
        debug!(channel, thread_ts, text_len = text.len(), "posting thread reply");

        let response = self
            .with_retry("chat.postMessage", move || {
                let client = Arc::clone(&client);
                let token = token.clone();
                let request = request.clone();
                async move {
                    let session = client.open_session(&token);
                    session.chat_post_message(&request).await
                }
            })
            .await?;
        Ok(response.ts.to_string())
    }

    fn render_markdown(&self, text: &str) -> String {
        markdown_to_mrkdwn(text)
    }
}
