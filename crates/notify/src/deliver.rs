//! Deliver a normalized notify record as a threaded DM notification.
//!
//! The parent message carries the tool/project header and the first chunk
//! of the user's prompt; its message handle becomes the thread root under
//! which the rest of the prompt and the assistant's answer are posted, and
//! the key under which the route is recorded for later replies.

use std::sync::Arc;

use {
    anyhow::{Context, Result, bail},
    backchannel_common::{
        ThreadMessenger,
        text::{MAX_TEXT, split_text},
    },
    backchannel_routes::{RouteEntry, RouteStore},
    tracing::{error, info, warn},
};

use crate::input::NotifyInput;

/// Notification delivery flow, generic over the messaging platform.
pub struct NotifyDelivery {
    messenger: Arc<dyn ThreadMessenger>,
    routes: Arc<RouteStore>,
    target_user_id: String,
}

impl NotifyDelivery {
    pub fn new(
        messenger: Arc<dyn ThreadMessenger>,
        routes: Arc<RouteStore>,
        target_user_id: impl Into<String>,
    ) -> Self {
        Self {
            messenger,
            routes,
            target_user_id: target_user_id.into(),
        }
    }

    /// Post the notification and record the reply route.
    ///
    /// Aborts (without posting) when the session id is absent or the user
    /// text could not be extracted; a missing assistant text is only
    /// warned about, the notification still carries its placeholder.
    pub async fn deliver(&self, input: &NotifyInput) -> Result<()> {
        if input.session_id.is_empty() {
            bail!("session id missing from notify payload");
        }
        if input.user_text_missing() {
            error!(
                tool = %input.tool,
                diagnostics = ?input.diagnostics,
                "user text extraction failed; not notifying"
            );
            bail!("user text could not be extracted");
        }
        if input.assistant_text_missing() {
            warn!(tool = %input.tool, "assistant text extraction failed");
        }

        let channel = self
            .messenger
            .open_dm(&self.target_user_id)
            .await
            .context("failed to open DM channel")?;

        let user_text = self.messenger.render_markdown(&input.user_text);
        let assistant_text = self.messenger.render_markdown(&input.assistant_text);

        let user_chunks = split_text(&user_text, MAX_TEXT);
        let header = format!("[ {} | {} ]", input.tool.label(), project_name(&input.cwd));
        let parent_text = match user_chunks.first() {
            Some(first) if !first.is_empty() => format!("{header}\n{first}"),
            _ => header,
        };

        let parent_ts = self
            .messenger
            .post_message(&channel, &parent_text)
            .await
            .context("failed to post parent notification")?;

        let entry = RouteEntry::new(
            channel.clone(),
            parent_ts.clone(),
            input.tool,
            input.session_id.clone(),
            input.turn_id.clone(),
            input.cwd.clone(),
        );
        match self.routes.append(&entry).await {
            Ok(()) => info!(
                tool = %input.tool,
                thread_ts = %parent_ts,
                "route recorded"
            ),
            // The notification is already visible; a dead route only means
            // replies in this thread will get the route-miss message.
            Err(e) => error!(error = %e, "failed to record route"),
        }

        for chunk in user_chunks.iter().skip(1).filter(|c| !c.is_empty()) {
            self.messenger
                .post_thread_reply(&channel, &parent_ts, chunk)
                .await
                .context("failed to post user text chunk")?;
        }
        for chunk in split_text(&assistant_text, MAX_TEXT) {
            if chunk.is_empty() {
                continue;
            }
            self.messenger
                .post_thread_reply(&channel, &parent_ts, &chunk)
                .await
                .context("failed to post assistant text chunk")?;
        }

        info!(
            tool = %input.tool,
            user_len = input.user_text.len(),
            assistant_len = input.assistant_text.len(),
            "notification delivered"
        );
        Ok(())
    }
}

/// Project label for the notification header: the trailing path component
/// of the working directory.
fn project_name(cwd: &str) -> &str {
    let trimmed = cwd.trim_end_matches('/');
    let base = trimmed.rsplit('/').next().unwrap_or("");
    if base.is_empty() { "unknown" } else { base }
}
