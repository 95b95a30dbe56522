use {anyhow::Result, async_trait::async_trait};

/// Thread-capable messaging collaborator.
///
/// The platform contract the core relies on: open a direct-message channel to
/// a user, post a message into a channel, and post a reply into an existing
/// thread. Delivery is at-least-once from the platform's perspective;
/// idempotency is the caller's responsibility.
#[async_trait]
pub trait ThreadMessenger: Send + Sync {
    /// Open (or look up) the direct-message channel for `user_id` and return
    /// its channel handle.
    async fn open_dm(&self, user_id: &str) -> Result<String>;

    /// Post a top-level message; returns the message handle, which doubles as
    /// the thread root identifier for later replies.
    async fn post_message(&self, channel: &str, text: &str) -> Result<String>;

    /// Post a reply into the thread rooted at `thread_ts`.
    async fn post_thread_reply(&self, channel: &str, thread_ts: &str, text: &str)
    -> Result<String>;

    /// Convert markdown to the platform's markup. Identity by default.
    fn render_markdown(&self, text: &str) -> String {
        text.to_string()
    }
}
