use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

/// CLI agent a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Codex,
    Claude,
}

impl Tool {
    /// Identifier used in ledger records and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Claude => "claude",
        }
    }

    /// Human-readable label used in outbound messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Codex => "Codex",
            Self::Claude => "Claude",
        }
    }

    /// Executable name on the search path.
    pub fn command(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tool {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "codex" => Ok(Self::Codex),
            "claude" => Ok(Self::Claude),
            other => Err(crate::Error::message(format!("unknown tool: {other}"))),
        }
    }
}

/// Normalized inbound conversational event, decoupled from any one
/// platform's event schema. Transport adapters build this; the router
/// classifies and handles it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Channel the event was posted in.
    pub channel: String,
    /// Channel kind discriminator when the transport supplies one
    /// (`im` for a direct-message channel).
    pub channel_type: Option<String>,
    /// The event's own timestamp identifier.
    pub ts: String,
    /// Thread root timestamp, present only for threaded messages.
    pub thread_ts: Option<String>,
    /// Message body.
    pub text: String,
    /// Author user id.
    pub user: Option<String>,
    /// Set when the author is a bot.
    pub bot_id: Option<String>,
    /// Message subtype (edits, deletions, joins, ...), absent for plain messages.
    pub subtype: Option<String>,
}

/// Sink for inbound events. The daemon provides the concrete
/// implementation; transport adapters call it once per received event.
#[async_trait]
pub trait InboundSink: Send + Sync {
    /// Handle one inbound event. Implementations capture and log their own
    /// errors; a failed event must never take down the dispatch loop.
    async fn dispatch(&self, event: InboundEvent);
}
