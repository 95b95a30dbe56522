use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackchannelConfig {
    pub slack: SlackConfig,
    pub destinations: DestinationsConfig,
    pub features: FeaturesConfig,
    pub notify: NotifyConfig,
}

/// Slack credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`), used for all Web API calls.
    #[serde(serialize_with = "serialize_secret")]
    pub bot_token: Secret<String>,

    /// App-level token (`xapp-...`), used by the Socket Mode listener.
    #[serde(serialize_with = "serialize_secret")]
    pub app_token: Secret<String>,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .finish()
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: Secret::new(String::new()),
            app_token: Secret::new(String::new()),
        }
    }
}

/// Where notifications are delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationsConfig {
    pub dm: DmDestinationConfig,
}

/// Direct-message destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DmDestinationConfig {
    /// Whether DM notifications are enabled at all.
    pub enabled: bool,
    /// Slack user id (`U...`) that receives the notifications.
    pub target_user_id: String,
}

/// Feature toggles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Whether threaded replies may be dispatched back to CLI sessions as
    /// `resume` invocations. The daemon refuses to start without it.
    pub reply_resume: bool,
}

/// Notify-side overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Codex home directory override. Falls back to `$CODEX_HOME`, then
    /// `~/.codex`.
    pub codex_home: Option<PathBuf>,
}

impl BackchannelConfig {
    /// Requirements for `backchannel notify`.
    pub fn validate_notify(&self) -> anyhow::Result<()> {
        if self.slack.bot_token.expose_secret().is_empty() {
            anyhow::bail!("slack.bot_token is not configured");
        }
        if !self.destinations.dm.enabled {
            anyhow::bail!("destinations.dm.enabled is false; nothing to notify");
        }
        if self.destinations.dm.target_user_id.is_empty() {
            anyhow::bail!("destinations.dm.target_user_id is not configured");
        }
        Ok(())
    }

    /// Requirements for `backchannel daemon`.
    pub fn validate_daemon(&self) -> anyhow::Result<()> {
        if self.slack.bot_token.expose_secret().is_empty() {
            anyhow::bail!("slack.bot_token is not configured");
        }
        if self.slack.app_token.expose_secret().is_empty() {
            anyhow::bail!("slack.app_token is not configured");
        }
        if !self.features.reply_resume {
            anyhow::bail!("features.reply_resume is false; the daemon has nothing to do");
        }
        Ok(())
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
