use {
    backchannel_common::Tool,
    serde::Serialize,
    serde_json::{Map, Value},
};

/// Placeholder for user text the extractor could not recover. Callers treat
/// this as a distinguishable failure signal, not as content.
pub const USER_TEXT_MISSING: &str = "(user message extraction failed)";

/// Placeholder for assistant text the extractor could not recover.
pub const ASSISTANT_TEXT_MISSING: &str = "(assistant message extraction failed)";

/// Prefix of the assistant placeholder that carries a failure reason.
pub const ASSISTANT_TEXT_ERROR_PREFIX: &str = "(assistant extraction error: ";

/// Assistant placeholder carrying the extraction failure reason.
pub fn assistant_error_placeholder(reason: &str) -> String {
    format!("{ASSISTANT_TEXT_ERROR_PREFIX}{reason})")
}

/// Normalized extraction result for one notify invocation.
#[derive(Debug, Clone, Serialize)]
pub struct NotifyInput {
    pub tool: Tool,
    pub session_id: String,
    pub turn_id: Option<String>,
    pub cwd: String,
    pub user_text: String,
    pub assistant_text: String,
    /// When set, the turn was internally generated and no notification must
    /// be sent for it.
    pub skip: bool,
    pub skip_reason: Option<String>,
    /// Open bag of extraction diagnostics, for observability only.
    pub diagnostics: Map<String, Value>,
}

impl NotifyInput {
    /// Skip verdict: suppress this turn entirely.
    pub fn skipped(tool: Tool, reason: impl Into<String>, diagnostics: Map<String, Value>) -> Self {
        Self {
            tool,
            session_id: String::new(),
            turn_id: None,
            cwd: String::new(),
            user_text: String::new(),
            assistant_text: String::new(),
            skip: true,
            skip_reason: Some(reason.into()),
            diagnostics,
        }
    }

    pub fn user_text_missing(&self) -> bool {
        self.user_text == USER_TEXT_MISSING
    }

    pub fn assistant_text_missing(&self) -> bool {
        self.assistant_text == ASSISTANT_TEXT_MISSING
            || self.assistant_text.starts_with(ASSISTANT_TEXT_ERROR_PREFIX)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_detection() {
        let mut input = NotifyInput {
            tool: Tool::Claude,
            session_id: "s".into(),
            turn_id: None,
            cwd: String::new(),
            user_text: USER_TEXT_MISSING.into(),
            assistant_text: assistant_error_placeholder("boom"),
            skip: false,
            skip_reason: None,
            diagnostics: Map::new(),
        };
        assert!(input.user_text_missing());
        assert!(input.assistant_text_missing());

        input.user_text = "real".into();
        input.assistant_text = "real".into();
        assert!(!input.user_text_missing());
        assert!(!input.assistant_text_missing());
    }
}
