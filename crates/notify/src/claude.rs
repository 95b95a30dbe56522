//! Claude Code Stop-hook payload extraction.
//!
//! The hook supplies a transcript path; the last user and last assistant
//! turns are recovered from it independently. Read or parse trouble never
//! aborts the notification; it degrades to placeholder text carrying the
//! failure reason.

use std::path::Path;

use {
    anyhow::{Context, Result},
    backchannel_common::Tool,
    serde_json::{Map, Value, json},
};

use crate::{
    extract::extract_text_deep,
    input::{NotifyInput, USER_TEXT_MISSING, assistant_error_placeholder},
};

/// Parse a Claude Code hook payload.
///
/// Returns `Ok(None)` unless this is a first-order `Stop` event: other hook
/// events and re-entrant stops (`stop_hook_active`) are not notification
/// triggers.
pub fn parse_claude_hook(raw: &str) -> Result<Option<NotifyInput>> {
    let payload: Value = serde_json::from_str(raw).context("hook payload is not valid JSON")?;
    if payload.get("hook_event_name").and_then(Value::as_str) != Some("Stop") {
        return Ok(None);
    }
    if payload.get("stop_hook_active").and_then(Value::as_bool) == Some(true) {
        return Ok(None);
    }

    let session_id = payload
        .get("session_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let cwd = payload
        .get("cwd")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut diagnostics = Map::new();
    let mut user_text = String::new();
    let mut assistant_text = String::new();
    let mut transcript_error = String::new();

    match payload.get("transcript_path").and_then(Value::as_str) {
        Some(path) => {
            diagnostics.insert("transcript_path".into(), json!(path));
            match read_transcript(Path::new(path)) {
                Ok((last_user, last_assistant)) => {
                    user_text = last_user;
                    assistant_text = last_assistant;
                },
                Err(e) => transcript_error = e.to_string(),
            }
        },
        None => transcript_error = "transcript_path_missing".to_string(),
    }
    if !transcript_error.is_empty() {
        diagnostics.insert("transcript_error".into(), json!(transcript_error));
    }

    if user_text.is_empty() {
        user_text = USER_TEXT_MISSING.to_string();
    }
    if assistant_text.is_empty() {
        let reason = if transcript_error.is_empty() {
            "unknown"
        } else {
            &transcript_error
        };
        assistant_text = assistant_error_placeholder(reason);
    }

    Ok(Some(NotifyInput {
        tool: Tool::Claude,
        session_id,
        turn_id: None,
        cwd,
        user_text,
        assistant_text,
        skip: false,
        skip_reason: None,
        diagnostics,
    }))
}

/// Last user text and last assistant text in the transcript, tracked
/// independently; they need not come from adjacent lines. Unparseable
/// lines are skipped.
fn read_transcript(path: &Path) -> Result<(String, String)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read transcript {}", path.display()))?;

    let mut last_user = String::new();
    let mut last_assistant = String::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let Ok(record) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let (role, text) = extract_role_and_text(&record);
        let Some(role) = role else { continue };
        if text.is_empty() {
            continue;
        }
        match role {
            "user" => last_user = text,
            "assistant" => last_assistant = text,
            _ => {},
        }
    }
    Ok((last_user, last_assistant))
}

/// Infer a line's role and extract its text. Role comes from an explicit
/// field, a nested message role, or type-based inference, in that order.
fn extract_role_and_text(record: &Value) -> (Option<&str>, String) {
    let role = record
        .get("role")
        .and_then(Value::as_str)
        .or_else(|| {
            record
                .get("message")
                .and_then(|m| m.get("role"))
                .and_then(Value::as_str)
        })
        .or_else(|| {
            record
                .get("data")
                .and_then(|d| d.get("role"))
                .and_then(Value::as_str)
        })
        .or_else(|| match record.get("type").and_then(Value::as_str) {
            Some("assistant") => Some("assistant"),
            Some("user") => Some("user"),
            _ => None,
        });

    let content = [
        record.get("content"),
        record.get("message").and_then(|m| m.get("content")),
        record.get("data").and_then(|d| d.get("content")),
        record.get("text"),
        record.get("message").and_then(|m| m.get("text")),
    ]
    .into_iter()
    .flatten()
    .find(|value| !value.is_null() && value.as_str() != Some(""));

    let text = content.map(extract_text_deep).unwrap_or_default();
    (role, text)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::input::ASSISTANT_TEXT_ERROR_PREFIX, std::fs, tempfile::TempDir};

    fn hook_payload(transcript_path: Option<&str>) -> String {
        let mut payload = json!({
            "hook_event_name": "Stop",
            "session_id": "claude-sess-1",
            "cwd": "/tmp/proj",
        });
        if let Some(path) = transcript_path {
            payload["transcript_path"] = json!(path);
        }
        serde_json::to_string(&payload).unwrap()
    }

    fn write_transcript(lines: &[Value]) -> (TempDir, String) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("transcript.jsonl");
        let body: String = lines.iter().map(|l| format!("{l}\n")).collect();
        fs::write(&path, body).unwrap();
        let path = path.to_string_lossy().into_owned();
        (tmp, path)
    }

    #[test]
    fn non_stop_event_is_not_applicable() {
        let raw = serde_json::to_string(&json!({"hook_event_name": "PreToolUse"})).unwrap();
        assert!(parse_claude_hook(&raw).unwrap().is_none());
    }

    #[test]
    fn reentrant_stop_is_not_applicable() {
        let raw = serde_json::to_string(&json!({
            "hook_event_name": "Stop",
            "stop_hook_active": true,
        }))
        .unwrap();
        assert!(parse_claude_hook(&raw).unwrap().is_none());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_claude_hook("][").is_err());
    }

    #[test]
    fn tracks_last_user_and_assistant_independently() {
        let (_tmp, path) = write_transcript(&[
            json!({"type": "user", "message": {"role": "user", "content": "first ask"}}),
            json!({"type": "assistant", "message": {"role": "assistant", "content": [
                {"type": "text", "text": "first answer"}]}}),
            json!({"type": "user", "message": {"role": "user", "content": "second ask"}}),
            json!({"type": "system", "content": "noise"}),
        ]);

        let input = parse_claude_hook(&hook_payload(Some(&path))).unwrap().unwrap();
        assert_eq!(input.user_text, "second ask");
        assert_eq!(input.assistant_text, "first answer");
        assert_eq!(input.session_id, "claude-sess-1");
        assert_eq!(input.cwd, "/tmp/proj");
    }

    #[test]
    fn role_inferred_from_type_when_absent() {
        let (_tmp, path) = write_transcript(&[
            json!({"type": "user", "text": "typed user line"}),
            json!({"type": "assistant", "text": "typed assistant line"}),
        ]);

        let input = parse_claude_hook(&hook_payload(Some(&path))).unwrap().unwrap();
        assert_eq!(input.user_text, "typed user line");
        assert_eq!(input.assistant_text, "typed assistant line");
    }

    #[test]
    fn unreadable_transcript_degrades_to_placeholders() {
        let input = parse_claude_hook(&hook_payload(Some("/nonexistent/transcript.jsonl")))
            .unwrap()
            .unwrap();
        assert!(input.user_text_missing());
        assert!(input.assistant_text.starts_with(ASSISTANT_TEXT_ERROR_PREFIX));
        assert!(input.assistant_text_missing());
    }

    #[test]
    fn missing_transcript_path_is_reported() {
        let input = parse_claude_hook(&hook_payload(None)).unwrap().unwrap();
        assert!(input.user_text_missing());
        assert!(
            input
                .assistant_text
                .contains("transcript_path_missing")
        );
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let (_tmp, path) = write_transcript(&[json!({"role": "user", "content": "kept"})]);
        // Append garbage to the transcript.
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(b"{torn json\n")
            })
            .unwrap();

        let input = parse_claude_hook(&hook_payload(Some(&path))).unwrap().unwrap();
        assert_eq!(input.user_text, "kept");
    }
}
