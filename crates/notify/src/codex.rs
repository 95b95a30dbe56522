//! Codex turn-complete payload extraction.
//!
//! The notify payload carries the session id but not the triggering user
//! text; that has to be recovered from the session's rollout log under the
//! Codex home directory. Codex also runs internal title-generation turns
//! against the same session; those are recognized by their boilerplate
//! prompt and suppressed.

use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    backchannel_common::Tool,
    serde_json::{Map, Value, json},
    walkdir::WalkDir,
};

use crate::{
    extract::{extract_text_deep, first_non_empty_line},
    input::{ASSISTANT_TEXT_MISSING, NotifyInput, USER_TEXT_MISSING},
};

/// First line of Codex's internal title-generation prompt.
const INTERNAL_TITLE_PROMPT_PREFIX: &str =
    "You are a helpful assistant. You will be presented with a user prompt";

/// Sentences that occur in the internal title-generation prompt.
const INTERNAL_TITLE_PROMPT_LINES: [&str; 9] = [
    "Generate a concise UI title (18-36 characters) for this task.",
    "Return only the title. No quotes or trailing punctuation.",
    "Do not use markdown or formatting characters.",
    "If the task includes a ticket reference (e.g. ABC-123), include it verbatim.",
    "Generate a clear, informative task title based solely on the prompt provided. Follow the rules below to ensure consistency, readability, and usefulness.",
    "How to write a good title:",
    "Generate a single-line title that captures the question or core change requested. The title should be easy to scan and useful in changelogs or review queues.",
    "By following these conventions, your titles will be readable, changelog-friendly, and helpful to both users and downstream tools.",
    "Examples:",
];

/// Minimum number of matched sentences for a positive identification.
const INTERNAL_TITLE_PROMPT_MIN_MATCHES: usize = 3;

/// Upper bound on rollout files whose contents are scanned during the
/// fallback search.
const ROLLOUT_CONTENT_SCAN_LIMIT: usize = 30;

/// Keys tried, in order, on a rollout `user_message` payload.
const USER_MESSAGE_KEYS: [&str; 5] = ["message", "text", "prompt", "input", "content"];

/// Parse a Codex notify payload.
///
/// Returns `Ok(None)` when the payload is not a turn-complete event (the
/// caller aborts without side effects). Top-level JSON errors propagate;
/// everything downstream degrades to placeholders plus diagnostics.
pub fn parse_codex_notify(raw: &str, codex_home: &Path) -> Result<Option<NotifyInput>> {
    let payload: Value = serde_json::from_str(raw).context("notify payload is not valid JSON")?;
    if payload.get("type").and_then(Value::as_str) != Some("agent-turn-complete") {
        return Ok(None);
    }

    let session_id = payload
        .get("thread-id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let turn_id = payload
        .get("turn-id")
        .and_then(Value::as_str)
        .map(str::to_string);
    let cwd = payload
        .get("cwd")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut diagnostics = Map::new();
    diagnostics.insert("codex_home".into(), json!(codex_home.display().to_string()));
    input_messages_diagnostics(payload.get("input-messages"), &mut diagnostics);

    let user_text = read_user_message_from_rollout(&session_id, codex_home, &mut diagnostics);

    let title_check = match_internal_title_prompt(&user_text);
    diagnostics.insert(
        "internal_title_prompt_match".into(),
        json!(title_check.matched),
    );
    diagnostics.insert("internal_title_prompt_hits".into(), json!(title_check.hits));
    diagnostics.insert(
        "internal_title_prompt_first_line".into(),
        json!(title_check.first_line),
    );
    if title_check.matched {
        return Ok(Some(NotifyInput::skipped(
            Tool::Codex,
            "codex_internal_title_prompt",
            diagnostics,
        )));
    }

    let assistant_text = payload
        .get("last-assistant-message")
        .map(extract_text_deep)
        .unwrap_or_default();

    Ok(Some(NotifyInput {
        tool: Tool::Codex,
        session_id,
        turn_id,
        cwd,
        user_text: non_empty_or(user_text, USER_TEXT_MISSING),
        assistant_text: non_empty_or(assistant_text, ASSISTANT_TEXT_MISSING),
        skip: false,
        skip_reason: None,
        diagnostics,
    }))
}

fn non_empty_or(text: String, placeholder: &str) -> String {
    if text.is_empty() {
        placeholder.to_string()
    } else {
        text
    }
}

struct TitlePromptCheck {
    matched: bool,
    hits: usize,
    first_line: String,
}

/// Identify Codex's internal title-generation prompt: the first non-empty
/// line must match the known prefix verbatim, and at least
/// [`INTERNAL_TITLE_PROMPT_MIN_MATCHES`] of the known sentences must occur
/// anywhere in the text.
fn match_internal_title_prompt(text: &str) -> TitlePromptCheck {
    let first_line = first_non_empty_line(text).to_string();
    if !first_line.starts_with(INTERNAL_TITLE_PROMPT_PREFIX) {
        return TitlePromptCheck {
            matched: false,
            hits: 0,
            first_line,
        };
    }
    let hits = INTERNAL_TITLE_PROMPT_LINES
        .iter()
        .filter(|line| text.contains(*line))
        .count();
    TitlePromptCheck {
        matched: hits >= INTERNAL_TITLE_PROMPT_MIN_MATCHES,
        hits,
        first_line,
    }
}

/// Recover the last user message from the session's rollout file. Failures
/// yield an empty string with the reason recorded in `diagnostics`.
fn read_user_message_from_rollout(
    session_id: &str,
    codex_home: &Path,
    diagnostics: &mut Map<String, Value>,
) -> String {
    let Some(rollout_path) = find_rollout_path(session_id, codex_home, diagnostics) else {
        return String::new();
    };
    let content = match std::fs::read_to_string(&rollout_path) {
        Ok(content) => content,
        Err(e) => {
            diagnostics.insert("rollout_error".into(), json!(e.to_string()));
            return String::new();
        },
    };

    let mut last_user = String::new();
    let mut user_message_count = 0usize;
    let mut line_count = 0usize;
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        line_count += 1;
        let Ok(record) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if record.get("type").and_then(Value::as_str) != Some("event_msg") {
            continue;
        }
        let Some(payload) = record.get("payload") else {
            continue;
        };
        if payload.get("type").and_then(Value::as_str) != Some("user_message") {
            continue;
        }
        let text = extract_user_message(payload);
        if !text.is_empty() {
            last_user = text;
        }
        user_message_count += 1;
    }
    diagnostics.insert("rollout_line_count".into(), json!(line_count));
    diagnostics.insert("rollout_user_message_count".into(), json!(user_message_count));
    last_user
}

/// Text of one `user_message` payload: the first present key from the
/// ordered list feeds the deep search.
fn extract_user_message(payload: &Value) -> String {
    for key in USER_MESSAGE_KEYS {
        if let Some(value) = payload.get(key)
            && !value.is_null()
        {
            return extract_text_deep(value);
        }
    }
    String::new()
}

struct RolloutFile {
    path: PathBuf,
    name: String,
    mtime: std::time::SystemTime,
}

/// Locate the session's rollout file under `<codex_home>/sessions`.
///
/// Filename match wins over content match: a file named after the session
/// id is chosen even when some unrelated, more recent file happens to
/// mention the id in its body.
fn find_rollout_path(
    session_id: &str,
    codex_home: &Path,
    diagnostics: &mut Map<String, Value>,
) -> Option<PathBuf> {
    if session_id.is_empty() {
        diagnostics.insert("rollout_error".into(), json!("session_id_missing"));
        return None;
    }
    let sessions_dir = codex_home.join("sessions");
    diagnostics.insert(
        "sessions_dir".into(),
        json!(sessions_dir.display().to_string()),
    );
    if !sessions_dir.is_dir() {
        diagnostics.insert("rollout_error".into(), json!("sessions_dir_missing"));
        return None;
    }

    let files = collect_rollout_files(&sessions_dir);
    diagnostics.insert("rollout_total".into(), json!(files.len()));

    let by_name: Vec<&RolloutFile> = files
        .iter()
        .filter(|f| f.name.contains(session_id))
        .collect();
    if let Some(best) = by_name.iter().max_by_key(|f| f.mtime) {
        diagnostics.insert("rollout_source".into(), json!("filename"));
        diagnostics.insert(
            "rollout_path".into(),
            json!(best.path.display().to_string()),
        );
        return Some(best.path.clone());
    }

    if let Some(found) = find_rollout_by_content(&files, session_id, diagnostics) {
        diagnostics.insert("rollout_source".into(), json!("content"));
        diagnostics.insert(
            "rollout_path".into(),
            json!(found.display().to_string()),
        );
        return Some(found);
    }

    if !diagnostics.contains_key("rollout_error") {
        diagnostics.insert("rollout_error".into(), json!("rollout_not_found"));
    }
    None
}

/// All `rollout-*.jsonl` files under `root`, recursively. Unreadable
/// entries are skipped.
fn collect_rollout_files(root: &Path) -> Vec<RolloutFile> {
    let mut results = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with("rollout-") || !name.ends_with(".jsonl") {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let mtime = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
        results.push(RolloutFile {
            path: entry.into_path(),
            name,
            mtime,
        });
    }
    results
}

/// Fallback: scan the most recent rollout files for a literal occurrence of
/// the session id, newest first, bounded by the scan limit.
fn find_rollout_by_content(
    files: &[RolloutFile],
    session_id: &str,
    diagnostics: &mut Map<String, Value>,
) -> Option<PathBuf> {
    if files.is_empty() {
        diagnostics.insert("rollout_error".into(), json!("rollout_files_empty"));
        return None;
    }
    let mut sorted: Vec<&RolloutFile> = files.iter().collect();
    sorted.sort_by(|a, b| b.mtime.cmp(&a.mtime));
    for file in sorted.into_iter().take(ROLLOUT_CONTENT_SCAN_LIMIT) {
        let Ok(content) = std::fs::read_to_string(&file.path) else {
            continue;
        };
        if content.contains(session_id) {
            return Some(file.path.clone());
        }
    }
    diagnostics.insert(
        "rollout_error".into(),
        json!("rollout_not_matched_in_recent_files"),
    );
    None
}

fn input_messages_diagnostics(input_messages: Option<&Value>, diagnostics: &mut Map<String, Value>) {
    let messages = input_messages.and_then(Value::as_array);
    diagnostics.insert(
        "input_messages_len".into(),
        json!(messages.map(Vec::len).unwrap_or(0)),
    );
    let has_content = messages.is_some_and(|items| {
        items
            .iter()
            .any(|item| !extract_text_deep(item).trim().is_empty())
    });
    diagnostics.insert("input_messages_has_content".into(), json!(has_content));
    if let Some(last) = messages.and_then(|items| items.last()) {
        diagnostics.insert(
            "input_messages_last_role".into(),
            json!(
                last.get("role")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
            ),
        );
    }
}
