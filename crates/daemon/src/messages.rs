//! Canned user-facing messages posted by the event router.

use {
    backchannel_common::Tool,
    backchannel_resume::{ResumeResult, build_resume_command},
};

/// Posted into a thread whose route is unknown.
pub const ROUTE_NOT_RECOGNIZED_MESSAGE: &str = "This reply is not attached to a known \
    backchannel notification thread (no route entry was found for it).\n\
    Reply in the thread of the original notification (parent) message.\n\
    (No `resume` was run for this reply.)";

/// Posted when the resume subprocess fails.
pub const RESUME_FAILED_MESSAGE: &str =
    "The `resume` invocation failed.\nCheck the agent CLI logs for details.";

/// Detail lines longer than this are truncated.
const MAX_ERROR_HEAD: usize = 200;

/// Acknowledgement posted before dispatching the resume, previewing the
/// exact command line for operator transparency.
pub fn build_reply_received_message(tool: Tool, session_id: &str, cwd: &str) -> String {
    let command = build_resume_command(tool, session_id, cwd);
    format!(
        "Reply received: resuming the {} session below; results arrive as a new \
         notification thread.\nCLI equivalent: `{command}`",
        tool.label(),
    )
}

/// Failure report: first line of stderr (else stdout) bounded to 200
/// characters, falling back to the exit code when the streams were silent.
pub fn build_resume_failed_message(result: &ResumeResult) -> String {
    let detail = if !result.stderr_head.is_empty() {
        format_error_head(&result.stderr_head)
    } else {
        format_error_head(&result.stdout_head)
    };
    if !detail.is_empty() {
        return format!("{RESUME_FAILED_MESSAGE}\nError: {detail}");
    }
    if let Some(code) = result.exit_code {
        return format!("{RESUME_FAILED_MESSAGE}\nExit code: {code}");
    }
    RESUME_FAILED_MESSAGE.to_string()
}

/// First non-blank line of `text`, trimmed and truncated to 200 characters.
pub fn format_error_head(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let first_line = trimmed
        .lines()
        .next()
        .unwrap_or("")
        .trim();
    if first_line.chars().count() > MAX_ERROR_HEAD {
        let head: String = first_line.chars().take(MAX_ERROR_HEAD).collect();
        format!("{head}...")
    } else {
        first_line.to_string()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn result(exit_code: Option<i32>, stdout_head: &str, stderr_head: &str) -> ResumeResult {
        ResumeResult {
            exit_code,
            signal: None,
            stdout_len: stdout_head.len() as u64,
            stderr_len: stderr_head.len() as u64,
            stdout_head: stdout_head.into(),
            stderr_head: stderr_head.into(),
        }
    }

    #[test]
    fn reply_received_previews_command() {
        let message = build_reply_received_message(Tool::Codex, "sess-1", "/tmp/demo");
        assert!(message.contains("Codex"));
        assert!(
            message.contains("`cd /tmp/demo && codex exec --skip-git-repo-check resume sess-1 -`")
        );
    }

    #[test]
    fn failure_prefers_stderr() {
        let message = build_resume_failed_message(&result(Some(1), "out line", "err line\nmore"));
        assert!(message.contains("Error: err line"));
        assert!(!message.contains("more"));
    }

    #[test]
    fn failure_falls_back_to_stdout() {
        let message = build_resume_failed_message(&result(Some(1), "out line", ""));
        assert!(message.contains("Error: out line"));
    }

    #[test]
    fn failure_falls_back_to_exit_code() {
        let message = build_resume_failed_message(&result(Some(86), "", ""));
        assert!(message.contains("Exit code: 86"));
    }

    #[test]
    fn failure_with_nothing_is_generic() {
        let message = build_resume_failed_message(&result(None, "", ""));
        assert_eq!(message, RESUME_FAILED_MESSAGE);
    }

    #[test]
    fn error_head_truncates_long_lines() {
        let long = "e".repeat(300);
        let head = format_error_head(&long);
        assert_eq!(head.chars().count(), 203);
        assert!(head.ends_with("..."));
    }

    #[test]
    fn error_head_takes_first_line() {
        assert_eq!(format_error_head("  first\nsecond\n"), "first");
        assert_eq!(format_error_head("   \n\t\n"), "");
    }
}
