//! Executable resolution and operator-facing command previews.

use std::path::PathBuf;

use {
    anyhow::{Context, Result, bail},
    backchannel_common::Tool,
};

/// Resolve `command` on the process search path.
///
/// Fails fast when the binary is absent, and refuses paths provisioned by an
/// ephemeral `npx` cache: a resume must target the user's real installation.
pub fn resolve_command_path(command: &str) -> Result<PathBuf> {
    let path = which::which(command).with_context(|| format!("command not found: {command}"))?;
    if path.to_string_lossy().contains("/.npm/_npx/") {
        bail!("refusing npx-provisioned path: {}", path.display());
    }
    Ok(path)
}

/// Quote `value` for copy-paste into a POSIX shell.
pub fn quote_shell(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | ':' | '-'))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Shell command line equivalent to the resume invocation, shown to the
/// operator in the acknowledgement message.
pub fn build_resume_command(tool: Tool, session_id: &str, cwd: &str) -> String {
    let session = quote_shell(session_id);
    let command = match tool {
        Tool::Codex => format!("codex exec --skip-git-repo-check resume {session} -"),
        Tool::Claude => format!("claude -r {session}"),
    };
    if cwd.is_empty() {
        command
    } else {
        format!("cd {} && {command}", quote_shell(cwd))
    }
}
