//! Subprocess invocation with incremental, bounded output capture.

use std::{path::Path, process::Stdio};

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    backchannel_common::Tool,
    serde::Serialize,
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        process::Command,
    },
    tracing::debug,
};

use crate::command::resolve_command_path;

/// Head capture bound, in characters, per stream.
const MAX_HEAD_CHARS: usize = 400;
/// Raw byte cap always large enough to hold `MAX_HEAD_CHARS` characters.
const MAX_HEAD_BYTES: usize = MAX_HEAD_CHARS * 4;

/// Outcome of one resume subprocess.
///
/// Head fields are a prefix capture independent of the total length
/// counters, so failures can be reported without retaining unbounded
/// output.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeResult {
    /// Process exit code; absent when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Terminating signal, when there was one.
    pub signal: Option<i32>,
    pub stdout_len: u64,
    pub stderr_len: u64,
    pub stdout_head: String,
    pub stderr_head: String,
}

impl ResumeResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Seam between the event router and the subprocess layer.
#[async_trait]
pub trait ResumeRunner: Send + Sync {
    /// Resume `session_id` of `tool` with `prompt` as the new input.
    ///
    /// Resolves once the child exits; errors only on spawn failure.
    async fn resume(
        &self,
        tool: Tool,
        session_id: &str,
        prompt: &str,
        cwd: Option<&Path>,
    ) -> Result<ResumeResult>;
}

/// Real runner invoking the agent CLI binaries.
pub struct CliResumeRunner;

#[async_trait]
impl ResumeRunner for CliResumeRunner {
    async fn resume(
        &self,
        tool: Tool,
        session_id: &str,
        prompt: &str,
        cwd: Option<&Path>,
    ) -> Result<ResumeResult> {
        match tool {
            Tool::Codex => run_codex_resume(session_id, prompt, cwd).await,
            Tool::Claude => run_claude_resume(session_id, prompt, cwd).await,
        }
    }
}

/// Fold CRLF/CR to LF, then escape newlines as the literal two characters
/// `\n`. The claude CLI treats raw newlines in arguments unsafely.
pub fn normalize_claude_prompt(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").replace('\n', "\\n")
}

/// `codex exec --skip-git-repo-check [--cd <cwd>] resume <session> -`, with
/// the prompt piped to stdin.
pub async fn run_codex_resume(
    session_id: &str,
    prompt: &str,
    cwd: Option<&Path>,
) -> Result<ResumeResult> {
    let codex = resolve_command_path("codex")?;
    let mut args: Vec<String> = vec!["exec".into(), "--skip-git-repo-check".into()];
    if let Some(dir) = cwd {
        args.push("--cd".into());
        args.push(dir.to_string_lossy().into_owned());
    }
    args.push("resume".into());
    args.push(session_id.to_string());
    args.push("-".into());
    run_command(&codex, &args, Some(prompt), cwd).await
}

/// `claude -r <session> <prompt>`, prompt passed as a normalized argument.
pub async fn run_claude_resume(
    session_id: &str,
    prompt: &str,
    cwd: Option<&Path>,
) -> Result<ResumeResult> {
    let claude = resolve_command_path("claude")?;
    let args: Vec<String> = vec![
        "-r".into(),
        session_id.to_string(),
        normalize_claude_prompt(prompt),
    ];
    run_command(&claude, &args, None, cwd).await
}

/// Spawn the child and drain both output streams incrementally, tracking
/// total byte counts and a bounded head per stream.
///
/// There is deliberately no timeout: a hung agent hangs only the event
/// chain that dispatched it.
async fn run_command(
    program: &Path,
    args: &[String],
    input: Option<&str>,
    cwd: Option<&Path>,
) -> Result<ResumeResult> {
    debug!(program = %program.display(), ?args, cwd = ?cwd, "spawning resume subprocess");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {}", program.display()))?;

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let feed = async {
        if let (Some(mut pipe), Some(text)) = (stdin, input) {
            // A write error here means the child exited early; the exit
            // status tells the real story.
            let _ = pipe.write_all(text.as_bytes()).await;
            let _ = pipe.shutdown().await;
        }
    };

    let (_, out, err) = tokio::join!(feed, drain(stdout), drain(stderr));
    let status = child.wait().await.context("failed to wait for child")?;

    let (stdout_len, stdout_head) = out;
    let (stderr_len, stderr_head) = err;
    let result = ResumeResult {
        exit_code: status.code(),
        signal: exit_signal(&status),
        stdout_len,
        stderr_len,
        stdout_head,
        stderr_head,
    };
    debug!(
        exit_code = ?result.exit_code,
        signal = ?result.signal,
        stdout_len = result.stdout_len,
        stderr_len = result.stderr_len,
        "resume subprocess finished"
    );
    Ok(result)
}

/// Read a stream to EOF, keeping the total byte count and the first
/// `MAX_HEAD_CHARS` characters.
async fn drain<R>(stream: Option<R>) -> (u64, String)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return (0, String::new());
    };
    let mut total: u64 = 0;
    let mut head: Vec<u8> = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                total += n as u64;
                if head.len() < MAX_HEAD_BYTES {
                    let take = (MAX_HEAD_BYTES - head.len()).min(n);
                    head.extend_from_slice(&buf[..take]);
                }
            },
            Err(_) => break,
        }
    }
    let text: String = String::from_utf8_lossy(&head)
        .chars()
        .take(MAX_HEAD_CHARS)
        .collect();
    (total, text)
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}
