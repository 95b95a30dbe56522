//! Resume executor: re-invoke a CLI agent against an existing session,
//! feeding it new input and capturing bounded output.

pub mod command;
pub mod runner;

pub use {
    command::{build_resume_command, quote_shell, resolve_command_path},
    runner::{CliResumeRunner, ResumeResult, ResumeRunner, normalize_claude_prompt},
};
