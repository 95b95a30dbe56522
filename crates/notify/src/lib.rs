//! Turn heterogeneous agent notify payloads into normalized records and
//! deliver them as threaded chat notifications.
//!
//! Two sources are supported: Codex's turn-complete notify payload (user
//! text recovered from the session's rollout log) and Claude Code's Stop
//! hook (user/assistant text recovered from the hook-supplied transcript).

pub mod claude;
pub mod codex;
pub mod deliver;
pub mod extract;
pub mod input;

pub use {
    claude::parse_claude_hook,
    codex::parse_codex_notify,
    deliver::NotifyDelivery,
    input::NotifyInput,
};
