//! Event router: classify inbound reply events, resolve their route, and
//! dispatch resume work, reporting results back into the thread.

pub mod events;
pub mod handler;
pub mod messages;

pub use {
    events::{SkipReason, classify},
    handler::Handler,
};
