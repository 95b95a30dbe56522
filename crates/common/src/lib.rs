//! Shared types, error definitions, and utilities used across all backchannel crates.

pub mod error;
pub mod messenger;
pub mod text;
pub mod types;

pub use {
    error::{BackchannelError, Error, Result},
    messenger::ThreadMessenger,
    types::{InboundEvent, InboundSink, Tool},
};
