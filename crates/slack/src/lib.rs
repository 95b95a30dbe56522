//! Slack adapter: Web API messenger and Socket Mode listener.
//!
//! Uses slack-morphism for both directions: Web API calls for posting
//! notifications and thread replies, and a Socket Mode WebSocket listener
//! for inbound events, so no public HTTP endpoint is required.

pub mod client;
pub mod markdown;
pub mod socket;

pub use {client::SlackMessenger, markdown::markdown_to_mrkdwn, socket::run_socket_mode};
