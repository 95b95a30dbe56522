//! Append-only route ledger: `(channel, thread_ts)` → CLI session context.
//!
//! The effective route for a key is the most recently appended entry with
//! that key. The ledger is never mutated in place, only appended to and
//! occasionally truncated from the front when it grows past a size bound.

pub mod store;

pub use store::{RouteEntry, RouteStore};
