//! Relay: HTTP service hosting named channels for the long-poll clients.
//!
//! Messages are fanned out to the pollers parked at publish time and are not
//! stored; a channel with no parked poller drops the message.

mod broker;
mod server;

pub use broker::MessageBroker;
pub use server::{router, run_relay, RelayState};
