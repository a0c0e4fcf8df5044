//! Parley core library — channel addressing, the long-poll client core
//! (sender, receiver, transport), wire framing, configuration, and the relay
//! used by the CLI.

pub mod addr;
pub mod client;
pub mod config;
pub mod error;
pub mod init;
pub mod relay;
pub mod ui;
pub mod wire;
