//! Long-poll client core: sender, receiver, and the injected transport.
//!
//! The receiver turns a stateless request/response transport into a push
//! stream by keeping exactly one poll outstanding; the sender posts one
//! message at a time. Both hold their transport as a passed-in capability.

mod receiver;
mod sender;
mod transport;

pub use receiver::{BackoffPolicy, MessageHandler, Receiver};
pub use sender::{SendOutcome, Sender};
pub use transport::{HttpTransport, Transport, TransportResponse};
