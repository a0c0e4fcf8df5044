//! Error taxonomy for the client core.

use thiserror::Error;

/// Transport-level failure: the request could not complete, or came back
/// with a non-success status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Client errors. Receive failures are consumed inside the receiver loop
/// (logged, backed off, retried) and only appear here when a caller drives
/// the transport directly.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The transport could not be constructed. Fatal for the session: nothing
    /// can be sent or received. Reported once, never retried.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// A send request errored. The sender is available again; no automatic retry.
    #[error("send failed: {0}")]
    SendFailed(#[source] TransportError),

    /// A poll request errored.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] TransportError),

    /// Empty or malformed channel/user identifier.
    #[error("invalid chat address: {0}")]
    InvalidAddress(String),
}
