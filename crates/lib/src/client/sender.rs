//! Sender: one outbound message per call, at most one in flight.

use crate::addr::ChatAddress;
use crate::client::transport::Transport;
use crate::error::{ChatError, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of a send call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The request was issued and completed with a success status.
    Sent,
    /// A prior send was still in flight; this one was dropped, not queued.
    Dropped,
}

/// Fire-and-forget sender for one (channel, user) pair. Owns its transport
/// handle; overlapping sends are dropped, and failures are returned without
/// retry — the caller re-invokes if it wants another attempt.
pub struct Sender {
    addr: ChatAddress,
    transport: Arc<dyn Transport>,
    in_flight: AtomicBool,
}

impl Sender {
    pub fn new(addr: ChatAddress, transport: Arc<dyn Transport>) -> Self {
        Self {
            addr,
            transport,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn address(&self) -> &ChatAddress {
        &self.addr
    }

    /// Post one message. Empty text is permitted and delivered as an empty
    /// message. Returns `Dropped` without touching the wire when a prior send
    /// on this sender has not resolved yet.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, ChatError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            log::debug!(
                "send dropped: prior send still in flight on {}",
                self.addr.send_path()
            );
            return Ok(SendOutcome::Dropped);
        }
        let result = self
            .transport
            .send_text(&self.addr.send_path(), text.to_string())
            .await;
        self.in_flight.store(false, Ordering::SeqCst);
        match result {
            Ok(res) if res.is_success() => Ok(SendOutcome::Sent),
            Ok(res) => Err(ChatError::SendFailed(TransportError::Status {
                status: res.status,
                body: res.body,
            })),
            Err(e) => Err(ChatError::SendFailed(e)),
        }
    }
}
