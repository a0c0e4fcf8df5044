//! Receiver: the long-poll loop that turns request/response into a stream.

use crate::addr::ChatAddress;
use crate::client::transport::Transport;
use crate::error::{ChatError, TransportError};
use crate::wire::{self, ChatMessage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handler invoked for each received message, in arrival order, never
/// concurrently with itself. The receiver holds exactly one handler for its
/// lifetime.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, msg: ChatMessage);
}

/// Failure backoff: doubles per consecutive poll failure up to `max`, reset
/// to `initial` on any success.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(15),
        }
    }
}

impl BackoffPolicy {
    pub fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }
}

/// Long-poll receiver for one (channel, user) pair.
///
/// At most one poll request is outstanding at any time: the loop issues a new
/// request only after the previous one resolved, so the invariant is held by
/// control flow rather than a lock. `stop` flips a flag; a response that
/// resolves afterwards is discarded without reaching the handler. Stopping is
/// terminal — the in-flight poll may stay pending past `stop()`, so a restart
/// on the same receiver could overlap with it. Create a new receiver for a
/// new session instead.
pub struct Receiver {
    addr: ChatAddress,
    transport: Arc<dyn Transport>,
    backoff: BackoffPolicy,
    started: AtomicBool,
    listening: AtomicBool,
}

impl Receiver {
    pub fn new(addr: ChatAddress, transport: Arc<dyn Transport>) -> Self {
        Self::with_backoff(addr, transport, BackoffPolicy::default())
    }

    pub fn with_backoff(
        addr: ChatAddress,
        transport: Arc<dyn Transport>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            addr,
            transport,
            backoff,
            started: AtomicBool::new(false),
            listening: AtomicBool::new(false),
        }
    }

    pub fn address(&self) -> &ChatAddress {
        &self.addr
    }

    fn listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Start the poll loop, delivering messages to `handler`. A receiver
    /// starts at most once: a second start — whether the loop is live or
    /// already stopped — is a no-op returning `None`. Returns a handle to
    /// await on shutdown.
    pub fn start(self: Arc<Self>, handler: Arc<dyn MessageHandler>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            log::debug!("receiver already started on {}", self.addr.receive_path());
            return None;
        }
        self.listening.store(true, Ordering::SeqCst);
        log::info!(
            "receiver: starting long-poll loop on {}",
            self.addr.receive_path()
        );
        Some(tokio::spawn(async move {
            run_poll_loop(self, handler).await;
        }))
    }

    /// Stop listening. Cooperative: the in-flight poll is not aborted, but its
    /// eventual response is discarded and the loop does not re-arm.
    pub fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    /// One poll: GET the receive path and decode the batch.
    async fn poll_once(&self) -> Result<Vec<ChatMessage>, ChatError> {
        let res = self
            .transport
            .poll(&self.addr.receive_path())
            .await
            .map_err(ChatError::ReceiveFailed)?;
        if !res.is_success() {
            return Err(ChatError::ReceiveFailed(TransportError::Status {
                status: res.status,
                body: res.body,
            }));
        }
        Ok(wire::decode_body(self.addr.channel(), &res.body))
    }
}

async fn run_poll_loop(receiver: Arc<Receiver>, handler: Arc<dyn MessageHandler>) {
    let mut delay = receiver.backoff.initial;
    while receiver.listening() {
        match receiver.poll_once().await {
            Ok(messages) => {
                delay = receiver.backoff.initial;
                if messages.is_empty() {
                    log::debug!("empty poll on {}, re-arming", receiver.addr.receive_path());
                }
                for msg in messages {
                    // Re-checked per payload so a stop() mid-batch silences the rest.
                    if !receiver.listening() {
                        log::debug!("receiver stopped, discarding undelivered payloads");
                        return;
                    }
                    handler.on_message(msg).await;
                }
            }
            Err(e) => {
                if !receiver.listening() {
                    break;
                }
                log::debug!(
                    "poll failed on {}: {}, retrying in {:?}",
                    receiver.addr.receive_path(),
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = receiver.backoff.next_delay(delay);
            }
        }
    }
    log::info!(
        "receiver: long-poll loop stopped on {}",
        receiver.addr.receive_path()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_to_cap() {
        let policy = BackoffPolicy {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(350),
        };
        let d1 = policy.next_delay(policy.initial);
        let d2 = policy.next_delay(d1);
        let d3 = policy.next_delay(d2);
        assert_eq!(d1, Duration::from_millis(200));
        assert_eq!(d2, Duration::from_millis(350));
        assert_eq!(d3, Duration::from_millis(350));
    }
}
