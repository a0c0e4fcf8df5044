//! Per-channel fan-out: publish to everyone currently parked on the channel.

use crate::wire::WireMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Buffered messages per channel between a poller's subscribe and its drain.
const CHANNEL_CAPACITY: usize = 64;

/// Named channels created on first use. Publishing reaches every subscriber
/// parked at that moment; with nobody parked the message is dropped
/// (best-effort delivery, no persistence).
pub struct MessageBroker {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<WireMessage>>>>,
}

impl Default for MessageBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBroker {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish a message to a channel. Returns how many parked pollers it reached.
    pub async fn publish(&self, channel: &str, user: &str, text: &str) -> usize {
        let tx = self.sender(channel).await;
        let msg = WireMessage {
            user: user.to_string(),
            text: text.to_string(),
        };
        tx.send(msg).unwrap_or(0)
    }

    /// Subscribe to a channel's stream, creating the channel on first use.
    pub async fn subscribe(&self, channel: &str) -> broadcast::Receiver<WireMessage> {
        self.sender(channel).await.subscribe()
    }

    async fn sender(&self, channel: &str) -> broadcast::Sender<WireMessage> {
        if let Some(tx) = self.channels.read().await.get(channel) {
            return tx.clone();
        }
        let mut g = self.channels.write().await;
        g.entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}
