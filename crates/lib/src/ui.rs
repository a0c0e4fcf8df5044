//! UI collaborator surface consumed by the client core.

use crate::client::MessageHandler;
use crate::wire::ChatMessage;
use async_trait::async_trait;
use std::sync::Arc;

/// Sink for rendered transcript fragments. The CLI renders to stdout; a UI
/// would append to its message view.
pub trait TranscriptSink: Send + Sync {
    /// Append one rendered message fragment to the transcript.
    fn append(&self, fragment: &str);

    /// Clear the rendered history.
    fn clear(&self);
}

/// Bridges the receiver to a transcript sink: renders each message and
/// appends it. Sequential by construction — the receiver invokes handlers
/// one payload at a time.
pub struct SinkHandler {
    sink: Arc<dyn TranscriptSink>,
}

impl SinkHandler {
    pub fn new(sink: Arc<dyn TranscriptSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl MessageHandler for SinkHandler {
    async fn on_message(&self, msg: ChatMessage) {
        self.sink.append(&msg.render());
    }
}
