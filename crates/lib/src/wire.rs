//! Wire payloads and receive framing.
//!
//! A receive response body is NDJSON: zero or more lines, one message object
//! per line, in arrival order. Message text may contain newlines; JSON string
//! escaping keeps each message on a single line.

use serde::{Deserialize, Serialize};

/// One chat message as delivered to handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub channel: String,
    pub user: String,
    pub text: String,
}

impl ChatMessage {
    /// Rendered transcript fragment, e.g. `[alice] hi`.
    pub fn render(&self) -> String {
        format!("[{}] {}", self.user, self.text)
    }
}

/// Message as framed on the wire. The channel is implied by the request path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub user: String,
    #[serde(default)]
    pub text: String,
}

/// Encode one message as an NDJSON line (trailing newline included).
pub fn encode_line(msg: &WireMessage) -> String {
    let mut line = serde_json::to_string(msg).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    line
}

/// Decode a receive response body into ordered messages. Malformed lines are
/// logged and skipped; they never take the well-formed lines around them down
/// with them.
pub fn decode_body(channel: &str, body: &str) -> Vec<ChatMessage> {
    let mut out = Vec::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<WireMessage>(line) {
            Ok(w) => out.push(ChatMessage {
                channel: channel.to_string(),
                user: w.user,
                text: w.text,
            }),
            Err(e) => log::debug!("skipping malformed wire line: {}", e),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(user: &str, text: &str) -> String {
        encode_line(&WireMessage {
            user: user.to_string(),
            text: text.to_string(),
        })
    }

    #[test]
    fn decode_preserves_order() {
        let body = format!("{}{}{}", line("alice", "A"), line("bob", "B"), line("alice", "C"));
        let msgs = decode_body("room1", &body);
        let texts: Vec<&str> = msgs.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["A", "B", "C"]);
        assert!(msgs.iter().all(|m| m.channel == "room1"));
    }

    #[test]
    fn empty_body_is_empty_batch() {
        assert!(decode_body("room1", "").is_empty());
        assert!(decode_body("room1", "\n\n").is_empty());
    }

    #[test]
    fn malformed_line_skipped_neighbors_kept() {
        let body = format!("{}not json\n{}", line("alice", "A"), line("bob", "B"));
        let msgs = decode_body("room1", &body);
        let texts: Vec<&str> = msgs.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["A", "B"]);
    }

    #[test]
    fn newline_in_text_survives_framing() {
        let body = line("alice", "two\nlines");
        let msgs = decode_body("room1", &body);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].text, "two\nlines");
    }

    #[test]
    fn empty_text_is_a_message() {
        let msgs = decode_body("room1", &line("alice", ""));
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].text, "");
    }

    #[test]
    fn render_attributes_user() {
        let msg = ChatMessage {
            channel: "room1".to_string(),
            user: "alice".to_string(),
            text: "hi".to_string(),
        };
        assert_eq!(msg.render(), "[alice] hi");
    }
}
