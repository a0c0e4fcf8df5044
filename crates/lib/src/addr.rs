//! Channel/user addressing: validated identifiers and service endpoint paths.

use crate::error::ChatError;

/// A (channel, user) pair scoping one chat session. Immutable once built.
/// Both identifiers are opaque strings; they must be non-empty and free of
/// path separators so they embed cleanly in the endpoint paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAddress {
    channel: String,
    user: String,
}

impl ChatAddress {
    pub fn new(channel: impl Into<String>, user: impl Into<String>) -> Result<Self, ChatError> {
        let channel = channel.into();
        let user = user.into();
        validate_ident("channel", &channel)?;
        validate_ident("user", &user)?;
        Ok(Self { channel, user })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Path for posting one message: `service/{channel}/addMessage/{user}`.
    pub fn send_path(&self) -> String {
        format!("service/{}/addMessage/{}", self.channel, self.user)
    }

    /// Path for the long poll: `service/{channel}/receiveMessages/{user}`.
    pub fn receive_path(&self) -> String {
        format!("service/{}/receiveMessages/{}", self.channel, self.user)
    }
}

fn validate_ident(what: &str, value: &str) -> Result<(), ChatError> {
    if value.trim().is_empty() {
        return Err(ChatError::InvalidAddress(format!("{} must not be empty", what)));
    }
    if value.contains('/') {
        return Err(ChatError::InvalidAddress(format!(
            "{} must not contain '/': {:?}",
            what, value
        )));
    }
    Ok(())
}
