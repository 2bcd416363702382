//! Outbound side of the chat transport.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ChannelId;

/// File attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Where the file lives on disk.
    pub path: PathBuf,
    /// Name shown to readers.
    pub filename: String,
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Message body.
    pub text: String,
    /// File sent along with the text, if any.
    pub attachment: Option<Attachment>,
}

impl Outbound {
    /// Plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    /// Message with a file.
    pub fn with_attachment(text: impl Into<String>, attachment: Attachment) -> Self {
        Self {
            text: text.into(),
            attachment: Some(attachment),
        }
    }
}

/// Delivers messages to channels.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `message` to `channel`.
    async fn send(&self, channel: &ChannelId, message: Outbound) -> Result<()>;
}
