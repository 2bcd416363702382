//! Shared domain models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a chat channel; sessions are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(String);

impl ChannelId {
    /// Wrap a transport-specific channel identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An already-authenticated chat participant.
///
/// Equality only considers `id`; the display name may change between messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Opaque, stable identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

impl Participant {
    /// Build a participant reference.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Form used to address the participant in replies.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Participant {}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One inbound chat line.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// Channel the message arrived on.
    pub channel: ChannelId,
    /// Author of the message.
    pub author: Participant,
    /// Raw message text, prefix included.
    pub text: String,
}

impl Inbound {
    /// Convenience constructor.
    pub fn new(channel: ChannelId, author: Participant, text: impl Into<String>) -> Self {
        Self {
            channel,
            author,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participants_compare_by_id() {
        let a = Participant::new("1", "Alice");
        let renamed = Participant::new("1", "Alice (away)");
        let b = Participant::new("2", "Alice");
        assert_eq!(a, renamed);
        assert_ne!(a, b);
        assert_eq!(a.mention(), "<@1>");
    }
}
