//! Capability interface for an incoming gateway interaction.
//!
//! The dispatcher only ever sees `dyn Interaction`; the serenity adapter in
//! `accord-discord` and the in-memory doubles used in tests both implement it.

use std::fmt;

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    serde_json::Value,
};

use crate::Result;

/// Kind of interaction delivered by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// A slash command typed in the chat input.
    ChatInputCommand,
    /// A user or message context-menu command.
    ContextMenuCommand,
    Autocomplete,
    Component,
    Modal,
    Ping,
}

impl InteractionKind {
    /// Only chat-input commands are routed to command modules.
    pub fn is_chat_input_command(self) -> bool {
        matches!(self, Self::ChatInputCommand)
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A message sent back in response to an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
}

impl Reply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    /// Shorthand for a reply only the invoking user can see.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

/// An interaction received from the gateway.
#[async_trait]
pub trait Interaction: Send + Sync {
    fn kind(&self) -> InteractionKind;

    /// Name of the invoked command; empty for non-command interactions.
    fn command_name(&self) -> &str;

    fn user_id(&self) -> &str;

    fn user_name(&self) -> &str;

    fn guild_id(&self) -> Option<&str>;

    /// Creation time of the interaction as reported by the platform.
    fn created_at(&self) -> DateTime<Utc>;

    /// Whether an initial response has already been sent.
    fn replied(&self) -> bool;

    /// Whether the interaction has been acknowledged with a deferred response.
    fn deferred(&self) -> bool;

    /// JSON view of the interaction, handed to command handlers.
    fn to_value(&self) -> Value;

    async fn reply(&self, reply: Reply) -> Result<()>;

    async fn follow_up(&self, reply: Reply) -> Result<()>;

    async fn defer(&self, ephemeral: bool) -> Result<()>;
}

impl fmt::Debug for dyn Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction")
            .field("kind", &self.kind())
            .field("command", &self.command_name())
            .field("user_id", &self.user_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_chat_input_is_routed() {
        assert!(InteractionKind::ChatInputCommand.is_chat_input_command());
        assert!(!InteractionKind::Autocomplete.is_chat_input_command());
        assert!(!InteractionKind::ContextMenuCommand.is_chat_input_command());
        assert!(!InteractionKind::Component.is_chat_input_command());
    }

    #[test]
    fn ephemeral_reply_shorthand() {
        let reply = Reply::ephemeral("later");
        assert!(reply.ephemeral);
        assert_eq!(reply.content, "later");
        assert!(!Reply::new("now").ephemeral);
    }
}
