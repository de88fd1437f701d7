//! [`Interaction`] over a serenity command interaction.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    accord_common::{Interaction, InteractionKind, Reply},
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    serde_json::{Value, json},
    serenity::all::{
        CommandInteraction, CommandType, CreateInteractionResponse,
        CreateInteractionResponseFollowup, CreateInteractionResponseMessage, Http,
    },
};

/// A slash or context-menu command received over the gateway.
pub struct SerenityInteraction {
    http: Arc<Http>,
    command: CommandInteraction,
    kind: InteractionKind,
    user_id: String,
    guild_id: Option<String>,
    created_at: DateTime<Utc>,
    replied: AtomicBool,
    deferred: AtomicBool,
}

impl SerenityInteraction {
    /// Wrap a command interaction. Autocomplete requests carry the same
    /// payload, so the caller says which one it is.
    pub fn new(http: Arc<Http>, command: CommandInteraction, autocomplete: bool) -> Self {
        let kind = if autocomplete {
            InteractionKind::Autocomplete
        } else {
            command_kind(command.data.kind)
        };
        Self {
            user_id: command.user.id.to_string(),
            guild_id: command.guild_id.map(|g| g.to_string()),
            created_at: unix_to_utc(command.id.created_at().unix_timestamp()),
            http,
            command,
            kind,
            replied: AtomicBool::new(false),
            deferred: AtomicBool::new(false),
        }
    }
}

/// Chat input versus user/message context menus.
pub fn command_kind(kind: CommandType) -> InteractionKind {
    if kind == CommandType::ChatInput {
        InteractionKind::ChatInputCommand
    } else {
        InteractionKind::ContextMenuCommand
    }
}

pub fn unix_to_utc(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn external(context: &str, e: serenity::Error) -> accord_common::Error {
    accord_common::Error::external(context, e)
}

#[async_trait]
impl Interaction for SerenityInteraction {
    fn kind(&self) -> InteractionKind {
        self.kind
    }

    fn command_name(&self) -> &str {
        &self.command.data.name
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn user_name(&self) -> &str {
        &self.command.user.name
    }

    fn guild_id(&self) -> Option<&str> {
        self.guild_id.as_deref()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn replied(&self) -> bool {
        self.replied.load(Ordering::Acquire)
    }

    fn deferred(&self) -> bool {
        self.deferred.load(Ordering::Acquire)
    }

    fn to_value(&self) -> Value {
        json!({
            "id": self.command.id.to_string(),
            "commandName": self.command.data.name,
            "user": {
                "id": self.user_id,
                "username": self.command.user.name,
                "bot": self.command.user.bot,
            },
            "guildId": self.guild_id,
            "channelId": self.command.channel_id.to_string(),
            "locale": self.command.locale,
            "createdAt": self.created_at.to_rfc3339(),
        })
    }

    async fn reply(&self, reply: Reply) -> accord_common::Result<()> {
        let message = CreateInteractionResponseMessage::new()
            .content(reply.content)
            .ephemeral(reply.ephemeral);
        self.command
            .create_response(&self.http, CreateInteractionResponse::Message(message))
            .await
            .map_err(|e| external("failed to reply to interaction", e))?;
        self.replied.store(true, Ordering::Release);
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> accord_common::Result<()> {
        let followup = CreateInteractionResponseFollowup::new()
            .content(reply.content)
            .ephemeral(reply.ephemeral);
        self.command
            .create_followup(&self.http, followup)
            .await
            .map_err(|e| external("failed to send follow-up", e))?;
        Ok(())
    }

    async fn defer(&self, ephemeral: bool) -> accord_common::Result<()> {
        let result = if ephemeral {
            self.command.defer_ephemeral(&self.http).await
        } else {
            self.command.defer(&self.http).await
        };
        result.map_err(|e| external("failed to defer interaction", e))?;
        self.deferred.store(true, Ordering::Release);
        Ok(())
    }
}
