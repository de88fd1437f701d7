//! Discord event handler for serenity.
//!
//! Forwards gateway events into an [`EventBus`] under their discord.js
//! names, with the serialized model as the single argument. Command
//! interactions additionally go to the bus's interaction listeners.

use std::sync::Arc;

use {
    accord_gateway::EventBus,
    serde::Serialize,
    serenity::{
        all::{
            Context, EventHandler, GatewayIntents, Guild, Interaction as GatewayInteraction,
            Member, Message, Ready,
        },
        async_trait,
    },
    tracing::{debug, info, warn},
};

use crate::interaction::SerenityInteraction;

/// discord.js event names forwarded to modules.
pub mod names {
    pub const READY: &str = "ready";
    pub const MESSAGE_CREATE: &str = "messageCreate";
    pub const GUILD_CREATE: &str = "guildCreate";
    pub const GUILD_MEMBER_ADD: &str = "guildMemberAdd";
    pub const INTERACTION_CREATE: &str = "interactionCreate";
}

/// Handler for Discord gateway events.
pub struct DiscordHandler {
    pub bus: Arc<EventBus>,
}

impl DiscordHandler {
    /// Intents requested when none are configured. `GUILD_MEMBERS` and
    /// `MESSAGE_CONTENT` are privileged and must be enabled for the
    /// application in the developer portal.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }

    async fn forward<T: Serialize>(&self, event: &str, model: &T) {
        match serde_json::to_value(model) {
            Ok(value) => {
                let listeners = self.bus.emit(event, vec![value]).await;
                debug!(event, listeners, "forwarded gateway event");
            },
            Err(e) => warn!(event, error = %e, "failed to serialize gateway event"),
        }
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );
        self.forward(names::READY, &ready).await;
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        self.forward(names::MESSAGE_CREATE, &msg).await;
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        self.forward(names::GUILD_CREATE, &guild).await;
    }

    async fn guild_member_addition(&self, _ctx: Context, member: Member) {
        self.forward(names::GUILD_MEMBER_ADD, &member).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: GatewayInteraction) {
        self.forward(names::INTERACTION_CREATE, &interaction).await;

        let wrapped = match interaction {
            GatewayInteraction::Command(command) => {
                SerenityInteraction::new(Arc::clone(&ctx.http), command, false)
            },
            GatewayInteraction::Autocomplete(command) => {
                SerenityInteraction::new(Arc::clone(&ctx.http), command, true)
            },
            _ => {
                debug!("ignoring non-command interaction");
                return;
            },
        };
        self.bus.dispatch_interaction(Arc::new(wrapped)).await;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        accord_gateway::GatewayClient,
        serde_json::{Value, json},
        std::sync::Mutex,
    };

    #[test]
    fn default_intents_cover_forwarded_events() {
        let intents = DiscordHandler::intents();
        assert!(intents.contains(GatewayIntents::GUILDS));
        assert!(intents.contains(GatewayIntents::GUILD_MESSAGES));
        assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(intents.contains(GatewayIntents::GUILD_MEMBERS));
    }

    #[tokio::test]
    async fn forward_emits_serialized_model() {
        let bus = Arc::new(EventBus::new());
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let sink = Arc::clone(&seen);
        bus.on(
            names::MESSAGE_CREATE,
            Arc::new(move |args| {
                let sink = Arc::clone(&sink);
                Box::pin(async move {
                    sink.lock().unwrap().extend(args);
                })
            }),
        );

        let handler = DiscordHandler {
            bus: Arc::clone(&bus),
        };
        handler
            .forward(names::MESSAGE_CREATE, &json!({"content": "hi"}))
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![json!({"content": "hi"})]);
    }
}
