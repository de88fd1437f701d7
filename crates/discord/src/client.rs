use std::sync::{Arc, Mutex};

use {
    accord_gateway::{
        EventBus, GatewayClient, InteractionListener, Listener, ListenerId, Result,
    },
    async_trait::async_trait,
    serenity::all::{Client, GatewayIntents, ShardManager},
    tracing::info,
};

use crate::handler::DiscordHandler;

/// [`GatewayClient`] backed by a serenity connection.
///
/// Listeners live on an [`EventBus`]; [`DiscordHandler`] feeds it once
/// [`login`](GatewayClient::login) connects.
pub struct SerenityGateway {
    bus: Arc<EventBus>,
    intents: GatewayIntents,
    shard_manager: Mutex<Option<Arc<ShardManager>>>,
}

impl Default for SerenityGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl SerenityGateway {
    pub fn new() -> Self {
        Self {
            bus: Arc::new(EventBus::new()),
            intents: DiscordHandler::intents(),
            shard_manager: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_intents(mut self, intents: GatewayIntents) -> Self {
        self.intents = intents;
        self
    }

    pub fn intents(&self) -> GatewayIntents {
        self.intents
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Close every shard, which makes a running [`login`](GatewayClient::login)
    /// return. No-op before login.
    pub async fn shutdown(&self) {
        let manager = self
            .shard_manager
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(manager) = manager {
            info!("closing discord shards");
            manager.shutdown_all().await;
        }
    }
}

#[async_trait]
impl GatewayClient for SerenityGateway {
    fn on(&self, event: &str, listener: Listener) -> ListenerId {
        self.bus.on(event, listener)
    }

    fn once(&self, event: &str, listener: Listener) -> ListenerId {
        self.bus.once(event, listener)
    }

    fn off(&self, event: &str, id: ListenerId) -> bool {
        self.bus.off(event, id)
    }

    fn on_interaction(&self, listener: InteractionListener) {
        self.bus.on_interaction(listener);
    }

    async fn login(&self, token: &str) -> Result<()> {
        let handler = DiscordHandler {
            bus: Arc::clone(&self.bus),
        };
        let mut client = Client::builder(token, self.intents)
            .event_handler(handler)
            .await
            .map_err(|e| accord_common::Error::external("failed to build discord client", e))?;

        *self
            .shard_manager
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&client.shard_manager));

        info!("connecting to discord gateway");
        client
            .start()
            .await
            .map_err(|e| accord_common::Error::external("discord gateway connection failed", e))?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    #[tokio::test]
    async fn listeners_are_kept_on_the_bus() {
        let gateway = SerenityGateway::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = gateway.once(
            "ready",
            Arc::new(move |_| {
                let counter = Arc::clone(&counter);
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            }),
        );

        assert_eq!(gateway.bus().listener_count("ready"), 1);
        gateway.bus().emit("ready", vec![]).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!gateway.off("ready", id));
    }

    #[tokio::test]
    async fn shutdown_before_login_is_a_no_op() {
        SerenityGateway::new().shutdown().await;
    }

    #[test]
    fn intents_can_be_overridden() {
        let gateway = SerenityGateway::new().with_intents(GatewayIntents::GUILDS);
        assert_eq!(gateway.intents(), GatewayIntents::GUILDS);
    }
}
