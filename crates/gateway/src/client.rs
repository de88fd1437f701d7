//! The gateway client seam and an in-process event bus.
//!
//! [`GatewayClient`] is what the registrar and the dispatcher bind to. The
//! serenity adapter forwards real gateway traffic into an [`EventBus`]; tests
//! drive the bus directly.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use {
    accord_common::Interaction,
    accord_modules::EventArgs,
    async_trait::async_trait,
    futures::future::{BoxFuture, join_all},
    tracing::{debug, info},
};

use crate::error::Result;

/// Event listener. Listener failures are handled inside the listener.
pub type Listener = Arc<dyn Fn(EventArgs) -> BoxFuture<'static, ()> + Send + Sync>;

pub type InteractionListener =
    Arc<dyn Fn(Arc<dyn Interaction>) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capabilities the core needs from a chat gateway connection.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Call `listener` on every emission of `event`.
    fn on(&self, event: &str, listener: Listener) -> ListenerId;

    /// Call `listener` on the next emission of `event` only.
    fn once(&self, event: &str, listener: Listener) -> ListenerId;

    /// Remove a listener. Returns `false` when it was already gone.
    fn off(&self, event: &str, id: ListenerId) -> bool;

    /// Receive every interaction.
    fn on_interaction(&self, listener: InteractionListener);

    /// Connect and run until the connection ends.
    async fn login(&self, token: &str) -> Result<()>;
}

struct Registered {
    id: ListenerId,
    once: bool,
    listener: Listener,
}

/// Listener registry with discord.js-style `on`/`once` semantics.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<String, Vec<Registered>>>,
    interaction_listeners: Mutex<Vec<InteractionListener>>,
    next_id: AtomicU64,
    logged_in: AtomicBool,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.event_names())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, event: &str, once: bool, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners
            .entry(event.to_string())
            .or_default()
            .push(Registered { id, once, listener });
        id
    }

    /// Run every listener of `event` with `args`. One-shot listeners are
    /// removed before they run. Returns how many listeners ran.
    pub async fn emit(&self, event: &str, args: EventArgs) -> usize {
        let batch: Vec<Listener> = {
            let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            let Some(registered) = listeners.get_mut(event) else {
                return 0;
            };
            let batch = registered.iter().map(|r| Arc::clone(&r.listener)).collect();
            registered.retain(|r| !r.once);
            if registered.is_empty() {
                listeners.remove(event);
            }
            batch
        };

        let count = batch.len();
        debug!(event, listeners = count, "emitting event");
        join_all(batch.into_iter().map(|listener| listener(args.clone()))).await;
        count
    }

    /// Hand an interaction to every interaction listener.
    pub async fn dispatch_interaction(&self, interaction: Arc<dyn Interaction>) {
        let batch: Vec<InteractionListener> = self
            .interaction_listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        join_all(
            batch
                .into_iter()
                .map(|listener| listener(Arc::clone(&interaction))),
        )
        .await;
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(event)
            .map_or(0, Vec::len)
    }

    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::Acquire)
    }
}

#[async_trait]
impl GatewayClient for EventBus {
    fn on(&self, event: &str, listener: Listener) -> ListenerId {
        self.add(event, false, listener)
    }

    fn once(&self, event: &str, listener: Listener) -> ListenerId {
        self.add(event, true, listener)
    }

    fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let Some(registered) = listeners.get_mut(event) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|r| r.id != id);
        let removed = registered.len() != before;
        if registered.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    fn on_interaction(&self, listener: InteractionListener) {
        self.interaction_listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// The bus has no remote side; logging in only marks it ready.
    async fn login(&self, _token: &str) -> Result<()> {
        self.logged_in.store(true, Ordering::Release);
        info!("in-process event bus ready");
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn counting(counter: &Arc<AtomicU64>) -> Listener {
        let counter = Arc::clone(counter);
        Arc::new(move |_| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn on_listeners_fire_every_time() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));
        bus.on("messageCreate", counting(&hits));

        assert_eq!(bus.emit("messageCreate", vec![json!({})]).await, 1);
        assert_eq!(bus.emit("messageCreate", vec![json!({})]).await, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn once_listeners_fire_a_single_time() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));
        bus.once("ready", counting(&hits));

        bus.emit("ready", vec![]).await;
        assert_eq!(bus.emit("ready", vec![]).await, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count("ready"), 0);
    }

    #[tokio::test]
    async fn off_removes_only_the_named_listener() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));
        let first = bus.on("typingStart", counting(&hits));
        bus.on("typingStart", counting(&hits));

        assert!(bus.off("typingStart", first));
        assert!(!bus.off("typingStart", first));
        assert!(!bus.off("ready", first));

        bus.emit("typingStart", vec![]).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_events_are_ignored() {
        let bus = EventBus::new();
        assert_eq!(bus.emit("guildCreate", vec![]).await, 0);
    }

    #[tokio::test]
    async fn login_marks_the_bus_ready() {
        let bus = EventBus::new();
        assert!(!bus.is_logged_in());
        bus.login("token").await.unwrap();
        assert!(bus.is_logged_in());
    }
}
