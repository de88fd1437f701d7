//! Binds event descriptors to a [`GatewayClient`].

use std::sync::Arc;

use {
    accord_modules::{EventArgs, EventDescriptor, Executable},
    serde_json::Value,
    tracing::{debug, error},
};

#[cfg(feature = "metrics")]
use accord_metrics::{counter, events as event_metrics, labels};

use crate::client::{GatewayClient, Listener, ListenerId};

/// What [`register_event`] bound, so it can be unbound later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationHandle {
    pub event_name: String,
    pub id: ListenerId,
    pub once: bool,
}

impl RegistrationHandle {
    /// Remove the listener from `client`.
    pub fn unbind(&self, client: &dyn GatewayClient) -> bool {
        client.off(&self.event_name, self.id)
    }
}

/// The arguments `execute` receives for one emission, or `None` when the
/// handler dropped it.
///
/// With a handler, only the first argument is handed to it and its result
/// becomes the sole argument. Without one, every argument passes through.
pub fn event_input(event: &EventDescriptor, args: EventArgs) -> Option<EventArgs> {
    let Some(handler) = &event.handler else {
        return Some(args);
    };
    let first = args.into_iter().next().unwrap_or(Value::Null);
    handler(&first).filter(|v| !v.is_null()).map(|v| vec![v])
}

fn listener_for(event: EventDescriptor) -> Listener {
    let event = Arc::new(event);
    Arc::new(move |args| {
        let event = Arc::clone(&event);
        Box::pin(async move {
            let Some(input) = event_input(&event, args) else {
                debug!(event = %event.name, origin = %event.origin, "event dropped by handler");
                return;
            };
            #[cfg(feature = "metrics")]
            counter!(event_metrics::DISPATCHED_TOTAL, labels::EVENT => event.name.clone())
                .increment(1);
            if let Err(e) = event.execute(input).await {
                error!(
                    event = %event.name,
                    origin = %event.origin,
                    error = %e,
                    "event executor failed"
                );
            }
        })
    })
}

/// Bind `event` with `once` or `on` as declared.
pub fn register_event(client: &dyn GatewayClient, event: &EventDescriptor) -> RegistrationHandle {
    let listener = listener_for(event.clone());
    let id = if event.once {
        client.once(&event.name, listener)
    } else {
        client.on(&event.name, listener)
    };
    debug!(event = %event.name, once = event.once, origin = %event.origin, "registered event");
    RegistrationHandle {
        event_name: event.name.clone(),
        id,
        once: event.once,
    }
}

pub fn register_events(
    client: &dyn GatewayClient,
    events: &[EventDescriptor],
) -> Vec<RegistrationHandle> {
    events
        .iter()
        .map(|event| register_event(client, event))
        .collect()
}
