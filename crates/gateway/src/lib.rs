//! Gateway side of an accord bot: event registration, command dispatch,
//! and command sync.
//!
//! Lifecycle (see [`Bot::prepare`]):
//! 1. Run the module pipeline
//! 2. Sync command metadata (per guild in dev mode, global otherwise)
//! 3. Bind every event descriptor to the client
//! 4. Bind the command dispatcher to the interaction stream
//! 5. Log in
//!
//! Transport specifics live behind [`GatewayClient`] and [`CommandApi`];
//! `accord-discord` supplies the serenity-backed client.

pub mod client;
pub mod cooldown;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod runtime;
pub mod sync;
pub mod testing;

pub use {
    client::{EventBus, GatewayClient, InteractionListener, Listener, ListenerId},
    cooldown::{CooldownDecision, cooldown_notice, evaluate},
    dispatch::{CommandDispatcher, DispatchOutcome},
    error::{Error, Result},
    events::{RegistrationHandle, event_input, register_event, register_events},
    runtime::{Bot, PreparedBot},
    sync::{CommandApi, RestCommandApi, ScopeOutcome, SyncReport, SyncScope, sync_commands},
};
