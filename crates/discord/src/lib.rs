//! Discord transport for accord, built on serenity.
//!
//! [`SerenityGateway`] implements `GatewayClient`: gateway events reach
//! module listeners under their discord.js names, and command interactions
//! are wrapped in [`SerenityInteraction`] for the dispatcher.

pub mod client;
pub mod handler;
pub mod interaction;

pub use {
    client::SerenityGateway,
    handler::{DiscordHandler, names},
    interaction::SerenityInteraction,
};
