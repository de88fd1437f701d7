//! Shared types, error definitions, and capability traits used across all
//! accord crates.

pub mod cooldown;
pub mod error;
pub mod interaction;

pub use {
    cooldown::CooldownState,
    error::{Error, Result},
    interaction::{Interaction, InteractionKind, Reply},
};
