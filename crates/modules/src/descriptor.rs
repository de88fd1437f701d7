//! Validated event and command descriptors.

use std::{fmt, sync::Arc};

use {accord_common::Interaction, futures::future::BoxFuture, serde_json::Value};

use crate::value::{CommandFn, CooldownFn, EventArgs, EventFn, HandlerFn};

/// Where a descriptor was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOrigin {
    pub path: String,
    pub index: usize,
}

impl fmt::Display for ModuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.path, self.index)
    }
}

/// Something the runtime can run with an input.
pub trait Executable {
    type Input;

    fn execute(&self, input: Self::Input) -> BoxFuture<'static, anyhow::Result<()>>;
}

#[derive(Clone)]
pub struct EventDescriptor {
    /// Gateway event name, e.g. `ready` or `messageCreate`.
    pub name: String,
    pub once: bool,
    pub handler: Option<HandlerFn>,
    pub execute: EventFn,
    pub origin: ModuleOrigin,
}

impl Executable for EventDescriptor {
    type Input = EventArgs;

    fn execute(&self, input: EventArgs) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.execute)(input)
    }
}

impl fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("name", &self.name)
            .field("once", &self.once)
            .field("handler", &self.handler.is_some())
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Command metadata exactly as sent to the command registry.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandData {
    name: String,
    json: Value,
}

impl CommandData {
    /// Accepts an object with a non-empty string `name`.
    pub fn from_json(json: Value) -> Result<Self, String> {
        let name = match json.get("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
            Some(Value::String(_)) => return Err("`data.name` is empty".into()),
            Some(other) => return Err(format!("`data.name` must be a string, got {other}")),
            None if json.is_object() => return Err("`data.name` is missing".into()),
            None => return Err("`data` must be an object".into()),
        };
        Ok(Self { name, json })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_json(&self) -> &Value {
        &self.json
    }
}

#[derive(Clone)]
pub enum Cooldown {
    /// Minimum number of seconds between two invocations by one user.
    Seconds(u64),
    /// Custom comparator; `false` blocks.
    Custom(CooldownFn),
}

impl fmt::Debug for Cooldown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(n) => write!(f, "Seconds({n})"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Clone)]
pub struct CommandDescriptor {
    pub data: CommandData,
    pub handler: Option<HandlerFn>,
    pub cooldown: Option<Cooldown>,
    pub execute: CommandFn,
    pub origin: ModuleOrigin,
}

impl CommandDescriptor {
    pub fn name(&self) -> &str {
        self.data.name()
    }
}

impl Executable for CommandDescriptor {
    type Input = Arc<dyn Interaction>;

    fn execute(&self, input: Arc<dyn Interaction>) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.execute)(input)
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name())
            .field("handler", &self.handler.is_some())
            .field("cooldown", &self.cooldown)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum ModuleDescriptor {
    Event(EventDescriptor),
    Command(CommandDescriptor),
}

impl ModuleDescriptor {
    pub fn name(&self) -> &str {
        match self {
            Self::Event(e) => &e.name,
            Self::Command(c) => c.name(),
        }
    }

    pub fn origin(&self) -> &ModuleOrigin {
        match self {
            Self::Event(e) => &e.origin,
            Self::Command(c) => &c.origin,
        }
    }

    /// The discriminant tag the descriptor was declared with.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Event(_) => "event",
            Self::Command(_) => "command",
        }
    }
}
