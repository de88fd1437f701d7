//! In-memory value model for loaded modules.
//!
//! A module file is data, so most of a [`ModuleValue`] mirrors JSON. The one
//! addition is [`ModuleValue::Callable`]: an action reference that the loader
//! already resolved into executable behaviour.

use std::{collections::BTreeMap, fmt, future::Future, sync::Arc};

use {
    accord_common::{CooldownState, Interaction},
    chrono::{DateTime, Utc},
    futures::future::BoxFuture,
    serde_json::Value,
};

/// Arguments an event was emitted with, in emission order.
pub type EventArgs = Vec<Value>;

/// Event executor.
pub type EventFn = Arc<dyn Fn(EventArgs) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Pre-processor run on the first argument. `None` drops the occurrence.
pub type HandlerFn = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Command executor.
pub type CommandFn =
    Arc<dyn Fn(Arc<dyn Interaction>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Custom cooldown comparator. `false` blocks the invocation.
pub type CooldownFn = Arc<dyn Fn(&CooldownCheck<'_>) -> bool + Send + Sync>;

/// Everything a custom cooldown comparator gets to look at.
pub struct CooldownCheck<'a> {
    /// Previous invocation by the same user, or the Unix epoch.
    pub last_use: DateTime<Utc>,
    /// Creation time of the current interaction.
    pub now: DateTime<Utc>,
    pub state: &'a CooldownState,
    pub interaction: &'a dyn Interaction,
}

/// Resolved executable behaviour.
#[derive(Clone)]
pub enum Callable {
    Event(EventFn),
    Handler(HandlerFn),
    Command(CommandFn),
    Cooldown(CooldownFn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Event,
    Handler,
    Command,
    Cooldown,
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Event => "event executor",
            Self::Handler => "handler",
            Self::Command => "command executor",
            Self::Cooldown => "cooldown function",
        };
        f.write_str(name)
    }
}

impl Callable {
    pub fn event<F, Fut>(f: F) -> Self
    where
        F: Fn(EventArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Event(Arc::new(move |args| Box::pin(f(args))))
    }

    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        Self::Handler(Arc::new(f))
    }

    pub fn command<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<dyn Interaction>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Command(Arc::new(move |interaction| Box::pin(f(interaction))))
    }

    pub fn cooldown<F>(f: F) -> Self
    where
        F: Fn(&CooldownCheck<'_>) -> bool + Send + Sync + 'static,
    {
        Self::Cooldown(Arc::new(f))
    }

    pub fn kind(&self) -> CallableKind {
        match self {
            Self::Event(_) => CallableKind::Event,
            Self::Handler(_) => CallableKind::Handler,
            Self::Command(_) => CallableKind::Command,
            Self::Cooldown(_) => CallableKind::Cooldown,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.kind())
    }
}

/// A value exported by a module.
#[derive(Debug, Clone, Default)]
pub enum ModuleValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<ModuleValue>),
    Object(BTreeMap<String, ModuleValue>),
    Callable(Callable),
}

impl ModuleValue {
    /// Build an object from `(key, value)` pairs.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, ModuleValue)>) -> Self {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Field lookup; `None` for missing keys and non-objects.
    pub fn get(&self, key: &str) -> Option<&ModuleValue> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Self::Callable(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Object(_) => "object",
            Self::Callable(_) => "callable",
        }
    }

    /// Plain JSON view. Fails on the first callable found, naming its key path.
    pub fn to_json(&self) -> Result<Value, String> {
        self.to_json_at("")
    }

    fn to_json_at(&self, at: &str) -> Result<Value, String> {
        Ok(match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v.to_json_at(&format!("{at}[{i}]")))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json_at(&format!("{at}.{k}"))?)))
                    .collect::<Result<_, String>>()?,
            ),
            Self::Callable(c) => {
                let at = if at.is_empty() { "<root>" } else { at.trim_start_matches('.') };
                return Err(format!("{} found at `{at}` where plain data is expected", c.kind()));
            },
        })
    }
}

impl From<Value> for ModuleValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            },
        }
    }
}

impl From<Callable> for ModuleValue {
    fn from(callable: Callable) -> Self {
        Self::Callable(callable)
    }
}

impl From<&str> for ModuleValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<bool> for ModuleValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u64> for ModuleValue {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<Vec<ModuleValue>> for ModuleValue {
    fn from(items: Vec<ModuleValue>) -> Self {
        Self::List(items)
    }
}
