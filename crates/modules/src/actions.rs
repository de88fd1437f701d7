//! Named actions that module files reference with `{ "$action" = "name" }`.
//!
//! An action is a factory: given the parameters written next to the
//! `$action` key it builds a [`Callable`]. Parameter errors surface while the
//! module is loaded, not when the bot first runs the action.

use std::{collections::HashMap, future::Future, sync::Arc};

use {
    accord_common::{Interaction, Reply},
    serde_json::Value,
    tracing::info,
};

use crate::{
    error::{Error, Result},
    value::{Callable, CooldownCheck, EventArgs},
};

/// Key marking an object as an action reference.
pub const ACTION_KEY: &str = "$action";

/// What a factory gets when an action reference is resolved.
#[derive(Debug, Clone, Copy)]
pub struct ActionRequest<'a> {
    /// Label of the module file the reference appears in.
    pub module: &'a str,
    /// Every key of the reference object except `$action`.
    pub params: &'a Value,
}

type Factory = Arc<dyn Fn(&ActionRequest<'_>) -> anyhow::Result<Callable> + Send + Sync>;

/// Registry of action factories keyed by name.
#[derive(Clone, Default)]
pub struct ActionTable {
    factories: HashMap<String, Factory>,
}

impl std::fmt::Debug for ActionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = self.names();
        names.sort_unstable();
        f.debug_struct("ActionTable").field("actions", &names).finish()
    }
}

impl ActionTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with `reply`, `defer`, `log`, `pluck`, `match` and `ignore-bots`.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table
            .register("reply", reply_action)
            .register("defer", defer_action)
            .register("log", log_action)
            .register("pluck", pluck_action)
            .register("match", match_action)
            .register_handler("ignore-bots", |_, arg| {
                let is_bot = arg.pointer("/author/bot") == Some(&Value::Bool(true));
                (!is_bot).then(|| arg.clone())
            });
        table
    }

    /// Register a raw factory. A later registration under the same name wins.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&ActionRequest<'_>) -> anyhow::Result<Callable> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register an event executor. `f` receives the reference's parameters and
    /// the event arguments.
    pub fn register_event<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Arc<Value>, EventArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let f = Arc::new(f);
        self.register(name, move |req| {
            let f = Arc::clone(&f);
            let params = Arc::new(req.params.clone());
            Ok(Callable::event(move |args| f(Arc::clone(&params), args)))
        })
    }

    /// Register a handler. Returning `None` drops the occurrence.
    pub fn register_handler<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&Value, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.register(name, move |req| {
            let f = Arc::clone(&f);
            let params = req.params.clone();
            Ok(Callable::handler(move |arg| f(&params, arg)))
        })
    }

    /// Register a command executor.
    pub fn register_command<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Arc<Value>, Arc<dyn Interaction>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let f = Arc::new(f);
        self.register(name, move |req| {
            let f = Arc::clone(&f);
            let params = Arc::new(req.params.clone());
            Ok(Callable::command(move |interaction| {
                f(Arc::clone(&params), interaction)
            }))
        })
    }

    /// Register a custom cooldown comparator. Returning `false` blocks.
    pub fn register_cooldown<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&Value, &CooldownCheck<'_>) -> bool + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.register(name, move |req| {
            let f = Arc::clone(&f);
            let params = req.params.clone();
            Ok(Callable::cooldown(move |check| f(&params, check)))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the callable for `name`.
    pub fn resolve(&self, name: &str, req: &ActionRequest<'_>) -> Result<Callable> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownAction { name: name.into() })?;
        factory(req).map_err(|e| Error::message(format!("action '{name}': {e:#}")))
    }
}

fn str_param<'a>(params: &'a Value, key: &str) -> anyhow::Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("missing string parameter `{key}`"))
}

fn bool_param(params: &Value, key: &str) -> anyhow::Result<bool> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => anyhow::bail!("parameter `{key}` must be a boolean, got {other}"),
    }
}

fn pointer_param(params: &Value) -> anyhow::Result<String> {
    let pointer = str_param(params, "pointer")?;
    if !pointer.is_empty() && !pointer.starts_with('/') {
        anyhow::bail!("`pointer` must be a JSON pointer starting with '/', got '{pointer}'");
    }
    Ok(pointer.to_string())
}

fn reply_action(req: &ActionRequest<'_>) -> anyhow::Result<Callable> {
    let template = Arc::new(str_param(req.params, "content")?.to_string());
    let ephemeral = bool_param(req.params, "ephemeral")?;
    Ok(Callable::command(move |interaction| {
        let template = Arc::clone(&template);
        async move {
            let content = template
                .replace("{user}", interaction.user_name())
                .replace("{command}", interaction.command_name());
            interaction.reply(Reply { content, ephemeral }).await?;
            Ok(())
        }
    }))
}

fn defer_action(req: &ActionRequest<'_>) -> anyhow::Result<Callable> {
    let ephemeral = bool_param(req.params, "ephemeral")?;
    Ok(Callable::command(move |interaction| async move {
        interaction.defer(ephemeral).await?;
        Ok(())
    }))
}

fn log_action(req: &ActionRequest<'_>) -> anyhow::Result<Callable> {
    let module = Arc::new(req.module.to_string());
    let message = Arc::new(
        req.params
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("event received")
            .to_string(),
    );
    Ok(Callable::event(move |args| {
        let module = Arc::clone(&module);
        let message = Arc::clone(&message);
        async move {
            info!(module = %module, args = args.len(), "{message}");
            Ok(())
        }
    }))
}

fn pluck_action(req: &ActionRequest<'_>) -> anyhow::Result<Callable> {
    let pointer = pointer_param(req.params)?;
    Ok(Callable::handler(move |arg| {
        arg.pointer(&pointer).filter(|v| !v.is_null()).cloned()
    }))
}

fn match_action(req: &ActionRequest<'_>) -> anyhow::Result<Callable> {
    let pointer = pointer_param(req.params)?;
    let expected = req
        .params
        .get("equals")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing parameter `equals`"))?;
    Ok(Callable::handler(move |arg| {
        (arg.pointer(&pointer) == Some(&expected)).then(|| arg.clone())
    }))
}
