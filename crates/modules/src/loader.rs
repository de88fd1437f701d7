//! Turns one module file into a [`ModuleValue`].

use std::{path::Path, sync::Arc};

use {serde_json::Value, tracing::debug};

use crate::{
    actions::{ACTION_KEY, ActionRequest, ActionTable},
    error::{Error, Result},
    value::ModuleValue,
};

/// Key of the default-export wrapper.
const DEFAULT_EXPORT: &str = "default";

/// Parses module files and resolves their action references.
#[derive(Debug, Clone)]
pub struct ModuleLoader {
    actions: Arc<ActionTable>,
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new(ActionTable::with_builtins())
    }
}

impl ModuleLoader {
    pub fn new(actions: ActionTable) -> Self {
        Self {
            actions: Arc::new(actions),
        }
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    /// Read and load the file at `path`. The format follows the extension.
    pub fn load(&self, path: &Path) -> Result<ModuleValue> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::load(path, e))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        self.load_str(&path.display().to_string(), ext, &raw)
    }

    /// Load module text already in memory. `label` names it in diagnostics.
    pub fn load_str(&self, label: &str, ext: &str, raw: &str) -> Result<ModuleValue> {
        let parsed: Value = match ext.to_ascii_lowercase().as_str() {
            "toml" => toml::from_str(raw).map_err(|e| Error::load(label, e))?,
            "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::load(label, e))?,
            "json" => serde_json::from_str(raw).map_err(|e| Error::load(label, e))?,
            other => {
                return Err(Error::load(
                    label,
                    format!("unsupported module format '.{other}'"),
                ));
            },
        };

        let exported = unwrap_default(parsed);
        let value = self.resolve(label, exported)?;
        debug!(module = label, kind = value.type_name(), "loaded module");
        Ok(value)
    }

    fn resolve(&self, label: &str, value: Value) -> Result<ModuleValue> {
        match value {
            Value::Object(mut map) if map.contains_key(ACTION_KEY) => {
                let name = match map.remove(ACTION_KEY) {
                    Some(Value::String(name)) => name,
                    other => {
                        return Err(Error::load(
                            label,
                            format!("`{ACTION_KEY}` must be a string, got {other:?}"),
                        ));
                    },
                };
                let params = Value::Object(map);
                let callable = self
                    .actions
                    .resolve(&name, &ActionRequest {
                        module: label,
                        params: &params,
                    })
                    .map_err(|e| Error::load(label, e))?;
                Ok(ModuleValue::Callable(callable))
            },
            Value::Object(map) => Ok(ModuleValue::Object(
                map.into_iter()
                    .map(|(k, v)| Ok((k, self.resolve(label, v)?)))
                    .collect::<Result<_>>()?,
            )),
            Value::Array(items) => Ok(ModuleValue::List(
                items
                    .into_iter()
                    .map(|v| self.resolve(label, v))
                    .collect::<Result<_>>()?,
            )),
            plain => Ok(ModuleValue::from(plain)),
        }
    }
}

/// Use the `default` export when it holds something; an empty one (`null`,
/// `false`, `0`, `""`) leaves the outer value as the export.
fn unwrap_default(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get(DEFAULT_EXPORT).is_some_and(is_present) => {
            map.remove(DEFAULT_EXPORT).unwrap_or(Value::Null)
        },
        other => other,
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
