//! Source → normalize → validate → partition.

use std::collections::HashMap;

use {
    serde_json::Value,
    tracing::{info, warn},
};

#[cfg(feature = "metrics")]
use accord_metrics::{counter, modules as module_metrics};

use crate::{
    descriptor::{CommandDescriptor, EventDescriptor, ModuleDescriptor},
    error::{Error, Result},
    normalize::normalize,
    source::ModuleSource,
    validate::{ValidationFailure, validate},
};

/// Everything the pipeline accepted, split by tag, plus what it rejected.
#[derive(Debug, Default)]
pub struct LoadedModules {
    pub events: Vec<EventDescriptor>,
    pub commands: Vec<CommandDescriptor>,
    pub failures: Vec<ValidationFailure>,
}

impl LoadedModules {
    /// Serialized metadata of every command, in load order.
    pub fn command_metadata(&self) -> Vec<Value> {
        self.commands
            .iter()
            .map(|c| c.data.as_json().clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.commands.is_empty()
    }
}

/// Run the whole pipeline over `source`.
///
/// Malformed candidates are logged and collected in
/// [`LoadedModules::failures`]. An unusable source root and two commands
/// sharing a name are errors.
pub async fn load_modules(source: &dyn ModuleSource) -> Result<LoadedModules> {
    let raw = source.list_entries().await?;
    let files = raw.len();
    let mut loaded = LoadedModules::default();

    for entry in normalize(raw) {
        match validate(entry) {
            Ok(ModuleDescriptor::Event(event)) => loaded.events.push(event),
            Ok(ModuleDescriptor::Command(command)) => loaded.commands.push(command),
            Err(failure) => {
                warn!(
                    path = %failure.path,
                    index = failure.index,
                    reason = %failure.reason,
                    "invalid module, skipping"
                );
                #[cfg(feature = "metrics")]
                counter!(module_metrics::REJECTED_TOTAL).increment(1);
                loaded.failures.push(failure);
            },
        }
    }

    check_duplicate_commands(&loaded.commands)?;

    info!(
        source = %source.describe(),
        files,
        events = loaded.events.len(),
        commands = loaded.commands.len(),
        rejected = loaded.failures.len(),
        "modules loaded"
    );
    Ok(loaded)
}

fn check_duplicate_commands(commands: &[CommandDescriptor]) -> Result<()> {
    let mut seen: HashMap<&str, &CommandDescriptor> = HashMap::new();
    for command in commands {
        if let Some(first) = seen.insert(command.name(), command) {
            return Err(Error::DuplicateCommand {
                name: command.name().to_string(),
                first: first.origin.to_string(),
                second: command.origin.to_string(),
            });
        }
    }
    Ok(())
}
