//! `accord check`: run the module pipeline without connecting.

use std::path::Path;

use {
    accord_config::{ValidateFor, validate_for},
    accord_modules::{LoadedModules, load_modules},
    anyhow::Result,
};

use crate::bot_commands::{Mode, check_diagnostics, load_config, module_source};

pub async fn check(config_path: Option<&Path>, source: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    check_diagnostics(&validate_for(&config, ValidateFor::default()))?;

    // Check what `dev` would load when the tree exists, the embedded set otherwise.
    let mode = if source.is_none() && !config.modules.source_dir.is_dir() {
        Mode::Production
    } else {
        Mode::Dev
    };
    let source = module_source(&config, mode, source)?;
    println!("Checking {}", source.describe());

    let loaded = load_modules(source.as_ref()).await?;
    print!("{}", render(&loaded));

    if !loaded.failures.is_empty() {
        anyhow::bail!("{} module(s) rejected", loaded.failures.len());
    }
    Ok(())
}

fn render(loaded: &LoadedModules) -> String {
    let mut out = String::new();
    out.push_str(&format!("Events ({}):\n", loaded.events.len()));
    for event in &loaded.events {
        let once = if event.once {
            " (once)"
        } else {
            ""
        };
        out.push_str(&format!("  {}{once}  {}\n", event.name, event.origin));
    }
    out.push_str(&format!("Commands ({}):\n", loaded.commands.len()));
    for command in &loaded.commands {
        out.push_str(&format!("  /{}  {}\n", command.name(), command.origin));
    }
    if !loaded.failures.is_empty() {
        out.push_str(&format!("Rejected ({}):\n", loaded.failures.len()));
        for failure in &loaded.failures {
            out.push_str(&format!("  {failure}\n"));
        }
    }
    out
}
