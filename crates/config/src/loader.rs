use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::AccordConfig,
};

/// Standard config file names, checked in order.
pub const CONFIG_FILENAMES: &[&str] = &["accord.toml", "accord.yaml", "accord.yml", "accord.json"];

/// A parsed config together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AccordConfig,
    /// `None` when no file was found and defaults plus env overrides are used.
    pub path: Option<PathBuf>,
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<AccordConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config, then apply environment overrides.
///
/// Search order:
/// 1. `explicit`, when given (a missing explicit file is an error)
/// 2. `<project_dir>/accord.{toml,yaml,yml,json}`
/// 3. `~/.config/accord/accord.{toml,yaml,yml,json}`
///
/// Falls back to `AccordConfig::default()` when nothing is found.
pub fn discover_and_load(project_dir: &Path, explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(project_dir),
    };

    let mut config = match &path {
        Some(p) => {
            debug!(path = %p.display(), "loading config");
            load_config(p)?
        },
        None => {
            info!("no config file found, using defaults and environment");
            AccordConfig::default()
        },
    };

    apply_env_overrides(&mut config)?;
    Ok(LoadedConfig { config, path })
}

/// Find the first config file in standard locations.
pub fn find_config_file(project_dir: &Path) -> Option<PathBuf> {
    let local = CONFIG_FILENAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|p| p.is_file());
    if local.is_some() {
        return local;
    }

    let global = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| global.join(name))
        .find(|p| p.is_file())
}

/// Returns the user-global config directory (`~/.config/accord/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "accord").map(|d| d.config_dir().to_path_buf())
}

/// Apply `DISCORD_TOKEN`, `ACCORD_CLIENT_ID`, `ACCORD_DEV` and `ACCORD_DEV_GUILDS`.
pub fn apply_env_overrides(config: &mut AccordConfig) -> Result<()> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

pub(crate) fn apply_env_overrides_with(
    config: &mut AccordConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(token) = lookup("DISCORD_TOKEN").filter(|t| !t.trim().is_empty()) {
        config.token = Some(Secret::new(token.trim().to_string()));
    }

    if let Some(id) = lookup("ACCORD_CLIENT_ID").filter(|v| !v.trim().is_empty()) {
        config.client_id = Some(id.trim().to_string());
    }

    if let Some(raw) = lookup("ACCORD_DEV") {
        config.dev.enabled = match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" | "" => false,
            other => {
                return Err(Error::InvalidEnv {
                    var: "ACCORD_DEV".into(),
                    message: format!("expected true or false, got '{other}'"),
                });
            },
        };
    }

    if let Some(raw) = lookup("ACCORD_DEV_GUILDS") {
        config.dev.guild_ids = raw
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect();
    }

    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> Result<AccordConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}
