//! Config schema types (credentials, module discovery, dev mode, dispatch, api).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Default file-name pattern: data modules whose names contain no parentheses.
pub const DEFAULT_FILE_PATTERN: &str = r"^[^()]*\.(toml|json|ya?ml)$";
/// Default directory-name pattern: directories whose names contain no parentheses.
pub const DEFAULT_DIR_PATTERN: &str = r"^[^()]*$";
pub const DEFAULT_MAX_DEPTH: usize = 32;
pub const DEFAULT_FAILURE_MESSAGE: &str = "There was an error while executing this command!";
pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccordConfig {
    /// Bot token. Usually `${DISCORD_TOKEN}`.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
    /// Application (client) ID used by the command registry endpoints.
    pub client_id: Option<String>,
    pub modules: ModulesConfig,
    pub dev: DevConfig,
    pub dispatch: DispatchConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
}

impl AccordConfig {
    /// Exposed token, if configured and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .filter(|t| !t.is_empty())
    }

    /// Guild scopes for command sync: `Some` in dev mode, `None` for a global deploy.
    pub fn sync_guilds(&self) -> Option<&[String]> {
        self.dev.enabled.then_some(self.dev.guild_ids.as_slice())
    }
}

/// Where and how user modules are discovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    /// Root directory scanned in dev mode, relative to the project directory.
    pub source_dir: PathBuf,
    /// Regex a file's bare name must match to be loaded.
    pub file_pattern: String,
    /// Regex a directory's bare name must match to be descended into.
    pub dir_pattern: String,
    /// Deepest directory level scanned below `source_dir`.
    pub max_depth: usize,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src"),
            file_pattern: DEFAULT_FILE_PATTERN.into(),
            dir_pattern: DEFAULT_DIR_PATTERN.into(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Development mode: modules come from the file tree and commands are
/// synced per guild, which propagates instantly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DevConfig {
    pub enabled: bool,
    pub guild_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Ephemeral message shown to the user when a command fails.
    pub failure_message: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            failure_message: DEFAULT_FAILURE_MESSAGE.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST API used for command sync.
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Address of the Prometheus scrape endpoint.
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "127.0.0.1:9464".into(),
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_document() {
        let cfg: AccordConfig = toml::from_str("").unwrap();
        assert!(cfg.token().is_none());
        assert_eq!(cfg.modules.source_dir, PathBuf::from("src"));
        assert_eq!(cfg.modules.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(cfg.dispatch.failure_message, DEFAULT_FAILURE_MESSAGE);
        assert!(!cfg.dev.enabled);
        assert!(cfg.sync_guilds().is_none());
    }

    #[test]
    fn dev_mode_exposes_guild_scopes() {
        let cfg: AccordConfig = toml::from_str(
            r#"
token = "abc"
client_id = "42"

[dev]
enabled = true
guild_ids = ["1", "2"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.token(), Some("abc"));
        assert_eq!(cfg.sync_guilds(), Some(&["1".to_string(), "2".to_string()][..]));
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let cfg: AccordConfig = toml::from_str(r#"token = """#).unwrap();
        assert!(cfg.token().is_none());
    }

    #[test]
    fn token_round_trips_through_serialization() {
        let cfg: AccordConfig = toml::from_str(r#"token = "s3cret""#).unwrap();
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["token"], "s3cret");
    }
}
