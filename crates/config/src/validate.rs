//! Configuration validation.
//!
//! Checks a loaded [`AccordConfig`] for values that would make the bot fail
//! at startup and reports them as diagnostics instead.

use regex::Regex;

use crate::schema::AccordConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "dev.guild_ids"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Options controlling which checks apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateFor {
    /// The gateway connection needs a token.
    pub needs_token: bool,
    /// Command sync needs the application id.
    pub needs_client_id: bool,
}

/// Validate `config` for a run that connects and syncs.
pub fn validate(config: &AccordConfig) -> ValidationResult {
    validate_for(config, ValidateFor {
        needs_token: true,
        needs_client_id: true,
    })
}

/// Validate `config`, only requiring the credentials named in `scope`.
pub fn validate_for(config: &AccordConfig, scope: ValidateFor) -> ValidationResult {
    let mut result = ValidationResult::default();

    if scope.needs_token && config.token().is_none() {
        result.push(
            Severity::Error,
            "token",
            "no bot token configured (set `token` or DISCORD_TOKEN)",
        );
    }

    match config.client_id.as_deref() {
        None | Some("") if scope.needs_client_id => result.push(
            Severity::Error,
            "client_id",
            "no application id configured (set `client_id` or ACCORD_CLIENT_ID)",
        ),
        Some(id) if !id.is_empty() && !is_snowflake(id) => result.push(
            Severity::Error,
            "client_id",
            format!("'{id}' is not a numeric id"),
        ),
        _ => {},
    }

    if config.dev.enabled && config.dev.guild_ids.is_empty() {
        result.push(
            Severity::Error,
            "dev.guild_ids",
            "dev mode is enabled but no guild is listed (set ACCORD_DEV_GUILDS)",
        );
    }
    for id in &config.dev.guild_ids {
        if !is_snowflake(id) {
            result.push(
                Severity::Error,
                "dev.guild_ids",
                format!("'{id}' is not a numeric guild id"),
            );
        }
    }
    if !config.dev.enabled && !config.dev.guild_ids.is_empty() {
        result.push(
            Severity::Warning,
            "dev.guild_ids",
            "guild ids are ignored unless dev mode is enabled",
        );
    }

    for (path, pattern) in [
        ("modules.file_pattern", &config.modules.file_pattern),
        ("modules.dir_pattern", &config.modules.dir_pattern),
    ] {
        if let Err(e) = Regex::new(pattern) {
            result.push(Severity::Error, path, format!("invalid regex: {e}"));
        }
    }

    if config.modules.max_depth == 0 {
        result.push(
            Severity::Error,
            "modules.max_depth",
            "must be at least 1",
        );
    }

    if config.dispatch.failure_message.trim().is_empty() {
        result.push(
            Severity::Warning,
            "dispatch.failure_message",
            "empty failure message, users will see a blank reply",
        );
    }

    result
}

fn is_snowflake(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}
