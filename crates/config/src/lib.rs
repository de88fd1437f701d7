//! Configuration loading, validation, env substitution, and env overrides.
//!
//! Config files: `accord.toml`, `accord.yaml`, `accord.yml`, or `accord.json`.
//! Searched in the project directory then `~/.config/accord/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        CONFIG_FILENAMES, LoadedConfig, apply_env_overrides, config_dir, discover_and_load,
        find_config_file, load_config,
    },
    schema::{AccordConfig, ApiConfig, DevConfig, DispatchConfig, MetricsConfig, ModulesConfig},
    validate::{Diagnostic, Severity, ValidateFor, ValidationResult, validate, validate_for},
};
