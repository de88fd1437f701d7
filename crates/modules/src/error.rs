use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The discovery root is missing or not a directory. Fatal at startup.
    #[error("module root {path} does not exist or is not a directory")]
    DiscoveryRoot { path: PathBuf },

    #[error("invalid name pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// One file could not be read or parsed. Recoverable: the file is skipped.
    #[error("failed to load module {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("unknown action '{name}'")]
    UnknownAction { name: String },

    #[error(
        "command '{name}' is defined twice: {first} and {second}; rename one of them"
    )]
    DuplicateCommand {
        name: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn load(path: impl AsRef<Path>, reason: impl std::fmt::Display) -> Self {
        Self::Load {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
