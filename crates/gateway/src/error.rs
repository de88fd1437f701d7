use thiserror::Error;

use crate::sync::SyncScope;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Modules(#[from] accord_modules::Error),

    #[error(transparent)]
    Common(#[from] accord_common::Error),

    /// The configuration cannot drive a run.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("request to {scope} command registry failed: {source}")]
    Http {
        scope: SyncScope,
        #[source]
        source: reqwest::Error,
    },

    #[error("{scope} command registry answered {status}: {body}")]
    Api {
        scope: SyncScope,
        status: u16,
        body: String,
    },

    /// One or more sync scopes failed.
    #[error("command sync failed for {}", .scopes.join(", "))]
    Sync { scopes: Vec<String> },
}

impl Error {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
