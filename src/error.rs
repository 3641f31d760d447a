use std::io;

use thiserror::Error;

/// Failure kinds surfaced by the collection client, cache store and selector.
///
/// Every variant is fatal for the current invocation; `main` maps it to an exit code.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} not found in response")]
    MissingField(&'static str),
    #[error("no records available to select from")]
    NoRecords,
    #[error("cache file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("configuration error: {0}")]
    Config(String),
}

impl CollectionError {
    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    pub fn io(path: impl AsRef<std::path::Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Process exit status for this failure. Usage errors (2) belong to clap.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 3,
            Self::Auth(_) => 4,
            Self::Transport { .. } | Self::Status { .. } => 5,
            Self::Decode { .. } => 6,
            Self::MissingField(_) => 7,
            Self::Io { .. } => 8,
            Self::NoRecords => 9,
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectionError>;
