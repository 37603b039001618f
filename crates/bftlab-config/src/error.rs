//! Errors raised while reading experiment configuration

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read experiment config at {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse experiment config at {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse inline experiment config: {0}")]
    InlineParseError(#[from] toml::de::Error),

    #[error("Top-level '{key}' must be a table keyed by protocol name")]
    ProtocolsNotTable { key: &'static str },

    #[error("Protocol layer '{protocol}' must be a table")]
    InvalidProtocolLayer { protocol: String },

    #[error("No home directory to look up the user config in")]
    NoUserConfigDir,
}
