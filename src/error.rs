//! Crate-level error type.

use crate::storage::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the cache helpers, configuration, and registry.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying store rejected the command
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored value could not be read as UTF-8 text
    #[error("value under key {key:?} is not valid UTF-8")]
    InvalidUtf8 { key: String },

    /// A value could not be serialized to JSON
    #[error("failed to encode value for key {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored value could not be deserialized from JSON
    #[error("failed to decode value under key {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be read
    #[error("failed to read configuration file {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for the expected shape
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// No data source is registered under the requested name
    #[error("unknown data source: {0}")]
    UnknownDataSource(String),

    /// A policy name did not match any known variant
    #[error("unknown {kind} policy: {value}")]
    UnknownPolicy { kind: &'static str, value: String },
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
