//! Configuration error types.

use std::path::PathBuf;

use super::BackendKind;

/// Errors that can occur while parsing or loading an executor configuration.
///
/// All of these are detected before any process is touched.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration names no backend.
    #[error("Configuration is empty: exactly one backend key is required")]
    EmptyConfiguration,

    /// More than one backend key is present.
    #[error("Configuration selects more than one backend: {}", .keys.join(", "))]
    AmbiguousSelection { keys: Vec<String> },

    /// The single key present is not a recognized backend.
    #[error("Unknown backend: {name}")]
    UnknownBackend { name: String },

    /// The backend is recognized but its options are invalid.
    #[error("Malformed options for {backend}: {reason}")]
    MalformedOptions { backend: BackendKind, reason: String },

    /// The configuration is not a key/value mapping.
    #[error("Configuration must be a mapping, found {found}")]
    NotAMapping { found: &'static str },

    /// The configuration text is not valid JSON.
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration text is not valid TOML.
    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// A configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A profile file has an extension other than `.toml` or `.json`.
    #[error("Unsupported config file format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// No profile exists at any search path.
    #[error("No profile found (searched {})", .searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    NoProfileFound { searched: Vec<PathBuf> },
}

impl ConfigError {
    pub(crate) fn malformed(backend: BackendKind, reason: impl Into<String>) -> Self {
        Self::MalformedOptions {
            backend,
            reason: reason.into(),
        }
    }
}
