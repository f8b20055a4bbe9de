//! Error types shared by the detection engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or persisting settings documents.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write settings file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in settings document '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings document '{0}' must be a JSON object")]
    NotAnObject(String),
}

/// Errors raised while resolving or running an external predicate.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("malformed plugin reference: '{0}'")]
    BadReference(String),

    #[error("plugin module not found: {0}")]
    ModuleNotFound(String),

    #[error("failed to load plugin module {module}: {reason}")]
    LoadFailed { module: String, reason: String },

    #[error("plugin module {module} has no entry point '{name}'")]
    MissingEntryPoint { module: String, name: String },

    #[error("plugin argument '{name}' is missing or invalid")]
    BadArgument { name: String },

    #[error("plugin predicate failed: {0}")]
    Predicate(String),
}

impl PluginError {
    /// Whether the host should see this error when `reraise_exceptions` is set.
    ///
    /// A malformed reference never gets as far as loading anything, so it
    /// only ever counts as "not matched".
    pub fn is_reraisable(&self) -> bool {
        !matches!(self, PluginError::BadReference(_))
    }
}

/// Errors that escape a detection or reconciliation pass.
///
/// Rule failures are normally swallowed and treated as "not matched"; only
/// plugin failures under `reraise_exceptions` and settings persistence
/// failures reach the host.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
