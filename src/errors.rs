//! Registry Reconciliation Error Hierarchy
//!
//! Errors are grouped by the layer that raises them and by how far they are
//! allowed to travel:
//! - [`RegistryError`]: transport and lookup failures of the key-value registry
//! - [`EntityError`]: a single malformed registry value, never escalates past the loader
//! - [`CommitError`]: render, validation and file-system failures of the writer
//! - [`Error`]: everything a reconciliation pass or the startup path can return

use std::path::PathBuf;
use std::process::ExitStatus;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Registry transport or lookup failures outside of the entity level
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Malformed registry value surfaced to a caller that asked for it
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// Render, pre-check, file-system and command failures
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Configuration source could not be loaded or deserialized
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration loaded but violates a rule
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The root of a reconciliation pass could not be read. The pass is
    /// aborted and the last committed artifact stays in place.
    #[error("Failed to read {path} from registry: {source}")]
    RootRead {
        path: String,
        #[source]
        source: RegistryError,
    },

    /// A control key (e.g. support entry block list) holds unusable data
    #[error("Malformed control data at {key}: {reason}")]
    ControlData { key: String, reason: String },

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// How a failed long-poll should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// A single request failed; the backend is reachable
    Transient,
    /// No endpoint of the backend could be reached
    BackendUnavailable,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// Key does not exist (etcd error code 100)
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    /// None of the configured endpoints accepted a connection
    #[error("Registry cluster is unavailable or misconfigured: {0}")]
    Unavailable(String),

    /// The request reached the backend but did not succeed
    #[error("Registry request failed: {0}")]
    Request(String),

    /// The backend answered with something we could not decode
    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),
}

impl RegistryError {
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, RegistryError::KeyNotFound { .. })
    }

    /// Maps the error onto the retry policy the watcher applies.
    pub fn failure_class(&self) -> FailureClass {
        match self {
            RegistryError::Unavailable(_) => FailureClass::BackendUnavailable,
            _ => FailureClass::Transient,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// Registry value is not a JSON document
    #[error("Failed to unmarshal registry value: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Registry value is JSON but not an object
    #[error("Registry value must be a JSON object")]
    NotAnObject,

    /// `tags` exists but is not an array
    #[error("{field} must be an array of strings")]
    InvalidTags { field: &'static str },

    /// `rewrite` attribute is present but unparsable
    #[error("Failed to unmarshal rewrite rule: {0}")]
    InvalidRewrite(#[source] serde_json::Error),

    /// A field the entity cannot exist without
    #[error("Missing required field {field}")]
    MissingField { field: &'static str },

    /// Key layout does not allow deriving the state node
    #[error("Key {key} does not begin with {prefix}")]
    UnexpectedKey { key: String, prefix: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// Template or JSON rendering failed
    #[error("Failed to render {target}: {reason}")]
    Render { target: PathBuf, reason: String },

    /// File-system operation failed
    #[error("Error occurred at path: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Command could not be started
    #[error("Failed to execute command \"{command}\"")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Pre-command rejected the candidate artifact
    #[error("Pre check command \"{command}\" failed with {status}")]
    Validation { command: String, status: ExitStatus },

    /// Post-command failed; the committed artifact stays authoritative
    #[error("Post command \"{command}\" failed with {status}")]
    ReloadSignal { command: String, status: ExitStatus },
}

impl CommitError {
    pub(crate) fn io(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        CommitError::Io {
            path: path.into(),
            source,
        }
    }
}

impl Error {
    /// True when the committed artifact is final despite the error.
    pub fn is_reload_signal(&self) -> bool {
        matches!(self, Error::Commit(CommitError::ReloadSignal { .. }))
    }
}
