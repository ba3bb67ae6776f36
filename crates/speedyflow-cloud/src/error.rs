//! Lifecycle error taxonomy

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by every lifecycle operation
#[derive(Error, Debug)]
pub enum CloudError {
    /// A mandatory option is missing or out of range. Raised before any remote call.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Local key storage error at {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any Cloud API Gateway failure (transport, HTTP status, business error)
    #[error("API error: {0}")]
    RemoteApi(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The provider reported `ERROR` for the instance. Never retried.
    #[error("Instance {instance_id} is in {status} state")]
    TerminalProvider { instance_id: String, status: String },

    /// The attempt budget ran out while the operation was still pending.
    #[error("Timeout: {operation} did not complete after {attempts} attempts")]
    Timeout { operation: String, attempts: u32 },

    #[error("No IP address found for instance {instance_id} after {attempts} attempts")]
    NoAddressFound { instance_id: String, attempts: u32 },

    #[error("Machine {name} is not running (state: {state})")]
    NotRunning { name: String, state: String },

    #[error("Machine record error: {0}")]
    Record(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// "still pending" as opposed to "provider rejected it"
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::NoAddressFound { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TerminalProvider { .. })
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
