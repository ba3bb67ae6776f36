use speedyflow_cloud::CloudError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "{what} must be specified either using the environment variable {env} or the CLI option {flag}"
    )]
    Missing {
        what: &'static str,
        env: &'static str,
        flag: &'static str,
    },

    #[error("Invalid value '{value}' for {flag}: {reason}")]
    Invalid {
        flag: &'static str,
        value: String,
        reason: String,
    },

    #[error("Data directory not found; set {0} or pass --storage-path")]
    DataDirNotFound(&'static str),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfigError> for CloudError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Read { path, source } => CloudError::LocalIo { path, source },
            other => CloudError::Configuration(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
