//! SpeedyCloud provider error types

use speedyflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeedyCloudError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SpeedyCloud returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// 2xx response whose payload carries an `error` member
    #[error("SpeedyCloud API error: {0}")]
    Api(String),

    #[error("Failed to decode {record}: {message}")]
    Decode {
        record: &'static str,
        message: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Key pair not found: {0}")]
    KeyPairNotFound(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SpeedyCloudError {
    pub(crate) fn decode(record: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            record,
            message: message.into(),
        }
    }
}

impl From<SpeedyCloudError> for CloudError {
    fn from(err: SpeedyCloudError) -> Self {
        match err {
            SpeedyCloudError::KeyPairNotFound(name) => CloudError::NotFound(format!("key pair '{}'", name)),
            other => CloudError::RemoteApi(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpeedyCloudError>;
