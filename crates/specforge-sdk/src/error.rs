use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the client itself. Pipeline failures are reported in the
/// response envelope instead.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Node returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Run {0} not found")]
    RunNotFound(Uuid),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Serialization(err.to_string())
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Connection(err.to_string())
    }
}
