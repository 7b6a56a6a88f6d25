use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single call to the chat platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl TransportError {
    /// Only server-side failures are worth retrying
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Status { status, .. } if status.is_server_error())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a quiz is already running in channel {0}")]
    AlreadyActive(String),
}

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("unknown quiz '{0}'")]
    Unknown(String),
    #[error("could not read quiz file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse quiz file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not write settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons a gateway connection ends
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed gateway payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("gateway protocol error: {0}")]
    Protocol(String),
}
