//! Error types for the gateway layer

use classroom_chats::ChatError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Timed out after {seconds}s connecting to {url}")]
    ConnectTimeout { url: String, seconds: u64 },

    #[error("{procedure} failed with {code}: {message}")]
    Procedure {
        procedure: String,
        code: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Unexpected response from {procedure}: HTTP {status}")]
    UnexpectedResponse { procedure: String, status: u16 },
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<GatewayError> for ChatError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Http(error) if error.is_decode() => ChatError::decode(error.to_string()),
            GatewayError::Http(error) => ChatError::transport(error.to_string()),
            GatewayError::WebSocket(error) => ChatError::transport(error.to_string()),
            GatewayError::Payload(error) => ChatError::decode(error.to_string()),
            GatewayError::InvalidEndpoint(message) => ChatError::transport(message),
            error @ GatewayError::ConnectTimeout { .. } => ChatError::transport(error.to_string()),
            GatewayError::Procedure { code, .. } if code == "UNAUTHORIZED" => {
                ChatError::Unauthenticated
            }
            GatewayError::Procedure {
                code,
                status,
                message,
                ..
            } => ChatError::rpc(code, status, message),
            GatewayError::UnexpectedResponse { procedure, status } => ChatError::rpc(
                "HTTP_ERROR",
                Some(status),
                format!("unexpected response from {procedure}"),
            ),
        }
    }
}
