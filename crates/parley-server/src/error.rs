//! Error types for the parley server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use parley::CoreError;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid or missing configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A `generate`, history, or reset call failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error (config file, listener socket, signal registration).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// MCP connection or shutdown failure.
    #[error("MCP error: {0:#}")]
    Mcp(anyhow::Error),
}

/// Result type alias using `ServerError`.
pub type Result<T> = std::result::Result<T, ServerError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ServerError {
    /// HTTP status reported to clients.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Core(CoreError::Gateway(_)) => StatusCode::BAD_GATEWAY,
            Self::Core(CoreError::Store(_) | CoreError::Message(_))
            | Self::Config(_)
            | Self::Io(_)
            | Self::Toml(_)
            | Self::Mcp(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = status.as_u16(), "Request failed: {self}");
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
