//! Error types for the MediLog core.

use thiserror::Error;

/// Errors raised by a [`RemoteGateway`](crate::gateway::RemoteGateway).
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Service '{service}' rejected the request: {reason}")]
    Rejected { service: String, reason: String },

    #[error("Service '{0}' returned no response")]
    MissingResponse(String),

    #[error("Failed to decode service payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// Create a rejection for the given service.
    pub fn rejected(service: impl Into<String>, reason: impl Into<String>) -> Self {
        GatewayError::Rejected {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Whether the backend refused the request (as opposed to a transport failure).
    pub fn is_rejection(&self) -> bool {
        matches!(self, GatewayError::Rejected { .. })
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Main error type for MediLog operations.
#[derive(Error, Debug)]
pub enum MedilogError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Invalid timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MedilogError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        MedilogError::Config(message.into())
    }

    /// The gateway error behind this failure, if any.
    pub fn gateway(&self) -> Option<&GatewayError> {
        match self {
            MedilogError::Gateway(e) => Some(e),
            _ => None,
        }
    }
}

pub type MedilogResult<T> = Result<T, MedilogError>;
