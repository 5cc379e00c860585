//! Collaborator error types

use thiserror::Error;

/// Errors raised by a [`Transport`](crate::http::Transport)
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be turned into a wire request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Connect or read deadline exceeded
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Any other HTTP client failure
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Transport-specific failure
    #[error("Transport error: {0}")]
    Other(String),
}

/// Errors raised by an [`Encoder`](crate::http::Encoder)
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Cannot encode {kind} as a request body with {encoder}")]
    Unsupported { encoder: &'static str, kind: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised by a [`Decoder`](crate::http::Decoder)
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Cannot decode a response into {target} with {decoder}")]
    Unsupported {
        decoder: &'static str,
        target: String,
    },

    #[error("Invalid response body: {0}")]
    Body(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raised by a request interceptor to abort the call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Interceptor '{interceptor}' rejected the request: {message}")]
pub struct InterceptorError {
    pub interceptor: String,
    pub message: String,
}

impl InterceptorError {
    pub fn new<I: Into<String>, M: Into<String>>(interceptor: I, message: M) -> Self {
        Self {
            interceptor: interceptor.into(),
            message: message.into(),
        }
    }
}
