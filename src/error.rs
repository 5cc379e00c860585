//! Error handling for the courier client library.
//!
//! This module defines the main error type `Error` used throughout the crate,
//! along with a convenient `Result` type alias. Configuration errors are only
//! raised while processing contracts or building a client; every other
//! variant is raised by a call and is routed through the client's
//! [`ExceptionHandler`](crate::dispatch::ExceptionHandler).
//!
//! # Examples
//!
//! ```
//! use courier::error::{Error, Result};
//!
//! fn validate(timeout_ms: u64) -> Result<()> {
//!     if timeout_ms == 0 {
//!         return Err(Error::config("timeout must be greater than zero"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate(0).unwrap_err().is_configuration());
//! ```

use crate::dispatch::DispatchError;
use crate::http::{DecodeError, EncodeError, HttpMethod, InterceptorError, TransportError};
use crate::template::{ExpansionError, TemplateError};
use thiserror::Error;

/// Result type for courier operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for courier operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid contract or client configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A URI or header template could not be expanded
    #[error("Template expansion error: {0}")]
    TemplateExpansion(#[from] ExpansionError),

    /// The body argument could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The response could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The transport failed to execute the request
    #[error("{method} {uri} failed: {source}")]
    Transport {
        method: HttpMethod,
        uri: String,
        #[source]
        source: TransportError,
    },

    /// An interceptor aborted the call
    #[error(transparent)]
    Interceptor(#[from] InterceptorError),

    /// The call could not be routed or completed
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a transport error carrying the request it belongs to
    pub fn transport<U: Into<String>>(method: HttpMethod, uri: U, source: TransportError) -> Self {
        Self::Transport {
            method,
            uri: uri.into(),
            source,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<TemplateError> for Error {
    fn from(error: TemplateError) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Configuration(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Configuration(s)
    }
}
