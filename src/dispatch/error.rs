//! Dispatch failures

use thiserror::Error;

/// Errors raised while routing or completing a call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The method has neither a request definition nor a default
    /// implementation
    #[error("Unsupported operation: {method}")]
    Unsupported { method: String },

    #[error("{method} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("No contract method named '{0}'")]
    UnknownMethod(String),

    #[error("Method name '{name}' is ambiguous: {candidates:?}")]
    AmbiguousMethod {
        name: String,
        candidates: Vec<String>,
    },

    /// The worker running the call failed or was cancelled
    #[error("Worker failed: {0}")]
    Worker(String),

    /// A default implementation reported an error
    #[error("Default method {method} failed: {message}")]
    DefaultMethod { method: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let error = DispatchError::ArgumentCount {
            method: "Api#get(String)".to_string(),
            expected: 1,
            actual: 0,
        };
        assert_eq!(
            error.to_string(),
            "Api#get(String) expects 1 argument(s), got 0"
        );
        assert_eq!(
            DispatchError::Unsupported {
                method: "Api#close()".to_string()
            }
            .to_string(),
            "Unsupported operation: Api#close()"
        );
    }
}
