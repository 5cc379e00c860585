//! Exception handling policies

use crate::error::{Error, Result};
use tracing::warn;

/// Sees every call failure except configuration errors. Returning `Ok`
/// suppresses the error and the call yields `Value::Null`.
pub trait ExceptionHandler: Send + Sync {
    fn handle(&self, error: Error) -> Result<()>;
}

/// Returns every error to the caller
#[derive(Debug, Default, Clone, Copy)]
pub struct RethrowExceptionHandler;

impl ExceptionHandler for RethrowExceptionHandler {
    fn handle(&self, error: Error) -> Result<()> {
        Err(error)
    }
}

/// Logs and swallows every error
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExceptionHandler;

impl ExceptionHandler for NoopExceptionHandler {
    fn handle(&self, error: Error) -> Result<()> {
        warn!(error = %error, "Suppressed call failure");
        Ok(())
    }
}

impl<F> ExceptionHandler for F
where
    F: Fn(Error) -> Result<()> + Send + Sync,
{
    fn handle(&self, error: Error) -> Result<()> {
        self(error)
    }
}
