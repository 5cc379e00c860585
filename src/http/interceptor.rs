//! Request interceptors
//!
//! Interceptors run in registration order after the request is built and
//! before the body is encoded. Returning an error aborts the call before any
//! network I/O.

use crate::http::error::InterceptorError;
use crate::http::request::RequestSpec;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use zeroize::Zeroizing;

pub trait RequestInterceptor: Send + Sync {
    fn accept(&self, request: &mut RequestSpec) -> Result<(), InterceptorError>;
}

impl<F> RequestInterceptor for F
where
    F: Fn(&mut RequestSpec) -> Result<(), InterceptorError> + Send + Sync,
{
    fn accept(&self, request: &mut RequestSpec) -> Result<(), InterceptorError> {
        self(request)
    }
}

fn has_control_characters(value: &str) -> bool {
    value.chars().any(|c| c.is_control() && c != '\t')
}

/// Adds an `Authorization: Basic ..` header. The encoded credentials are
/// wiped from memory on drop.
pub struct BasicAuthInterceptor {
    authorization: Zeroizing<String>,
}

impl BasicAuthInterceptor {
    pub fn new(username: &str, password: &str) -> Result<Self, InterceptorError> {
        if username.contains(':') {
            return Err(InterceptorError::new(
                "basic-auth",
                "username must not contain ':'",
            ));
        }
        let credentials = Zeroizing::new(format!("{username}:{password}"));
        Ok(Self {
            authorization: Zeroizing::new(format!(
                "Basic {}",
                STANDARD.encode(credentials.as_bytes())
            )),
        })
    }
}

impl std::fmt::Debug for BasicAuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthInterceptor")
            .field("authorization", &"[REDACTED]")
            .finish()
    }
}

impl RequestInterceptor for BasicAuthInterceptor {
    fn accept(&self, request: &mut RequestSpec) -> Result<(), InterceptorError> {
        request
            .headers_mut()
            .set("Authorization", self.authorization.as_str());
        Ok(())
    }
}

/// Adds a fixed header value to every request
#[derive(Debug, Clone)]
pub struct HeaderInterceptor {
    name: String,
    value: String,
}

impl HeaderInterceptor {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl RequestInterceptor for HeaderInterceptor {
    fn accept(&self, request: &mut RequestSpec) -> Result<(), InterceptorError> {
        if self.name.is_empty() || has_control_characters(&self.name) {
            return Err(InterceptorError::new("header", "invalid header name"));
        }
        if has_control_characters(&self.value) {
            return Err(InterceptorError::new(
                "header",
                format!("value for '{}' contains control characters", self.name),
            ));
        }
        request.headers_mut().add(self.name.as_str(), self.value.as_str());
        Ok(())
    }
}
