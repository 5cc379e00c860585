//! Client options
//!
//! Options can be built in code or loaded from TOML:
//!
//! ```toml
//! base_url = "https://api.github.com"
//! user_agent = "my-app/1.0"
//! suppress_decode_errors = false
//!
//! [default_headers]
//! Accept = "application/json"
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptions {
    /// Resolves relative request URIs
    pub base_url: Option<Url>,
    /// User agent for the default transport
    pub user_agent: Option<String>,
    /// Added to every request unless the method sets the same header
    pub default_headers: BTreeMap<String, String>,
    /// Turn decode failures into `Value::Null` instead of errors
    pub suppress_decode_errors: bool,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: ClientOptions = toml::from_str(content)
            .map_err(|e| Error::config(format!("Invalid client options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid base URL '{base_url}': {e}")))?;
        self.base_url = Some(url);
        self.validate()?;
        Ok(self)
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_default_header<N: Into<String>, V: Into<String>>(
        mut self,
        name: N,
        value: V,
    ) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_suppress_decode_errors(mut self, suppress: bool) -> Self {
        self.suppress_decode_errors = suppress;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.base_url {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::config(format!(
                    "Base URL must use http or https, got '{}'",
                    url.scheme()
                )));
            }
            if url.cannot_be_a_base() {
                return Err(Error::config(format!("'{url}' cannot be a base URL")));
            }
        }
        if self
            .user_agent
            .as_deref()
            .is_some_and(|agent| agent.trim().is_empty())
        {
            return Err(Error::config("User agent cannot be empty"));
        }
        for (name, value) in &self.default_headers {
            if name.trim().is_empty() {
                return Err(Error::config("Default header name cannot be empty"));
            }
            if value.chars().any(|c| c == '\r' || c == '\n') {
                return Err(Error::config(format!(
                    "Default header '{name}' contains a line break"
                )));
            }
        }
        Ok(())
    }
}
