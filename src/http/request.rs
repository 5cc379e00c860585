//! Mutable outgoing request handed to interceptors, encoders and the
//! transport

use crate::http::error::TransportError;
use crate::http::headers::Headers;
use crate::http::method::HttpMethod;
use crate::template::encoding::{Encoding, encode};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(60_000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    method: HttpMethod,
    uri: String,
    headers: Headers,
    body: Option<Vec<u8>>,
    connect_timeout: Duration,
    read_timeout: Duration,
    follow_redirects: bool,
}

impl RequestSpec {
    pub fn new<U: Into<String>>(method: HttpMethod, uri: U) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Headers::new(),
            body: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            follow_redirects: true,
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn set_uri<U: Into<String>>(&mut self, uri: U) {
        self.uri = uri.into();
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn header<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) -> &mut Self {
        self.headers.add(name, value);
        self
    }

    /// Append an encoded query parameter to the URI, before any fragment
    pub fn query<N: AsRef<str>, V: AsRef<str>>(&mut self, name: N, value: V) -> &mut Self {
        let pair = format!(
            "{}={}",
            encode(name.as_ref(), Encoding::Unreserved),
            encode(value.as_ref(), Encoding::Unreserved)
        );
        let (base, fragment) = match self.uri.split_once('#') {
            Some((base, fragment)) => (base.to_string(), Some(fragment.to_string())),
            None => (self.uri.clone(), None),
        };
        let separator = if !base.contains('?') {
            "?"
        } else if base.ends_with('?') || base.ends_with('&') {
            ""
        } else {
            "&"
        };
        self.uri = match fragment {
            Some(fragment) => format!("{base}{separator}{pair}#{fragment}"),
            None => format!("{base}{separator}{pair}"),
        };
        self
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = Some(body);
    }

    pub fn take_body(&mut self) -> Option<Vec<u8>> {
        self.body.take()
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// The URI as an absolute URL
    pub fn url(&self) -> Result<Url, TransportError> {
        Url::parse(&self.uri).map_err(|e| {
            TransportError::InvalidRequest(format!("'{}' is not an absolute URL: {}", self.uri, e))
        })
    }
}
