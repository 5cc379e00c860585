//! Transport responses

use crate::http::error::DecodeError;
use crate::http::headers::Headers;

/// A response with a fully buffered body. The body can be taken or closed
/// once; later reads see no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    reason: Option<String>,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: None,
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn with_body<B: Into<Vec<u8>>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.first("content-type")
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn take_body(&mut self) -> Option<Vec<u8>> {
        self.body.take()
    }

    /// Read the body as UTF-8; a missing body reads as an empty string
    pub fn text(&self) -> Result<String, DecodeError> {
        match &self.body {
            Some(bytes) => String::from_utf8(bytes.clone())
                .map_err(|e| DecodeError::Body(format!("body is not valid UTF-8: {e}"))),
            None => Ok(String::new()),
        }
    }

    /// Release the body
    pub fn close(&mut self) {
        self.body = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_access() {
        let mut response = Response::new(200)
            .with_header("Content-Type", "text/plain")
            .with_body("hello");
        assert!(response.is_success());
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.text().expect("utf8"), "hello");

        response.close();
        assert!(response.body().is_none());
        assert_eq!(response.text().expect("empty"), "");
        response.close();
    }

    #[test]
    fn test_invalid_utf8() {
        let response = Response::new(200).with_body(vec![0xff, 0xfe]);
        assert!(matches!(response.text(), Err(DecodeError::Body(_))));
    }
}
