//! Transport abstraction and the reqwest-backed implementation

use crate::http::error::TransportError;
use crate::http::request::RequestSpec;
use crate::http::response::Response;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Sends a finished request and returns the response
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: RequestSpec) -> Result<Response, TransportError>;
}

/// Transport over `reqwest`.
///
/// Timeouts and redirect policy are client-level settings in reqwest, so one
/// client is kept per combination. The read timeout bounds each wait for data
/// and resets after every successful read; it is not a deadline for the
/// whole exchange. Response bodies are fully buffered.
pub struct ReqwestTransport {
    user_agent: String,
    clients: RwLock<HashMap<ClientKey, reqwest::Client>>,
}

/// Connect timeout, read timeout, follow redirects
type ClientKey = (Duration, Duration, bool);

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::with_user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
    }

    pub fn with_user_agent<S: Into<String>>(user_agent: S) -> Self {
        Self {
            user_agent: user_agent.into(),
            clients: RwLock::new(HashMap::new()),
        }
    }

    fn client_for(&self, request: &RequestSpec) -> Result<reqwest::Client, TransportError> {
        let key = (
            request.connect_timeout(),
            request.read_timeout(),
            request.follow_redirects(),
        );
        let (connect_timeout, read_timeout, follow_redirects) = key;
        if let Some(client) = self
            .clients
            .read()
            .ok()
            .and_then(|clients| clients.get(&key).cloned())
        {
            return Ok(client);
        }

        let redirect = if follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .redirect(redirect)
            .user_agent(self.user_agent.clone())
            .build()?;

        if let Ok(mut clients) = self.clients.write() {
            return Ok(clients.entry(key).or_insert(client).clone());
        }
        Ok(client)
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, mut request: RequestSpec) -> Result<Response, TransportError> {
        let url = request.url()?;
        let client = self.client_for(&request)?;

        let mut builder = client.request(request.method().into(), url);
        for (name, values) in request.headers().iter() {
            for value in values {
                builder = builder.header(name, value);
            }
        }
        if let Some(body) = request.take_body() {
            builder = builder.body(body);
        }

        debug!(method = %request.method(), uri = request.uri(), "Sending request");
        let response = builder.send().await.map_err(classify)?;

        let status = response.status();
        let mut out = Response::new(status.as_u16());
        if let Some(reason) = status.canonical_reason() {
            out = out.with_reason(reason);
        }
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                out = out.with_header(name.as_str(), value);
            }
        }

        let body = response.bytes().await.map_err(classify)?;
        debug!(status = status.as_u16(), bytes = body.len(), "Received response");
        Ok(out.with_body(body.to_vec()))
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Client(error)
    }
}

/// Transport replaying canned responses and recording requests
#[cfg(test)]
pub struct MockTransport {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<Response, String>>>,
    requests: std::sync::Mutex<Vec<RequestSpec>>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new(responses: Vec<Response>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            responses: std::sync::Mutex::new(vec![Err(message.to_string())].into()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RequestSpec> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: RequestSpec) -> Result<Response, TransportError> {
        self.requests.lock().expect("requests lock").push(request);
        match self.responses.lock().expect("responses lock").pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::Connect(message)),
            None => Err(TransportError::Other("No more mock responses".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::method::HttpMethod;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_reqwest_transport_round_trip() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/items/7"))
            .and(query_param("q", "a b"))
            .and(header("x-trace", "abc"))
            .and(body_string("payload"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_string("created")
                    .insert_header("content-type", "text/plain"),
            )
            .mount(&mock_server)
            .await;

        let mut request =
            RequestSpec::new(HttpMethod::Put, format!("{}/items/7?q=a%20b", mock_server.uri()));
        request.header("X-Trace", "abc");
        request.set_body(b"payload".to_vec());

        let response = ReqwestTransport::new().send(request).await.expect("send");
        assert_eq!(response.status(), 201);
        assert_eq!(response.reason(), Some("Created"));
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.text().expect("text"), "created");
    }

    #[tokio::test]
    async fn test_redirects_can_be_disabled() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new();
        let url = format!("{}/old", mock_server.uri());

        let followed = transport
            .send(RequestSpec::new(HttpMethod::Get, url.clone()))
            .await
            .expect("send");
        assert_eq!(followed.status(), 200);

        let stopped = transport
            .send(RequestSpec::new(HttpMethod::Get, url).with_follow_redirects(false))
            .await
            .expect("send");
        assert_eq!(stopped.status(), 302);
    }

    #[tokio::test]
    async fn test_relative_uri_is_rejected_before_io() {
        let result = ReqwestTransport::new()
            .send(RequestSpec::new(HttpMethod::Get, "/relative"))
            .await;
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_read_timeout_is_enforced() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let request = RequestSpec::new(HttpMethod::Get, mock_server.uri())
            .with_timeouts(Duration::from_secs(1), Duration::from_millis(50));
        let result = ReqwestTransport::new().send(request).await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_clients_are_cached_per_timeout_and_redirect_policy() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new();
        let request = |read: u64, follow: bool| {
            RequestSpec::new(HttpMethod::Get, mock_server.uri())
                .with_timeouts(Duration::from_secs(1), Duration::from_secs(read))
                .with_follow_redirects(follow)
        };
        for spec in [
            request(5, true),
            request(5, true),
            request(9, true),
            request(5, false),
        ] {
            let response = transport.send(spec).await.expect("send");
            assert_eq!(response.status(), 204);
        }

        let clients = transport.clients.read().expect("clients lock");
        assert_eq!(clients.len(), 3);
        assert!(clients.contains_key(&(Duration::from_secs(1), Duration::from_secs(9), true)));
    }
}
