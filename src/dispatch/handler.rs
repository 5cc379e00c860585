//! Per-method call handlers
//!
//! An [`HttpMethodHandler`] runs one call of a request-annotated method:
//!
//! 1. check the argument count and bind arguments to template variables;
//! 2. expand the URI and header templates and build the [`RequestSpec`];
//! 3. run the interceptors in registration order;
//! 4. encode the body argument, if the method has one;
//! 5. send through the transport, inline or on the configured executor;
//! 6. return the raw response or decode it into the method's return type.
//!
//! Failures from any step except configuration errors pass through the
//! client's [`ExceptionHandler`].

use crate::config::ClientOptions;
use crate::contract::{DefaultMethod, MethodDefinition, MethodKey};
use crate::dispatch::error::DispatchError;
use crate::dispatch::exception::ExceptionHandler;
use crate::dispatch::reply::{Executor, PendingReply, Reply};
use crate::error::{Error, Result};
use crate::http::{Decoder, Encoder, RequestInterceptor, RequestSpec, Transport};
use crate::template::{ExpanderRegistry, Variable, Variables, is_absolute_uri};
use crate::types::universe::RESPONSE;
use crate::value::Value;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn invoke(&self, arguments: Vec<Value>) -> Result<Reply>;
}

/// Collaborators shared by every handler of one client
pub(crate) struct DispatchContext {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) encoder: Arc<dyn Encoder>,
    pub(crate) decoder: Arc<dyn Decoder>,
    pub(crate) interceptors: Vec<Arc<dyn RequestInterceptor>>,
    pub(crate) exception_handler: Arc<dyn ExceptionHandler>,
    pub(crate) executor: Executor,
    pub(crate) registry: Arc<ExpanderRegistry>,
    pub(crate) options: ClientOptions,
}

impl DispatchContext {
    /// Append relative URIs to the base URL's path, when one is configured.
    /// Query strings of both are kept; the URI's fragment wins.
    fn resolve_uri(&self, uri: String) -> String {
        let Some(base) = &self.options.base_url else {
            return uri;
        };
        if is_absolute_uri(&uri) {
            return uri;
        }

        let (rest, fragment) = match uri.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (uri.as_str(), None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        let mut resolved = base.clone();
        let prefix = base.path().trim_end_matches('/');
        if path.is_empty() || path.starts_with('/') {
            resolved.set_path(&format!("{prefix}{path}"));
        } else {
            resolved.set_path(&format!("{prefix}/{path}"));
        }

        let queries: Vec<&str> = [base.query(), query]
            .into_iter()
            .flatten()
            .filter(|query| !query.is_empty())
            .collect();
        if queries.is_empty() {
            resolved.set_query(None);
        } else {
            resolved.set_query(Some(&queries.join("&")));
        }
        if fragment.is_some() {
            resolved.set_fragment(fragment);
        }
        resolved.into()
    }

    fn handle_error(&self, key: &MethodKey, error: Error) -> Result<Reply> {
        if error.is_configuration() {
            return Err(error);
        }
        self.exception_handler.handle(error)?;
        debug!(method = %key, "Exception handler suppressed the failure");
        Ok(Reply::Value(Value::Null))
    }
}

/// Handler for a request-annotated method
pub struct HttpMethodHandler {
    definition: Arc<MethodDefinition>,
    context: Arc<DispatchContext>,
}

impl HttpMethodHandler {
    pub(crate) fn new(definition: MethodDefinition, context: Arc<DispatchContext>) -> Self {
        Self {
            definition: Arc::new(definition),
            context,
        }
    }

    pub fn definition(&self) -> &MethodDefinition {
        &self.definition
    }

    fn prepare(&self, arguments: &[Value]) -> Result<RequestSpec> {
        let definition = &self.definition;
        if arguments.len() != definition.parameter_count() {
            return Err(DispatchError::ArgumentCount {
                method: definition.key().to_string(),
                expected: definition.parameter_count(),
                actual: arguments.len(),
            }
            .into());
        }

        let mut variables = Variables::new();
        for (index, binding) in definition.parameter_bindings() {
            variables.insert_variable(
                binding.name(),
                Variable {
                    value: arguments[*index].clone(),
                    expander: binding.expander().cloned(),
                    encoded: binding.encoded(),
                },
            );
        }

        let registry = &self.context.registry;
        let uri = definition.uri_template().expand(&variables, registry)?;
        let mut request = RequestSpec::new(definition.http_method(), self.context.resolve_uri(uri))
            .with_timeouts(definition.connect_timeout(), definition.read_timeout())
            .with_follow_redirects(definition.follow_redirects());

        for (name, templates) in definition.headers().iter() {
            for template in templates {
                let value = template.expand_verbatim(&variables, registry)?;
                if !value.is_empty() {
                    request.header(name, value);
                }
            }
        }
        for (name, value) in &self.context.options.default_headers {
            if !request.headers().contains(name) {
                request.header(name.as_str(), value.as_str());
            }
        }

        for interceptor in &self.context.interceptors {
            interceptor.accept(&mut request)?;
        }

        if let Some(index) = definition.body_index() {
            self.context.encoder.encode(&arguments[index], &mut request)?;
        }
        Ok(request)
    }
}

#[async_trait]
impl MethodHandler for HttpMethodHandler {
    async fn invoke(&self, arguments: Vec<Value>) -> Result<Reply> {
        let request = match self.prepare(&arguments) {
            Ok(request) => request,
            Err(error) => return self.context.handle_error(self.definition.key(), error),
        };

        let context = self.context.clone();
        let definition = self.definition.clone();
        match &self.context.executor {
            Executor::Inline => complete(context, definition, request).await,
            Executor::Spawn(handle) => {
                let deferred = definition.return_type().is_container();
                let pending =
                    PendingReply::new(handle.spawn(complete(context, definition, request)));
                if deferred {
                    Ok(Reply::Pending(pending))
                } else {
                    pending.await
                }
            }
        }
    }
}

/// Send, decode and apply the exception policy
async fn complete(
    context: Arc<DispatchContext>,
    definition: Arc<MethodDefinition>,
    request: RequestSpec,
) -> Result<Reply> {
    match send_and_decode(&context, &definition, request).await {
        Ok(reply) => Ok(reply),
        Err(error) => context.handle_error(definition.key(), error),
    }
}

async fn send_and_decode(
    context: &DispatchContext,
    definition: &MethodDefinition,
    request: RequestSpec,
) -> Result<Reply> {
    let method = request.method();
    let uri = request.uri().to_string();
    debug!(key = %definition.key(), method = %method, uri = %uri, "Dispatching request");

    let response = context
        .transport
        .send(request)
        .await
        .map_err(|source| Error::transport(method, uri.as_str(), source))?;
    debug!(key = %definition.key(), status = response.status(), "Received response");

    let return_type = definition.return_type();
    let target = match return_type.contained() {
        Some(contained) => contained,
        None => return_type,
    };
    if target.erasure().is(RESPONSE) {
        return Ok(Reply::Response(response));
    }

    match context.decoder.decode(response, target) {
        Ok(value) => Ok(Reply::Value(value)),
        Err(error) if context.options.suppress_decode_errors => {
            warn!(key = %definition.key(), error = %error, "Suppressed decode failure");
            Ok(Reply::Value(Value::Null))
        }
        Err(error) => Err(error.into()),
    }
}

/// Handler running a method's default implementation locally
pub struct GuardMethodHandler {
    key: MethodKey,
    default: DefaultMethod,
}

impl GuardMethodHandler {
    pub fn new(key: MethodKey, default: DefaultMethod) -> Self {
        Self { key, default }
    }
}

#[async_trait]
impl MethodHandler for GuardMethodHandler {
    async fn invoke(&self, arguments: Vec<Value>) -> Result<Reply> {
        debug!(method = %self.key, "Running default implementation");
        self.default
            .call(&arguments)
            .map(Reply::Value)
            .map_err(|message| {
                DispatchError::DefaultMethod {
                    method: self.key.to_string(),
                    message,
                }
                .into()
            })
    }
}
