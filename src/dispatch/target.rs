//! The generated client

use crate::config::ClientOptions;
use crate::contract::{ContractType, DefaultMethod, MethodDefinition, MethodKey};
use crate::dispatch::error::DispatchError;
use crate::dispatch::exception::{ExceptionHandler, RethrowExceptionHandler};
use crate::dispatch::handler::{
    DispatchContext, GuardMethodHandler, HttpMethodHandler, MethodHandler,
};
use crate::dispatch::reply::{Executor, Reply};
use crate::error::{Error, Result};
use crate::http::{
    Decoder, Encoder, ReqwestTransport, RequestInterceptor, StringDecoder, StringEncoder,
    Transport,
};
use crate::template::ExpanderRegistry;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// A client for one contract.
///
/// Request-annotated methods are bound to handlers when the client is built.
/// Methods with a default implementation get a handler on first call. Any
/// other method fails with [`DispatchError::Unsupported`].
///
/// Equality, hashing and formatting use the client's identity: the contract
/// name and base URL.
pub struct DispatchTarget {
    contract: String,
    methods: Vec<(MethodKey, Option<DefaultMethod>)>,
    handlers: RwLock<HashMap<MethodKey, Arc<dyn MethodHandler>>>,
    context: Arc<DispatchContext>,
}

impl DispatchTarget {
    pub fn builder(contract: &ContractType, definitions: &[MethodDefinition]) -> TargetBuilder {
        TargetBuilder::new(contract, definitions)
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    pub fn base_url(&self) -> Option<&url::Url> {
        self.context.options.base_url.as_ref()
    }

    /// Keys of every contract method, in declaration order
    pub fn methods(&self) -> impl Iterator<Item = &MethodKey> {
        self.methods.iter().map(|(key, _)| key)
    }

    /// Number of bound handlers, including lazily created ones
    pub fn bound_handlers(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }

    pub async fn invoke(&self, key: &MethodKey, arguments: Vec<Value>) -> Result<Reply> {
        let handler = self.handler_for(key)?;
        debug!(client = %self, method = %key, arguments = arguments.len(), "Invoking");
        handler.invoke(arguments).await
    }

    /// Invoke the only contract method called `name`
    pub async fn invoke_named(&self, name: &str, arguments: Vec<Value>) -> Result<Reply> {
        let key = self.key_named(name)?.clone();
        self.invoke(&key, arguments).await
    }

    fn key_named(&self, name: &str) -> Result<&MethodKey> {
        let mut candidates = self.methods().filter(|key| key.name() == name);
        let Some(first) = candidates.next() else {
            return Err(DispatchError::UnknownMethod(name.to_string()).into());
        };
        let rest: Vec<&MethodKey> = candidates.collect();
        if !rest.is_empty() {
            let candidates = std::iter::once(first)
                .chain(rest)
                .map(MethodKey::to_string)
                .collect();
            return Err(DispatchError::AmbiguousMethod {
                name: name.to_string(),
                candidates,
            }
            .into());
        }
        Ok(first)
    }

    fn handler_for(&self, key: &MethodKey) -> Result<Arc<dyn MethodHandler>> {
        if let Some(handler) = self
            .handlers
            .read()
            .ok()
            .and_then(|handlers| handlers.get(key).cloned())
        {
            return Ok(handler);
        }

        let default = self
            .methods
            .iter()
            .find(|(candidate, _)| candidate == key)
            .and_then(|(_, default)| default.clone())
            .ok_or_else(|| DispatchError::Unsupported {
                method: key.to_string(),
            })?;

        let guard: Arc<dyn MethodHandler> = Arc::new(GuardMethodHandler::new(key.clone(), default));
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| DispatchError::Worker("handler table lock poisoned".to_string()))?;
        debug!(method = %key, "Binding default implementation");
        Ok(handlers.entry(key.clone()).or_insert(guard).clone())
    }
}

impl PartialEq for DispatchTarget {
    fn eq(&self, other: &Self) -> bool {
        self.contract == other.contract && self.base_url() == other.base_url()
    }
}

impl Eq for DispatchTarget {}

impl Hash for DispatchTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.contract.hash(state);
        self.base_url().map(url::Url::as_str).hash(state);
    }
}

impl fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base_url() {
            Some(url) => write!(f, "{}({})", self.contract, url),
            None => write!(f, "{}", self.contract),
        }
    }
}

impl fmt::Debug for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTarget")
            .field("contract", &self.contract)
            .field("base_url", &self.base_url().map(url::Url::as_str))
            .finish()
    }
}

/// Builder for [`DispatchTarget`]
pub struct TargetBuilder {
    contract: ContractType,
    definitions: Vec<MethodDefinition>,
    transport: Option<Arc<dyn Transport>>,
    encoder: Arc<dyn Encoder>,
    decoder: Arc<dyn Decoder>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    exception_handler: Arc<dyn ExceptionHandler>,
    executor: Executor,
    registry: Option<Arc<ExpanderRegistry>>,
    options: ClientOptions,
}

impl TargetBuilder {
    pub fn new(contract: &ContractType, definitions: &[MethodDefinition]) -> Self {
        Self {
            contract: contract.clone(),
            definitions: definitions.to_vec(),
            transport: None,
            encoder: Arc::new(StringEncoder),
            decoder: Arc::new(StringDecoder),
            interceptors: Vec::new(),
            exception_handler: Arc::new(RethrowExceptionHandler),
            executor: Executor::Inline,
            registry: None,
            options: ClientOptions::default(),
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Append an interceptor; interceptors run in the order they are added
    pub fn interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handler = handler;
        self
    }

    pub fn executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    /// Share an expander registry between clients
    pub fn registry(mut self, registry: Arc<ExpanderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_url(mut self, base_url: &str) -> Result<Self> {
        self.options = self.options.with_base_url(base_url)?;
        Ok(self)
    }

    pub fn build(self) -> Result<DispatchTarget> {
        self.options.validate()?;

        let methods: Vec<(MethodKey, Option<DefaultMethod>)> = self
            .contract
            .methods
            .iter()
            .map(|method| (method.key(&self.contract.name), method.default.clone()))
            .collect();

        for definition in &self.definitions {
            if !methods.iter().any(|(key, _)| key == definition.key()) {
                return Err(Error::config(format!(
                    "{} is not a method of contract '{}'",
                    definition.key(),
                    self.contract.name
                )));
            }
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(match &self.options.user_agent {
                Some(agent) => ReqwestTransport::with_user_agent(agent.as_str()),
                None => ReqwestTransport::new(),
            }),
        };

        let context = Arc::new(DispatchContext {
            transport,
            encoder: self.encoder,
            decoder: self.decoder,
            interceptors: self.interceptors,
            exception_handler: self.exception_handler,
            executor: self.executor,
            registry: self.registry.unwrap_or_default(),
            options: self.options,
        });

        let handlers: HashMap<MethodKey, Arc<dyn MethodHandler>> = self
            .definitions
            .into_iter()
            .map(|definition| {
                let key = definition.key().clone();
                let handler: Arc<dyn MethodHandler> =
                    Arc::new(HttpMethodHandler::new(definition, context.clone()));
                (key, handler)
            })
            .collect();

        debug!(
            contract = %self.contract.name,
            handlers = handlers.len(),
            methods = methods.len(),
            "Built client"
        );

        Ok(DispatchTarget {
            contract: self.contract.name,
            methods,
            handlers: RwLock::new(handlers),
            context,
        })
    }
}
