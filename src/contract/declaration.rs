//! Contract metadata: the declared shape of a client interface
//!
//! A [`ContractType`] lists its methods in declaration order. Each
//! [`MethodDecl`] carries its annotations, parameter declarations and
//! declared return type, and optionally a default implementation that is run
//! locally instead of issuing a request.

use crate::contract::key::MethodKey;
use crate::http::HttpMethod;
use crate::template::ExpressionExpander;
use crate::types::DeclaredType;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Request metadata, on a contract type or a method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestAnnotation {
    pub value: Option<String>,
    /// Takes precedence over `value`
    pub uri: Option<String>,
    pub method: Option<HttpMethod>,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub follow_redirects: Option<bool>,
}

impl RequestAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a request with a template and method
    pub fn to<S: Into<String>>(method: HttpMethod, template: S) -> Self {
        Self::new().value(template).method(method)
    }

    pub fn value<S: Into<String>>(mut self, template: S) -> Self {
        self.value = Some(template.into());
        self
    }

    pub fn uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = Some(connect);
        self.read_timeout = Some(read);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    /// The effective template: `uri` when set, else `value`
    pub fn template(&self) -> Option<&str> {
        self.uri.as_deref().or(self.value.as_deref())
    }
}

/// Type- and method-level annotations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Request(RequestAnnotation),
    /// Header lines of the form `Name: value`; values may hold template
    /// expressions
    Headers(Vec<String>),
}

impl Annotation {
    pub fn headers<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Annotation::Headers(lines.into_iter().map(Into::into).collect())
    }
}

impl From<RequestAnnotation> for Annotation {
    fn from(request: RequestAnnotation) -> Self {
        Annotation::Request(request)
    }
}

/// Parameter annotations
#[derive(Clone)]
pub enum ParameterAnnotation {
    /// Binds the argument to a template variable
    Param {
        name: String,
        expander: Option<Arc<dyn ExpressionExpander>>,
        encoded: bool,
    },
    /// Marks the argument as the request body
    Body,
}

impl fmt::Debug for ParameterAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterAnnotation::Param {
                name,
                expander,
                encoded,
            } => f
                .debug_struct("Param")
                .field("name", name)
                .field("custom_expander", &expander.is_some())
                .field("encoded", encoded)
                .finish(),
            ParameterAnnotation::Body => write!(f, "Body"),
        }
    }
}

/// A declared method parameter
#[derive(Debug, Clone)]
pub struct ParameterDecl {
    pub declared_type: DeclaredType,
    pub annotations: Vec<ParameterAnnotation>,
}

impl ParameterDecl {
    pub fn new(declared_type: DeclaredType) -> Self {
        Self {
            declared_type,
            annotations: Vec::new(),
        }
    }

    /// Bind to the template variable `name`, percent-encoded
    pub fn param<S: Into<String>>(mut self, name: S) -> Self {
        self.annotations.push(ParameterAnnotation::Param {
            name: name.into(),
            expander: None,
            encoded: true,
        });
        self
    }

    /// Bind to `name` with full control over expansion
    pub fn param_with<S: Into<String>>(
        mut self,
        name: S,
        expander: Option<Arc<dyn ExpressionExpander>>,
        encoded: bool,
    ) -> Self {
        self.annotations.push(ParameterAnnotation::Param {
            name: name.into(),
            expander,
            encoded,
        });
        self
    }

    pub fn body(mut self) -> Self {
        self.annotations.push(ParameterAnnotation::Body);
        self
    }
}

/// Local implementation of a contract method. Errors are reported as
/// messages and surface as [`DispatchError::DefaultMethod`](crate::dispatch::DispatchError::DefaultMethod).
#[derive(Clone)]
pub struct DefaultMethod(Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>);

impl DefaultMethod {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self(Arc::new(body))
    }

    pub fn call(&self, arguments: &[Value]) -> Result<Value, String> {
        (self.0)(arguments)
    }
}

impl fmt::Debug for DefaultMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultMethod")
    }
}

/// A declared contract method
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    /// Class that declares the method; the contract itself when `None`
    pub declared_by: Option<String>,
    pub parameters: Vec<ParameterDecl>,
    pub return_type: DeclaredType,
    pub annotations: Vec<Annotation>,
    pub default: Option<DefaultMethod>,
}

impl MethodDecl {
    pub fn new<S: Into<String>>(name: S, return_type: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared_by: None,
            parameters: Vec::new(),
            return_type,
            annotations: Vec::new(),
            default: None,
        }
    }

    pub fn declared_by<S: Into<String>>(mut self, class: S) -> Self {
        self.declared_by = Some(class.into());
        self
    }

    pub fn annotate<A: Into<Annotation>>(mut self, annotation: A) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn parameter(mut self, parameter: ParameterDecl) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_default(mut self, default: DefaultMethod) -> Self {
        self.default = Some(default);
        self
    }

    pub fn request(&self) -> Option<&RequestAnnotation> {
        self.annotations.iter().find_map(|annotation| match annotation {
            Annotation::Request(request) => Some(request),
            Annotation::Headers(_) => None,
        })
    }

    /// The method's key when declared on `contract`
    pub fn key(&self, contract: &str) -> MethodKey {
        let declaring = self.declared_by.as_deref().unwrap_or(contract);
        let parameters: Vec<DeclaredType> = self
            .parameters
            .iter()
            .map(|p| p.declared_type.clone())
            .collect();
        MethodKey::for_declared(declaring, &self.name, &parameters)
    }
}

/// A client interface: its name in the [`TypeUniverse`](crate::types::TypeUniverse),
/// type-level annotations and methods in declaration order
#[derive(Debug, Clone)]
pub struct ContractType {
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub methods: Vec<MethodDecl>,
}

impl ContractType {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn annotate<A: Into<Annotation>>(mut self, annotation: A) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn keys(&self) -> Vec<MethodKey> {
        self.methods.iter().map(|m| m.key(&self.name)).collect()
    }
}
