//! Contract processing
//!
//! A [`Contract`] turns the annotations of a [`ContractType`] into one
//! [`MethodDefinition`] per request-annotated method. The default
//! [`AnnotationContract`] starts every method from the type-level
//! annotations and layers the method's own annotations on top:
//!
//! - a method-level template is appended to the type-level one, unless it is
//!   an absolute URI, which replaces it;
//! - header lines are merged by name, values appended in declaration order;
//! - `Param` parameters become template bindings and at most one `Body`
//!   parameter becomes the request body.
//!
//! Methods without a request annotation produce no definition.

pub mod declaration;
pub mod definition;
pub mod key;

pub use declaration::{
    Annotation, ContractType, DefaultMethod, MethodDecl, ParameterAnnotation, ParameterDecl,
    RequestAnnotation,
};
pub use definition::{HeaderTemplates, MethodDefinition, TemplateParameter};
pub use key::MethodKey;

use crate::error::{Error, Result};
use crate::http::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, HttpMethod};
use crate::template::{UriTemplate, is_absolute_uri};
use crate::types::{TypeDescription, TypeResolver, TypeUniverse};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builds request definitions from contract metadata
pub trait Contract: Send + Sync {
    fn apply(&self, contract: &ContractType) -> Result<Vec<MethodDefinition>>;
}

/// Request settings shared by every method of a contract, refined per
/// method
#[derive(Debug, Clone)]
struct RequestDefaults {
    template: String,
    http_method: HttpMethod,
    headers: HeaderTemplates,
    connect_timeout: Duration,
    read_timeout: Duration,
    follow_redirects: bool,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            template: String::new(),
            http_method: HttpMethod::default(),
            headers: HeaderTemplates::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            follow_redirects: true,
        }
    }
}

impl RequestDefaults {
    fn apply(&mut self, annotation: &Annotation, site: &str) -> Result<()> {
        match annotation {
            Annotation::Request(request) => {
                if let Some(template) = request.template() {
                    if is_absolute_uri(template) {
                        self.template = template.to_string();
                    } else {
                        self.template.push_str(template);
                    }
                }
                if let Some(method) = request.method {
                    self.http_method = method;
                }
                if let Some(timeout) = request.connect_timeout {
                    self.connect_timeout = timeout;
                }
                if let Some(timeout) = request.read_timeout {
                    self.read_timeout = timeout;
                }
                if let Some(follow) = request.follow_redirects {
                    self.follow_redirects = follow;
                }
            }
            Annotation::Headers(lines) => {
                for line in lines {
                    let (name, value) = parse_header_line(line, site)?;
                    self.headers.add(name, value);
                }
            }
        }
        Ok(())
    }
}

fn parse_header_line(line: &str, site: &str) -> Result<(String, UriTemplate)> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| Error::config(format!("{site}: malformed header line '{line}'")))?;
    let name = name.trim();
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::config(format!("{site}: invalid header name in '{line}'")));
    }
    let value = UriTemplate::parse(value.trim())
        .map_err(|e| Error::config(format!("{site}: invalid header template: {e}")))?;
    Ok((name.to_string(), value))
}

/// First class in `description` that the universe does not define
fn unknown_class<'a>(
    universe: &TypeUniverse,
    description: &'a TypeDescription,
) -> Option<&'a str> {
    match description {
        TypeDescription::Simple { class } => {
            let name = class.element_name();
            (!universe.contains(name)).then_some(name)
        }
        TypeDescription::Parameterized {
            raw,
            owner,
            arguments,
        } => {
            if !universe.contains(raw.name()) {
                return Some(raw.name());
            }
            owner
                .iter()
                .map(|owner| &**owner)
                .chain(arguments)
                .find_map(|argument| unknown_class(universe, argument))
        }
        TypeDescription::GenericArray { component, .. } => unknown_class(universe, component),
        TypeDescription::WildCard {
            upper_bounds,
            lower_bounds,
            ..
        } => upper_bounds
            .iter()
            .chain(lower_bounds)
            .find_map(|bound| unknown_class(universe, bound)),
    }
}

/// The default contract: reads [`Annotation`]s and resolves return types
/// against a [`TypeUniverse`]
#[derive(Debug)]
pub struct AnnotationContract {
    resolver: TypeResolver,
}

impl AnnotationContract {
    pub fn new(universe: Arc<TypeUniverse>) -> Self {
        Self {
            resolver: TypeResolver::new(universe),
        }
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    fn process_method(
        &self,
        contract: &ContractType,
        method: &MethodDecl,
        root: &RequestDefaults,
    ) -> Result<MethodDefinition> {
        let key = method.key(&contract.name);
        let site = key.to_string();

        let mut defaults = root.clone();
        for annotation in &method.annotations {
            defaults.apply(annotation, &site)?;
        }
        if defaults.connect_timeout.is_zero() || defaults.read_timeout.is_zero() {
            return Err(Error::config(format!("{site}: timeouts must be greater than zero")));
        }

        let uri_template = UriTemplate::parse(&defaults.template)
            .map_err(|e| Error::config(format!("{site}: invalid URI template: {e}")))?;

        let mut parameter_bindings = BTreeMap::new();
        let mut body_index = None;
        for (index, parameter) in method.parameters.iter().enumerate() {
            let mut bound = false;
            let mut body = false;
            for annotation in &parameter.annotations {
                match annotation {
                    ParameterAnnotation::Param {
                        name,
                        expander,
                        encoded,
                    } => {
                        if name.trim().is_empty() {
                            return Err(Error::config(format!(
                                "{site}: parameter {index} has an empty name"
                            )));
                        }
                        let mut binding =
                            TemplateParameter::new(name.as_str()).with_encoded(*encoded);
                        if let Some(expander) = expander {
                            binding = binding.with_expander(expander.clone());
                        }
                        parameter_bindings.insert(index, binding);
                        bound = true;
                    }
                    ParameterAnnotation::Body => {
                        if body_index.is_some_and(|existing| existing != index) {
                            return Err(Error::config(format!(
                                "{site}: only one parameter may be the request body"
                            )));
                        }
                        body_index = Some(index);
                        body = true;
                    }
                }
            }
            if bound && body {
                return Err(Error::config(format!(
                    "{site}: parameter {index} cannot be both a template parameter and the body"
                )));
            }
        }

        let return_type = self
            .resolver
            .resolve(&method.return_type, &contract.name)
            .ok_or_else(|| {
                Error::config(format!(
                    "{site}: unable to resolve return type {}",
                    method.return_type
                ))
            })?;
        if let Some(unknown) = unknown_class(self.resolver.universe(), &return_type) {
            return Err(Error::config(format!(
                "{site}: return type {return_type} names unknown class '{unknown}'"
            )));
        }

        debug!(
            method = %key,
            http_method = %defaults.http_method,
            template = %uri_template,
            "Built method definition"
        );

        Ok(MethodDefinition {
            key,
            uri_template,
            http_method: defaults.http_method,
            headers: defaults.headers,
            parameter_bindings,
            parameter_count: method.parameters.len(),
            body_index,
            return_type,
            follow_redirects: defaults.follow_redirects,
            connect_timeout: defaults.connect_timeout,
            read_timeout: defaults.read_timeout,
        })
    }
}

impl Contract for AnnotationContract {
    fn apply(&self, contract: &ContractType) -> Result<Vec<MethodDefinition>> {
        if !self.resolver.universe().contains(&contract.name) {
            return Err(Error::config(format!("Unknown contract type '{}'", contract.name)));
        }

        let mut root = RequestDefaults::default();
        for annotation in &contract.annotations {
            root.apply(annotation, &contract.name)?;
        }

        let mut definitions = Vec::with_capacity(contract.methods.len());
        for method in &contract.methods {
            if method.request().is_none() {
                debug!(
                    contract = %contract.name,
                    method = %method.name,
                    "Skipping method without request annotation"
                );
                continue;
            }
            definitions.push(self.process_method(contract, method, &root)?);
        }

        debug!(contract = %contract.name, definitions = definitions.len(), "Processed contract");
        Ok(definitions)
    }
}
