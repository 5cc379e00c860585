//! Immutable per-method request definitions

use crate::contract::key::MethodKey;
use crate::http::HttpMethod;
use crate::template::{ExpressionExpander, UriTemplate};
use crate::types::TypeDescription;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

/// Binding of a method argument to a template variable
#[derive(Clone)]
pub struct TemplateParameter {
    name: String,
    expander: Option<Arc<dyn ExpressionExpander>>,
    encoded: bool,
}

impl TemplateParameter {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            expander: None,
            encoded: true,
        }
    }

    pub fn with_expander(mut self, expander: Arc<dyn ExpressionExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn with_encoded(mut self, encoded: bool) -> Self {
        self.encoded = encoded;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expander(&self) -> Option<&Arc<dyn ExpressionExpander>> {
        self.expander.as_ref()
    }

    pub fn encoded(&self) -> bool {
        self.encoded
    }
}

impl fmt::Debug for TemplateParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateParameter")
            .field("name", &self.name)
            .field("custom_expander", &self.expander.is_some())
            .field("encoded", &self.encoded)
            .finish()
    }
}

// Custom expanders are compared by identity.
impl PartialEq for TemplateParameter {
    fn eq(&self, other: &Self) -> bool {
        let same_expander = match (&self.expander, &other.expander) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.name == other.name && self.encoded == other.encoded && same_expander
    }
}

/// Header templates keyed by name (case-insensitive); values keep
/// declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTemplates {
    entries: Vec<(String, Vec<UriTemplate>)>,
}

impl HeaderTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<N: Into<String>>(&mut self, name: N, value: UriTemplate) {
        let name = name.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[UriTemplate]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[UriTemplate])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything needed to turn one method call into a request.
///
/// Built once by a [`Contract`](crate::contract::Contract); each client gets
/// its own clone. Equality and hashing consider only the method key.
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    pub(crate) key: MethodKey,
    pub(crate) uri_template: UriTemplate,
    pub(crate) http_method: HttpMethod,
    pub(crate) headers: HeaderTemplates,
    pub(crate) parameter_bindings: BTreeMap<usize, TemplateParameter>,
    pub(crate) parameter_count: usize,
    pub(crate) body_index: Option<usize>,
    pub(crate) return_type: TypeDescription,
    pub(crate) follow_redirects: bool,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
}

impl MethodDefinition {
    pub fn key(&self) -> &MethodKey {
        &self.key
    }

    pub fn uri_template(&self) -> &UriTemplate {
        &self.uri_template
    }

    pub fn http_method(&self) -> HttpMethod {
        self.http_method
    }

    pub fn headers(&self) -> &HeaderTemplates {
        &self.headers
    }

    pub fn parameter_bindings(&self) -> &BTreeMap<usize, TemplateParameter> {
        &self.parameter_bindings
    }

    /// Number of arguments a call must supply
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn body_index(&self) -> Option<usize> {
        self.body_index
    }

    pub fn return_type(&self) -> &TypeDescription {
        &self.return_type
    }

    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

impl PartialEq for MethodDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for MethodDefinition {}

impl Hash for MethodDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for MethodDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.http_method, self.uri_template, self.key)
    }
}
