//! RFC 6570 style URI templates
//!
//! A template is parsed once into literal and expression chunks and expanded
//! many times. Expansion is pure: the same template and variables always
//! produce the same string.
//!
//! ```
//! use courier::template::{ExpanderRegistry, UriTemplate, Variables};
//!
//! let template = UriTemplate::parse("/search{?q,list*}").unwrap();
//! let mut variables = Variables::new();
//! variables.insert("q", "a b");
//! variables.insert("list", courier::Value::list(["x", "y"]));
//!
//! let uri = template.expand(&variables, &ExpanderRegistry::new()).unwrap();
//! assert_eq!(uri, "/search?q=a%20b&list=x&list=y");
//! ```

pub mod encoding;
pub mod error;
pub mod expander;
pub mod expression;

pub use encoding::Encoding;
pub use error::{ExpansionError, TemplateError};
pub use expander::{
    BeanDescriptor, BeanExpander, ExpanderRegistry, ExpansionContext, ExpressionExpander,
    ListExpander, MapExpander, SimpleExpander,
};
pub use expression::{Expression, Operator, VarSpec};

use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A parsed template segment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Chunk {
    Literal(String),
    Expression(Expression),
}

/// A variable's value plus how it should be expanded
#[derive(Clone)]
pub struct Variable {
    pub value: Value,
    /// Overrides the registry's choice when set
    pub expander: Option<Arc<dyn ExpressionExpander>>,
    /// False disables percent-encoding for this variable
    pub encoded: bool,
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("value", &self.value)
            .field("custom_expander", &self.expander.is_some())
            .field("encoded", &self.encoded)
            .finish()
    }
}

/// Name to value map used for expansion
#[derive(Debug, Clone, Default)]
pub struct Variables {
    entries: HashMap<String, Variable>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an encoded variable expanded by the registry's choice
    pub fn insert<N: Into<String>, V: Into<Value>>(&mut self, name: N, value: V) -> &mut Self {
        self.entries.insert(
            name.into(),
            Variable {
                value: value.into(),
                expander: None,
                encoded: true,
            },
        );
        self
    }

    pub fn insert_variable<N: Into<String>>(&mut self, name: N, variable: Variable) -> &mut Self {
        self.entries.insert(name.into(), variable);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut variables = Variables::new();
        for (name, value) in iter {
            variables.insert(name, value);
        }
        variables
    }
}

/// A parsed URI template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UriTemplate {
    source: String,
    chunks: Vec<Chunk>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut chunks = Vec::new();
        let mut literal = String::new();
        let mut rest = template;
        let mut offset = 0;

        while let Some(index) = rest.find(['{', '}']) {
            if rest[index..].starts_with('}') {
                return Err(TemplateError::UnbalancedBraces {
                    template: template.to_string(),
                    offset: offset + index,
                });
            }
            literal.push_str(&rest[..index]);

            let body_start = index + 1;
            let close = rest[body_start..]
                .find(['{', '}'])
                .filter(|&i| rest[body_start + i..].starts_with('}'))
                .ok_or_else(|| TemplateError::UnbalancedBraces {
                    template: template.to_string(),
                    offset: offset + index,
                })?;

            if !literal.is_empty() {
                chunks.push(Chunk::Literal(std::mem::take(&mut literal)));
            }
            let body = &rest[body_start..body_start + close];
            chunks.push(Chunk::Expression(Expression::parse(
                body,
                template,
                offset + index,
            )?));

            let consumed = body_start + close + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            chunks.push(Chunk::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            chunks,
        })
    }

    /// The template text as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Whether the template is an absolute URI (has a scheme)
    pub fn is_absolute(&self) -> bool {
        is_absolute_uri(&self.source)
    }

    /// Names of all variables, in order of first appearance
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for chunk in &self.chunks {
            if let Chunk::Expression(expression) = chunk {
                for spec in &expression.variables {
                    if !names.contains(&spec.name.as_str()) {
                        names.push(&spec.name);
                    }
                }
            }
        }
        names
    }

    /// Expand with percent-encoding per operator and variable
    pub fn expand(
        &self,
        variables: &Variables,
        registry: &ExpanderRegistry,
    ) -> Result<String, ExpansionError> {
        self.expand_with(variables, registry, false)
    }

    /// Expand without any percent-encoding, e.g. for header values
    pub fn expand_verbatim(
        &self,
        variables: &Variables,
        registry: &ExpanderRegistry,
    ) -> Result<String, ExpansionError> {
        self.expand_with(variables, registry, true)
    }

    fn expand_with(
        &self,
        variables: &Variables,
        registry: &ExpanderRegistry,
        verbatim: bool,
    ) -> Result<String, ExpansionError> {
        let mut out = String::with_capacity(self.source.len());
        for chunk in &self.chunks {
            match chunk {
                Chunk::Literal(text) => out.push_str(text),
                Chunk::Expression(expression) => {
                    out.push_str(&expand_expression(expression, variables, registry, verbatim)?);
                }
            }
        }
        trace!(template = %self.source, expanded = %out, "Expanded template");
        Ok(out)
    }
}

fn expand_expression(
    expression: &Expression,
    variables: &Variables,
    registry: &ExpanderRegistry,
    verbatim: bool,
) -> Result<String, ExpansionError> {
    let operator = expression.operator;
    let mut contributions = Vec::with_capacity(expression.variables.len());

    for spec in &expression.variables {
        let Some(variable) = variables.get(&spec.name) else {
            continue;
        };
        if variable.value.is_null() {
            continue;
        }
        let encoding = if verbatim || !variable.encoded {
            Encoding::Verbatim
        } else {
            operator.encoding()
        };
        let context = ExpansionContext {
            operator,
            spec,
            encoding,
            registry,
        };
        let expander = match &variable.expander {
            Some(custom) => custom.clone(),
            None => registry.expander_for(&variable.value),
        };
        if let Some(contribution) = expander.expand(&context, &variable.value)? {
            contributions.push(contribution);
        }
    }

    if contributions.is_empty() {
        return Ok(String::new());
    }
    Ok(format!(
        "{}{}",
        operator.first(),
        contributions.join(operator.separator())
    ))
}

/// Whether `uri` starts with a URI scheme such as `https:`
pub fn is_absolute_uri(uri: &str) -> bool {
    let Some((scheme, _)) = uri.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
