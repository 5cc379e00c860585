//! Template expressions: operators and variable specifiers

use crate::template::encoding::Encoding;
use crate::template::error::TemplateError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static VARIABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_]|%[0-9A-Fa-f]{2})(?:\.?(?:[A-Za-z0-9_]|%[0-9A-Fa-f]{2}))*$")
        .expect("variable name pattern is valid")
});

const MAX_PREFIX: usize = 9999;

/// Expression operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParameter,
    Query,
    QueryContinuation,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Reserved),
            '#' => Some(Operator::Fragment),
            '.' => Some(Operator::Label),
            '/' => Some(Operator::Path),
            ';' => Some(Operator::PathParameter),
            '?' => Some(Operator::Query),
            '&' => Some(Operator::QueryContinuation),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Simple => "",
            Operator::Reserved => "+",
            Operator::Fragment => "#",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParameter => ";",
            Operator::Query => "?",
            Operator::QueryContinuation => "&",
        }
    }

    /// Prefix written before the first contribution
    pub fn first(&self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved => "",
            other => other.symbol(),
        }
    }

    /// Separator between contributions
    pub fn separator(&self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved | Operator::Fragment => ",",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParameter => ";",
            Operator::Query | Operator::QueryContinuation => "&",
        }
    }

    /// Whether contributions are written as `name=value`
    pub fn named(&self) -> bool {
        matches!(
            self,
            Operator::PathParameter | Operator::Query | Operator::QueryContinuation
        )
    }

    /// Written after the name when a named value is empty
    pub fn if_empty(&self) -> &'static str {
        match self {
            Operator::Query | Operator::QueryContinuation => "=",
            _ => "",
        }
    }

    pub fn allows_reserved(&self) -> bool {
        matches!(self, Operator::Reserved | Operator::Fragment)
    }

    /// Encoding for values expanded under this operator
    pub fn encoding(&self) -> Encoding {
        if self.allows_reserved() {
            Encoding::Reserved
        } else {
            Encoding::Unreserved
        }
    }
}

/// One variable inside an expression, e.g. `list*` or `name:3`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarSpec {
    pub name: String,
    pub explode: bool,
    pub prefix: Option<usize>,
}

impl fmt::Display for VarSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(prefix) = self.prefix {
            write!(f, ":{prefix}")?;
        }
        if self.explode {
            write!(f, "*")?;
        }
        Ok(())
    }
}

/// A `{...}` expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression {
    pub operator: Operator,
    pub variables: Vec<VarSpec>,
}

impl Expression {
    /// Parse the text between the braces
    pub(crate) fn parse(body: &str, template: &str, offset: usize) -> Result<Self, TemplateError> {
        let mut chars = body.chars();
        let (operator, list) = match chars.next().and_then(Operator::from_char) {
            Some(operator) => (operator, chars.as_str()),
            None => (Operator::Simple, body),
        };

        if list.trim().is_empty() {
            return Err(TemplateError::EmptyExpression {
                template: template.to_string(),
                offset,
            });
        }

        let variables = list
            .split(',')
            .map(|spec| Self::parse_var_spec(spec.trim(), template))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            operator,
            variables,
        })
    }

    fn parse_var_spec(spec: &str, template: &str) -> Result<VarSpec, TemplateError> {
        let (spec, explode) = match spec.strip_suffix('*') {
            Some(name) => (name, true),
            None => (spec, false),
        };

        let (name, prefix) = match spec.split_once(':') {
            Some((name, prefix)) => {
                let length = prefix
                    .parse::<usize>()
                    .ok()
                    .filter(|length| (1..=MAX_PREFIX).contains(length))
                    .ok_or_else(|| TemplateError::InvalidPrefix {
                        name: name.to_string(),
                        prefix: prefix.to_string(),
                    })?;
                (name, Some(length))
            }
            None => (spec, None),
        };

        if !VARIABLE_NAME.is_match(name) {
            return Err(TemplateError::InvalidVariable {
                template: template.to_string(),
                name: name.to_string(),
            });
        }

        Ok(VarSpec {
            name: name.to_string(),
            explode,
            prefix,
        })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variables: Vec<String> = self.variables.iter().map(|v| v.to_string()).collect();
        write!(f, "{{{}{}}}", self.operator.symbol(), variables.join(","))
    }
}
