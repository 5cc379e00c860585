//! Template parse and expansion errors

use crate::value::BeanError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("Unbalanced braces at offset {offset} in template '{template}'")]
    UnbalancedBraces { template: String, offset: usize },

    #[error("Empty expression at offset {offset} in template '{template}'")]
    EmptyExpression { template: String, offset: usize },

    #[error("Invalid variable name '{name}' in template '{template}'")]
    InvalidVariable { template: String, name: String },

    #[error("Invalid prefix length '{prefix}' for variable '{name}'")]
    InvalidPrefix { name: String, prefix: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpansionError {
    #[error("Failed to expand variable '{variable}': {source}")]
    Property {
        variable: String,
        #[source]
        source: BeanError,
    },

    #[error("Failed to expand variable '{variable}': {message}")]
    Expander { variable: String, message: String },
}

impl ExpansionError {
    /// Error for custom expanders to report a failure
    pub fn expander<V: Into<String>, M: Into<String>>(variable: V, message: M) -> Self {
        Self::Expander {
            variable: variable.into(),
            message: message.into(),
        }
    }
}
