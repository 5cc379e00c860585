//! Method identity

use crate::types::universe::{DeclaredType, OBJECT};
use std::fmt;

/// Identifies a contract method by declaring type, name and erased parameter
/// types. Displayed as `Decl#name(T1,T2)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    declaring_type: String,
    name: String,
    parameter_types: Vec<String>,
}

impl MethodKey {
    pub fn new<D, N, I, P>(declaring_type: D, name: N, parameter_types: I) -> Self
    where
        D: Into<String>,
        N: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Key for a method whose parameters are declared as `parameters`
    pub fn for_declared<D: Into<String>, N: Into<String>>(
        declaring_type: D,
        name: N,
        parameters: &[DeclaredType],
    ) -> Self {
        Self::new(declaring_type, name, parameters.iter().map(erased_name))
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}({})",
            self.declaring_type,
            self.name,
            self.parameter_types.join(",")
        )
    }
}

fn erased_name(declared: &DeclaredType) -> String {
    match declared {
        DeclaredType::Class(name) => name.clone(),
        DeclaredType::Parameterized { raw, .. } => raw.clone(),
        DeclaredType::Array(component) => format!("{}[]", erased_name(component)),
        DeclaredType::Variable(_) | DeclaredType::Wildcard { .. } => OBJECT.to_string(),
    }
}
