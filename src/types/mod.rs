//! Resolved type descriptions for contract return types

pub mod resolver;
pub mod universe;

pub use resolver::TypeResolver;
pub use universe::{ClassInfo, DeclaredType, TypeUniverse, TypeVariable, VariableScope};

use std::fmt;

/// A resolved class together with the traits the dispatcher cares about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Class {
    name: String,
    array: bool,
    collection_like: bool,
    container: bool,
}

impl Class {
    pub(crate) fn new(name: String, collection_like: bool, container: bool) -> Self {
        Self {
            name,
            array: false,
            collection_like,
            container,
        }
    }

    pub(crate) fn array_of(component: &Class) -> Self {
        Self {
            name: format!("{}[]", component.name),
            array: true,
            collection_like: true,
            container: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    /// The name with any array suffixes removed, e.g. `String` for `String[][]`
    pub fn element_name(&self) -> &str {
        self.name.trim_end_matches("[]")
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Normalized shape of a method's return type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescription {
    Simple {
        class: Class,
    },
    Parameterized {
        raw: Class,
        owner: Option<Box<TypeDescription>>,
        arguments: Vec<TypeDescription>,
    },
    GenericArray {
        component: Box<TypeDescription>,
        class: Class,
    },
    WildCard {
        upper_bounds: Vec<TypeDescription>,
        lower_bounds: Vec<TypeDescription>,
        object: Class,
    },
}

impl TypeDescription {
    /// The erasure class
    pub fn erasure(&self) -> &Class {
        match self {
            TypeDescription::Simple { class } => class,
            TypeDescription::Parameterized { raw, .. } => raw,
            TypeDescription::GenericArray { class, .. } => class,
            TypeDescription::WildCard { .. } => self.get_type(),
        }
    }

    /// For wildcards: the lower bound's class when present, else the first
    /// upper bound's, else `Object`. Other variants return their erasure.
    pub fn get_type(&self) -> &Class {
        match self {
            TypeDescription::WildCard {
                upper_bounds,
                lower_bounds,
                object,
            } => lower_bounds
                .first()
                .or_else(|| upper_bounds.first())
                .map(TypeDescription::erasure)
                .unwrap_or(object),
            other => other.erasure(),
        }
    }

    pub fn is_collection_like(&self) -> bool {
        match self {
            TypeDescription::GenericArray { .. } => true,
            _ => self.erasure().collection_like,
        }
    }

    pub fn is_container(&self) -> bool {
        self.erasure().container
    }

    pub fn type_arguments(&self) -> &[TypeDescription] {
        match self {
            TypeDescription::Parameterized { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// The value type held by a container, e.g. `String` for `Future<String>`
    pub fn contained(&self) -> Option<&TypeDescription> {
        if self.is_container() {
            self.type_arguments().first()
        } else {
            None
        }
    }

    /// Element type of a collection-like description
    pub fn element(&self) -> Option<&TypeDescription> {
        match self {
            TypeDescription::GenericArray { component, .. } => Some(component),
            TypeDescription::Parameterized { .. } if self.is_collection_like() => {
                self.type_arguments().first()
            }
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescription::Simple { class } => write!(f, "{class}"),
            TypeDescription::Parameterized {
                raw,
                owner,
                arguments,
            } => {
                if let Some(owner) = owner {
                    write!(f, "{owner}.")?;
                }
                let arguments: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
                write!(f, "{raw}<{}>", arguments.join(", "))
            }
            TypeDescription::GenericArray { component, .. } => write!(f, "{component}[]"),
            TypeDescription::WildCard {
                upper_bounds,
                lower_bounds,
                ..
            } => {
                if let Some(lower) = lower_bounds.first() {
                    write!(f, "? super {lower}")
                } else if let Some(upper) = upper_bounds.first() {
                    write!(f, "? extends {upper}")
                } else {
                    write!(f, "?")
                }
            }
        }
    }
}
