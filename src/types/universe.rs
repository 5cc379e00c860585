//! Explicit class metadata used in place of run-time reflection
//!
//! A [`TypeUniverse`] knows every class a contract can mention: its type
//! parameters, the supertypes it extends (with the type arguments it passes
//! to them), and whether it is a collection root or a single-value container.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Where a type variable was declared
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableScope {
    /// Declared by a generic class or interface
    Class(String),
    /// Declared by a generic method; never bound by a class
    Method(String),
}

/// A type variable reference such as `T`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeVariable {
    pub name: String,
    pub scope: VariableScope,
}

/// A type as written in a declaration, before resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    Class(String),
    Parameterized {
        raw: String,
        owner: Option<Box<DeclaredType>>,
        arguments: Vec<DeclaredType>,
    },
    Array(Box<DeclaredType>),
    Variable(TypeVariable),
    Wildcard {
        upper: Vec<DeclaredType>,
        lower: Vec<DeclaredType>,
    },
}

impl DeclaredType {
    pub fn class<S: Into<String>>(name: S) -> Self {
        DeclaredType::Class(name.into())
    }

    pub fn parameterized<S: Into<String>>(raw: S, arguments: Vec<DeclaredType>) -> Self {
        DeclaredType::Parameterized {
            raw: raw.into(),
            owner: None,
            arguments,
        }
    }

    /// A parameterized type nested in `owner`, e.g. `Outer<String>.Inner<T>`
    pub fn nested<S: Into<String>>(
        owner: DeclaredType,
        raw: S,
        arguments: Vec<DeclaredType>,
    ) -> Self {
        DeclaredType::Parameterized {
            raw: raw.into(),
            owner: Some(Box::new(owner)),
            arguments,
        }
    }

    pub fn array(component: DeclaredType) -> Self {
        DeclaredType::Array(Box::new(component))
    }

    /// A variable declared by the generic class `declared_by`
    pub fn variable<N: Into<String>, C: Into<String>>(name: N, declared_by: C) -> Self {
        DeclaredType::Variable(TypeVariable {
            name: name.into(),
            scope: VariableScope::Class(declared_by.into()),
        })
    }

    /// A variable declared by the generic method `method`
    pub fn method_variable<N: Into<String>, M: Into<String>>(name: N, method: M) -> Self {
        DeclaredType::Variable(TypeVariable {
            name: name.into(),
            scope: VariableScope::Method(method.into()),
        })
    }

    /// `? extends bound`
    pub fn wildcard_extends(bound: DeclaredType) -> Self {
        DeclaredType::Wildcard {
            upper: vec![bound],
            lower: Vec::new(),
        }
    }

    /// `? super bound`
    pub fn wildcard_super(bound: DeclaredType) -> Self {
        DeclaredType::Wildcard {
            upper: vec![DeclaredType::class(OBJECT)],
            lower: vec![bound],
        }
    }

    /// Raw class name, when the type names one directly
    pub fn raw_name(&self) -> Option<&str> {
        match self {
            DeclaredType::Class(name) => Some(name),
            DeclaredType::Parameterized { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Class(name) => write!(f, "{name}"),
            DeclaredType::Parameterized {
                raw,
                owner,
                arguments,
            } => {
                if let Some(owner) = owner {
                    write!(f, "{owner}.")?;
                }
                write!(f, "{raw}<")?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                write!(f, ">")
            }
            DeclaredType::Array(component) => write!(f, "{component}[]"),
            DeclaredType::Variable(variable) => write!(f, "{}", variable.name),
            DeclaredType::Wildcard { upper, lower } => {
                if let Some(bound) = lower.first() {
                    write!(f, "? super {bound}")
                } else if let Some(bound) = upper.first().filter(|b| b.raw_name() != Some(OBJECT)) {
                    write!(f, "? extends {bound}")
                } else {
                    write!(f, "?")
                }
            }
        }
    }
}

/// Metadata for one class or interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    name: String,
    type_parameters: Vec<String>,
    supertypes: Vec<DeclaredType>,
    collection_root: bool,
    container_root: bool,
}

impl ClassInfo {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            type_parameters: Vec::new(),
            supertypes: Vec::new(),
            collection_root: false,
            container_root: false,
        }
    }

    pub fn with_type_parameters(mut self, parameters: &[&str]) -> Self {
        self.type_parameters = parameters.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Add a supertype, e.g. `Crud<User>` for `UserApi extends Crud<User>`
    pub fn extends(mut self, supertype: DeclaredType) -> Self {
        self.supertypes.push(supertype);
        self
    }

    /// Mark as a collection root; the class and all its descendants are
    /// collection-like
    pub fn collection_root(mut self) -> Self {
        self.collection_root = true;
        self
    }

    /// Mark as a single-value container root (futures, optionals)
    pub fn container_root(mut self) -> Self {
        self.container_root = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_parameters(&self) -> &[String] {
        &self.type_parameters
    }

    pub fn supertypes(&self) -> &[DeclaredType] {
        &self.supertypes
    }
}

pub const OBJECT: &str = "Object";
pub const VOID: &str = "Void";
pub const STRING: &str = "String";
pub const BYTES: &str = "Bytes";
pub const BYTE_STREAM: &str = "ByteStream";
pub const RESPONSE: &str = "Response";

/// Registry of known classes
#[derive(Debug, Clone, Default)]
pub struct TypeUniverse {
    classes: HashMap<String, ClassInfo>,
}

impl TypeUniverse {
    /// An empty universe with no built-in classes
    pub fn empty() -> Self {
        Self::default()
    }

    /// A universe holding the built-in scalar, collection and container
    /// classes
    pub fn with_builtins() -> Self {
        let mut universe = Self::empty();
        for scalar in [
            OBJECT,
            VOID,
            STRING,
            "Bool",
            "Int",
            "Long",
            "Float",
            "Double",
            BYTES,
            BYTE_STREAM,
            RESPONSE,
        ] {
            universe.define(ClassInfo::new(scalar));
        }

        let element = |name: &str, declared_by: &str| DeclaredType::variable(name, declared_by);
        universe.define(
            ClassInfo::new("Iterable")
                .with_type_parameters(&["T"])
                .collection_root(),
        );
        universe.define(
            ClassInfo::new("Collection")
                .with_type_parameters(&["E"])
                .extends(DeclaredType::parameterized(
                    "Iterable",
                    vec![element("E", "Collection")],
                ))
                .collection_root(),
        );
        for collection in ["List", "Set"] {
            universe.define(
                ClassInfo::new(collection)
                    .with_type_parameters(&["E"])
                    .extends(DeclaredType::parameterized(
                        "Collection",
                        vec![element("E", collection)],
                    )),
            );
        }
        universe.define(ClassInfo::new("Map").with_type_parameters(&["K", "V"]));
        universe.define(
            ClassInfo::new("Future")
                .with_type_parameters(&["T"])
                .container_root(),
        );
        universe.define(
            ClassInfo::new("Optional")
                .with_type_parameters(&["T"])
                .container_root(),
        );
        universe
    }

    /// Register (or replace) a class
    pub fn define(&mut self, class: ClassInfo) -> &mut Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Whether `name` is `ancestor` or descends from it
    pub fn is_assignable_to(&self, name: &str, ancestor: &str) -> bool {
        let mut visited = HashSet::new();
        self.walk_ancestors(name, &mut visited, &mut |class| class.name == ancestor)
    }

    pub fn is_collection_like(&self, name: &str) -> bool {
        let mut visited = HashSet::new();
        self.walk_ancestors(name, &mut visited, &mut |class| class.collection_root)
    }

    pub fn is_container(&self, name: &str) -> bool {
        let mut visited = HashSet::new();
        self.walk_ancestors(name, &mut visited, &mut |class| class.container_root)
    }

    fn walk_ancestors(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        predicate: &mut dyn FnMut(&ClassInfo) -> bool,
    ) -> bool {
        if !visited.insert(name.to_string()) {
            return false;
        }
        let Some(class) = self.classes.get(name) else {
            return false;
        };
        if predicate(class) {
            return true;
        }
        class
            .supertypes
            .iter()
            .filter_map(DeclaredType::raw_name)
            .any(|parent| self.walk_ancestors(parent, visited, predicate))
    }
}
