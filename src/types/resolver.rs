//! Resolves declared types into [`TypeDescription`]s
//!
//! Type variables are bound by walking the owning class's supertypes until the
//! reference that supplies an argument for the variable's declaring class is
//! found. Variables with no binding anywhere in the chain resolve to `None`;
//! callers treat that as "return type cannot be determined".

use crate::types::universe::{DeclaredType, OBJECT, TypeUniverse, TypeVariable, VariableScope};
use crate::types::{Class, TypeDescription};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::trace;

/// Resolution is recursive through variable substitution; this bounds
/// pathological self-referential bindings.
const MAX_DEPTH: usize = 32;

type CacheKey = (DeclaredType, String);

/// Memoizing type resolver over a [`TypeUniverse`]
#[derive(Debug)]
pub struct TypeResolver {
    universe: Arc<TypeUniverse>,
    cache: RwLock<HashMap<CacheKey, Option<TypeDescription>>>,
}

impl TypeResolver {
    pub fn new(universe: Arc<TypeUniverse>) -> Self {
        Self {
            universe,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn universe(&self) -> &TypeUniverse {
        &self.universe
    }

    /// Resolve `declared` in the context of `owner`, the most-derived class
    /// supplying concrete type arguments.
    pub fn resolve(&self, declared: &DeclaredType, owner: &str) -> Option<TypeDescription> {
        let key = (declared.clone(), owner.to_string());
        if let Some(hit) = self.cache.read().ok().and_then(|c| c.get(&key).cloned()) {
            return hit;
        }

        let resolved = self.resolve_at(declared, owner, 0);
        trace!(
            declared = %declared,
            owner,
            resolved = ?resolved.as_ref().map(|d| d.to_string()),
            "Resolved type"
        );

        if let Ok(mut cache) = self.cache.write() {
            cache.entry(key).or_insert_with(|| resolved.clone());
        }
        resolved
    }

    /// Number of memoized resolutions
    pub fn cached(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    fn resolve_at(
        &self,
        declared: &DeclaredType,
        owner: &str,
        depth: usize,
    ) -> Option<TypeDescription> {
        if depth > MAX_DEPTH {
            return None;
        }
        match declared {
            DeclaredType::Class(name) => Some(TypeDescription::Simple {
                class: self.class(name),
            }),
            DeclaredType::Parameterized {
                raw,
                owner: enclosing,
                arguments,
            } => {
                let enclosing = match enclosing {
                    Some(enclosing) => {
                        Some(Box::new(self.resolve_at(enclosing, owner, depth + 1)?))
                    }
                    None => None,
                };
                let arguments = arguments
                    .iter()
                    .map(|argument| self.resolve_at(argument, owner, depth + 1))
                    .collect::<Option<Vec<_>>>()?;
                Some(TypeDescription::Parameterized {
                    raw: self.class(raw),
                    owner: enclosing,
                    arguments,
                })
            }
            DeclaredType::Array(component) => {
                match self.resolve_at(component, owner, depth + 1)? {
                    TypeDescription::Simple { class } => Some(TypeDescription::Simple {
                        class: Class::array_of(&class),
                    }),
                    generic => {
                        let class = Class::array_of(generic.erasure());
                        Some(TypeDescription::GenericArray {
                            component: Box::new(generic),
                            class,
                        })
                    }
                }
            }
            DeclaredType::Wildcard { upper, lower } => {
                let upper_bounds = upper
                    .iter()
                    .map(|bound| self.resolve_at(bound, owner, depth + 1))
                    .collect::<Option<Vec<_>>>()?;
                let lower_bounds = lower
                    .iter()
                    .map(|bound| self.resolve_at(bound, owner, depth + 1))
                    .collect::<Option<Vec<_>>>()?;
                Some(TypeDescription::WildCard {
                    upper_bounds,
                    lower_bounds,
                    object: self.class(OBJECT),
                })
            }
            DeclaredType::Variable(variable) => {
                let binding = self.find_binding(variable, owner)?;
                self.resolve_at(&binding, owner, depth + 1)
            }
        }
    }

    /// The type argument a descendant of the variable's declaring class
    /// passes for it, as written in that descendant.
    fn find_binding(&self, variable: &TypeVariable, owner: &str) -> Option<DeclaredType> {
        let VariableScope::Class(declaring) = &variable.scope else {
            return None;
        };
        let position = self
            .universe
            .class(declaring)?
            .type_parameters()
            .iter()
            .position(|p| p == &variable.name)?;

        let mut visited = HashSet::new();
        self.search_supertypes(owner, declaring, position, &mut visited)
    }

    fn search_supertypes(
        &self,
        current: &str,
        declaring: &str,
        position: usize,
        visited: &mut HashSet<String>,
    ) -> Option<DeclaredType> {
        if !visited.insert(current.to_string()) {
            return None;
        }
        let class = self.universe.class(current)?;
        for supertype in class.supertypes() {
            match supertype {
                DeclaredType::Parameterized { raw, arguments, .. } if raw == declaring => {
                    return arguments.get(position).cloned();
                }
                // A raw reference to the declaring class leaves the variable unbound
                DeclaredType::Class(raw) if raw == declaring => return None,
                _ => {}
            }
        }
        class
            .supertypes()
            .iter()
            .filter_map(DeclaredType::raw_name)
            .find_map(|parent| self.search_supertypes(parent, declaring, position, visited))
    }

    fn class(&self, name: &str) -> Class {
        Class::new(
            name.to_string(),
            self.universe.is_collection_like(name),
            self.universe.is_container(name),
        )
    }
}
