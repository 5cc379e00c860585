//! Expansion strategies and the registry that picks them
//!
//! An [`ExpressionExpander`] turns one variable's value into its contribution
//! to an expression. The [`ExpanderRegistry`] chooses an expander by the
//! value's runtime shape and keeps one instance per shape (and one
//! [`BeanExpander`] per bean type), so bean descriptors are computed once.

use crate::template::encoding::{Encoding, encode};
use crate::template::error::ExpansionError;
use crate::template::expression::{Operator, VarSpec};
use crate::value::{Bean, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::trace;

/// Everything an expander needs to know about where a value lands
pub struct ExpansionContext<'a> {
    pub operator: Operator,
    pub spec: &'a VarSpec,
    pub encoding: Encoding,
    pub registry: &'a ExpanderRegistry,
}

impl ExpansionContext<'_> {
    pub fn encode(&self, raw: &str) -> String {
        encode(raw, self.encoding)
    }

    /// `name=value`, or `name` plus the operator's if-empty marker
    pub fn named_pair(&self, name: &str, encoded: &str) -> String {
        if encoded.is_empty() {
            format!("{name}{}", self.operator.if_empty())
        } else {
            format!("{name}={encoded}")
        }
    }
}

/// Serializes one variable's value into its template contribution.
///
/// Returning `Ok(None)` means the variable contributes nothing.
pub trait ExpressionExpander: Send + Sync {
    fn expand(
        &self,
        context: &ExpansionContext<'_>,
        value: &Value,
    ) -> Result<Option<String>, ExpansionError>;
}

/// Scalars
#[derive(Debug, Default)]
pub struct SimpleExpander;

impl ExpressionExpander for SimpleExpander {
    fn expand(
        &self,
        context: &ExpansionContext<'_>,
        value: &Value,
    ) -> Result<Option<String>, ExpansionError> {
        let Some(raw) = value.to_scalar_string() else {
            return Ok(None);
        };
        let raw = match context.spec.prefix {
            Some(length) => raw.chars().take(length).collect(),
            None => raw,
        };
        let encoded = context.encode(&raw);
        if context.operator.named() {
            Ok(Some(context.named_pair(&context.spec.name, &encoded)))
        } else {
            Ok(Some(encoded))
        }
    }
}

/// Lists
#[derive(Debug, Default)]
pub struct ListExpander;

impl ExpressionExpander for ListExpander {
    fn expand(
        &self,
        context: &ExpansionContext<'_>,
        value: &Value,
    ) -> Result<Option<String>, ExpansionError> {
        let Value::List(items) = value else {
            return SimpleExpander.expand(context, value);
        };
        let encoded: Vec<String> = items
            .iter()
            .filter_map(Value::to_scalar_string)
            .map(|item| context.encode(&item))
            .collect();
        if encoded.is_empty() {
            return Ok(None);
        }

        let name = &context.spec.name;
        let operator = context.operator;
        let expanded = match (context.spec.explode, operator.named()) {
            (false, false) => encoded.join(","),
            (false, true) => context.named_pair(name, &encoded.join(",")),
            (true, false) => encoded.join(operator.separator()),
            (true, true) => encoded
                .iter()
                .map(|item| context.named_pair(name, item))
                .collect::<Vec<_>>()
                .join(operator.separator()),
        };
        Ok(Some(expanded))
    }
}

/// Maps; nested maps and beans are flattened into dotted keys
#[derive(Debug, Default)]
pub struct MapExpander;

impl MapExpander {
    fn expand_pairs(
        &self,
        context: &ExpansionContext<'_>,
        pairs: Vec<(String, Value)>,
    ) -> Result<Option<String>, ExpansionError> {
        let mut flat = Vec::new();
        for (key, value) in pairs {
            flatten(context, key, value, &mut flat)?;
        }
        if flat.is_empty() {
            return Ok(None);
        }

        let operator = context.operator;
        let expanded = if context.spec.explode {
            flat.iter()
                .map(|(key, value)| context.named_pair(&context.encode(key), value))
                .collect::<Vec<_>>()
                .join(operator.separator())
        } else {
            let joined = flat
                .iter()
                .flat_map(|(key, value)| [context.encode(key), value.clone()])
                .collect::<Vec<_>>()
                .join(",");
            if operator.named() {
                context.named_pair(&context.spec.name, &joined)
            } else {
                joined
            }
        };
        Ok(Some(expanded))
    }
}

/// Collect `(dotted key, encoded value)` pairs
fn flatten(
    context: &ExpansionContext<'_>,
    key: String,
    value: Value,
    out: &mut Vec<(String, String)>,
) -> Result<(), ExpansionError> {
    match value {
        Value::Null => {}
        Value::Map(map) => {
            for (inner, nested) in map {
                flatten(context, format!("{key}.{inner}"), nested, out)?;
            }
        }
        Value::Bean(bean) => {
            let expander = context.registry.bean_expander(bean.as_ref());
            for (inner, nested) in expander.read_properties(&context.spec.name, bean.as_ref())? {
                flatten(context, format!("{key}.{inner}"), nested, out)?;
            }
        }
        Value::List(items) => {
            let encoded: Vec<String> = items
                .iter()
                .filter_map(Value::to_scalar_string)
                .map(|item| context.encode(&item))
                .collect();
            if !encoded.is_empty() {
                out.push((key, encoded.join(",")));
            }
        }
        scalar => {
            if let Some(raw) = scalar.to_scalar_string() {
                out.push((key, context.encode(&raw)));
            }
        }
    }
    Ok(())
}

impl ExpressionExpander for MapExpander {
    fn expand(
        &self,
        context: &ExpansionContext<'_>,
        value: &Value,
    ) -> Result<Option<String>, ExpansionError> {
        let Value::Map(map) = value else {
            return SimpleExpander.expand(context, value);
        };
        let pairs = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        self.expand_pairs(context, pairs)
    }
}

/// Readable properties of a bean type, computed once per type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanDescriptor {
    pub type_name: String,
    pub properties: Vec<String>,
}

impl BeanDescriptor {
    pub fn describe(bean: &dyn Bean) -> Self {
        Self {
            type_name: bean.type_name().to_string(),
            properties: bean
                .describe()
                .into_iter()
                .filter(|property| property.readable)
                .map(|property| property.name)
                .collect(),
        }
    }
}

/// Beans, expanded as a map of their readable properties
#[derive(Debug)]
pub struct BeanExpander {
    descriptor: BeanDescriptor,
}

impl BeanExpander {
    pub fn new(descriptor: BeanDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &BeanDescriptor {
        &self.descriptor
    }

    fn read_properties(
        &self,
        variable: &str,
        bean: &dyn Bean,
    ) -> Result<Vec<(String, Value)>, ExpansionError> {
        let mut pairs = Vec::with_capacity(self.descriptor.properties.len());
        for property in &self.descriptor.properties {
            let value = bean
                .read(property)
                .map_err(|source| ExpansionError::Property {
                    variable: variable.to_string(),
                    source,
                })?;
            pairs.push((property.clone(), value));
        }
        Ok(pairs)
    }
}

impl ExpressionExpander for BeanExpander {
    fn expand(
        &self,
        context: &ExpansionContext<'_>,
        value: &Value,
    ) -> Result<Option<String>, ExpansionError> {
        let Value::Bean(bean) = value else {
            return context.registry.expander_for(value).expand(context, value);
        };
        let pairs = self.read_properties(&context.spec.name, bean.as_ref())?;
        MapExpander.expand_pairs(context, pairs)
    }
}

/// Picks and caches expanders by value shape
pub struct ExpanderRegistry {
    simple: Arc<SimpleExpander>,
    list: Arc<ListExpander>,
    map: Arc<MapExpander>,
    beans: RwLock<HashMap<String, Arc<BeanExpander>>>,
}

impl Default for ExpanderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpanderRegistry {
    pub fn new() -> Self {
        Self {
            simple: Arc::new(SimpleExpander),
            list: Arc::new(ListExpander),
            map: Arc::new(MapExpander),
            beans: RwLock::new(HashMap::new()),
        }
    }

    /// Expander for a value: maps, then lists, then beans, else scalars
    pub fn expander_for(&self, value: &Value) -> Arc<dyn ExpressionExpander> {
        match value {
            Value::Map(_) => self.map.clone(),
            Value::List(_) => self.list.clone(),
            Value::Bean(bean) => self.bean_expander(bean.as_ref()),
            _ => self.simple.clone(),
        }
    }

    /// Cached expander for the bean's type; the descriptor is built on first use
    pub fn bean_expander(&self, bean: &dyn Bean) -> Arc<BeanExpander> {
        if let Some(expander) = self
            .beans
            .read()
            .ok()
            .and_then(|beans| beans.get(bean.type_name()).cloned())
        {
            return expander;
        }

        let expander = Arc::new(BeanExpander::new(BeanDescriptor::describe(bean)));
        trace!(
            type_name = bean.type_name(),
            properties = ?expander.descriptor.properties,
            "Described bean"
        );
        match self.beans.write() {
            Ok(mut beans) => beans
                .entry(bean.type_name().to_string())
                .or_insert(expander)
                .clone(),
            Err(_) => expander,
        }
    }

    /// Number of bean types described so far
    pub fn described_beans(&self) -> usize {
        self.beans.read().map(|beans| beans.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for ExpanderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpanderRegistry")
            .field("described_beans", &self.described_beans())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{BeanError, PropertyDescriptor};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DESCRIBE_CALLS: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Bean for Counted {
        fn type_name(&self) -> &str {
            "Counted"
        }

        fn describe(&self) -> Vec<PropertyDescriptor> {
            DESCRIBE_CALLS.fetch_add(1, Ordering::SeqCst);
            vec![PropertyDescriptor::readable("n")]
        }

        fn read(&self, _property: &str) -> Result<Value, BeanError> {
            Ok(Value::Int(1))
        }
    }

    fn spec(name: &str, explode: bool) -> VarSpec {
        VarSpec {
            name: name.to_string(),
            explode,
            prefix: None,
        }
    }

    fn expand(operator: Operator, spec: &VarSpec, value: &Value) -> Option<String> {
        let registry = ExpanderRegistry::new();
        let context = ExpansionContext {
            operator,
            spec,
            encoding: operator.encoding(),
            registry: &registry,
        };
        registry
            .expander_for(value)
            .expand(&context, value)
            .expect("expands")
    }

    #[test]
    fn test_simple_expander_named_and_unnamed() {
        let value = Value::from("a b");
        assert_eq!(expand(Operator::Simple, &spec("q", false), &value), Some("a%20b".to_string()));
        assert_eq!(expand(Operator::Query, &spec("q", false), &value), Some("q=a%20b".to_string()));
        assert_eq!(
            expand(Operator::Query, &spec("q", false), &Value::from("")),
            Some("q=".to_string())
        );
        assert_eq!(
            expand(Operator::PathParameter, &spec("x", false), &Value::from("")),
            Some("x".to_string())
        );
    }

    #[test]
    fn test_prefix_truncates_before_encoding() {
        let spec = VarSpec {
            name: "var".to_string(),
            explode: false,
            prefix: Some(3),
        };
        assert_eq!(expand(Operator::Simple, &spec, &Value::from("value")), Some("val".to_string()));
    }

    #[test]
    fn test_list_expander() {
        let list = Value::list(["red", "green", "blue"]);
        assert_eq!(
            expand(Operator::Simple, &spec("list", false), &list),
            Some("red,green,blue".to_string())
        );
        assert_eq!(
            expand(Operator::Path, &spec("list", true), &list),
            Some("red/green/blue".to_string())
        );
        assert_eq!(
            expand(Operator::Query, &spec("list", false), &list),
            Some("list=red,green,blue".to_string())
        );
        assert_eq!(
            expand(Operator::Query, &spec("list", true), &list),
            Some("list=red&list=green&list=blue".to_string())
        );
        assert_eq!(expand(Operator::Query, &spec("list", true), &Value::List(vec![])), None);
    }

    #[test]
    fn test_map_expander() {
        let keys = Value::map([("semi", ";"), ("dot", "."), ("comma", ",")]);
        // BTreeMap orders keys
        assert_eq!(
            expand(Operator::Simple, &spec("keys", false), &keys),
            Some("comma,%2C,dot,.,semi,%3B".to_string())
        );
        assert_eq!(
            expand(Operator::Simple, &spec("keys", true), &keys),
            Some("comma=%2C,dot=.,semi=%3B".to_string())
        );
        assert_eq!(
            expand(Operator::Query, &spec("keys", true), &keys),
            Some("comma=%2C&dot=.&semi=%3B".to_string())
        );
        assert_eq!(
            expand(Operator::Query, &spec("keys", false), &keys),
            Some("keys=comma,%2C,dot,.,semi,%3B".to_string())
        );
    }

    #[test]
    fn test_map_expander_nests_with_dots() {
        let nested = Value::map([("owner", Value::map([("name", "ann")])), ("id", Value::Int(3))]);
        assert_eq!(
            expand(Operator::Query, &spec("filter", true), &nested),
            Some("id=3&owner.name=ann".to_string())
        );
    }

    #[test]
    fn test_registry_reuses_expanders() {
        let registry = ExpanderRegistry::new();
        let first = registry.expander_for(&Value::from("a"));
        let second = registry.expander_for(&Value::Int(1));
        assert!(Arc::ptr_eq(&first, &second));

        let before = DESCRIBE_CALLS.load(Ordering::SeqCst);
        let a = registry.bean_expander(&Counted);
        let b = registry.bean_expander(&Counted);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(DESCRIBE_CALLS.load(Ordering::SeqCst) - before, 1);
        assert_eq!(registry.described_beans(), 1);
    }
}
