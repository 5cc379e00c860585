//! Dynamic argument and result values
//!
//! Contract methods are invoked through a dispatch table, so arguments and
//! decoded results travel as [`Value`]s. A value is either a scalar, a list, a
//! map, or a [`Bean`]: an object exposing named, readable properties.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Error raised when a bean property cannot be read
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to read property '{property}' of {type_name}: {message}")]
pub struct BeanError {
    pub type_name: String,
    pub property: String,
    pub message: String,
}

impl BeanError {
    pub fn new<T, P, M>(type_name: T, property: P, message: M) -> Self
    where
        T: Into<String>,
        P: Into<String>,
        M: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            property: property.into(),
            message: message.into(),
        }
    }
}

/// Describes one property of a bean type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    /// False when the property has no accessor
    pub readable: bool,
}

impl PropertyDescriptor {
    pub fn readable<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            readable: true,
        }
    }

    pub fn write_only<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            readable: false,
        }
    }
}

/// An object whose readable properties can be expanded into templates.
///
/// `describe` is called once per `type_name` and the result is cached by the
/// expander registry, so it must return the same properties for every
/// instance of a type.
pub trait Bean: Send + Sync {
    /// Name of the bean's type
    fn type_name(&self) -> &str;

    /// Properties in declaration order
    fn describe(&self) -> Vec<PropertyDescriptor>;

    /// Read a property. `Value::Null` means "no value".
    fn read(&self, property: &str) -> Result<Value, BeanError>;
}

/// Runtime shape of a value, used to pick an expansion strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    Scalar,
    List,
    Map,
    Bean,
}

/// Error converting between [`Value`] and serde types
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("JSON conversion error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bean(#[from] BeanError),

    #[error("Value is not representable as JSON: {0}")]
    Unrepresentable(String),
}

/// A dynamically typed argument or result
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Bean(Arc<dyn Bean>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn shape(&self) -> ValueShape {
        match self {
            Value::List(_) => ValueShape::List,
            Value::Map(_) => ValueShape::Map,
            Value::Bean(_) => ValueShape::Bean,
            _ => ValueShape::Scalar,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// String form of a scalar. `None` for null and composite values.
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            Value::Null | Value::List(_) | Value::Map(_) | Value::Bean(_) => None,
        }
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON. Beans are read property by property; bytes become a
    /// string when they are valid UTF-8.
    pub fn to_json(&self) -> Result<serde_json::Value, ValueError> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| ValueError::Unrepresentable(f.to_string()))?,
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => serde_json::Value::String(s.to_string()),
                Err(_) => serde_json::Value::Array(
                    b.iter().map(|byte| serde_json::Value::from(*byte)).collect(),
                ),
            },
            Value::List(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Result<_, _>>()?,
            ),
            Value::Map(map) => {
                let mut object = serde_json::Map::new();
                for (k, v) in map {
                    object.insert(k.clone(), v.to_json()?);
                }
                serde_json::Value::Object(object)
            }
            Value::Bean(bean) => {
                let mut object = serde_json::Map::new();
                for property in bean.describe().into_iter().filter(|p| p.readable) {
                    let value = bean.read(&property.name)?;
                    object.insert(property.name, value.to_json()?);
                }
                serde_json::Value::Object(object)
            }
        })
    }

    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, ValueError> {
        Ok(Value::from_json(serde_json::to_value(value)?))
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ValueError> {
        Ok(serde_json::from_value(self.to_json()?)?)
    }

    pub fn bean<B: Bean + 'static>(bean: B) -> Self {
        Value::Bean(Arc::new(bean))
    }

    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Bean(bean) => write!(f, "Bean({})", bean.type_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Bean(a), Value::Bean(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
