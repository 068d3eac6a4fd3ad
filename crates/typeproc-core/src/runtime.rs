//! # Runtime Types
//!
//! A `RuntimeType` is the concrete type of a [`Value`]. Atomic descriptors
//! wrap one, and parametrized descriptors use one as their origin (`list` is
//! the origin of `list[int]`).
//!
//! Each runtime type knows three things:
//!
//! 1. **Instance check**: [`RuntimeType::is_instance`]. There is no subtype
//!    relation: `bool` values are not instances of `int`.
//! 2. **Zero-argument construction**: [`RuntimeType::zero_value`].
//!    User-named types have none; they need a registered defaulter.
//! 3. **Construction from a value**: [`RuntimeType::construct_from`], the
//!    coercion an atomic converter applies when the value is not already an
//!    instance. User-named types need a registered converter.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::error::CoercionError;
use crate::value::Value;

/// Name of a user-declared runtime type.
///
/// Cheap to clone; compared and hashed by content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeName(Arc<str>);

impl TypeName {
    /// Create a type name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The concrete type of a runtime value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuntimeType {
    /// Type of the absence marker.
    NoneType,
    /// `bool`
    Bool,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `str`
    Str,
    /// `bytes`
    Bytes,
    /// `tuple`
    Tuple,
    /// `list`
    List,
    /// `set`
    Set,
    /// `dict`
    Map,
    /// A user-declared type; its instances are [`crate::Object`]s.
    Named(TypeName),
}

impl RuntimeType {
    /// Every built-in runtime type, in declaration order.
    pub fn builtins() -> &'static [RuntimeType] {
        &[
            Self::NoneType,
            Self::Bool,
            Self::Int,
            Self::Float,
            Self::Str,
            Self::Bytes,
            Self::Tuple,
            Self::List,
            Self::Set,
            Self::Map,
        ]
    }

    /// Shorthand for a user-named type.
    pub fn named(name: impl Into<TypeName>) -> Self {
        Self::Named(name.into())
    }

    /// The name this type is written with in type expressions.
    pub fn name(&self) -> &str {
        match self {
            Self::NoneType => "NoneType",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::Tuple => "tuple",
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "dict",
            Self::Named(name) => name.as_str(),
        }
    }

    /// Look up a built-in runtime type by the name it is written with.
    pub fn from_builtin_name(name: &str) -> Option<Self> {
        Self::builtins().iter().find(|t| t.name() == name).cloned()
    }

    /// Whether the type is a container that accepts type arguments.
    pub fn is_generic(&self) -> bool {
        matches!(
            self,
            Self::Tuple | Self::List | Self::Set | Self::Map | Self::Named(_)
        )
    }

    /// Number of type arguments the built-in generic expects, or `None` when
    /// any number is accepted (tuples and user-named generics).
    pub fn expected_arity(&self) -> Option<usize> {
        match self {
            Self::List | Self::Set => Some(1),
            Self::Map => Some(2),
            _ => None,
        }
    }

    /// Instance check. Exact: there is no subtype relation between runtime types.
    ///
    /// This differs from a subclass-aware check in one place: `bool` values
    /// are not instances of `int`. So `int` validates `true` as `NONE` and
    /// converts it to `1`, and `float` does not accept `int` values either.
    pub fn is_instance(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::NoneType, Value::None)
            | (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::Str, Value::Str(_))
            | (Self::Bytes, Value::Bytes(_))
            | (Self::Tuple, Value::Tuple(_))
            | (Self::List, Value::List(_))
            | (Self::Set, Value::Set(_))
            | (Self::Map, Value::Map(_)) => true,
            (Self::Named(name), Value::Object(obj)) => obj.type_name() == name,
            _ => false,
        }
    }

    /// The value produced by calling the type with no arguments, or `None`
    /// when the type has no zero-argument constructor.
    pub fn zero_value(&self) -> Option<Value> {
        match self {
            Self::NoneType => Some(Value::None),
            Self::Bool => Some(Value::Bool(false)),
            Self::Int => Some(Value::Int(0)),
            Self::Float => Some(Value::Float(0.0)),
            Self::Str => Some(Value::Str(String::new())),
            Self::Bytes => Some(Value::Bytes(Vec::new())),
            Self::Tuple => Some(Value::Tuple(Vec::new())),
            Self::List => Some(Value::List(Vec::new())),
            Self::Set => Some(Value::Set(BTreeSet::new())),
            Self::Map => Some(Value::Map(BTreeMap::new())),
            Self::Named(_) => None,
        }
    }

    /// Build an instance of this type from an arbitrary value.
    ///
    /// Values that already are instances are returned as clones.
    ///
    /// # Errors
    ///
    /// Returns a [`CoercionError`] describing why the value cannot be turned
    /// into an instance; parse failures chain the standard library error.
    pub fn construct_from(&self, value: &Value) -> Result<Value, CoercionError> {
        if self.is_instance(value) {
            return Ok(value.clone());
        }
        match self {
            Self::NoneType => Err(CoercionError::AbsenceOnly),
            Self::Bool => Ok(Value::Bool(value.is_truthy())),
            Self::Int => int_from(value),
            Self::Float => float_from(value),
            Self::Str => Ok(Value::Str(value.to_string())),
            Self::Bytes => bytes_from(value),
            Self::Tuple => Ok(Value::Tuple(self.elements_of(value)?)),
            Self::List => Ok(Value::List(self.elements_of(value)?)),
            Self::Set => Ok(Value::Set(self.elements_of(value)?.into_iter().collect())),
            Self::Map => map_from(value),
            Self::Named(name) => Err(CoercionError::NoConstructor {
                type_name: name.to_string(),
            }),
        }
    }

    fn elements_of(&self, value: &Value) -> Result<Vec<Value>, CoercionError> {
        value.elements().ok_or_else(|| CoercionError::NotIterable {
            type_name: value.runtime_type().to_string(),
        })
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn int_from(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(x) if !x.is_finite() => Err(CoercionError::NonFiniteFloat(*x)),
        Value::Float(x) => {
            let truncated = x.trunc();
            // i64::MAX as f64 rounds up to 2^63, which is out of range.
            if truncated < -(2f64.powi(63)) || truncated >= 2f64.powi(63) {
                return Err(CoercionError::OutOfRange {
                    value: value.repr(),
                    target: "int",
                });
            }
            Ok(Value::Int(truncated as i64))
        }
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|source| CoercionError::ParseInt {
                input: s.clone(),
                source,
            }),
        other => Err(CoercionError::Unsupported {
            from: other.runtime_type().to_string(),
            to: "int",
        }),
    }
}

fn float_from(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|source| CoercionError::ParseFloat {
                input: s.clone(),
                source,
            }),
        other => Err(CoercionError::Unsupported {
            from: other.runtime_type().to_string(),
            to: "float",
        }),
    }
}

fn bytes_from(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Str(s) => Ok(Value::Bytes(s.as_bytes().to_vec())),
        Value::Int(n) => {
            let out_of_range = || CoercionError::OutOfRange {
                value: value.repr(),
                target: "bytes",
            };
            let len = usize::try_from(*n).map_err(|_| out_of_range())?;
            // Zero-filled buffer of `len` bytes; an allocation failure is a range error.
            let mut buf = Vec::new();
            buf.try_reserve_exact(len).map_err(|_| out_of_range())?;
            buf.resize(len, 0);
            Ok(Value::Bytes(buf))
        }
        Value::Tuple(items) | Value::List(items) => items
            .iter()
            .map(|item| match item {
                Value::Int(i) => u8::try_from(*i).map_err(|_| CoercionError::OutOfRange {
                    value: item.repr(),
                    target: "bytes",
                }),
                other => Err(CoercionError::Unsupported {
                    from: other.runtime_type().to_string(),
                    to: "bytes",
                }),
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(Value::Bytes),
        other => Err(CoercionError::Unsupported {
            from: other.runtime_type().to_string(),
            to: "bytes",
        }),
    }
}

fn map_from(value: &Value) -> Result<Value, CoercionError> {
    let items = match value {
        Value::Tuple(items) | Value::List(items) => items.clone(),
        Value::Set(items) => items.iter().cloned().collect(),
        other => {
            return Err(CoercionError::Unsupported {
                from: other.runtime_type().to_string(),
                to: "dict",
            })
        }
    };
    let mut entries = BTreeMap::new();
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Tuple(mut pair) | Value::List(mut pair) if pair.len() == 2 => {
                let v = pair.pop().unwrap_or_default();
                let k = pair.pop().unwrap_or_default();
                entries.insert(k, v);
            }
            other => {
                return Err(CoercionError::NotAPair {
                    index,
                    element: other.repr(),
                })
            }
        }
    }
    Ok(Value::Map(entries))
}
