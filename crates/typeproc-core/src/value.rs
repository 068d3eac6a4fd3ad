//! # Dynamic Values
//!
//! `Value` is the in-process value that validators inspect, defaulters
//! produce and converters coerce. It is deliberately closed: every runtime
//! type a descriptor can name has exactly one representation here.
//!
//! ## Ordering and Hashing
//!
//! Values are members of sets and keys of dicts, so `Value` implements a
//! total `Eq`, `Ord` and `Hash`. Floats compare with [`f64::total_cmp`] and
//! hash by bit pattern, which keeps the three impls consistent (`NaN` equals
//! itself, `0.0` and `-0.0` are distinct). Values of different runtime types
//! are never equal: `Int(1)` is not `Float(1.0)` and not `Bool(true)`.
//!
//! ## Text Forms
//!
//! - [`fmt::Display`] is the `str()` form: strings render bare.
//! - [`Value::repr`] is the `repr()` form: strings are quoted.
//!
//! Containers always render their elements in `repr()` form, so
//! `["a", 1]` displays as `['a', 1]` either way.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::runtime::{RuntimeType, TypeName};

/// Longest `repr()` embedded in an error message before it is elided.
const MAX_REPR_IN_MESSAGES: usize = 96;

/// A dynamic, in-process value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The absence marker.
    #[default]
    None,
    /// A boolean.
    Bool(bool),
    /// A signed 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A UTF-8 string.
    Str(String),
    /// A byte string.
    Bytes(Vec<u8>),
    /// A fixed-size, positional sequence.
    Tuple(Vec<Value>),
    /// A variable-size sequence.
    List(Vec<Value>),
    /// A set of unique values.
    Set(BTreeSet<Value>),
    /// A mapping from keys to values.
    Map(BTreeMap<Value, Value>),
    /// An instance of a user-named type.
    Object(Object),
}

/// An instance of a user-named runtime type.
///
/// The engine never looks inside an object; it only compares the type name
/// during instance checks. Custom converters and defaulters build objects.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Object {
    type_name: TypeName,
    fields: BTreeMap<String, Value>,
}

impl Object {
    /// Create an object of the given type with no fields.
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Name of the runtime type this object is an instance of.
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Look up a field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// All fields, ordered by name.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Insert or replace a field, returning the previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }
}

impl Value {
    /// Build a tuple.
    pub fn tuple<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Build a list.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a set; duplicates collapse.
    pub fn set<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// Build a dict; later duplicate keys win.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Whether this is the absence marker.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The runtime type this value is a direct instance of.
    pub fn runtime_type(&self) -> RuntimeType {
        match self {
            Self::None => RuntimeType::NoneType,
            Self::Bool(_) => RuntimeType::Bool,
            Self::Int(_) => RuntimeType::Int,
            Self::Float(_) => RuntimeType::Float,
            Self::Str(_) => RuntimeType::Str,
            Self::Bytes(_) => RuntimeType::Bytes,
            Self::Tuple(_) => RuntimeType::Tuple,
            Self::List(_) => RuntimeType::List,
            Self::Set(_) => RuntimeType::Set,
            Self::Map(_) => RuntimeType::Map,
            Self::Object(obj) => RuntimeType::Named(obj.type_name.clone()),
        }
    }

    /// Conventional truthiness: `None`, `false`, zero, and empty strings or
    /// containers are false. Objects are always true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Bytes(b) => !b.is_empty(),
            Self::Tuple(items) | Self::List(items) => !items.is_empty(),
            Self::Set(items) => !items.is_empty(),
            Self::Map(entries) => !entries.is_empty(),
            Self::Object(_) => true,
        }
    }

    /// Number of elements for sized values (strings count characters).
    /// `None` for scalars and objects.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Str(s) => Some(s.chars().count()),
            Self::Bytes(b) => Some(b.len()),
            Self::Tuple(items) | Self::List(items) => Some(items.len()),
            Self::Set(items) => Some(items.len()),
            Self::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// The elements produced by iterating this value, or `None` when it is
    /// not iterable. Strings yield one-character strings, bytes yield ints,
    /// dicts yield their keys.
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Self::Str(s) => Some(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Self::Bytes(b) => Some(b.iter().map(|&byte| Value::Int(i64::from(byte))).collect()),
            Self::Tuple(items) | Self::List(items) => Some(items.clone()),
            Self::Set(items) => Some(items.iter().cloned().collect()),
            Self::Map(entries) => Some(entries.keys().cloned().collect()),
            _ => None,
        }
    }

    /// The `repr()` form: like `Display`, but strings are quoted.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_repr(&mut out);
        out
    }

    /// `repr()` elided to a bounded length for error messages.
    pub fn short_repr(&self) -> String {
        let repr = self.repr();
        if repr.chars().count() <= MAX_REPR_IN_MESSAGES {
            return repr;
        }
        let mut short: String = repr.chars().take(MAX_REPR_IN_MESSAGES).collect();
        short.push_str("...");
        short
    }

    fn write_repr(&self, f: &mut impl fmt::Write) -> fmt::Result {
        match self {
            Self::Str(s) => write_quoted(f, s),
            other => write_str_form(f, other),
        }
    }

    /// Convert to JSON. Tuples and sets become arrays, dict keys are
    /// stringified with their `str()` form, bytes become arrays of ints,
    /// objects become JSON objects of their fields and non-finite floats
    /// become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::None => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::Str(s) => Json::String(s.clone()),
            Self::Bytes(b) => Json::Array(b.iter().map(|&byte| Json::from(byte)).collect()),
            Self::Tuple(items) | Self::List(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Set(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Self::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Self::Object(obj) => Json::Object(
                obj.fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Rank used to order values of different runtime types.
    fn rank(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Str(_) => 4,
            Self::Bytes(_) => 5,
            Self::Tuple(_) => 6,
            Self::List(_) => 7,
            Self::Set(_) => 8,
            Self::Map(_) => 9,
            Self::Object(_) => 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Equality, ordering, hashing
// ---------------------------------------------------------------------------

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::None, Self::None) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::Tuple(a), Self::Tuple(b)) | (Self::List(a), Self::List(b)) => a.cmp(b),
            (Self::Set(a), Self::Set(b)) => a.cmp(b),
            (Self::Map(a), Self::Map(b)) => a.cmp(b),
            (Self::Object(a), Self::Object(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::None => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Str(s) => s.hash(state),
            Self::Bytes(b) => b.hash(state),
            Self::Tuple(items) | Self::List(items) => items.hash(state),
            Self::Set(items) => items.hash(state),
            Self::Map(entries) => entries.hash(state),
            Self::Object(obj) => obj.hash(state),
        }
    }
}

// ---------------------------------------------------------------------------
// Text forms
// ---------------------------------------------------------------------------

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_str_form(f, self)
    }
}

fn write_str_form(f: &mut impl fmt::Write, value: &Value) -> fmt::Result {
    match value {
        Value::None => f.write_str("None"),
        Value::Bool(true) => f.write_str("True"),
        Value::Bool(false) => f.write_str("False"),
        Value::Int(i) => write!(f, "{i}"),
        Value::Float(x) => write_float(f, *x),
        Value::Str(s) => f.write_str(s),
        Value::Bytes(b) => write!(f, "b'{}'", b.escape_ascii()),
        Value::Tuple(items) => {
            f.write_char('(')?;
            write_items(f, items.iter())?;
            if items.len() == 1 {
                f.write_char(',')?;
            }
            f.write_char(')')
        }
        Value::List(items) => {
            f.write_char('[')?;
            write_items(f, items.iter())?;
            f.write_char(']')
        }
        Value::Set(items) if items.is_empty() => f.write_str("set()"),
        Value::Set(items) => {
            f.write_char('{')?;
            write_items(f, items.iter())?;
            f.write_char('}')
        }
        Value::Map(entries) => {
            f.write_char('{')?;
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                k.write_repr(f)?;
                f.write_str(": ")?;
                v.write_repr(f)?;
            }
            f.write_char('}')
        }
        Value::Object(obj) => {
            write!(f, "{}(", obj.type_name)?;
            for (i, (name, v)) in obj.fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}=")?;
                v.write_repr(f)?;
            }
            f.write_char(')')
        }
    }
}

fn write_items<'a>(
    f: &mut impl fmt::Write,
    items: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.write_repr(f)?;
    }
    Ok(())
}

fn write_float(f: &mut impl fmt::Write, x: f64) -> fmt::Result {
    if x.is_nan() {
        f.write_str("nan")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "inf" } else { "-inf" })
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        write!(f, "{x:.1}")
    } else {
        write!(f, "{x}")
    }
}

fn write_quoted(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    f.write_char('\'')?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('\'')
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u8> for Value {
    fn from(i: u8) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Self::Object(obj)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::None, Into::into)
    }
}

/// JSON ingestion. Arrays become lists, objects become dicts with string
/// keys, integral numbers that fit `i64` become ints and every other number
/// becomes a float.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::None,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Self::Str(s),
            Json::Array(items) => Self::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Bytes(b) => serializer.serialize_bytes(b),
            Self::Tuple(items) | Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::Object(obj) => {
                let mut map = serializer.serialize_map(Some(obj.fields.len()))?;
                for (k, v) in &obj.fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}
