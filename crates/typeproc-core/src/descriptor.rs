//! # Type Descriptors — Canonical Declared Types
//!
//! A [`TypeDescriptor`] describes a declared type as data. Descriptors are
//! immutable and structurally hashable because the registry uses them as map
//! keys: two descriptors that denote the same declared type must compare and
//! hash equal. [`TypeDescriptor::normalize`] establishes that.
//!
//! ## Shapes
//!
//! | Variant | Example | Decomposes to |
//! |---------|---------|---------------|
//! | `Any` | `Any` | — |
//! | `Atomic` | `int`, `Point` | — |
//! | `Parametrized` | `dict[str, int]` | `(Type(dict), [str, int])` |
//! | `Union` | `int \| None` | `(Union, [int, None])` |
//! | `Literal` | `Literal['a', 1]` | `(Literal, [])` |
//! | `Wrapper` | `Final[int]` | `(Wrapper(Final), [int])` |
//!
//! Only `Origin::Type` heads are registry keys. The other origins are
//! dispatched by the registry's built-in rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::UnresolvableDescriptorError;
use crate::runtime::RuntimeType;
use crate::value::Value;

/// Annotation wrappers that are transparent to validation of their inner type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapperKind {
    /// Immutability annotation.
    Final,
    /// Class-level scope annotation (`ClassVar`).
    Shared,
    /// The cast marker: validates every value, converts through the inner type.
    Cast,
}

impl WrapperKind {
    /// Name used when rendering the wrapper.
    pub fn name(self) -> &'static str {
        match self {
            Self::Final => "Final",
            Self::Shared => "ClassVar",
            Self::Cast => "Cast",
        }
    }
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The canonical representation of a declared type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeDescriptor {
    /// Matches everything.
    Any,
    /// A concrete runtime type with no internal structure.
    Atomic(RuntimeType),
    /// A generic runtime type applied to argument descriptors.
    Parametrized {
        /// The unparameterized head.
        origin: RuntimeType,
        /// Argument descriptors, in declaration order.
        args: Vec<TypeDescriptor>,
    },
    /// Alternatives, in tie-break order.
    Union(Vec<TypeDescriptor>),
    /// A fixed set of allowed values, in declaration order.
    Literal(Vec<Value>),
    /// A transparent annotation around one inner descriptor.
    Wrapper {
        /// Which annotation.
        kind: WrapperKind,
        /// The annotated descriptor.
        inner: Box<TypeDescriptor>,
    },
}

/// The decomposition head of a non-atomic descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A runtime type used generically; the registry looks it up as
    /// `Atomic(runtime type)`.
    Type(RuntimeType),
    /// `Union[...]`
    Union,
    /// `Literal[...]`
    Literal,
    /// `Final[...]`, `ClassVar[...]` or `Cast[...]`
    Wrapper(WrapperKind),
}

impl TypeDescriptor {
    /// `int`
    pub fn int() -> Self {
        Self::Atomic(RuntimeType::Int)
    }

    /// `float`
    pub fn float() -> Self {
        Self::Atomic(RuntimeType::Float)
    }

    /// `str`
    pub fn str() -> Self {
        Self::Atomic(RuntimeType::Str)
    }

    /// `bool`
    pub fn bool() -> Self {
        Self::Atomic(RuntimeType::Bool)
    }

    /// `bytes`
    pub fn bytes() -> Self {
        Self::Atomic(RuntimeType::Bytes)
    }

    /// The absence type.
    pub fn none() -> Self {
        Self::Atomic(RuntimeType::NoneType)
    }

    /// A user-named atomic type.
    pub fn named(name: &str) -> Self {
        Self::Atomic(RuntimeType::named(name))
    }

    /// A generic runtime type applied to arguments.
    pub fn parametrized<I>(origin: RuntimeType, args: I) -> Self
    where
        I: IntoIterator<Item = TypeDescriptor>,
    {
        Self::Parametrized {
            origin,
            args: args.into_iter().collect(),
        }
    }

    /// `tuple[T1, ..., Tn]`
    pub fn tuple_of<I>(items: I) -> Self
    where
        I: IntoIterator<Item = TypeDescriptor>,
    {
        Self::parametrized(RuntimeType::Tuple, items)
    }

    /// `list[T]`
    pub fn list_of(item: TypeDescriptor) -> Self {
        Self::parametrized(RuntimeType::List, [item])
    }

    /// `set[T]`
    pub fn set_of(item: TypeDescriptor) -> Self {
        Self::parametrized(RuntimeType::Set, [item])
    }

    /// `dict[K, V]`
    pub fn dict_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::parametrized(RuntimeType::Map, [key, value])
    }

    /// A normalized union of the variants.
    pub fn union<I>(variants: I) -> Self
    where
        I: IntoIterator<Item = TypeDescriptor>,
    {
        Self::Union(variants.into_iter().collect()).normalize()
    }

    /// `Optional[T]`, i.e. `T | None`.
    pub fn optional(inner: TypeDescriptor) -> Self {
        Self::union([inner, Self::none()])
    }

    /// A normalized literal of the values.
    pub fn literal<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Literal(values.into_iter().map(Into::into).collect()).normalize()
    }

    /// Wrap in an annotation.
    pub fn wrapped(kind: WrapperKind, inner: TypeDescriptor) -> Self {
        Self::Wrapper {
            kind,
            inner: Box::new(inner),
        }
    }

    /// `Final[T]`
    pub fn final_of(inner: TypeDescriptor) -> Self {
        Self::wrapped(WrapperKind::Final, inner)
    }

    /// `ClassVar[T]`
    pub fn shared_of(inner: TypeDescriptor) -> Self {
        Self::wrapped(WrapperKind::Shared, inner)
    }

    /// `Cast[T]`
    pub fn cast_of(inner: TypeDescriptor) -> Self {
        Self::wrapped(WrapperKind::Cast, inner)
    }

    /// Split a non-atomic descriptor into its origin and argument descriptors.
    ///
    /// Literal descriptors decompose with no arguments; their values stay on
    /// the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`UnresolvableDescriptorError::NotDecomposable`] for `Any` and
    /// atomic descriptors.
    pub fn decompose(&self) -> Result<(Origin, Vec<TypeDescriptor>), UnresolvableDescriptorError> {
        match self {
            Self::Parametrized { origin, args } => Ok((Origin::Type(origin.clone()), args.clone())),
            Self::Union(variants) => Ok((Origin::Union, variants.clone())),
            Self::Literal(_) => Ok((Origin::Literal, Vec::new())),
            Self::Wrapper { kind, inner } => Ok((Origin::Wrapper(*kind), vec![(**inner).clone()])),
            Self::Any | Self::Atomic(_) => Err(UnresolvableDescriptorError::NotDecomposable {
                descriptor: self.clone(),
            }),
        }
    }

    /// Canonical form of this descriptor.
    ///
    /// - nested unions are flattened, duplicate variants removed (first
    ///   occurrence wins) and single-variant unions collapse to the variant;
    /// - duplicate literal values are removed (first occurrence wins);
    /// - a parametrized head with no arguments collapses to its atomic type;
    /// - wrappers are preserved around their normalized inner descriptor.
    ///
    /// Normalizing an already normalized descriptor returns it unchanged.
    pub fn normalize(&self) -> TypeDescriptor {
        match self {
            Self::Any | Self::Atomic(_) => self.clone(),
            Self::Parametrized { origin, args } if args.is_empty() => Self::Atomic(origin.clone()),
            Self::Parametrized { origin, args } => Self::Parametrized {
                origin: origin.clone(),
                args: args.iter().map(TypeDescriptor::normalize).collect(),
            },
            Self::Union(variants) => {
                let mut flat: Vec<TypeDescriptor> = Vec::with_capacity(variants.len());
                for variant in variants {
                    match variant.normalize() {
                        Self::Union(nested) => {
                            for v in nested {
                                push_unique(&mut flat, v);
                            }
                        }
                        other => push_unique(&mut flat, other),
                    }
                }
                if flat.len() == 1 {
                    flat.pop().unwrap_or(Self::Any)
                } else {
                    Self::Union(flat)
                }
            }
            Self::Literal(values) => {
                let mut unique: Vec<Value> = Vec::with_capacity(values.len());
                for value in values {
                    push_unique(&mut unique, value.clone());
                }
                Self::Literal(unique)
            }
            Self::Wrapper { kind, inner } => Self::wrapped(*kind, inner.normalize()),
        }
    }

    /// Whether this is a union.
    pub fn is_union(&self) -> bool {
        matches!(self, Self::Union(_))
    }

    /// Whether this is a union with the absence type among its variants.
    pub fn is_optional(&self) -> bool {
        match self {
            Self::Union(variants) => variants.iter().any(TypeDescriptor::is_absence),
            _ => false,
        }
    }

    /// Whether this is exactly `T | None` (or `None | T`).
    pub fn is_binary_optional(&self) -> bool {
        match self {
            Self::Union(variants) => {
                variants.len() == 2 && variants.iter().filter(|v| v.is_absence()).count() == 1
            }
            _ => false,
        }
    }

    /// The non-absence variant of a binary optional.
    pub fn optional_inner(&self) -> Option<&TypeDescriptor> {
        if !self.is_binary_optional() {
            return None;
        }
        match self {
            Self::Union(variants) => variants.iter().find(|v| !v.is_absence()),
            _ => None,
        }
    }

    /// Whether this is the absence type itself.
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::Atomic(RuntimeType::NoneType))
    }

    /// The allowed values of a literal; empty for every other shape.
    pub fn literal_values(&self) -> &[Value] {
        match self {
            Self::Literal(values) => values,
            _ => &[],
        }
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

impl From<RuntimeType> for TypeDescriptor {
    fn from(runtime_type: RuntimeType) -> Self {
        Self::Atomic(runtime_type)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Atomic(RuntimeType::NoneType) => f.write_str("None"),
            Self::Atomic(t) => f.write_str(t.name()),
            Self::Parametrized { origin, args } => {
                write!(f, "{origin}[")?;
                write_joined(f, args, ", ")?;
                f.write_str("]")
            }
            Self::Union(variants) => write_joined(f, variants, " | "),
            Self::Literal(values) => {
                f.write_str("Literal[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&value.repr())?;
                }
                f.write_str("]")
            }
            Self::Wrapper { kind, inner } => write!(f, "{kind}[{inner}]"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(
            TypeDescriptor::tuple_of([TypeDescriptor::int(), TypeDescriptor::str()]).to_string(),
            "tuple[int, str]"
        );
        assert_eq!(
            TypeDescriptor::optional(TypeDescriptor::int()).to_string(),
            "int | None"
        );
        assert_eq!(
            TypeDescriptor::literal(["a", "b"]).to_string(),
            "Literal['a', 'b']"
        );
        assert_eq!(
            TypeDescriptor::final_of(TypeDescriptor::int()).to_string(),
            "Final[int]"
        );
        assert_eq!(
            TypeDescriptor::dict_of(TypeDescriptor::str(), TypeDescriptor::Any).to_string(),
            "dict[str, Any]"
        );
    }

    #[test]
    fn union_flattens_and_dedupes() {
        let nested = TypeDescriptor::Union(vec![
            TypeDescriptor::int(),
            TypeDescriptor::Union(vec![TypeDescriptor::str(), TypeDescriptor::int()]),
            TypeDescriptor::none(),
        ]);
        assert_eq!(
            nested.normalize(),
            TypeDescriptor::Union(vec![
                TypeDescriptor::int(),
                TypeDescriptor::str(),
                TypeDescriptor::none(),
            ])
        );
    }

    #[test]
    fn single_variant_union_collapses() {
        let u = TypeDescriptor::Union(vec![TypeDescriptor::int(), TypeDescriptor::int()]);
        assert_eq!(u.normalize(), TypeDescriptor::int());
    }

    #[test]
    fn union_order_is_preserved() {
        let a = TypeDescriptor::union([TypeDescriptor::int(), TypeDescriptor::str()]);
        let b = TypeDescriptor::union([TypeDescriptor::str(), TypeDescriptor::int()]);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_generic_collapses_to_atomic() {
        let bare = TypeDescriptor::parametrized(RuntimeType::List, []);
        assert_eq!(bare.normalize(), TypeDescriptor::Atomic(RuntimeType::List));
    }

    #[test]
    fn literal_dedupes_first_wins() {
        assert_eq!(
            TypeDescriptor::literal(["b", "a", "b"]),
            TypeDescriptor::Literal(vec![Value::from("b"), Value::from("a")])
        );
    }

    #[test]
    fn normalization_reaches_inside_wrappers_and_args() {
        let raw = TypeDescriptor::final_of(TypeDescriptor::list_of(TypeDescriptor::Union(vec![
            TypeDescriptor::int(),
        ])));
        assert_eq!(
            raw.normalize(),
            TypeDescriptor::final_of(TypeDescriptor::list_of(TypeDescriptor::int()))
        );
    }

    #[test]
    fn decompose_shapes() {
        let (origin, args) = TypeDescriptor::dict_of(TypeDescriptor::str(), TypeDescriptor::int())
            .decompose()
            .unwrap();
        assert_eq!(origin, Origin::Type(RuntimeType::Map));
        assert_eq!(args, vec![TypeDescriptor::str(), TypeDescriptor::int()]);

        let (origin, args) = TypeDescriptor::cast_of(TypeDescriptor::int()).decompose().unwrap();
        assert_eq!(origin, Origin::Wrapper(WrapperKind::Cast));
        assert_eq!(args, vec![TypeDescriptor::int()]);

        let (origin, args) = TypeDescriptor::literal([1i64]).decompose().unwrap();
        assert_eq!(origin, Origin::Literal);
        assert!(args.is_empty());
    }

    #[test]
    fn atomic_does_not_decompose() {
        assert!(matches!(
            TypeDescriptor::int().decompose(),
            Err(UnresolvableDescriptorError::NotDecomposable { .. })
        ));
        assert!(TypeDescriptor::Any.decompose().is_err());
    }

    #[test]
    fn optional_predicates() {
        let opt = TypeDescriptor::optional(TypeDescriptor::int());
        assert!(opt.is_union());
        assert!(opt.is_optional());
        assert!(opt.is_binary_optional());
        assert_eq!(opt.optional_inner(), Some(&TypeDescriptor::int()));

        let wide = TypeDescriptor::union([
            TypeDescriptor::int(),
            TypeDescriptor::str(),
            TypeDescriptor::none(),
        ]);
        assert!(wide.is_optional());
        assert!(!wide.is_binary_optional());
        assert_eq!(wide.optional_inner(), None);

        assert!(!TypeDescriptor::int().is_optional());
    }
}
