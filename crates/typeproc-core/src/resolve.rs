//! # Descriptor Resolution
//!
//! Turns a raw declared type ([`RawType`]) into a normalized
//! [`TypeDescriptor`]. Raw types may hold forward references: bare names,
//! or whole type expressions in strings, resolved against a [`Bindings`]
//! context.
//!
//! ## Rules
//!
//! - `None` becomes the absence type; `Optional[T]` becomes `T | None`.
//! - `Annotated[T, ...]` is stripped to `T`.
//! - `Final`, `ClassVar` and `Cast` wrappers are preserved.
//! - Built-in generics have their arity checked (`list`/`set` take one
//!   argument, `dict` two). Variable-length tuples are rejected.
//! - A binding that refers back to itself is reported instead of looping.
//! - The result is normalized (see [`TypeDescriptor::normalize`]).

use std::collections::HashMap;
use std::fmt;

use crate::descriptor::{TypeDescriptor, WrapperKind};
use crate::error::UnresolvableDescriptorError;
use crate::parse::parse_type_expr;
use crate::runtime::RuntimeType;
use crate::value::Value;

/// A declared type before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum RawType {
    /// The absence shorthand.
    None,
    /// `Any`
    Any,
    /// A concrete runtime type.
    Type(RuntimeType),
    /// An already-built descriptor, used as-is.
    Descriptor(TypeDescriptor),
    /// A name to look up in the bindings.
    Name(String),
    /// A type expression in a string, parsed then resolved.
    Forward(String),
    /// `head[args]`
    Generic {
        /// The subscripted head.
        head: Box<RawType>,
        /// Subscript arguments.
        args: Vec<RawType>,
    },
    /// `Optional[T]`
    Optional(Box<RawType>),
    /// `Union[...]` or `A | B`.
    Union(Vec<RawType>),
    /// `Literal[...]`
    Literal(Vec<LiteralItem>),
    /// `Final[T]`, `ClassVar[T]` or `Cast[T]`.
    Wrapped {
        /// Which annotation.
        kind: WrapperKind,
        /// The annotated type.
        inner: Box<RawType>,
    },
    /// `Annotated[T, metadata...]`; the metadata is kept as text and dropped
    /// on resolution.
    Annotated {
        /// The annotated type.
        inner: Box<RawType>,
        /// Metadata, as written.
        metadata: Vec<String>,
    },
    /// `...`
    Ellipsis,
}

/// One entry of a raw `Literal[...]`.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralItem {
    /// A literal value.
    Value(Value),
    /// A nested `Literal[...]`, flattened on resolution.
    Nested(Vec<LiteralItem>),
}

impl RawType {
    /// A forward reference to a name or type expression.
    pub fn forward(expr: impl Into<String>) -> Self {
        Self::Forward(expr.into())
    }

    /// `head[args]` with a named head.
    pub fn generic<I>(head: &str, args: I) -> Self
    where
        I: IntoIterator<Item = RawType>,
    {
        Self::Generic {
            head: Box::new(Self::Name(head.to_string())),
            args: args.into_iter().collect(),
        }
    }
}

impl From<TypeDescriptor> for RawType {
    fn from(descriptor: TypeDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

impl From<RuntimeType> for RawType {
    fn from(runtime_type: RuntimeType) -> Self {
        Self::Type(runtime_type)
    }
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Any => f.write_str("Any"),
            Self::Type(t) => write!(f, "{t}"),
            Self::Descriptor(d) => write!(f, "{d}"),
            Self::Name(name) => f.write_str(name),
            Self::Forward(expr) => write!(f, "'{expr}'"),
            Self::Generic { head, args } => {
                write!(f, "{head}[")?;
                write_joined(f, args, ", ")?;
                f.write_str("]")
            }
            Self::Optional(inner) => write!(f, "Optional[{inner}]"),
            Self::Union(variants) => write_joined(f, variants, " | "),
            Self::Literal(items) => {
                f.write_str("Literal[")?;
                write_literal_items(f, items)?;
                f.write_str("]")
            }
            Self::Wrapped { kind, inner } => write!(f, "{kind}[{inner}]"),
            Self::Annotated { inner, metadata } => {
                write!(f, "Annotated[{inner}")?;
                for m in metadata {
                    write!(f, ", {m}")?;
                }
                f.write_str("]")
            }
            Self::Ellipsis => f.write_str("..."),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[RawType], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_literal_items(f: &mut fmt::Formatter<'_>, items: &[LiteralItem]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        match item {
            LiteralItem::Value(v) => f.write_str(&v.repr())?,
            LiteralItem::Nested(nested) => {
                f.write_str("Literal[")?;
                write_literal_items(f, nested)?;
                f.write_str("]")?;
            }
        }
    }
    Ok(())
}

/// Name → raw type context for resolving forward references.
#[derive(Debug, Clone)]
pub struct Bindings {
    names: HashMap<String, RawType>,
}

impl Bindings {
    /// A context with no names bound at all.
    pub fn empty() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    /// A context with the built-in names bound: every built-in runtime type
    /// by its name, `None`, `Any`, and the capitalized aliases `Tuple`,
    /// `List`, `Set` and `Dict`.
    pub fn builtin() -> Self {
        let mut bindings = Self::empty();
        for ty in RuntimeType::builtins() {
            bindings.bind(ty.name(), RawType::Type(ty.clone()));
        }
        bindings.bind("None", RawType::None);
        bindings.bind("Any", RawType::Any);
        bindings.bind("Tuple", RawType::Type(RuntimeType::Tuple));
        bindings.bind("List", RawType::Type(RuntimeType::List));
        bindings.bind("Set", RawType::Type(RuntimeType::Set));
        bindings.bind("Dict", RawType::Type(RuntimeType::Map));
        bindings
    }

    /// Bind a name, returning the previous binding.
    pub fn bind(&mut self, name: impl Into<String>, raw: impl Into<RawType>) -> Option<RawType> {
        self.names.insert(name.into(), raw.into())
    }

    /// Builder-style [`Bindings::bind`].
    pub fn with(mut self, name: impl Into<String>, raw: impl Into<RawType>) -> Self {
        self.bind(name, raw);
        self
    }

    /// Bind a user-named runtime type under its own name.
    pub fn with_named_type(self, name: &str) -> Self {
        self.with(name, RawType::Type(RuntimeType::named(name)))
    }

    /// Look up a name.
    pub fn get(&self, name: &str) -> Option<&RawType> {
        self.names.get(name)
    }
}

impl Default for Bindings {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolve a raw declared type into a normalized descriptor.
///
/// # Errors
///
/// Returns an [`UnresolvableDescriptorError`] for unbound names, recursive
/// bindings, malformed forward-reference expressions, arguments applied to
/// non-generic types, arity mismatches and unsupported constructs.
pub fn resolve(raw: &RawType, bindings: &Bindings) -> Result<TypeDescriptor, UnresolvableDescriptorError> {
    let mut resolver = Resolver {
        bindings,
        in_progress: Vec::new(),
    };
    Ok(resolver.resolve(raw)?.normalize())
}

impl TypeDescriptor {
    /// Parse a textual type expression and resolve it.
    ///
    /// # Errors
    ///
    /// See [`parse_type_expr`] and [`resolve`].
    pub fn parse(expr: &str, bindings: &Bindings) -> Result<Self, UnresolvableDescriptorError> {
        resolve(&parse_type_expr(expr)?, bindings)
    }
}

struct Resolver<'b> {
    bindings: &'b Bindings,
    /// Names whose bindings are currently being resolved.
    in_progress: Vec<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, raw: &RawType) -> Result<TypeDescriptor, UnresolvableDescriptorError> {
        match raw {
            RawType::None => Ok(TypeDescriptor::none()),
            RawType::Any => Ok(TypeDescriptor::Any),
            RawType::Type(t) => Ok(TypeDescriptor::Atomic(t.clone())),
            RawType::Descriptor(d) => Ok(d.clone()),
            RawType::Name(name) => self.resolve_name(name),
            RawType::Forward(expr) => {
                let parsed = parse_type_expr(expr)?;
                self.resolve(&parsed)
            }
            RawType::Generic { head, args } => self.resolve_generic(raw, head, args),
            RawType::Optional(inner) => Ok(TypeDescriptor::Union(vec![
                self.resolve(inner)?,
                TypeDescriptor::none(),
            ])),
            RawType::Union(variants) => Ok(TypeDescriptor::Union(
                variants
                    .iter()
                    .map(|v| self.resolve(v))
                    .collect::<Result<_, _>>()?,
            )),
            RawType::Literal(items) => {
                let mut values = Vec::new();
                flatten_literal(items, &mut values);
                Ok(TypeDescriptor::Literal(values))
            }
            RawType::Wrapped { kind, inner } => {
                Ok(TypeDescriptor::wrapped(*kind, self.resolve(inner)?))
            }
            RawType::Annotated { inner, .. } => self.resolve(inner),
            RawType::Ellipsis => Err(UnresolvableDescriptorError::Unsupported {
                construct: "...".to_string(),
                reason: "'...' is only meaningful as the last argument of tuple[...]".to_string(),
            }),
        }
    }

    fn resolve_name(&mut self, name: &str) -> Result<TypeDescriptor, UnresolvableDescriptorError> {
        if self.in_progress.iter().any(|n| n == name) {
            return Err(UnresolvableDescriptorError::RecursiveBinding {
                name: name.to_string(),
            });
        }
        let bound = self
            .bindings
            .get(name)
            .ok_or_else(|| UnresolvableDescriptorError::UnknownName {
                name: name.to_string(),
            })?;
        self.in_progress.push(name.to_string());
        let result = self.resolve(bound);
        self.in_progress.pop();
        result
    }

    fn resolve_generic(
        &mut self,
        raw: &RawType,
        head: &RawType,
        args: &[RawType],
    ) -> Result<TypeDescriptor, UnresolvableDescriptorError> {
        let origin = match self.resolve(head)? {
            TypeDescriptor::Atomic(t) if t.is_generic() => t,
            other => {
                return Err(UnresolvableDescriptorError::NotGeneric {
                    name: other.to_string(),
                })
            }
        };
        if origin == RuntimeType::Tuple && args.iter().any(|a| *a == RawType::Ellipsis) {
            return Err(UnresolvableDescriptorError::Unsupported {
                construct: raw.to_string(),
                reason: "variable-length tuples are not supported; use list[T]".to_string(),
            });
        }
        if let Some(expected) = origin.expected_arity() {
            if args.len() != expected {
                return Err(UnresolvableDescriptorError::Arity {
                    origin,
                    expected,
                    found: args.len(),
                });
            }
        }
        let args = args
            .iter()
            .map(|a| self.resolve(a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TypeDescriptor::Parametrized { origin, args })
    }
}

fn flatten_literal(items: &[LiteralItem], out: &mut Vec<Value>) {
    for item in items {
        match item {
            LiteralItem::Value(v) => out.push(v.clone()),
            LiteralItem::Nested(nested) => flatten_literal(nested, out),
        }
    }
}
