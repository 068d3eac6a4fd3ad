//! # Error Types — Structured Error Hierarchy
//!
//! Defines the errors raised while resolving descriptors and while deriving
//! or applying processors. All errors use `thiserror` for derive-based
//! `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Resolution errors name the descriptor, binding or expression at fault.
//! - Conversion errors carry the offending value, its runtime type and the
//!   target descriptor, and chain the failure that caused them.
//! - Coercion errors are the low-level cause of a failed atomic conversion
//!   and chain the standard library parse errors. They only surface as the
//!   source of a [`ConversionError`].
//! - [`TypingError`] is the umbrella returned by derivation.

use std::error::Error as StdError;
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

use crate::descriptor::TypeDescriptor;
use crate::runtime::RuntimeType;
use crate::value::Value;

/// Boxed cause chained under a higher-level error.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Top-level error returned by processor derivation and the convenience
/// operations.
#[derive(Error, Debug)]
pub enum TypingError {
    /// The descriptor could not be resolved or decomposed.
    #[error(transparent)]
    Unresolvable(#[from] UnresolvableDescriptorError),

    /// No default value could be produced.
    #[error(transparent)]
    Defaulting(#[from] DefaultingError),

    /// A value could not be converted.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// A descriptor that cannot be resolved, decomposed or derived.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnresolvableDescriptorError {
    /// Atomic and `Any` descriptors have no origin and arguments.
    #[error("descriptor {descriptor} cannot be decomposed into an origin and arguments")]
    NotDecomposable {
        /// The descriptor that was asked to decompose.
        descriptor: TypeDescriptor,
    },

    /// Deriving a processor re-entered the same derivation.
    #[error("cyclic descriptor: deriving the {operation} for {descriptor} requires itself")]
    Cycle {
        /// The processor kind being derived (`validator`, `defaulter`, `converter`).
        operation: &'static str,
        /// The descriptor whose derivation re-entered itself.
        descriptor: TypeDescriptor,
    },

    /// A forward reference names nothing in the binding context.
    #[error("unknown type name '{name}'")]
    UnknownName {
        /// The unbound name.
        name: String,
    },

    /// A binding refers back to itself while being resolved.
    #[error("binding '{name}' refers to itself")]
    RecursiveBinding {
        /// The binding being resolved when the loop was found.
        name: String,
    },

    /// Type arguments were applied to a type that takes none.
    #[error("type '{name}' does not accept type arguments")]
    NotGeneric {
        /// Rendered head the arguments were applied to.
        name: String,
    },

    /// A built-in generic received the wrong number of type arguments.
    #[error("'{origin}' expects {expected} type argument(s), got {found}")]
    Arity {
        /// The generic's runtime type.
        origin: RuntimeType,
        /// Number of arguments the generic takes.
        expected: usize,
        /// Number of arguments supplied.
        found: usize,
    },

    /// A well-formed but unsupported construct (e.g. variable-length tuples).
    #[error("unsupported type construct '{construct}': {reason}")]
    Unsupported {
        /// Rendered construct.
        construct: String,
        /// What is unsupported about it.
        reason: String,
    },

    /// A textual type expression failed to parse.
    #[error("syntax error in type expression '{input}' at offset {offset}: {message}")]
    Syntax {
        /// The full expression.
        input: String,
        /// Byte offset of the failure.
        offset: usize,
        /// What the parser expected.
        message: String,
    },
}

/// No default value could be produced for a descriptor.
#[derive(Error, Debug)]
pub enum DefaultingError {
    /// The runtime type cannot be constructed without arguments and no
    /// defaulter is registered for it.
    #[error("type '{runtime_type}' has no default constructor; register a defaulter for it")]
    NoDefaultConstructor {
        /// The runtime type without a zero-argument constructor.
        runtime_type: RuntimeType,
    },

    /// No rule produces a default for this descriptor shape.
    #[error("cannot produce a default for {descriptor}: {reason}")]
    Unsupported {
        /// The descriptor.
        descriptor: TypeDescriptor,
        /// Why no rule applies.
        reason: String,
    },

    /// A registered defaulter failed.
    #[error("defaulter for {descriptor} failed: {reason}")]
    Failed {
        /// The descriptor the defaulter is registered for.
        descriptor: TypeDescriptor,
        /// What went wrong.
        reason: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },
}

impl DefaultingError {
    /// A custom defaulter failure with no chained cause.
    pub fn failed(descriptor: &TypeDescriptor, reason: impl Into<String>) -> Self {
        Self::Failed {
            descriptor: descriptor.clone(),
            reason: reason.into(),
            source: None,
        }
    }
}

/// A value could not be converted to a descriptor.
///
/// The message embeds a bounded `repr()` of the value, its runtime type and
/// the target descriptor.
#[derive(Error, Debug)]
#[error("cannot convert {} of type '{value_type}' to {target}: {reason}", .value.short_repr())]
pub struct ConversionError {
    /// The value that failed to convert.
    pub value: Value,
    /// Runtime type of the value.
    pub value_type: RuntimeType,
    /// The descriptor conversion targeted.
    pub target: TypeDescriptor,
    /// What went wrong.
    pub reason: String,
    /// Underlying cause, if any.
    #[source]
    pub source: Option<BoxError>,
}

impl ConversionError {
    /// A conversion failure without a chained cause.
    pub fn new(value: &Value, target: &TypeDescriptor, reason: impl Into<String>) -> Self {
        Self {
            value: value.clone(),
            value_type: value.runtime_type(),
            target: target.clone(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Attach the failure that caused this one.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Why a runtime type could not be constructed from a value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    /// Only the absence marker is an instance of `NoneType`.
    #[error("only None converts to NoneType")]
    AbsenceOnly,

    /// The runtime type has no conversion from this source type.
    #[error("cannot build '{to}' from a value of type '{from}'")]
    Unsupported {
        /// Source runtime type name.
        from: String,
        /// Target runtime type name.
        to: &'static str,
    },

    /// A user-named type is only constructible through a registered converter.
    #[error("type '{type_name}' has no built-in constructor; register a converter for it")]
    NoConstructor {
        /// The user-named type.
        type_name: String,
    },

    /// A string did not parse as an integer.
    #[error("invalid literal for int: '{input}'")]
    ParseInt {
        /// The rejected input.
        input: String,
        /// Parser failure.
        #[source]
        source: ParseIntError,
    },

    /// A string did not parse as a float.
    #[error("could not convert string to float: '{input}'")]
    ParseFloat {
        /// The rejected input.
        input: String,
        /// Parser failure.
        #[source]
        source: ParseFloatError,
    },

    /// NaN and infinities have no integer value.
    #[error("cannot convert float {0} to integer")]
    NonFiniteFloat(f64),

    /// The value is outside the target's representable range.
    #[error("{value} is out of range for '{target}'")]
    OutOfRange {
        /// `repr()` of the value.
        value: String,
        /// Target runtime type name.
        target: &'static str,
    },

    /// The source value cannot be iterated.
    #[error("'{type_name}' object is not iterable")]
    NotIterable {
        /// Runtime type of the source value.
        type_name: String,
    },

    /// A dict was built from a sequence containing a non-pair.
    #[error("dictionary update sequence element #{index} ({element}) is not a 2-element tuple or list")]
    NotAPair {
        /// Position of the element.
        index: usize,
        /// `repr()` of the element.
        element: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_error_message_names_value_type_and_target() {
        let err = ConversionError::new(
            &Value::from("abc"),
            &TypeDescriptor::int(),
            "not a number",
        );
        let msg = err.to_string();
        assert!(msg.contains("'abc'"));
        assert!(msg.contains("'str'"));
        assert!(msg.contains("int"));
        assert!(msg.contains("not a number"));
    }

    #[test]
    fn conversion_error_chains_its_cause() {
        let cause = CoercionError::AbsenceOnly;
        let err = ConversionError::new(&Value::Int(1), &TypeDescriptor::none(), "no")
            .with_source(cause);
        let source = StdError::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("only None converts to NoneType"));
    }

    #[test]
    fn conversion_error_elides_huge_values() {
        let huge = Value::from("y".repeat(10_000));
        let err = ConversionError::new(&huge, &TypeDescriptor::int(), "too long");
        assert!(err.to_string().len() < 300);
    }

    #[test]
    fn typing_error_is_transparent() {
        let err: TypingError = UnresolvableDescriptorError::UnknownName {
            name: "Nope".into(),
        }
        .into();
        assert_eq!(err.to_string(), "unknown type name 'Nope'");
    }

    #[test]
    fn arity_message() {
        let err = UnresolvableDescriptorError::Arity {
            origin: RuntimeType::Map,
            expected: 2,
            found: 1,
        };
        assert_eq!(err.to_string(), "'dict' expects 2 type argument(s), got 1");
    }

    #[test]
    fn no_default_constructor_names_type() {
        let err = DefaultingError::NoDefaultConstructor {
            runtime_type: RuntimeType::named("Point"),
        };
        assert!(err.to_string().contains("'Point'"));
    }
}
