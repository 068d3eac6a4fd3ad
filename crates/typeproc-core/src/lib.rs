//! # typeproc-core — Foundational Types for Descriptor-Driven Processing
//!
//! This crate defines the data every other `typeproc` crate works on: the
//! dynamic [`Value`], the [`RuntimeType`] of a value, the [`TypeDescriptor`]
//! describing a declared type, the ternary [`ValidationLevel`], and the
//! error taxonomy. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Descriptors are data.** A closed enum with structural `Eq`/`Hash`, so
//!    descriptors can key maps. [`TypeDescriptor::normalize`] gives every
//!    declared type exactly one canonical form.
//!
//! 2. **Exhaustive origins.** Non-atomic descriptors decompose into an
//!    [`Origin`] and arguments. Adding an origin forces every consumer to
//!    handle it.
//!
//! 3. **Forward references resolve once.** [`resolve()`] and
//!    [`TypeDescriptor::parse`] turn names and textual type expressions into
//!    descriptors up front; recursive bindings are reported, not followed.
//!
//! 4. **Values are totally ordered.** [`Value`] implements `Ord` and `Hash`
//!    (floats by bit pattern) so sets and dicts of values need no special
//!    casing.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `typeproc-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod descriptor;
pub mod error;
pub mod level;
pub mod parse;
pub mod resolve;
pub mod runtime;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use descriptor::{Origin, TypeDescriptor, WrapperKind};
pub use error::{
    BoxError, CoercionError, ConversionError, DefaultingError, TypingError,
    UnresolvableDescriptorError,
};
pub use level::{LevelMask, ValidationLevel};
pub use parse::parse_type_expr;
pub use resolve::{resolve, Bindings, LiteralItem, RawType};
pub use runtime::{RuntimeType, TypeName};
pub use value::{Object, Value};
