//! # Processor Entries
//!
//! A [`ProcessorEntry`] is what a registry stores for one descriptor: up to
//! three leaf processors and up to three creators.
//!
//! - **Leaf processors** ([`Validator`], [`Defaulter`], [`Converter`]) are
//!   used as-is whenever the registry derives that operation for the exact
//!   descriptor, or for a parametrized descriptor with this origin when no
//!   creator applies.
//! - **Creators** build a processor for a parametrized descriptor from the
//!   processors already derived for its arguments. A creator may decline by
//!   returning `Ok(None)`, in which case the origin's leaf processor (if any)
//!   is used instead.
//!
//! Processors are immutable `Arc<dyn Fn>` values: derived once, cached, and
//! shared freely between threads.

use std::fmt;
use std::sync::Arc;

use typeproc_core::{ConversionError, DefaultingError, TypeDescriptor, TypingError, ValidationLevel, Value};

use crate::registry::Registry;

/// Classifies how well a value matches a descriptor.
pub type Validator = Arc<dyn Fn(&Value) -> ValidationLevel + Send + Sync>;

/// Produces a default value.
pub type Defaulter = Arc<dyn Fn() -> Result<Value, DefaultingError> + Send + Sync>;

/// Converts a value into an instance of a descriptor.
pub type Converter = Arc<dyn Fn(&Value) -> Result<Value, ConversionError> + Send + Sync>;

/// Builds a processor for a parametrized descriptor from the processors of
/// its arguments. `Ok(None)` declines.
pub type Creator<P> =
    Arc<dyn Fn(&[P], &TypeDescriptor, &Registry) -> Result<Option<P>, TypingError> + Send + Sync>;

/// Creator of [`Validator`]s.
pub type ValidatorCreator = Creator<Validator>;
/// Creator of [`Defaulter`]s.
pub type DefaulterCreator = Creator<Defaulter>;
/// Creator of [`Converter`]s.
pub type ConverterCreator = Creator<Converter>;

/// The processors and creators registered for one descriptor.
#[derive(Clone, Default)]
pub struct ProcessorEntry {
    /// Leaf validator.
    pub validate: Option<Validator>,
    /// Leaf defaulter.
    pub default: Option<Defaulter>,
    /// Leaf converter.
    pub convert: Option<Converter>,
    /// Validator creator for parametrized descriptors with this origin.
    pub create_validator: Option<ValidatorCreator>,
    /// Defaulter creator for parametrized descriptors with this origin.
    pub create_defaulter: Option<DefaulterCreator>,
    /// Converter creator for parametrized descriptors with this origin.
    pub create_converter: Option<ConverterCreator>,
}

impl ProcessorEntry {
    /// An entry with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the leaf validator.
    pub fn with_validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> ValidationLevel + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }

    /// Set the leaf defaulter.
    pub fn with_defaulter<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<Value, DefaultingError> + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(f));
        self
    }

    /// Set the leaf converter.
    pub fn with_converter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        self.convert = Some(Arc::new(f));
        self
    }

    /// Set the validator creator.
    pub fn with_validator_creator<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Validator], &TypeDescriptor, &Registry) -> Result<Option<Validator>, TypingError>
            + Send
            + Sync
            + 'static,
    {
        self.create_validator = Some(Arc::new(f));
        self
    }

    /// Set the defaulter creator.
    pub fn with_defaulter_creator<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Defaulter], &TypeDescriptor, &Registry) -> Result<Option<Defaulter>, TypingError>
            + Send
            + Sync
            + 'static,
    {
        self.create_defaulter = Some(Arc::new(f));
        self
    }

    /// Set the converter creator.
    pub fn with_converter_creator<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Converter], &TypeDescriptor, &Registry) -> Result<Option<Converter>, TypingError>
            + Send
            + Sync
            + 'static,
    {
        self.create_converter = Some(Arc::new(f));
        self
    }

    /// Whether no slot is set.
    pub fn is_empty(&self) -> bool {
        self.validate.is_none()
            && self.default.is_none()
            && self.convert.is_none()
            && self.create_validator.is_none()
            && self.create_defaulter.is_none()
            && self.create_converter.is_none()
    }
}

impl fmt::Debug for ProcessorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorEntry")
            .field("validate", &self.validate.is_some())
            .field("default", &self.default.is_some())
            .field("convert", &self.convert.is_some())
            .field("create_validator", &self.create_validator.is_some())
            .field("create_defaulter", &self.create_defaulter.is_some())
            .field("create_converter", &self.create_converter.is_some())
            .finish()
    }
}

/// All three processors derived for one descriptor. Each derivation
/// succeeds or fails on its own.
pub struct Processors {
    /// Result of deriving the validator.
    pub validator: Result<Validator, TypingError>,
    /// Result of deriving the defaulter.
    pub defaulter: Result<Defaulter, TypingError>,
    /// Result of deriving the converter.
    pub converter: Result<Converter, TypingError>,
}

impl fmt::Debug for Processors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn describe<P>(slot: &Result<P, TypingError>) -> String {
            match slot {
                Ok(_) => "ok".to_string(),
                Err(e) => format!("error: {e}"),
            }
        }
        f.debug_struct("Processors")
            .field("validator", &describe(&self.validator))
            .field("defaulter", &describe(&self.defaulter))
            .field("converter", &describe(&self.converter))
            .finish()
    }
}
