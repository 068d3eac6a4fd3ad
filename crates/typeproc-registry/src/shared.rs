//! # Shared Registry
//!
//! A process-wide [`Registry`] created on first use, plus free functions
//! that forward to it. The registry is built from
//! [`RegistryConfig::from_env`]; an unreadable configuration is logged at
//! `warn` and the defaults are used instead.
//!
//! Registration through these functions is visible to every later caller
//! in the process.

use std::sync::OnceLock;

use tracing::warn;
use typeproc_core::{ConversionError, DefaultingError, TypeDescriptor, TypingError, ValidationLevel, Value};

use crate::config::{RegistryConfig, UnionStrategy};
use crate::entry::{Converter, Defaulter, Validator};
use crate::registry::Registry;

static SHARED: OnceLock<Registry> = OnceLock::new();

/// The process-wide registry.
pub fn registry() -> &'static Registry {
    SHARED.get_or_init(|| {
        let config = RegistryConfig::from_env().unwrap_or_else(|err| {
            warn!(error = %err, "falling back to default registry configuration");
            RegistryConfig::default()
        });
        Registry::with_config(config)
    })
}

/// [`Registry::validate`] on the shared registry.
pub fn validate(descriptor: &TypeDescriptor, value: &Value) -> Result<ValidationLevel, TypingError> {
    registry().validate(descriptor, value)
}

/// [`Registry::default`] on the shared registry.
pub fn default(descriptor: &TypeDescriptor) -> Result<Value, TypingError> {
    registry().default(descriptor)
}

/// [`Registry::convert`] on the shared registry.
pub fn convert(descriptor: &TypeDescriptor, value: &Value) -> Result<Value, TypingError> {
    registry().convert(descriptor, value)
}

/// [`Registry::convert_with`] on the shared registry.
pub fn convert_with(
    descriptor: &TypeDescriptor,
    value: &Value,
    strategy: UnionStrategy,
) -> Result<Value, TypingError> {
    registry().convert_with(descriptor, value, strategy)
}

/// [`Registry::validator_from`] on the shared registry.
pub fn validator_from(descriptor: &TypeDescriptor) -> Result<Validator, TypingError> {
    registry().validator_from(descriptor)
}

/// [`Registry::defaulter_from`] on the shared registry.
pub fn defaulter_from(descriptor: &TypeDescriptor) -> Result<Defaulter, TypingError> {
    registry().defaulter_from(descriptor)
}

/// [`Registry::converter_from`] on the shared registry.
pub fn converter_from(
    descriptor: &TypeDescriptor,
    strategy: UnionStrategy,
) -> Result<Converter, TypingError> {
    registry().converter_from(descriptor, strategy)
}

/// [`Registry::register_validator`] on the shared registry.
pub fn register_validator<F>(descriptor: &TypeDescriptor, f: F)
where
    F: Fn(&Value) -> ValidationLevel + Send + Sync + 'static,
{
    registry().register_validator(descriptor, f);
}

/// [`Registry::register_defaulter`] on the shared registry.
pub fn register_defaulter<F>(descriptor: &TypeDescriptor, f: F)
where
    F: Fn() -> Result<Value, DefaultingError> + Send + Sync + 'static,
{
    registry().register_defaulter(descriptor, f);
}

/// [`Registry::register_converter`] on the shared registry.
pub fn register_converter<F>(descriptor: &TypeDescriptor, f: F)
where
    F: Fn(&Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
{
    registry().register_converter(descriptor, f);
}

/// [`Registry::register_validator_creator`] on the shared registry.
pub fn register_validator_creator<F>(origin: &TypeDescriptor, f: F)
where
    F: Fn(&[Validator], &TypeDescriptor, &Registry) -> Result<Option<Validator>, TypingError>
        + Send
        + Sync
        + 'static,
{
    registry().register_validator_creator(origin, f);
}

/// [`Registry::register_defaulter_creator`] on the shared registry.
pub fn register_defaulter_creator<F>(origin: &TypeDescriptor, f: F)
where
    F: Fn(&[Defaulter], &TypeDescriptor, &Registry) -> Result<Option<Defaulter>, TypingError>
        + Send
        + Sync
        + 'static,
{
    registry().register_defaulter_creator(origin, f);
}

/// [`Registry::register_converter_creator`] on the shared registry.
pub fn register_converter_creator<F>(origin: &TypeDescriptor, f: F)
where
    F: Fn(&[Converter], &TypeDescriptor, &Registry) -> Result<Option<Converter>, TypingError>
        + Send
        + Sync
        + 'static,
{
    registry().register_converter_creator(origin, f);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_registry_is_a_singleton() {
        assert!(std::ptr::eq(registry(), registry()));
    }

    #[test]
    fn shared_registry_has_builtins() {
        let d = TypeDescriptor::list_of(TypeDescriptor::int());
        assert_eq!(validate(&d, &Value::list([1i64])).unwrap(), ValidationLevel::Full);
        assert_eq!(default(&d).unwrap(), Value::list(Vec::<Value>::new()));
    }

    #[test]
    fn registration_is_visible_to_free_functions() {
        let d = TypeDescriptor::named("SharedModuleMarker");
        register_defaulter(&d, || Ok(Value::from("marker")));
        assert_eq!(default(&d).unwrap(), Value::from("marker"));
        assert!(registry().has_entry(&d));
    }
}
