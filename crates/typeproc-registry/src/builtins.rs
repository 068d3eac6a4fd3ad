//! # Built-in Processors
//!
//! Structural processors for `Any`, atomic types and literals, and the
//! creator entries installed for the built-in containers.
//!
//! ## Containers
//!
//! | Origin  | Validate                              | Default         | Convert                              |
//! |---------|---------------------------------------|-----------------|--------------------------------------|
//! | `tuple` | exact length, every element           | element-wise    | length must match, then positional   |
//! | `list`  | every element                         | `[]`            | element-wise from any iterable       |
//! | `set`   | every element                         | `set()`         | element-wise from any iterable       |
//! | `dict`  | every key and every value             | `{}`            | keys and values, also from pairs     |
//!
//! Container validators are `PARTIAL` when the container type matches but
//! some part does not. Converters return values that already validate
//! `FULL` unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;
use typeproc_core::{
    ConversionError, DefaultingError, RuntimeType, TypeDescriptor, TypingError,
    UnresolvableDescriptorError, ValidationLevel, Value,
};

use crate::entry::{Converter, Defaulter, ProcessorEntry, Validator};
use crate::registry::Registry;

/// Register the container entries.
pub(crate) fn install(registry: &Registry) {
    registry.register(&TypeDescriptor::Atomic(RuntimeType::Tuple), tuple_entry());
    registry.register(
        &TypeDescriptor::Atomic(RuntimeType::List),
        sequence_entry(RuntimeType::List),
    );
    registry.register(
        &TypeDescriptor::Atomic(RuntimeType::Set),
        sequence_entry(RuntimeType::Set),
    );
    registry.register(&TypeDescriptor::Atomic(RuntimeType::Map), dict_entry());
}

// ----------------------------------------------------------------------------
// Structural processors
// ----------------------------------------------------------------------------

pub(crate) fn any_validator() -> Validator {
    Arc::new(|_| ValidationLevel::Full)
}

pub(crate) fn instance_validator(runtime_type: RuntimeType) -> Validator {
    Arc::new(move |value| runtime_type.is_instance(value).into())
}

pub(crate) fn constant(value: Value) -> Defaulter {
    Arc::new(move || Ok(value.clone()))
}

pub(crate) fn identity_converter() -> Converter {
    Arc::new(|value| Ok(value.clone()))
}

pub(crate) fn atomic_converter(runtime_type: RuntimeType, target: TypeDescriptor) -> Converter {
    Arc::new(move |value| {
        runtime_type.construct_from(value).map_err(|cause| {
            ConversionError::new(value, &target, cause.to_string()).with_source(cause)
        })
    })
}

pub(crate) fn literal_validator(allowed: Vec<Value>) -> Validator {
    Arc::new(move |value| allowed.contains(value).into())
}

pub(crate) fn literal_defaulter(d: &TypeDescriptor) -> Result<Defaulter, TypingError> {
    match d.literal_values().first() {
        Some(first) => Ok(constant(first.clone())),
        None => Err(DefaultingError::Unsupported {
            descriptor: d.clone(),
            reason: "a literal without values has no default".to_string(),
        }
        .into()),
    }
}

/// Members pass through; anything else becomes the first literal value.
pub(crate) fn literal_converter(target: TypeDescriptor) -> Converter {
    let allowed = target.literal_values().to_vec();
    Arc::new(move |value| {
        if allowed.contains(value) {
            return Ok(value.clone());
        }
        match allowed.first() {
            Some(first) => {
                trace!(
                    descriptor = %target,
                    value = %value.short_repr(),
                    "value is not a literal member, using the first literal"
                );
                Ok(first.clone())
            }
            None => Err(ConversionError::new(value, &target, "the literal has no values")),
        }
    })
}

// ----------------------------------------------------------------------------
// Container entries
// ----------------------------------------------------------------------------

fn arity(origin: &RuntimeType, expected: usize, found: usize) -> TypingError {
    UnresolvableDescriptorError::Arity {
        origin: origin.clone(),
        expected,
        found,
    }
    .into()
}

fn element_failure(value: &Value, target: &TypeDescriptor, what: String, cause: ConversionError) -> ConversionError {
    ConversionError::new(value, target, format!("{what} could not be converted")).with_source(cause)
}

fn tuple_entry() -> ProcessorEntry {
    ProcessorEntry::new()
        .with_validator_creator(|inner, _, _| {
            let inner = inner.to_vec();
            let validator: Validator = Arc::new(move |value| match value {
                Value::Tuple(items) if items.len() == inner.len() => {
                    ValidationLevel::all_parts(items.iter().zip(&inner).map(|(item, v)| v(item)))
                }
                _ => ValidationLevel::None,
            });
            Ok(Some(validator))
        })
        .with_defaulter_creator(|inner, _, _| {
            let inner = inner.to_vec();
            let defaulter: Defaulter = Arc::new(move || {
                inner
                    .iter()
                    .map(|default| default())
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Tuple)
            });
            Ok(Some(defaulter))
        })
        .with_converter_creator(|inner, d, registry| {
            let inner = inner.to_vec();
            let validator = registry.validator_from(d)?;
            let target = d.clone();
            let converter: Converter = Arc::new(move |value| {
                let Some(len) = value.len() else {
                    return Err(ConversionError::new(value, &target, "the value has no length"));
                };
                if len != inner.len() {
                    return Err(ConversionError::new(
                        value,
                        &target,
                        format!("size mismatch: expected {} elements, got {len}", inner.len()),
                    ));
                }
                if validator(value).is_full() {
                    return Ok(value.clone());
                }
                let items = value.elements().unwrap_or_default();
                items
                    .iter()
                    .zip(&inner)
                    .enumerate()
                    .map(|(index, (item, convert))| {
                        convert(item).map_err(|cause| {
                            element_failure(value, &target, format!("element {index}"), cause)
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Tuple)
            });
            Ok(Some(converter))
        })
}

fn sequence_level(origin: &RuntimeType, value: &Value, item: &Validator) -> ValidationLevel {
    match (origin, value) {
        (RuntimeType::List, Value::List(items)) => ValidationLevel::all_parts(items.iter().map(|i| item(i))),
        (RuntimeType::Set, Value::Set(items)) => ValidationLevel::all_parts(items.iter().map(|i| item(i))),
        _ => ValidationLevel::None,
    }
}

/// `list[T]` and `set[T]`.
fn sequence_entry(origin: RuntimeType) -> ProcessorEntry {
    let for_validator = origin.clone();
    let for_defaulter = origin.clone();
    let for_converter = origin;
    ProcessorEntry::new()
        .with_validator_creator(move |inner, _, _| match inner {
            [item] => {
                let item = Arc::clone(item);
                let origin = for_validator.clone();
                let validator: Validator = Arc::new(move |value| sequence_level(&origin, value, &item));
                Ok(Some(validator))
            }
            _ => Err(arity(&for_validator, 1, inner.len())),
        })
        .with_defaulter_creator(move |inner, d, _| {
            if inner.len() != 1 {
                return Err(arity(&for_defaulter, 1, inner.len()));
            }
            match for_defaulter.zero_value() {
                Some(empty) => Ok(Some(constant(empty))),
                None => Err(DefaultingError::failed(d, "no empty instance").into()),
            }
        })
        .with_converter_creator(move |inner, d, registry| match inner {
            [item] => {
                let item = Arc::clone(item);
                let origin = for_converter.clone();
                let validator = registry.validator_from(d)?;
                let target = d.clone();
                let converter: Converter = Arc::new(move |value| {
                    if validator(value).is_full() {
                        return Ok(value.clone());
                    }
                    let Some(elements) = value.elements() else {
                        return Err(ConversionError::new(value, &target, "the value is not iterable"));
                    };
                    let converted = elements
                        .iter()
                        .enumerate()
                        .map(|(index, element)| {
                            item(element).map_err(|cause| {
                                element_failure(value, &target, format!("element {index}"), cause)
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(match origin {
                        RuntimeType::Set => Value::Set(converted.into_iter().collect()),
                        _ => Value::List(converted),
                    })
                });
                Ok(Some(converter))
            }
            _ => Err(arity(&for_converter, 1, inner.len())),
        })
}

/// `dict[K, V]`.
fn dict_entry() -> ProcessorEntry {
    ProcessorEntry::new()
        .with_validator_creator(|inner, _, _| match inner {
            [key, val] => {
                let (key, val) = (Arc::clone(key), Arc::clone(val));
                let validator: Validator = Arc::new(move |value| match value {
                    Value::Map(entries) => ValidationLevel::all_parts(
                        entries.keys().map(|k| key(k)).chain(entries.values().map(|v| val(v))),
                    ),
                    _ => ValidationLevel::None,
                });
                Ok(Some(validator))
            }
            _ => Err(arity(&RuntimeType::Map, 2, inner.len())),
        })
        .with_defaulter_creator(|inner, _, _| {
            if inner.len() != 2 {
                return Err(arity(&RuntimeType::Map, 2, inner.len()));
            }
            Ok(Some(constant(Value::Map(Default::default()))))
        })
        .with_converter_creator(|inner, d, registry| match inner {
            [key, val] => {
                let (key, val) = (Arc::clone(key), Arc::clone(val));
                let validator = registry.validator_from(d)?;
                let target = d.clone();
                let converter: Converter = Arc::new(move |value| {
                    if validator(value).is_full() {
                        return Ok(value.clone());
                    }
                    let source = RuntimeType::Map.construct_from(value).map_err(|cause| {
                        ConversionError::new(value, &target, cause.to_string()).with_source(cause)
                    })?;
                    let Value::Map(entries) = source else {
                        return Err(ConversionError::new(value, &target, "the value is not a mapping"));
                    };
                    let mut converted = BTreeMap::new();
                    for (k, v) in &entries {
                        let new_key = key(k).map_err(|cause| {
                            element_failure(value, &target, format!("key {}", k.short_repr()), cause)
                        })?;
                        let new_val = val(v).map_err(|cause| {
                            element_failure(value, &target, format!("value for key {}", k.short_repr()), cause)
                        })?;
                        converted.insert(new_key, new_val);
                    }
                    Ok(Value::Map(converted))
                });
                Ok(Some(converter))
            }
            _ => Err(arity(&RuntimeType::Map, 2, inner.len())),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TypeDescriptor {
        TypeDescriptor::tuple_of([TypeDescriptor::int(), TypeDescriptor::str()])
    }

    #[test]
    fn atomic_failure_is_a_conversion_error_over_the_coercion() {
        let registry = Registry::new();
        let err = registry.convert(&TypeDescriptor::int(), &Value::from("x")).unwrap_err();
        let TypingError::Conversion(conversion) = err else {
            panic!("expected a conversion error");
        };
        let source = std::error::Error::source(&conversion).expect("chained cause");
        assert!(matches!(
            source.downcast_ref::<typeproc_core::CoercionError>(),
            Some(typeproc_core::CoercionError::ParseInt { .. })
        ));
    }

    #[test]
    fn tuple_validation_levels() {
        let registry = Registry::new();
        let d = pair();
        assert_eq!(
            registry.validate(&d, &Value::tuple([Value::Int(1), Value::from("a")])).unwrap(),
            ValidationLevel::Full
        );
        assert_eq!(
            registry.validate(&d, &Value::tuple([Value::from("1"), Value::from("a")])).unwrap(),
            ValidationLevel::Partial
        );
        assert_eq!(
            registry.validate(&d, &Value::tuple([1i64])).unwrap(),
            ValidationLevel::None
        );
        assert_eq!(
            registry.validate(&d, &Value::list([Value::Int(1), Value::from("a")])).unwrap(),
            ValidationLevel::None
        );
    }

    #[test]
    fn tuple_default_is_element_wise() {
        let registry = Registry::new();
        assert_eq!(
            registry.default(&pair()).unwrap(),
            Value::tuple([Value::Int(0), Value::from("")])
        );
    }

    #[test]
    fn tuple_conversion_checks_size_first() {
        let registry = Registry::new();
        let err = registry.convert(&pair(), &Value::list([1i64, 2, 3])).unwrap_err();
        assert!(err.to_string().contains("size mismatch"));
        let err = registry.convert(&pair(), &Value::Int(1)).unwrap_err();
        assert!(err.to_string().contains("no length"));
    }

    #[test]
    fn tuple_conversion_is_positional() {
        let registry = Registry::new();
        assert_eq!(
            registry.convert(&pair(), &Value::list(["4", "x"])).unwrap(),
            Value::tuple([Value::Int(4), Value::from("x")])
        );
    }

    #[test]
    fn list_and_set_validation() {
        let registry = Registry::new();
        let ints = TypeDescriptor::list_of(TypeDescriptor::int());
        assert_eq!(registry.validate(&ints, &Value::list([1i64, 2])).unwrap(), ValidationLevel::Full);
        assert_eq!(registry.validate(&ints, &Value::list(Vec::<Value>::new())).unwrap(), ValidationLevel::Full);
        assert_eq!(registry.validate(&ints, &Value::list(["1"])).unwrap(), ValidationLevel::Partial);
        assert_eq!(registry.validate(&ints, &Value::set([1i64])).unwrap(), ValidationLevel::None);
        let set = TypeDescriptor::set_of(TypeDescriptor::int());
        assert_eq!(registry.validate(&set, &Value::set([1i64])).unwrap(), ValidationLevel::Full);
    }

    #[test]
    fn containers_default_to_empty() {
        let registry = Registry::new();
        assert_eq!(
            registry.default(&TypeDescriptor::list_of(TypeDescriptor::int())).unwrap(),
            Value::list(Vec::<Value>::new())
        );
        assert_eq!(
            registry.default(&TypeDescriptor::set_of(TypeDescriptor::int())).unwrap(),
            Value::set(Vec::<Value>::new())
        );
        assert_eq!(
            registry
                .default(&TypeDescriptor::dict_of(TypeDescriptor::str(), TypeDescriptor::int()))
                .unwrap(),
            Value::map(Vec::<(Value, Value)>::new())
        );
    }

    #[test]
    fn list_conversion_from_other_iterables() {
        let registry = Registry::new();
        let ints = TypeDescriptor::list_of(TypeDescriptor::int());
        assert_eq!(
            registry.convert(&ints, &Value::tuple(["1", "2"])).unwrap(),
            Value::list([1i64, 2])
        );
        let err = registry.convert(&ints, &Value::Int(5)).unwrap_err();
        assert!(err.to_string().contains("not iterable"));
    }

    #[test]
    fn set_conversion_collapses_duplicates() {
        let registry = Registry::new();
        let set = TypeDescriptor::set_of(TypeDescriptor::int());
        assert_eq!(
            registry.convert(&set, &Value::list(["1", "1", "2"])).unwrap(),
            Value::set([1i64, 2])
        );
    }

    #[test]
    fn element_failure_chains_cause() {
        let registry = Registry::new();
        let ints = TypeDescriptor::list_of(TypeDescriptor::int());
        let err = registry.convert(&ints, &Value::list(["1", "x"])).unwrap_err();
        let TypingError::Conversion(conversion) = err else {
            panic!("expected a conversion error");
        };
        assert!(conversion.reason.contains("element 1"));
        assert!(conversion.source.is_some());
    }

    #[test]
    fn dict_validation_checks_keys_and_values() {
        let registry = Registry::new();
        let d = TypeDescriptor::dict_of(TypeDescriptor::str(), TypeDescriptor::int());
        assert_eq!(registry.validate(&d, &Value::map([("a", 1i64)])).unwrap(), ValidationLevel::Full);
        assert_eq!(registry.validate(&d, &Value::map([(1i64, 1i64)])).unwrap(), ValidationLevel::Partial);
        assert_eq!(registry.validate(&d, &Value::map([("a", "b")])).unwrap(), ValidationLevel::Partial);
        assert_eq!(registry.validate(&d, &Value::list([1i64])).unwrap(), ValidationLevel::None);
    }

    #[test]
    fn dict_conversion_from_map_and_pairs() {
        let registry = Registry::new();
        let d = TypeDescriptor::dict_of(TypeDescriptor::str(), TypeDescriptor::int());
        assert_eq!(
            registry.convert(&d, &Value::map([(1i64, "2")])).unwrap(),
            Value::map([("1", 2i64)])
        );
        let pairs = Value::list([Value::tuple(["a", "1"]), Value::tuple(["b", "2"])]);
        assert_eq!(
            registry.convert(&d, &pairs).unwrap(),
            Value::map([("a", 1i64), ("b", 2i64)])
        );
    }

    #[test]
    fn wrong_arity_is_reported() {
        let registry = Registry::new();
        let d = TypeDescriptor::parametrized(RuntimeType::List, [TypeDescriptor::int(), TypeDescriptor::str()]);
        let err = registry.validator_from(&d).err().expect("expected an error");
        assert!(matches!(
            err,
            TypingError::Unresolvable(UnresolvableDescriptorError::Arity { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn literal_processors() {
        let registry = Registry::new();
        let d = TypeDescriptor::literal(["a", "b"]);
        assert_eq!(registry.validate(&d, &Value::from("b")).unwrap(), ValidationLevel::Full);
        assert_eq!(registry.validate(&d, &Value::from("c")).unwrap(), ValidationLevel::None);
        assert_eq!(registry.default(&d).unwrap(), Value::from("a"));
        assert_eq!(registry.convert(&d, &Value::from("b")).unwrap(), Value::from("b"));
        assert_eq!(registry.convert(&d, &Value::from("zzz")).unwrap(), Value::from("a"));
    }
}
