//! # Union Processors
//!
//! Validation of a union is the best level any variant reaches. Defaulting
//! prefers the absence value when `None` is a variant, otherwise the first
//! variant's default.
//!
//! ## Conversion Strategies
//!
//! - [`UnionStrategy::BestMatch`]: classify every variant with its validator,
//!   then try converters in the order FULL, PARTIAL, NONE (declaration order
//!   within each group). The first success wins; failures of earlier
//!   candidates are logged at `trace` and only the highest-priority one is
//!   chained if every candidate fails.
//! - [`UnionStrategy::FirstInUnion`]: every value goes through the first
//!   variant's converter, even one that already matches a later variant.
//!   A failure there fails the union.

use std::sync::Arc;

use tracing::trace;
use typeproc_core::{
    ConversionError, DefaultingError, TypeDescriptor, TypingError, ValidationLevel, Value,
};

use crate::builtins;
use crate::config::UnionStrategy;
use crate::entry::{Converter, Defaulter, Validator};
use crate::registry::Registry;

pub(crate) fn union_validator(variants: Vec<Validator>) -> Validator {
    Arc::new(move |value| ValidationLevel::best_of(variants.iter().map(|v| v(value))))
}

pub(crate) fn union_defaulter(
    registry: &Registry,
    d: &TypeDescriptor,
    variants: &[TypeDescriptor],
) -> Result<Defaulter, TypingError> {
    if variants.iter().any(TypeDescriptor::is_absence) {
        return Ok(builtins::constant(Value::None));
    }
    match variants.first() {
        Some(first) => registry.defaulter_from(first),
        None => Err(DefaultingError::Unsupported {
            descriptor: d.clone(),
            reason: "a union without variants has no default".to_string(),
        }
        .into()),
    }
}

pub(crate) fn union_converter(
    registry: &Registry,
    d: &TypeDescriptor,
    variants: &[TypeDescriptor],
    strategy: UnionStrategy,
) -> Result<Converter, TypingError> {
    match strategy {
        UnionStrategy::BestMatch => {
            let validators = variants
                .iter()
                .map(|v| registry.validator_from(v))
                .collect::<Result<Vec<_>, _>>()?;
            let converters = variants
                .iter()
                .map(|v| registry.converter_from(v, strategy))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(best_match(d.clone(), validators, converters))
        }
        UnionStrategy::FirstInUnion => {
            let first = match variants.first() {
                Some(first) => Some(registry.converter_from(first, strategy)?),
                None => None,
            };
            Ok(first_in_union(d.clone(), first))
        }
    }
}

const PRIORITY: [ValidationLevel; 3] = [
    ValidationLevel::Full,
    ValidationLevel::Partial,
    ValidationLevel::None,
];

fn best_match(target: TypeDescriptor, validators: Vec<Validator>, converters: Vec<Converter>) -> Converter {
    Arc::new(move |value| {
        let levels: Vec<ValidationLevel> = validators.iter().map(|v| v(value)).collect();
        let mut first_failure: Option<ConversionError> = None;
        for wanted in PRIORITY {
            for (index, (level, convert)) in levels.iter().zip(&converters).enumerate() {
                if *level != wanted {
                    continue;
                }
                match convert(value) {
                    Ok(converted) => return Ok(converted),
                    Err(err) => {
                        trace!(
                            descriptor = %target,
                            variant = index,
                            level = %level,
                            error = %err,
                            "union candidate rejected"
                        );
                        if first_failure.is_none() {
                            first_failure = Some(err);
                        }
                    }
                }
            }
        }
        let err = ConversionError::new(value, &target, "no variant of the union accepted the value");
        Err(match first_failure {
            Some(cause) => err.with_source(cause),
            None => err,
        })
    })
}

fn first_in_union(target: TypeDescriptor, first: Option<Converter>) -> Converter {
    Arc::new(move |value| {
        let Some(convert) = &first else {
            return Err(ConversionError::new(value, &target, "the union has no variants"));
        };
        convert(value).map_err(|cause| {
            ConversionError::new(value, &target, "the first variant of the union rejected the value")
                .with_source(cause)
        })
    })
}
