//! # Processor Derivation
//!
//! How the registry turns a normalized descriptor into a processor. All
//! three operations follow the same priority order:
//!
//! 1. A leaf processor registered for the exact descriptor wins.
//! 2. `Any` and atomic descriptors use their structural rule.
//! 3. Otherwise the descriptor is decomposed into an origin and arguments:
//!    - a runtime-type origin is looked up as `Atomic(origin)`. Its creator,
//!      if any, receives the processors of the arguments; if it declines, the
//!      origin's leaf processor is used; failing both, the origin itself is
//!      derived as if the arguments were absent;
//!    - unions, literals and wrappers use the built-in rules.
//!
//! Caching and the cycle guard live in [`crate::registry`]; this module
//! only derives.

use tracing::trace;
use typeproc_core::{
    DefaultingError, Origin, RuntimeType, TypeDescriptor, TypingError,
    UnresolvableDescriptorError, Value, WrapperKind,
};

use crate::builtins;
use crate::config::UnionStrategy;
use crate::entry::{Converter, Creator, Defaulter, ProcessorEntry, Validator};
use crate::registry::Registry;
use crate::union;

impl Registry {
    pub(crate) fn derive_validator(&self, d: &TypeDescriptor) -> Result<Validator, TypingError> {
        if let Some(leaf) = self.slot(d, |e| e.validate.clone()) {
            return Ok(leaf);
        }
        match d {
            TypeDescriptor::Any => Ok(builtins::any_validator()),
            TypeDescriptor::Atomic(t) => Ok(builtins::instance_validator(t.clone())),
            _ => {
                let (origin, args) = d.decompose()?;
                match origin {
                    Origin::Type(head) => self.via_origin(
                        d,
                        head,
                        &args,
                        |e| e.create_validator.clone(),
                        |e| e.validate.clone(),
                        |a| self.validator_from(a),
                    ),
                    Origin::Union => {
                        let variants = args
                            .iter()
                            .map(|a| self.validator_from(a))
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(union::union_validator(variants))
                    }
                    Origin::Literal => Ok(builtins::literal_validator(d.literal_values().to_vec())),
                    Origin::Wrapper(WrapperKind::Cast) => Ok(builtins::any_validator()),
                    Origin::Wrapper(_) => self.validator_from(&sole_arg(d, args)?),
                }
            }
        }
    }

    pub(crate) fn derive_defaulter(&self, d: &TypeDescriptor) -> Result<Defaulter, TypingError> {
        if let Some(leaf) = self.slot(d, |e| e.default.clone()) {
            return Ok(leaf);
        }
        match d {
            TypeDescriptor::Any => Ok(builtins::constant(Value::None)),
            TypeDescriptor::Atomic(t) => match t.zero_value() {
                Some(zero) => Ok(builtins::constant(zero)),
                None => Err(DefaultingError::NoDefaultConstructor {
                    runtime_type: t.clone(),
                }
                .into()),
            },
            _ => {
                let (origin, args) = d.decompose()?;
                match origin {
                    Origin::Type(head) => self.via_origin(
                        d,
                        head,
                        &args,
                        |e| e.create_defaulter.clone(),
                        |e| e.default.clone(),
                        |a| self.defaulter_from(a),
                    ),
                    Origin::Union => union::union_defaulter(self, d, &args),
                    Origin::Literal => builtins::literal_defaulter(d),
                    Origin::Wrapper(_) => self.defaulter_from(&sole_arg(d, args)?),
                }
            }
        }
    }

    pub(crate) fn derive_converter(
        &self,
        d: &TypeDescriptor,
        strategy: UnionStrategy,
    ) -> Result<Converter, TypingError> {
        if let Some(leaf) = self.slot(d, |e| e.convert.clone()) {
            return Ok(leaf);
        }
        match d {
            TypeDescriptor::Any => Ok(builtins::identity_converter()),
            TypeDescriptor::Atomic(t) => Ok(builtins::atomic_converter(t.clone(), d.clone())),
            _ => {
                let (origin, args) = d.decompose()?;
                match origin {
                    Origin::Type(head) => self.via_origin(
                        d,
                        head,
                        &args,
                        |e| e.create_converter.clone(),
                        |e| e.convert.clone(),
                        |a| self.converter_from(a, strategy),
                    ),
                    Origin::Union => union::union_converter(self, d, &args, strategy),
                    Origin::Literal => Ok(builtins::literal_converter(d.clone())),
                    Origin::Wrapper(_) => self.converter_from(&sole_arg(d, args)?, strategy),
                }
            }
        }
    }

    /// Creator, then leaf, then the bare origin.
    fn via_origin<P>(
        &self,
        d: &TypeDescriptor,
        head: RuntimeType,
        args: &[TypeDescriptor],
        creator: impl FnOnce(&ProcessorEntry) -> Option<Creator<P>>,
        leaf: impl FnOnce(&ProcessorEntry) -> Option<P>,
        derive: impl Fn(&TypeDescriptor) -> Result<P, TypingError>,
    ) -> Result<P, TypingError> {
        let head = TypeDescriptor::Atomic(head);
        if let Some(create) = self.slot(&head, creator) {
            let inner = args.iter().map(&derive).collect::<Result<Vec<P>, _>>()?;
            match create(inner.as_slice(), d, self)? {
                Some(processor) => return Ok(processor),
                None => trace!(descriptor = %d, origin = %head, "creator declined"),
            }
        }
        if let Some(processor) = self.slot(&head, leaf) {
            return Ok(processor);
        }
        derive(&head)
    }
}

/// The single argument of a wrapper.
fn sole_arg(d: &TypeDescriptor, args: Vec<TypeDescriptor>) -> Result<TypeDescriptor, TypingError> {
    args.into_iter().next().ok_or_else(|| {
        UnresolvableDescriptorError::NotDecomposable {
            descriptor: d.clone(),
        }
        .into()
    })
}
