//! # Processor Registry
//!
//! The [`Registry`] maps descriptors to [`ProcessorEntry`]s and caches every
//! processor it derives.
//!
//! ## Locking
//!
//! - `processors` and `cache` are `parking_lot::RwLock` maps. Their guards
//!   are never held across a derivation or a user callback.
//! - Derivation is double-checked: a cache read first, then on a miss the
//!   reentrant `derivation` mutex is taken, the cache re-checked, the
//!   processor derived and stored. The mutex is reentrant because
//!   derivation recurses into argument descriptors, and creators may call
//!   back into the registry on the same thread.
//! - Registration takes the same mutex, so it never interleaves with a
//!   derivation running on another thread.
//!
//! ## Cycle Guard
//!
//! The mutex protects a stack of the `(operation, descriptor)` pairs being
//! derived. Re-entering a pair fails with
//! [`UnresolvableDescriptorError::Cycle`] instead of recursing forever.
//!
//! ## Invalidation
//!
//! Registering or unregistering anything for a descriptor drops the cached
//! processors of that exact descriptor. Processors already derived for
//! composite descriptors that embed it are kept until their own cache entry
//! is cleared with [`Registry::clear_cache`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, trace};
use typeproc_core::{
    TypeDescriptor, TypingError, UnresolvableDescriptorError, ValidationLevel, Value,
};

use crate::builtins;
use crate::config::{RegistryConfig, UnionStrategy};
use crate::entry::{Converter, Defaulter, ProcessorEntry, Processors, Validator};

/// The processor kind a derivation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Operation {
    Validate,
    Default,
    Convert(UnionStrategy),
}

impl Operation {
    fn noun(self) -> &'static str {
        match self {
            Self::Validate => "validator",
            Self::Default => "defaulter",
            Self::Convert(_) => "converter",
        }
    }
}

/// Processors derived for one descriptor. Each slot is filled independently.
#[derive(Clone, Default)]
struct CacheEntry {
    validator: Option<Validator>,
    defaulter: Option<Defaulter>,
    converter: Option<Converter>,
    first_in_union_converter: Option<Converter>,
}

impl CacheEntry {
    fn converter(&self, strategy: UnionStrategy) -> Option<Converter> {
        match strategy {
            UnionStrategy::BestMatch => self.converter.clone(),
            UnionStrategy::FirstInUnion => self.first_in_union_converter.clone(),
        }
    }

    fn set_converter(&mut self, strategy: UnionStrategy, converter: Converter) {
        match strategy {
            UnionStrategy::BestMatch => self.converter = Some(converter),
            UnionStrategy::FirstInUnion => self.first_in_union_converter = Some(converter),
        }
    }
}

type DerivationStack = RefCell<Vec<(Operation, TypeDescriptor)>>;

/// Marks an `(operation, descriptor)` pair as being derived until dropped.
struct InProgress<'a> {
    stack: &'a DerivationStack,
}

impl<'a> InProgress<'a> {
    fn enter(
        stack: &'a DerivationStack,
        operation: Operation,
        descriptor: &TypeDescriptor,
    ) -> Result<Self, UnresolvableDescriptorError> {
        let mut frames = stack.borrow_mut();
        if frames
            .iter()
            .any(|(op, d)| *op == operation && d == descriptor)
        {
            debug!(
                descriptor = %descriptor,
                operation = operation.noun(),
                "cyclic descriptor detected"
            );
            return Err(UnresolvableDescriptorError::Cycle {
                operation: operation.noun(),
                descriptor: descriptor.clone(),
            });
        }
        frames.push((operation, descriptor.clone()));
        Ok(Self { stack })
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

/// Descriptor → processor registry with a derived-processor cache.
///
/// `Send + Sync`; share it behind a reference or an `Arc`. See
/// [`crate::shared::registry`] for the process-wide instance.
pub struct Registry {
    config: RegistryConfig,
    processors: RwLock<HashMap<TypeDescriptor, ProcessorEntry>>,
    cache: RwLock<HashMap<TypeDescriptor, CacheEntry>>,
    derivation: ReentrantMutex<DerivationStack>,
}

impl Registry {
    /// A registry with no entries at all. Only the structural rules (atomic
    /// types, unions, literals, wrappers, `Any`) are available.
    pub fn empty() -> Self {
        Self::with_config(RegistryConfig::default().with_builtins(false))
    }

    /// A registry with the built-in `tuple`, `list`, `set` and `dict`
    /// entries installed.
    ///
    /// There is no `Default` impl: [`Registry::default`] produces the
    /// default value of a descriptor.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// A registry built from explicit configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        let registry = Self {
            config,
            processors: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            derivation: ReentrantMutex::new(RefCell::new(Vec::new())),
        };
        if registry.config.builtins {
            builtins::install(&registry);
        }
        registry
    }

    /// The configuration this registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // -- Registration ---------------------------------------------------------

    /// Replace the whole entry for a descriptor.
    pub fn register(&self, descriptor: &TypeDescriptor, entry: ProcessorEntry) {
        let descriptor = descriptor.normalize();
        let _guard = self.derivation.lock();
        self.processors.write().insert(descriptor.clone(), entry);
        self.cache.write().remove(&descriptor);
        debug!(descriptor = %descriptor, "registered processor entry");
    }

    /// Set the leaf validator for a descriptor, keeping its other slots.
    pub fn register_validator<F>(&self, descriptor: &TypeDescriptor, f: F)
    where
        F: Fn(&Value) -> ValidationLevel + Send + Sync + 'static,
    {
        self.update_entry(descriptor, "validator", |entry| {
            *entry = std::mem::take(entry).with_validator(f);
        });
    }

    /// Set the leaf defaulter for a descriptor, keeping its other slots.
    pub fn register_defaulter<F>(&self, descriptor: &TypeDescriptor, f: F)
    where
        F: Fn() -> Result<Value, typeproc_core::DefaultingError> + Send + Sync + 'static,
    {
        self.update_entry(descriptor, "defaulter", |entry| {
            *entry = std::mem::take(entry).with_defaulter(f);
        });
    }

    /// Set the leaf converter for a descriptor, keeping its other slots.
    pub fn register_converter<F>(&self, descriptor: &TypeDescriptor, f: F)
    where
        F: Fn(&Value) -> Result<Value, typeproc_core::ConversionError> + Send + Sync + 'static,
    {
        self.update_entry(descriptor, "converter", |entry| {
            *entry = std::mem::take(entry).with_converter(f);
        });
    }

    /// Set the validator creator for an origin, keeping its other slots.
    pub fn register_validator_creator<F>(&self, origin: &TypeDescriptor, f: F)
    where
        F: Fn(&[Validator], &TypeDescriptor, &Registry) -> Result<Option<Validator>, TypingError>
            + Send
            + Sync
            + 'static,
    {
        self.update_entry(origin, "validator creator", |entry| {
            *entry = std::mem::take(entry).with_validator_creator(f);
        });
    }

    /// Set the defaulter creator for an origin, keeping its other slots.
    pub fn register_defaulter_creator<F>(&self, origin: &TypeDescriptor, f: F)
    where
        F: Fn(&[Defaulter], &TypeDescriptor, &Registry) -> Result<Option<Defaulter>, TypingError>
            + Send
            + Sync
            + 'static,
    {
        self.update_entry(origin, "defaulter creator", |entry| {
            *entry = std::mem::take(entry).with_defaulter_creator(f);
        });
    }

    /// Set the converter creator for an origin, keeping its other slots.
    pub fn register_converter_creator<F>(&self, origin: &TypeDescriptor, f: F)
    where
        F: Fn(&[Converter], &TypeDescriptor, &Registry) -> Result<Option<Converter>, TypingError>
            + Send
            + Sync
            + 'static,
    {
        self.update_entry(origin, "converter creator", |entry| {
            *entry = std::mem::take(entry).with_converter_creator(f);
        });
    }

    fn update_entry(
        &self,
        descriptor: &TypeDescriptor,
        slot: &'static str,
        update: impl FnOnce(&mut ProcessorEntry),
    ) {
        let descriptor = descriptor.normalize();
        let _guard = self.derivation.lock();
        update(self.processors.write().entry(descriptor.clone()).or_default());
        self.cache.write().remove(&descriptor);
        debug!(descriptor = %descriptor, slot, "registered processor");
    }

    // -- Unregistration -------------------------------------------------------

    /// Remove the whole entry for a descriptor, returning it.
    pub fn unregister(&self, descriptor: &TypeDescriptor) -> Option<ProcessorEntry> {
        let descriptor = descriptor.normalize();
        let _guard = self.derivation.lock();
        let removed = self.processors.write().remove(&descriptor);
        if removed.is_some() {
            self.cache.write().remove(&descriptor);
            debug!(descriptor = %descriptor, "unregistered processor entry");
        }
        removed
    }

    /// Remove the leaf validator. Returns whether one was registered.
    pub fn unregister_validator(&self, descriptor: &TypeDescriptor) -> bool {
        self.remove_slot(descriptor, "validator", |e| e.validate.take().is_some())
    }

    /// Remove the leaf defaulter. Returns whether one was registered.
    pub fn unregister_defaulter(&self, descriptor: &TypeDescriptor) -> bool {
        self.remove_slot(descriptor, "defaulter", |e| e.default.take().is_some())
    }

    /// Remove the leaf converter. Returns whether one was registered.
    pub fn unregister_converter(&self, descriptor: &TypeDescriptor) -> bool {
        self.remove_slot(descriptor, "converter", |e| e.convert.take().is_some())
    }

    /// Remove the validator creator. Returns whether one was registered.
    pub fn unregister_validator_creator(&self, origin: &TypeDescriptor) -> bool {
        self.remove_slot(origin, "validator creator", |e| {
            e.create_validator.take().is_some()
        })
    }

    /// Remove the defaulter creator. Returns whether one was registered.
    pub fn unregister_defaulter_creator(&self, origin: &TypeDescriptor) -> bool {
        self.remove_slot(origin, "defaulter creator", |e| {
            e.create_defaulter.take().is_some()
        })
    }

    /// Remove the converter creator. Returns whether one was registered.
    pub fn unregister_converter_creator(&self, origin: &TypeDescriptor) -> bool {
        self.remove_slot(origin, "converter creator", |e| {
            e.create_converter.take().is_some()
        })
    }

    /// Clear one slot; the entry is dropped once every slot is empty.
    fn remove_slot(
        &self,
        descriptor: &TypeDescriptor,
        slot: &'static str,
        take: impl FnOnce(&mut ProcessorEntry) -> bool,
    ) -> bool {
        let descriptor = descriptor.normalize();
        let _guard = self.derivation.lock();
        let removed = {
            let mut processors = self.processors.write();
            let (removed, now_empty) = match processors.get_mut(&descriptor) {
                Some(entry) => (take(entry), entry.is_empty()),
                None => (false, false),
            };
            if now_empty {
                processors.remove(&descriptor);
            }
            removed
        };
        if removed {
            self.cache.write().remove(&descriptor);
            debug!(descriptor = %descriptor, slot, "unregistered processor");
        }
        removed
    }

    // -- Lookup ---------------------------------------------------------------

    /// A copy of the entry registered for a descriptor.
    pub fn get_entry(&self, descriptor: &TypeDescriptor) -> Option<ProcessorEntry> {
        self.processors.read().get(&descriptor.normalize()).cloned()
    }

    /// Whether an entry is registered for a descriptor.
    pub fn has_entry(&self, descriptor: &TypeDescriptor) -> bool {
        self.processors
            .read()
            .contains_key(&descriptor.normalize())
    }

    /// Every descriptor with an entry, sorted.
    pub fn registered_descriptors(&self) -> Vec<TypeDescriptor> {
        let mut keys: Vec<TypeDescriptor> = self.processors.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// One slot of the entry for an already-normalized descriptor.
    pub(crate) fn slot<T>(
        &self,
        descriptor: &TypeDescriptor,
        pick: impl FnOnce(&ProcessorEntry) -> Option<T>,
    ) -> Option<T> {
        self.processors.read().get(descriptor).and_then(pick)
    }

    // -- Cache ----------------------------------------------------------------

    /// Drop cached processors for one descriptor, or for all descriptors.
    pub fn clear_cache(&self, descriptor: Option<&TypeDescriptor>) {
        let _guard = self.derivation.lock();
        match descriptor {
            Some(d) => {
                let d = d.normalize();
                self.cache.write().remove(&d);
                debug!(descriptor = %d, "cleared processor cache");
            }
            None => {
                self.cache.write().clear();
                debug!("cleared all processor caches");
            }
        }
    }

    /// Drop the cached validator for one descriptor.
    pub fn clear_validator_cache(&self, descriptor: &TypeDescriptor) {
        self.clear_cached_slot(descriptor, "validator", |c| c.validator = None);
    }

    /// Drop the cached defaulter for one descriptor.
    pub fn clear_defaulter_cache(&self, descriptor: &TypeDescriptor) {
        self.clear_cached_slot(descriptor, "defaulter", |c| c.defaulter = None);
    }

    /// Drop the cached converters (both strategies) for one descriptor.
    pub fn clear_converter_cache(&self, descriptor: &TypeDescriptor) {
        self.clear_cached_slot(descriptor, "converter", |c| {
            c.converter = None;
            c.first_in_union_converter = None;
        });
    }

    fn clear_cached_slot(
        &self,
        descriptor: &TypeDescriptor,
        slot: &'static str,
        clear: impl FnOnce(&mut CacheEntry),
    ) {
        let descriptor = descriptor.normalize();
        let _guard = self.derivation.lock();
        if let Some(entry) = self.cache.write().get_mut(&descriptor) {
            clear(entry);
        }
        debug!(descriptor = %descriptor, slot, "cleared processor cache");
    }

    /// Look up a cached processor, or derive and cache it.
    fn cached<P, R, W, D>(
        &self,
        operation: Operation,
        descriptor: &TypeDescriptor,
        read: R,
        write: W,
        derive: D,
    ) -> Result<P, TypingError>
    where
        P: Clone,
        R: Fn(&CacheEntry) -> Option<P>,
        W: FnOnce(&mut CacheEntry, P),
        D: FnOnce(&TypeDescriptor) -> Result<P, TypingError>,
    {
        let hit = self.cache.read().get(descriptor).and_then(&read);
        if let Some(processor) = hit {
            return Ok(processor);
        }

        let guard = self.derivation.lock();
        let hit = self.cache.read().get(descriptor).and_then(&read);
        if let Some(processor) = hit {
            return Ok(processor);
        }

        let _frame = InProgress::enter(&guard, operation, descriptor)?;
        trace!(
            descriptor = %descriptor,
            operation = operation.noun(),
            "cache miss, deriving"
        );
        let derived = derive(descriptor)?;
        write(
            self.cache.write().entry(descriptor.clone()).or_default(),
            derived.clone(),
        );
        Ok(derived)
    }

    // -- Derivation -----------------------------------------------------------

    /// The validator for a descriptor.
    ///
    /// # Errors
    ///
    /// Fails when the descriptor, or one of its arguments, cannot be derived.
    pub fn validator_from(&self, descriptor: &TypeDescriptor) -> Result<Validator, TypingError> {
        let descriptor = descriptor.normalize();
        self.cached(
            Operation::Validate,
            &descriptor,
            |c| c.validator.clone(),
            |c, v| c.validator = Some(v),
            |d| self.derive_validator(d),
        )
    }

    /// The defaulter for a descriptor.
    ///
    /// # Errors
    ///
    /// Fails with a [`typeproc_core::DefaultingError`] when no rule produces a
    /// default, or when the descriptor cannot be derived.
    pub fn defaulter_from(&self, descriptor: &TypeDescriptor) -> Result<Defaulter, TypingError> {
        let descriptor = descriptor.normalize();
        self.cached(
            Operation::Default,
            &descriptor,
            |c| c.defaulter.clone(),
            |c, d| c.defaulter = Some(d),
            |d| self.derive_defaulter(d),
        )
    }

    /// The converter for a descriptor, resolving unions with `strategy`.
    ///
    /// # Errors
    ///
    /// Fails when the descriptor, or one of its arguments, cannot be derived.
    pub fn converter_from(
        &self,
        descriptor: &TypeDescriptor,
        strategy: UnionStrategy,
    ) -> Result<Converter, TypingError> {
        let descriptor = descriptor.normalize();
        self.cached(
            Operation::Convert(strategy),
            &descriptor,
            |c| c.converter(strategy),
            |c, f| c.set_converter(strategy, f),
            |d| self.derive_converter(d, strategy),
        )
    }

    /// Derive all three processors. One failing derivation does not hide
    /// the others. Converters use the configured union strategy.
    pub fn processors_for(&self, descriptor: &TypeDescriptor) -> Processors {
        Processors {
            validator: self.validator_from(descriptor),
            defaulter: self.defaulter_from(descriptor),
            converter: self.converter_from(descriptor, self.config.union_strategy),
        }
    }

    // -- Convenience ----------------------------------------------------------

    /// Validate a value against a descriptor.
    pub fn validate(
        &self,
        descriptor: &TypeDescriptor,
        value: &Value,
    ) -> Result<ValidationLevel, TypingError> {
        let validator = self.validator_from(descriptor)?;
        Ok(validator(value))
    }

    /// Produce the default value of a descriptor.
    pub fn default(&self, descriptor: &TypeDescriptor) -> Result<Value, TypingError> {
        let defaulter = self.defaulter_from(descriptor)?;
        Ok(defaulter()?)
    }

    /// Convert a value to a descriptor with the configured union strategy.
    pub fn convert(&self, descriptor: &TypeDescriptor, value: &Value) -> Result<Value, TypingError> {
        self.convert_with(descriptor, value, self.config.union_strategy)
    }

    /// Convert a value to a descriptor with an explicit union strategy.
    pub fn convert_with(
        &self,
        descriptor: &TypeDescriptor,
        value: &Value,
        strategy: UnionStrategy,
    ) -> Result<Value, TypingError> {
        let converter = self.converter_from(descriptor, strategy)?;
        Ok(converter(value)?)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("entries", &self.processors.read().len())
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use typeproc_core::{ConversionError, DefaultingError, RuntimeType};

    fn point() -> TypeDescriptor {
        TypeDescriptor::named("Point")
    }

    #[test]
    fn empty_registry_has_no_entries() {
        assert!(Registry::empty().registered_descriptors().is_empty());
    }

    #[test]
    fn new_registry_installs_container_entries() {
        let registry = Registry::new();
        for t in [RuntimeType::Tuple, RuntimeType::List, RuntimeType::Set, RuntimeType::Map] {
            assert!(registry.has_entry(&TypeDescriptor::Atomic(t)));
        }
    }

    #[test]
    fn register_slot_merges_into_existing_entry() {
        let registry = Registry::empty();
        registry.register_validator(&point(), |_| ValidationLevel::Full);
        registry.register_defaulter(&point(), || Ok(Value::Int(0)));
        let entry = registry.get_entry(&point()).unwrap();
        assert!(entry.validate.is_some());
        assert!(entry.default.is_some());
        assert!(entry.convert.is_none());
    }

    #[test]
    fn lookups_normalize_their_argument() {
        let registry = Registry::empty();
        let raw = TypeDescriptor::Union(vec![point(), point()]);
        registry.register_validator(&raw, |_| ValidationLevel::Partial);
        assert!(registry.has_entry(&point()));
        assert_eq!(registry.registered_descriptors(), vec![point()]);
    }

    #[test]
    fn removing_last_slot_drops_entry() {
        let registry = Registry::empty();
        registry.register_validator(&point(), |_| ValidationLevel::Full);
        registry.register_converter(&point(), |v| Ok(v.clone()));
        assert!(registry.unregister_validator(&point()));
        assert!(registry.has_entry(&point()));
        assert!(!registry.unregister_validator(&point()));
        assert!(registry.unregister_converter(&point()));
        assert!(!registry.has_entry(&point()));
    }

    #[test]
    fn unregister_returns_entry() {
        let registry = Registry::empty();
        registry.register(&point(), ProcessorEntry::new().with_validator(|_| ValidationLevel::Full));
        assert!(registry.unregister(&point()).is_some());
        assert!(registry.unregister(&point()).is_none());
    }

    #[test]
    fn derived_processors_are_cached() {
        let registry = Registry::empty();
        let a = registry.validator_from(&TypeDescriptor::int()).unwrap();
        let b = registry.validator_from(&TypeDescriptor::int()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        registry.clear_validator_cache(&TypeDescriptor::int());
        let c = registry.validator_from(&TypeDescriptor::int()).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn registering_invalidates_exact_descriptor() {
        let registry = Registry::empty();
        assert_eq!(
            registry.validate(&point(), &Value::Int(1)).unwrap(),
            ValidationLevel::None
        );
        registry.register_validator(&point(), |_| ValidationLevel::Full);
        assert_eq!(
            registry.validate(&point(), &Value::Int(1)).unwrap(),
            ValidationLevel::Full
        );
    }

    #[test]
    fn registering_leaves_composite_caches_alone() {
        let registry = Registry::new();
        let points = TypeDescriptor::list_of(point());
        let raw = Value::list([1i64]);
        registry.register_converter(&point(), |v| Ok(Value::tuple([v.clone()])));
        assert_eq!(
            registry.convert(&points, &raw).unwrap(),
            Value::list([Value::tuple([1i64])])
        );

        registry.register_converter(&point(), |_| Ok(Value::from("replaced")));
        assert_eq!(registry.convert(&point(), &Value::Int(1)).unwrap(), Value::from("replaced"));
        assert_eq!(
            registry.convert(&points, &raw).unwrap(),
            Value::list([Value::tuple([1i64])])
        );

        registry.clear_cache(Some(&points));
        assert_eq!(
            registry.convert(&points, &raw).unwrap(),
            Value::list([Value::from("replaced")])
        );
    }

    #[test]
    fn default_path_is_the_descriptor_operation() {
        let registry = Registry::new();
        assert_eq!(
            Registry::default(&registry, &TypeDescriptor::int()).unwrap(),
            Value::Int(0)
        );
    }

    #[test]
    fn clear_cache_all() {
        let registry = Registry::empty();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        registry.register_defaulter_creator(&TypeDescriptor::named("Box"), move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Arc::new(|| Ok::<_, DefaultingError>(Value::None)) as Defaulter))
        });
        let boxed = TypeDescriptor::parametrized(RuntimeType::named("Box"), [TypeDescriptor::int()]);
        registry.default(&boxed).unwrap();
        registry.default(&boxed).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        registry.clear_cache(None);
        registry.default(&boxed).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn creator_reentering_its_own_descriptor_is_a_cycle() {
        let registry = Registry::empty();
        registry.register_validator_creator(&TypeDescriptor::named("Node"), |_, d, reg| {
            reg.validator_from(d).map(Some)
        });
        let node = TypeDescriptor::parametrized(RuntimeType::named("Node"), [TypeDescriptor::int()]);
        let err = registry.validator_from(&node).err().unwrap();
        assert!(matches!(
            err,
            TypingError::Unresolvable(UnresolvableDescriptorError::Cycle { operation: "validator", .. })
        ));
        // The stack unwound: unrelated derivations still work.
        assert!(registry.validator_from(&TypeDescriptor::int()).is_ok());
    }

    #[test]
    fn creator_may_use_registry_for_other_descriptors() {
        let registry = Registry::empty();
        registry.register_validator_creator(&TypeDescriptor::named("Wrapper"), |_, _, reg| {
            reg.validator_from(&TypeDescriptor::int()).map(Some)
        });
        let wrapped =
            TypeDescriptor::parametrized(RuntimeType::named("Wrapper"), [TypeDescriptor::str()]);
        assert_eq!(
            registry.validate(&wrapped, &Value::Int(3)).unwrap(),
            ValidationLevel::Full
        );
    }

    #[test]
    fn processors_for_reports_each_slot() {
        let registry = Registry::empty();
        let processors = registry.processors_for(&point());
        assert!(processors.validator.is_ok());
        assert!(matches!(
            processors.defaulter,
            Err(TypingError::Defaulting(_))
        ));
        let convert = processors.converter.unwrap();
        assert!(convert(&Value::Int(1)).is_err());
    }

    #[test]
    fn converter_strategies_are_cached_separately() {
        let registry = Registry::empty();
        let d = TypeDescriptor::union([TypeDescriptor::int(), TypeDescriptor::str()]);
        let best = registry.converter_from(&d, UnionStrategy::BestMatch).unwrap();
        let first = registry.converter_from(&d, UnionStrategy::FirstInUnion).unwrap();
        assert!(!Arc::ptr_eq(&best, &first));
        let value = Value::list([1i64]);
        assert_eq!(best(&value).unwrap(), Value::from("[1]"));
        let err: ConversionError = first(&value).unwrap_err();
        assert_eq!(err.target, d);
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }

    #[test]
    fn concurrent_derivation_converges() {
        let registry = Arc::new(Registry::new());
        let d = TypeDescriptor::dict_of(
            TypeDescriptor::str(),
            TypeDescriptor::list_of(TypeDescriptor::int()),
        );
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let d = d.clone();
                std::thread::spawn(move || {
                    registry
                        .validate(&d, &Value::map([("a", Value::list([1i64, 2]))]))
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), ValidationLevel::Full);
        }
    }
}
