//! # typeproc-registry — Processor Registry & Derivation
//!
//! Derives validators, defaulters and converters from
//! [`TypeDescriptor`](typeproc_core::TypeDescriptor)s, lets callers register
//! their own processors and creators, and caches everything it derives.
//!
//! ## Operations
//!
//! - **validate**: classify a value as `FULL`, `PARTIAL` or `NONE`.
//! - **default**: produce a value for a descriptor with no input.
//! - **convert**: turn a value into an instance of a descriptor. Values that
//!   already validate `FULL` are returned unchanged, except where a
//!   first-in-union converter forces them into the first variant.
//!
//! ## Derivation Order
//!
//! An exact registration always wins. Parametrized descriptors go to the
//! creator registered on their origin, then the origin's leaf processor,
//! then the bare origin. Unions, literals, wrappers and `Any` use built-in
//! rules; `tuple`, `list`, `set` and `dict` come with creators unless
//! [`RegistryConfig::builtins`] is off.
//!
//! ## Registries
//!
//! - [`Registry`]: an owned instance, configured with [`RegistryConfig`].
//! - [`shared`]: a lazily created process-wide instance and free functions
//!   forwarding to it.

mod builtins;
pub mod config;
mod derive;
pub mod entry;
pub mod registry;
pub mod shared;
mod union;

pub use config::{ConfigError, RegistryConfig, UnionStrategy, UNION_STRATEGY_ENV};
pub use entry::{
    Converter, ConverterCreator, Creator, Defaulter, DefaulterCreator, ProcessorEntry, Processors,
    Validator, ValidatorCreator,
};
pub use registry::Registry;
