//! Property tests over generated descriptors and values.
//!
//! - values that already validate `FULL` convert to themselves under the
//!   best-match strategy;
//! - under first-in-union, a union converts exactly as its first variant;
//! - a successful default validates `FULL`;
//! - a union validates at the best level of its variants.
//!
//! `Cast[...]` is left out of the generated descriptors: it validates
//! everything `FULL` but still converts through its inner type.

use proptest::prelude::*;
use typeproc_core::{TypeDescriptor, ValidationLevel, Value};
use typeproc_registry::{Registry, UnionStrategy};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn arb_descriptor() -> impl Strategy<Value = TypeDescriptor> {
    let leaf = prop_oneof![
        Just(TypeDescriptor::int()),
        Just(TypeDescriptor::float()),
        Just(TypeDescriptor::str()),
        Just(TypeDescriptor::bool()),
        Just(TypeDescriptor::none()),
        Just(TypeDescriptor::Any),
        prop::collection::vec(-3i64..3, 1..3).prop_map(|values| TypeDescriptor::literal(values)),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(TypeDescriptor::list_of),
            inner.clone().prop_map(TypeDescriptor::set_of),
            (inner.clone(), inner.clone()).prop_map(|(k, v)| TypeDescriptor::dict_of(k, v)),
            prop::collection::vec(inner.clone(), 1..4).prop_map(|items| TypeDescriptor::tuple_of(items)),
            prop::collection::vec(inner.clone(), 1..4).prop_map(|variants| TypeDescriptor::union(variants)),
            inner.prop_map(TypeDescriptor::final_of),
        ]
    })
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        (-5i64..5).prop_map(Value::Int),
        (-10.0f64..10.0).prop_map(Value::Float),
        "[a-c0-9]{0,3}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Tuple),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::btree_set(inner.clone(), 0..4).prop_map(Value::Set),
            prop::collection::btree_map(inner.clone(), inner, 0..4).prop_map(Value::Map),
        ]
    })
}

proptest! {
    #[test]
    fn full_match_converts_to_itself(d in arb_descriptor(), v in arb_value()) {
        init_tracing();
        let registry = Registry::new();
        if registry.validate(&d, &v).unwrap().is_full() {
            prop_assert_eq!(registry.convert_with(&d, &v, UnionStrategy::BestMatch).unwrap(), v);
        }
    }

    #[test]
    fn first_in_union_converts_as_first_variant(
        a in arb_descriptor(),
        b in arb_descriptor(),
        v in arb_value(),
    ) {
        init_tracing();
        let registry = Registry::new();
        if let TypeDescriptor::Union(variants) = TypeDescriptor::union([a, b]) {
            let union = TypeDescriptor::Union(variants.clone());
            let whole = registry.convert_with(&union, &v, UnionStrategy::FirstInUnion);
            let first = registry.convert_with(&variants[0], &v, UnionStrategy::FirstInUnion);
            match (whole, first) {
                (Ok(whole), Ok(first)) => prop_assert_eq!(whole, first),
                (Err(_), Err(_)) => {}
                (whole, first) => prop_assert!(
                    false,
                    "union gave {:?}, first variant gave {:?}",
                    whole.map_err(|e| e.to_string()),
                    first.map_err(|e| e.to_string())
                ),
            }
        }
    }

    #[test]
    fn default_validates_full(d in arb_descriptor()) {
        init_tracing();
        let registry = Registry::new();
        let value = registry.default(&d).unwrap();
        prop_assert_eq!(registry.validate(&d, &value).unwrap(), ValidationLevel::Full);
        prop_assert_eq!(registry.convert(&d, &value).unwrap(), value);
    }

    #[test]
    fn union_validates_at_best_variant_level(
        a in arb_descriptor(),
        b in arb_descriptor(),
        v in arb_value(),
    ) {
        let registry = Registry::new();
        let union = TypeDescriptor::union([a.clone(), b.clone()]);
        let expected = ValidationLevel::best_of([
            registry.validate(&a, &v).unwrap(),
            registry.validate(&b, &v).unwrap(),
        ]);
        prop_assert_eq!(registry.validate(&union, &v).unwrap(), expected);
    }
}
