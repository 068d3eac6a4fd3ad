//! Integration test: values ingested from JSON and rendered back.
//!
//! JSON documents are the usual source of raw input for conversion, so the
//! mapping in both directions is pinned here.

use serde_json::json;
use typeproc_core::{Object, RuntimeType, Value};

#[test]
fn json_document_becomes_nested_values() {
    let value = Value::from(json!({
        "name": "sensor",
        "count": 3,
        "ratio": 0.5,
        "tags": ["a", null, true]
    }));
    assert_eq!(
        value,
        Value::map([
            ("count", Value::Int(3)),
            ("name", Value::from("sensor")),
            ("ratio", Value::Float(0.5)),
            ("tags", Value::list([Value::from("a"), Value::None, Value::Bool(true)])),
        ])
    );
    assert_eq!(value.runtime_type(), RuntimeType::Map);
}

#[test]
fn values_render_to_json() {
    let value = Value::map([
        (Value::Int(1), Value::tuple([Value::Float(f64::NAN), Value::from("x")])),
        (Value::from("s"), Value::set([2i64, 1])),
    ]);
    assert_eq!(
        value.to_json(),
        json!({ "1": [null, "x"], "s": [1, 2] })
    );
}

#[test]
fn objects_render_as_their_fields() {
    let point = Value::Object(Object::new("Point").with_field("x", 1i64).with_field("y", 2i64));
    assert_eq!(point.to_json(), json!({ "x": 1, "y": 2 }));
    assert_eq!(point.runtime_type(), RuntimeType::named("Point"));
}

#[test]
fn json_and_coercion_compose() {
    let raw = Value::from(json!(["1", "2"]));
    let tuple = RuntimeType::Tuple.construct_from(&raw).unwrap();
    assert_eq!(tuple, Value::tuple(["1", "2"]));
    let int = RuntimeType::Int.construct_from(&Value::from(json!(" 42 "))).unwrap();
    assert_eq!(int, Value::Int(42));
}
