use pretty_assertions::assert_eq;
use serde_json::json;

use crate::from_json;

use super::build_engine;

/// `attr ... to: {fcn: "u.<name>"}` (§3, §4.5, §8): the path update function
/// sees only the old leaf value and returns the new one, spliced back into
/// a freshly rebuilt record.
#[test]
fn attr_to_with_fcnref_rebuilds_the_containing_record() {
    let record_ty = json!({
        "type": "record",
        "name": "Rec",
        "fields": [{"name": "values", "type": {"type": "array", "items": "long"}}]
    });
    let engine = build_engine(json!({
        "method": "map",
        "input": record_ty,
        "output": "Rec",
        "fcns": {
            "inc": {"params": [{"x": "long"}], "ret": "long", "do": [{"+": ["x", {"long": 1}]}]}
        },
        "action": [
            {"let": {"r": "input"}},
            {"attr": "r", "path": [[["values"]], 0], "to": {"fcn": "u.inc"}}
        ]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let input = from_json(
        &json!({"values": [10, 20, 30]}),
        engine.input_type(),
        engine.registry(),
        engine.interner(),
    )
    .expect("input matches declared record type");
    let expected = from_json(
        &json!({"values": [11, 20, 30]}),
        engine.output_type(),
        engine.registry(),
        engine.interner(),
    )
    .expect("expected value matches declared record type");

    let outcome = actor.action(input).expect("action succeeds");
    assert_eq!(outcome.output, Some(expected));
}

#[test]
fn attr_get_out_of_bounds_index_is_a_runtime_error() {
    let record_ty = json!({
        "type": "record",
        "name": "Rec2",
        "fields": [{"name": "values", "type": {"type": "array", "items": "long"}}]
    });
    let engine = build_engine(json!({
        "method": "map",
        "input": record_ty,
        "output": "long",
        "action": [{"attr": "input", "path": [[["values"]], 5]}]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let input = from_json(
        &json!({"values": [1, 2, 3]}),
        engine.input_type(),
        engine.registry(),
        engine.interner(),
    )
    .expect("input matches declared record type");

    let err = actor.action(input).expect_err("out of bounds index should fail");
    assert!(matches!(err, pfa_diagnostic::PFAError::Runtime { .. }));
}
