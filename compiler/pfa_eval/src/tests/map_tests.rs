use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{Engine, Value};

use super::build_engine;

#[test]
fn map_produces_one_output_per_action() {
    let engine = build_engine(json!({
        "method": "map",
        "input": "double",
        "output": "double",
        "action": [{"+": ["input", 1.0]}]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let outcome = actor.action(Value::Double(2.5)).expect("action succeeds");
    assert_eq!(outcome.output, Some(Value::Double(3.5)));
    assert!(outcome.emitted.is_empty());

    let outcome = actor.action(Value::Double(-1.0)).expect("action succeeds");
    assert_eq!(outcome.output, Some(Value::Double(0.0)));
}

#[test]
fn map_action_output_type_mismatch_is_rejected_at_construction() {
    let parsed = pfa_parse::parse_document(&json!({
        "method": "map",
        "input": "double",
        "output": "string",
        "action": [{"+": ["input", 1.0]}]
    }))
    .expect("document parses");
    let err = Engine::new(parsed.interner, parsed.registry, parsed.config);
    assert!(err.is_err());
}

#[test]
fn user_error_node_aborts_the_action_not_the_engine() {
    let engine = build_engine(json!({
        "method": "map",
        "input": "long",
        "output": "long",
        "action": [
            {"if": {"<": ["input", {"long": 0}]}, "then": [{"error": "negative input", "code": 7}]},
            "input"
        ]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let err = actor.action(Value::Long(-3)).expect_err("negative input should raise");
    assert!(matches!(err, pfa_diagnostic::PFAError::User { code: Some(7), .. }));

    // A later, valid action on the same actor still succeeds: the user
    // error aborted only the failed action, not the engine.
    let outcome = actor.action(Value::Long(5)).expect("action succeeds");
    assert_eq!(outcome.output, Some(Value::Long(5)));
}
