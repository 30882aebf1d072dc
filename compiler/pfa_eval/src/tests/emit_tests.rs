use pretty_assertions::assert_eq;
use serde_json::json;

use crate::Value;

use super::build_engine;

#[test]
fn emit_method_discards_the_block_value_and_collects_explicit_emits() {
    let engine = build_engine(json!({
        "method": "emit",
        "input": "long",
        "output": "long",
        "action": [
            {"emit": [{"+": ["input", {"long": 1}]}]},
            {"if": {">": ["input", {"long": 0}]}, "then": [{"emit": [{"*": ["input", {"long": 2}]}]}]},
            "input"
        ]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let outcome = actor.action(Value::Long(5)).expect("action succeeds");
    assert_eq!(outcome.output, None);
    assert_eq!(outcome.emitted, vec![Value::Long(6), Value::Long(10)]);

    let outcome = actor.action(Value::Long(-1)).expect("action succeeds");
    assert_eq!(outcome.output, None);
    assert_eq!(outcome.emitted, vec![Value::Long(0)]);
}
