use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{Engine, Value};

use super::build_engine;

fn summing_engine() -> Engine {
    build_engine(json!({
        "method": "fold",
        "input": "long",
        "output": "long",
        "zero": 0,
        "action": [{"+": ["tally", "input"]}]
    }))
}

#[test]
fn fold_seeds_tally_from_zero_and_accumulates() {
    let engine = summing_engine();
    let mut actor = engine.new_actor().expect("begin succeeds");
    assert_eq!(actor.tally(), Some(&Value::Long(0)));

    let first = actor.action(Value::Long(3)).expect("action succeeds");
    assert_eq!(first.output, Some(Value::Long(3)));
    assert_eq!(actor.tally(), Some(&Value::Long(3)));

    let second = actor.action(Value::Long(4)).expect("action succeeds");
    assert_eq!(second.output, Some(Value::Long(7)));
    assert_eq!(actor.tally(), Some(&Value::Long(7)));
}

#[test]
fn fold_without_zero_is_rejected_at_construction() {
    let parsed = pfa_parse::parse_document(&json!({
        "method": "fold",
        "input": "long",
        "output": "long",
        "action": [{"+": ["tally", "input"]}]
    }))
    .expect("document parses");
    let err = Engine::new(parsed.interner, parsed.registry, parsed.config);
    assert!(err.is_err());
}

#[test]
fn tally_is_not_readable_outside_a_fold_engine() {
    let parsed = pfa_parse::parse_document(&json!({
        "method": "map",
        "input": "long",
        "output": "long",
        "action": ["tally"]
    }))
    .expect("document parses");
    let err = Engine::new(parsed.interner, parsed.registry, parsed.config);
    assert!(err.is_err());
}
