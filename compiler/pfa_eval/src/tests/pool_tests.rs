use pretty_assertions::assert_eq;
use serde_json::json;

use crate::Value;

use super::build_engine;

/// Per-key increment-or-initialize: the classic PFA pool counter pattern
/// (§4.5, §8) — `pool.to` with `init` seeds a fresh key, and an existing
/// key's `to:` function sees its current value rather than `init` again.
#[test]
fn pool_to_increments_or_initializes_per_key() {
    let engine = build_engine(json!({
        "method": "map",
        "input": "string",
        "output": "long",
        "pools": {
            "counts": {"type": "long", "init": {}}
        },
        "action": [
            {
                "pool": "counts",
                "path": ["input"],
                "to": {"params": [{"x": "long"}], "ret": "long", "do": [{"+": ["x", {"long": 1}]}]},
                "init": {"long": 0}
            },
            {"pool": "counts", "path": ["input"]}
        ]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let a1 = actor.action(Value::String("a".to_string())).expect("action succeeds");
    assert_eq!(a1.output, Some(Value::Long(1)));

    let b1 = actor.action(Value::String("b".to_string())).expect("action succeeds");
    assert_eq!(b1.output, Some(Value::Long(1)));

    let a2 = actor.action(Value::String("a".to_string())).expect("action succeeds");
    assert_eq!(a2.output, Some(Value::Long(2)));

    let a3 = actor.action(Value::String("a".to_string())).expect("action succeeds");
    assert_eq!(a3.output, Some(Value::Long(3)));
}

/// A `pool ... to:` function whose body reads a sibling cell must see that
/// cell's live value, not a scratch state disconnected from the actor.
#[test]
fn pool_to_fcndef_reads_a_sibling_cell() {
    let engine = build_engine(json!({
        "method": "map",
        "input": "string",
        "output": "long",
        "cells": {
            "step": {"type": "long", "init": 10}
        },
        "pools": {
            "counts": {"type": "long", "init": {}}
        },
        "action": [
            {
                "pool": "counts",
                "path": ["input"],
                "to": {"params": [{"x": "long"}], "ret": "long", "do": [{"+": ["x", {"cell": "step"}]}]},
                "init": {"long": 0}
            },
            {"pool": "counts", "path": ["input"]}
        ]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let a = actor.action(Value::String("a".to_string())).expect("action succeeds");
    assert_eq!(a.output, Some(Value::Long(10)));

    let b = actor.action(Value::String("a".to_string())).expect("action succeeds");
    assert_eq!(b.output, Some(Value::Long(20)));
}

#[test]
fn pool_get_on_an_absent_key_is_a_runtime_error() {
    let engine = build_engine(json!({
        "method": "map",
        "input": "string",
        "output": "long",
        "pools": {
            "counts": {"type": "long", "init": {}}
        },
        "action": [{"pool": "counts", "path": ["input"]}]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let err = actor
        .action(Value::String("missing".to_string()))
        .expect_err("absent pool key should fail");
    assert!(matches!(err, pfa_diagnostic::PFAError::Runtime { .. }));
}
