use pretty_assertions::assert_eq;
use serde_json::json;

use crate::Value;

use super::build_engine;

#[test]
fn cell_get_reads_the_declared_init_value() {
    let engine = build_engine(json!({
        "method": "map",
        "input": "null",
        "output": "long",
        "cells": {
            "total": {"type": "long", "init": 42}
        },
        "action": [{"cell": "total"}]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let outcome = actor.action(Value::Null).expect("action succeeds");
    assert_eq!(outcome.output, Some(Value::Long(42)));
}

/// A `cell ... to:` with a `Const` body referencing `input` must see the
/// actual input value for this call, not a disconnected sub-evaluation —
/// this is the live-`env` path `AttrTo` already took.
#[test]
fn cell_to_const_sees_the_live_input_binding() {
    let engine = build_engine(json!({
        "method": "map",
        "input": "long",
        "output": "long",
        "cells": {
            "total": {"type": "long", "init": 0}
        },
        "action": [
            {"cell": "total", "to": {"+": [{"cell": "total"}, "input"]}},
            {"cell": "total"}
        ]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let a = actor.action(Value::Long(10)).expect("action succeeds");
    assert_eq!(a.output, Some(Value::Long(10)));

    let b = actor.action(Value::Long(5)).expect("action succeeds");
    assert_eq!(b.output, Some(Value::Long(15)));
}

/// A `cell ... to:` function whose body reads a second, sibling cell must
/// see that cell's live value, not a scratch state disconnected from the
/// actor.
#[test]
fn cell_to_fcndef_reads_a_sibling_cell() {
    let engine = build_engine(json!({
        "method": "map",
        "input": "long",
        "output": "long",
        "cells": {
            "step": {"type": "long", "init": 3},
            "total": {"type": "long", "init": 0}
        },
        "action": [
            {
                "cell": "total",
                "to": {"params": [{"x": "long"}], "ret": "long", "do": [{"+": ["x", {"cell": "step"}]}]}
            },
            {"cell": "total"}
        ]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let a = actor.action(Value::Long(0)).expect("action succeeds");
    assert_eq!(a.output, Some(Value::Long(3)));

    let b = actor.action(Value::Long(0)).expect("action succeeds");
    assert_eq!(b.output, Some(Value::Long(6)));
}

/// Same as above but for a `shared` cell, exercising the `Mutex`-backed
/// slot rather than the private copy-on-write path.
#[test]
fn cell_to_on_a_shared_cell_commits_through_the_lock() {
    let engine = build_engine(json!({
        "method": "map",
        "input": "long",
        "output": "long",
        "cells": {
            "total": {"type": "long", "init": 0, "shared": true}
        },
        "action": [
            {"cell": "total", "to": {"+": [{"cell": "total"}, "input"]}},
            {"cell": "total"}
        ]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let a = actor.action(Value::Long(4)).expect("action succeeds");
    assert_eq!(a.output, Some(Value::Long(4)));

    let b = actor.action(Value::Long(6)).expect("action succeeds");
    assert_eq!(b.output, Some(Value::Long(10)));
}
