use serde_json::json;

use crate::Value;

use super::build_engine;

/// Cooperative cancellation (§5, §8): a runaway `while` loop is interrupted
/// at its next back-edge check once the per-action deadline has passed,
/// not via a thread interrupt.
#[test]
fn action_past_its_deadline_returns_a_timeout_error() {
    let engine = build_engine(json!({
        "method": "map",
        "input": "null",
        "output": "null",
        "options": {"timeout": 5},
        "action": [{"while": true, "do": []}]
    }));
    let mut actor = engine.new_actor().expect("begin succeeds");

    let err = actor.action(Value::Null).expect_err("runaway loop should time out");
    assert!(matches!(err, pfa_diagnostic::PFAError::Timeout { limit_ms: 5 }));
}
