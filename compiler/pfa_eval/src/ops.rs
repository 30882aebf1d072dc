//! Executable implementations of the built-in operators whose signatures
//! are declared in `pfa_types::BuiltinCatalog` (§4.7).

use pfa_diagnostic::{Location, PFAError, PFAResult};

use crate::value::Value;

/// Dispatches a resolved catalog operator by name against already
/// type-checked argument values. `name` has had any `u.` prefix stripped
/// by the caller — user calls never reach this function.
pub fn call_builtin(name: &str, args: &[Value], loc: &Location) -> PFAResult<Value> {
    match name {
        "+" => numeric_binop(args, loc, i32::checked_add, i64::checked_add, |a, b| a + b, |a, b| a + b, "int overflow", "long overflow"),
        "-" => numeric_binop(args, loc, i32::checked_sub, i64::checked_sub, |a, b| a - b, |a, b| a - b, "int overflow", "long overflow"),
        "*" => numeric_binop(args, loc, i32::checked_mul, i64::checked_mul, |a, b| a * b, |a, b| a * b, "int overflow", "long overflow"),
        "/" => {
            let (a, b) = two_doubles(args, loc)?;
            Ok(Value::Double(a / b))
        }
        "//" => integer_floor_div(args, loc),
        "%" => modulo(args, loc),
        "%%" => remainder(args, loc),
        "**" => power(args, loc),
        "==" => Ok(Value::Boolean(compare(args, loc)? == std::cmp::Ordering::Equal)),
        "!=" => Ok(Value::Boolean(compare(args, loc)? != std::cmp::Ordering::Equal)),
        "<" => Ok(Value::Boolean(compare(args, loc)? == std::cmp::Ordering::Less)),
        "<=" => Ok(Value::Boolean(compare(args, loc)? != std::cmp::Ordering::Greater)),
        ">" => Ok(Value::Boolean(compare(args, loc)? == std::cmp::Ordering::Greater)),
        ">=" => Ok(Value::Boolean(compare(args, loc)? != std::cmp::Ordering::Less)),
        "cmp" => Ok(Value::Int(match compare(args, loc)? {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        })),
        "and" => {
            let (a, b) = two_bools(args, loc)?;
            Ok(Value::Boolean(a && b))
        }
        "or" => {
            let (a, b) = two_bools(args, loc)?;
            Ok(Value::Boolean(a || b))
        }
        "xor" => {
            let (a, b) = two_bools(args, loc)?;
            Ok(Value::Boolean(a != b))
        }
        "not" => {
            let a = one_bool(args, loc)?;
            Ok(Value::Boolean(!a))
        }
        "&" => integral_binop(args, loc, |a, b| a & b, "and"),
        "|" => integral_binop(args, loc, |a, b| a | b, "or"),
        "^" => integral_binop(args, loc, |a, b| a ^ b, "xor"),
        "~" => integral_unop(args, loc, |a| !a),
        "<<" => shift(args, loc, |a, n| a.checked_shl(n), |a, n| a.checked_shl(n)),
        ">>" => shift(args, loc, |a, n| a.checked_shr(n), |a, n| a.checked_shr(n)),
        ">>>" => unsigned_shift(args, loc),
        "min" => minmax(args, loc, std::cmp::Ordering::Less),
        "max" => minmax(args, loc, std::cmp::Ordering::Greater),
        other => Err(PFAError::runtime(format!("unimplemented built-in `{other}`"), loc.clone())),
    }
}

fn two(args: &[Value], loc: &Location) -> PFAResult<(&Value, &Value)> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(PFAError::runtime("expected exactly two arguments", loc.clone())),
    }
}

fn two_doubles(args: &[Value], loc: &Location) -> PFAResult<(f64, f64)> {
    let (a, b) = two(args, loc)?;
    Ok((as_f64(a, loc)?, as_f64(b, loc)?))
}

fn two_bools(args: &[Value], loc: &Location) -> PFAResult<(bool, bool)> {
    let (a, b) = two(args, loc)?;
    match (a, b) {
        (Value::Boolean(a), Value::Boolean(b)) => Ok((*a, *b)),
        _ => Err(PFAError::runtime("expected two booleans", loc.clone())),
    }
}

fn one_bool(args: &[Value], loc: &Location) -> PFAResult<bool> {
    match args {
        [Value::Boolean(a)] => Ok(*a),
        _ => Err(PFAError::runtime("expected one boolean", loc.clone())),
    }
}

fn as_f64(v: &Value, loc: &Location) -> PFAResult<f64> {
    match v {
        Value::Int(i) => Ok(f64::from(*i)),
        Value::Long(l) => Ok(*l as f64),
        Value::Float(f) => Ok(f64::from(*f)),
        Value::Double(d) => Ok(*d),
        other => Err(PFAError::runtime(format!("expected a number, found {other:?}"), loc.clone())),
    }
}

#[allow(clippy::too_many_arguments)]
fn numeric_binop(
    args: &[Value],
    loc: &Location,
    int_op: impl Fn(i32, i32) -> Option<i32>,
    long_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f32, f32) -> f32,
    double_op: impl Fn(f64, f64) -> f64,
    int_overflow_msg: &str,
    long_overflow_msg: &str,
) -> PFAResult<Value> {
    let (a, b) = two(args, loc)?;
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| PFAError::runtime(int_overflow_msg, loc.clone())),
        (Value::Long(a), Value::Long(b)) => long_op(*a, *b)
            .map(Value::Long)
            .ok_or_else(|| PFAError::runtime(long_overflow_msg, loc.clone())),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(*a, *b))),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(double_op(*a, *b))),
        _ => Err(PFAError::runtime("mismatched numeric operand types", loc.clone())),
    }
}

/// True floor division (rounds toward negative infinity for every sign of
/// divisor), matching `lib1/core.py`'s `//` (plain Python `//`). Rust's
/// `div_euclid` is NOT equivalent: it keeps the *remainder* non-negative
/// rather than rounding the quotient down, so the two disagree whenever
/// the divisor is negative (e.g. `7 // -3` is `-3` in Python but
/// `7i64.div_euclid(-3) == -2`).
fn floor_div_i64(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q }
}

fn integer_floor_div(args: &[Value], loc: &Location) -> PFAResult<Value> {
    let (a, b) = two(args, loc)?;
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(PFAError::runtime("division by zero", loc.clone()));
            }
            i32::try_from(floor_div_i64(i64::from(*a), i64::from(*b)))
                .map(Value::Int)
                .map_err(|_| PFAError::runtime("int overflow", loc.clone()))
        }
        (Value::Long(a), Value::Long(b)) => {
            if *b == 0 {
                return Err(PFAError::runtime("division by zero", loc.clone()));
            }
            Ok(Value::Long(floor_div_i64(*a, *b)))
        }
        _ => Err(PFAError::runtime("`//` requires int or long operands", loc.clone())),
    }
}

/// Sign-of-divisor modulo (Python's `%`, per `lib1/core.py`'s `Modulo`):
/// the result always carries the same sign as the divisor. Rust's
/// `rem_euclid` is NOT equivalent — it is always non-negative regardless
/// of the divisor's sign, so it diverges from this for a negative
/// divisor (e.g. `7 % -3` is `-2` in Python but `7i64.rem_euclid(-3) ==
/// 1`).
fn modulo(args: &[Value], loc: &Location) -> PFAResult<Value> {
    let (a, b) = two(args, loc)?;
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(PFAError::runtime("modulo by zero", loc.clone()));
            }
            let r = a % b;
            Ok(Value::Int(if r != 0 && (r < 0) != (*b < 0) { r + b } else { r }))
        }
        (Value::Long(a), Value::Long(b)) => {
            if *b == 0 {
                return Err(PFAError::runtime("modulo by zero", loc.clone()));
            }
            let r = a % b;
            Ok(Value::Long(if r != 0 && (r < 0) != (*b < 0) { r + b } else { r }))
        }
        (Value::Float(a), Value::Float(b)) => {
            let r = a % b;
            Ok(Value::Float(if r != 0.0 && (r < 0.0) != (*b < 0.0) { r + b } else { r }))
        }
        (Value::Double(a), Value::Double(b)) => {
            let r = a % b;
            Ok(Value::Double(if r != 0.0 && (r < 0.0) != (*b < 0.0) { r + b } else { r }))
        }
        _ => Err(PFAError::runtime("mismatched operand types for `%`", loc.clone())),
    }
}

/// Sign-of-dividend remainder (§9 open question: resolved this way
/// pending the upstream clarification the design notes mention).
fn remainder(args: &[Value], loc: &Location) -> PFAResult<Value> {
    let (a, b) = two(args, loc)?;
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(PFAError::runtime("remainder by zero", loc.clone()));
            }
            Ok(Value::Int(a % b))
        }
        (Value::Long(a), Value::Long(b)) => {
            if *b == 0 {
                return Err(PFAError::runtime("remainder by zero", loc.clone()));
            }
            Ok(Value::Long(a % b))
        }
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a % b)),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a % b)),
        _ => Err(PFAError::runtime("mismatched operand types for `%%`", loc.clone())),
    }
}

fn power(args: &[Value], loc: &Location) -> PFAResult<Value> {
    let (a, b) = two(args, loc)?;
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => {
            if *b < 0 {
                return Err(PFAError::runtime("negative exponent for integer `**`", loc.clone()));
            }
            checked_ipow(i64::from(*a), *b as u32)
                .and_then(|r| i32::try_from(r).ok())
                .map(Value::Int)
                .ok_or_else(|| PFAError::runtime("int overflow", loc.clone()))
        }
        (Value::Long(a), Value::Long(b)) => {
            if *b < 0 {
                return Err(PFAError::runtime("negative exponent for integer `**`", loc.clone()));
            }
            checked_ipow(*a, *b as u32)
                .map(Value::Long)
                .ok_or_else(|| PFAError::runtime("long overflow", loc.clone()))
        }
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a.powf(*b))),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a.powf(*b))),
        _ => Err(PFAError::runtime("mismatched operand types for `**`", loc.clone())),
    }
}

fn checked_ipow(base: i64, mut exp: u32) -> Option<i64> {
    let mut result: i64 = 1;
    let mut base = base;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(base)?;
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(base)?;
        }
    }
    Some(result)
}

fn compare(args: &[Value], loc: &Location) -> PFAResult<std::cmp::Ordering> {
    let (a, b) = two(args, loc)?;
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Long(a), Value::Long(b)) => Ok(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a
            .partial_cmp(b)
            .ok_or_else(|| PFAError::runtime("NaN is not orderable", loc.clone())),
        (Value::Double(a), Value::Double(b)) => a
            .partial_cmp(b)
            .ok_or_else(|| PFAError::runtime("NaN is not orderable", loc.clone())),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Err(PFAError::runtime("mismatched operand types for comparison", loc.clone())),
    }
}

fn minmax(args: &[Value], loc: &Location, keep: std::cmp::Ordering) -> PFAResult<Value> {
    let ord = compare(args, loc)?;
    let (a, b) = two(args, loc)?;
    Ok(if ord == keep { a.clone() } else { b.clone() })
}

fn integral_binop(args: &[Value], loc: &Location, op: impl Fn(i64, i64) -> i64, name: &str) -> PFAResult<Value> {
    let (a, b) = two(args, loc)?;
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => {
            let r = op(i64::from(*a), i64::from(*b));
            i32::try_from(r).map(Value::Int).map_err(|_| {
                PFAError::runtime(format!("bitwise `{name}` overflowed int"), loc.clone())
            })
        }
        (Value::Long(a), Value::Long(b)) => Ok(Value::Long(op(*a, *b))),
        _ => Err(PFAError::runtime(format!("`{name}` requires int or long operands"), loc.clone())),
    }
}

fn integral_unop(args: &[Value], loc: &Location, op: impl Fn(i64) -> i64) -> PFAResult<Value> {
    match args {
        [Value::Int(a)] => i32::try_from(op(i64::from(*a)))
            .map(Value::Int)
            .map_err(|_| PFAError::runtime("bitwise `~` overflowed int", loc.clone())),
        [Value::Long(a)] => Ok(Value::Long(op(*a))),
        _ => Err(PFAError::runtime("`~` requires an int or long operand", loc.clone())),
    }
}

fn shift(
    args: &[Value],
    loc: &Location,
    int_shift: impl Fn(i32, u32) -> Option<i32>,
    long_shift: impl Fn(i64, u32) -> Option<i64>,
) -> PFAResult<Value> {
    let (a, b) = two(args, loc)?;
    let Value::Int(n) = b else {
        return Err(PFAError::runtime("shift amount must be `int`", loc.clone()));
    };
    let n = u32::try_from(*n).map_err(|_| PFAError::runtime("negative shift amount", loc.clone()))?;
    match a {
        Value::Int(a) => int_shift(*a, n)
            .map(Value::Int)
            .ok_or_else(|| PFAError::runtime("shift amount out of range", loc.clone())),
        Value::Long(a) => long_shift(*a, n)
            .map(Value::Long)
            .ok_or_else(|| PFAError::runtime("shift amount out of range", loc.clone())),
        _ => Err(PFAError::runtime("shift requires an int or long operand", loc.clone())),
    }
}

fn unsigned_shift(args: &[Value], loc: &Location) -> PFAResult<Value> {
    let (a, b) = two(args, loc)?;
    let Value::Int(n) = b else {
        return Err(PFAError::runtime("shift amount must be `int`", loc.clone()));
    };
    let n = u32::try_from(*n).map_err(|_| PFAError::runtime("negative shift amount", loc.clone()))?;
    match a {
        Value::Int(a) => Ok(Value::Int(((*a as u32) >> n) as i32)),
        Value::Long(a) => Ok(Value::Long(((*a as u64) >> n) as i64)),
        _ => Err(PFAError::runtime("`>>>` requires an int or long operand", loc.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loc() -> Location {
        Location::root()
    }

    #[test]
    fn int_overflow_is_detected() {
        let args = [Value::Int(i32::MAX), Value::Int(1)];
        let err = call_builtin("+", &args, &loc());
        assert!(matches!(err, Err(PFAError::Runtime { .. })));
    }

    #[test]
    fn long_overflow_is_detected() {
        let args = [Value::Long(i64::MAX), Value::Long(1)];
        let err = call_builtin("+", &args, &loc());
        assert!(matches!(err, Err(PFAError::Runtime { .. })));
    }

    #[test]
    fn division_is_always_double() {
        let args = [Value::Double(7.0), Value::Double(2.0)];
        assert_eq!(call_builtin("/", &args, &loc()).expect("should divide"), Value::Double(3.5));
    }

    #[test]
    fn floor_division_rounds_toward_negative_infinity() {
        let args = [Value::Int(-7), Value::Int(2)];
        assert_eq!(call_builtin("//", &args, &loc()).expect("should divide"), Value::Int(-4));
    }

    #[test]
    fn floor_division_with_negative_divisor_rounds_down_not_toward_zero() {
        // Python's `7 // -3 == -3`; Rust's `div_euclid` would give `-2`.
        let args = [Value::Long(7), Value::Long(-3)];
        assert_eq!(call_builtin("//", &args, &loc()).expect("should divide"), Value::Long(-3));
    }

    #[test]
    fn modulo_takes_the_sign_of_the_divisor() {
        // Python's `7 % -3 == -2`; Rust's `rem_euclid` would give `1`.
        let args = [Value::Long(7), Value::Long(-3)];
        assert_eq!(call_builtin("%", &args, &loc()).expect("should modulo"), Value::Long(-2));
        let args = [Value::Long(-7), Value::Long(3)];
        assert_eq!(call_builtin("%", &args, &loc()).expect("should modulo"), Value::Long(2));
    }

    #[test]
    fn cmp_returns_minus_one_zero_one() {
        assert_eq!(call_builtin("cmp", &[Value::Int(1), Value::Int(2)], &loc()).unwrap(), Value::Int(-1));
        assert_eq!(call_builtin("cmp", &[Value::Int(2), Value::Int(2)], &loc()).unwrap(), Value::Int(0));
        assert_eq!(call_builtin("cmp", &[Value::Int(3), Value::Int(2)], &loc()).unwrap(), Value::Int(1));
    }

    #[test]
    fn boolean_ops_evaluate_correctly() {
        let args = [Value::Boolean(true), Value::Boolean(false)];
        assert_eq!(call_builtin("and", &args, &loc()).unwrap(), Value::Boolean(false));
        assert_eq!(call_builtin("or", &args, &loc()).unwrap(), Value::Boolean(true));
        assert_eq!(call_builtin("xor", &args, &loc()).unwrap(), Value::Boolean(true));
        assert_eq!(call_builtin("not", &[Value::Boolean(true)], &loc()).unwrap(), Value::Boolean(false));
    }
}
