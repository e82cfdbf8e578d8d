//! Built-in template functions.
//!
//! Each function receives a `Vec<Value>` of already-evaluated arguments.
//! Only the names listed in [`BUILTINS`] can be called from a template; any
//! other call fails with [`EvalError::UnknownFunction`].

use crate::ast::CmpOp;
use crate::error::EvalError;
use crate::value::Value;

/// Names callable from templates.
pub const BUILTINS: &[&str] = &[
    "range", "len", "str", "int", "float", "bool", "abs", "min", "max", "sum", "round", "lower",
    "upper",
];

/// Largest sequence `range` will produce.
pub const MAX_RANGE_LEN: usize = 100_000;

type BuiltinResult = Result<Value, EvalError>;

/// Dispatch a built-in function call.
pub fn call_builtin(name: &str, args: Vec<Value>) -> BuiltinResult {
    match name {
        "range" => range(args),
        "len" => {
            let [x] = exact::<1>(name, args)?;
            x.len().map(Value::from).ok_or_else(|| {
                EvalError::invalid_argument(name, format!("{} has no length", x.type_name()))
            })
        }
        "str" => {
            let [x] = exact::<1>(name, args)?;
            Ok(Value::String(x.to_string()))
        }
        "int" => {
            let [x] = exact::<1>(name, args)?;
            to_int(name, x)
        }
        "float" => {
            let [x] = exact::<1>(name, args)?;
            to_float(name, x)
        }
        "bool" => {
            let [x] = exact::<1>(name, args)?;
            Ok(Value::Bool(x.is_truthy()))
        }
        "abs" => {
            let [x] = exact::<1>(name, args)?;
            match x {
                Value::Int(i) => i.checked_abs().map(Value::Int).ok_or(EvalError::Overflow("abs")),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(EvalError::invalid_argument(
                    name,
                    format!("expected a number, got {}", other.type_name()),
                )),
            }
        }
        "min" => extremum(name, args, CmpOp::Lt),
        "max" => extremum(name, args, CmpOp::Gt),
        "sum" => {
            arity(name, &args, 1, 2)?;
            let mut args = args.into_iter();
            let items = match args.next() {
                Some(Value::List(items)) => items,
                Some(other) => {
                    return Err(EvalError::invalid_argument(
                        name,
                        format!("expected a list, got {}", other.type_name()),
                    ))
                }
                None => Vec::new(),
            };
            let start = args.next().unwrap_or(Value::Int(0));
            items.iter().try_fold(start, |acc, item| acc.arith_add(item))
        }
        "round" => round(args),
        "lower" => {
            let [x] = exact::<1>(name, args)?;
            Ok(Value::String(string_arg(name, &x)?.to_lowercase()))
        }
        "upper" => {
            let [x] = exact::<1>(name, args)?;
            Ok(Value::String(string_arg(name, &x)?.to_uppercase()))
        }
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("{min}")
    } else {
        format!("{min} to {max}")
    };
    Err(EvalError::invalid_argument(
        name,
        format!("expected {expected} argument(s), got {}", args.len()),
    ))
}

fn exact<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], EvalError> {
    arity(name, &args, N, N)?;
    args.try_into()
        .map_err(|_| EvalError::invalid_argument(name, "argument count mismatch"))
}

fn int_arg(name: &str, value: &Value) -> Result<i64, EvalError> {
    value.as_int().ok_or_else(|| {
        EvalError::invalid_argument(name, format!("expected an integer, got {}", value.type_name()))
    })
}

fn string_arg<'v>(name: &str, value: &'v Value) -> Result<&'v str, EvalError> {
    value.as_str().ok_or_else(|| {
        EvalError::invalid_argument(name, format!("expected a string, got {}", value.type_name()))
    })
}

/// `range(stop)`, `range(start, stop)` or `range(start, stop, step)`.
fn range(args: Vec<Value>) -> BuiltinResult {
    let name = "range";
    arity(name, &args, 1, 3)?;
    let ints = args
        .iter()
        .map(|v| int_arg(name, v))
        .collect::<Result<Vec<i64>, _>>()?;
    let (start, stop, step) = match ints[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => return Err(EvalError::invalid_argument(name, "expected 1 to 3 argument(s)")),
    };
    if step == 0 {
        return Err(EvalError::invalid_argument(name, "step must not be zero"));
    }

    let span = i128::from(stop) - i128::from(start);
    let step_wide = i128::from(step);
    let count = if (span > 0 && step > 0) || (span < 0 && step < 0) {
        (span.abs() + step_wide.abs() - 1) / step_wide.abs()
    } else {
        0
    };
    if count > MAX_RANGE_LEN as i128 {
        return Err(EvalError::invalid_argument(
            name,
            format!("range would produce {count} elements (limit {MAX_RANGE_LEN})"),
        ));
    }

    // Every element lies within [start, stop), so narrowing back is lossless
    Ok(Value::List(
        (0..count)
            .map(|i| Value::Int((i128::from(start) + i * step_wide) as i64))
            .collect(),
    ))
}

fn to_int(name: &str, value: Value) -> BuiltinResult {
    match value {
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Bool(b) => Ok(Value::Int(i64::from(b))),
        Value::Float(f) => {
            let t = f.trunc();
            if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
                Ok(Value::Int(t as i64))
            } else {
                Err(EvalError::invalid_argument(name, format!("cannot convert {f} to an integer")))
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| {
                EvalError::invalid_argument(name, format!("invalid integer literal {s:?}"))
            }),
        other => Err(EvalError::invalid_argument(
            name,
            format!("cannot convert {} to an integer", other.type_name()),
        )),
    }
}

fn to_float(name: &str, value: Value) -> BuiltinResult {
    match value {
        Value::Int(i) => Ok(Value::Float(i as f64)),
        Value::Float(f) => Ok(Value::Float(f)),
        Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| EvalError::invalid_argument(name, format!("invalid float literal {s:?}"))),
        other => Err(EvalError::invalid_argument(
            name,
            format!("cannot convert {} to a float", other.type_name()),
        )),
    }
}

/// `min`/`max` over a single list argument or over all arguments.
fn extremum(name: &str, args: Vec<Value>, better: CmpOp) -> BuiltinResult {
    let items = match <[Value; 1]>::try_from(args) {
        Ok([Value::List(items)]) => items,
        Ok([other]) => vec![other],
        Err(args) => args,
    };
    let mut items = items.into_iter();
    let first = items
        .next()
        .ok_or_else(|| EvalError::invalid_argument(name, "expected at least one value"))?;
    items.try_fold(first, |best, item| {
        Ok(if item.compare(better, &best)? { item } else { best })
    })
}

/// Rounds half to even; `round(x)` yields an int, `round(x, n)` a float.
fn round(args: Vec<Value>) -> BuiltinResult {
    let name = "round";
    arity(name, &args, 1, 2)?;
    let digits = match args.get(1) {
        Some(v) => Some(int_arg(name, v)?),
        None => None,
    };
    let x = match &args[0] {
        Value::Int(i) if digits.is_none() => return Ok(Value::Int(*i)),
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        other => {
            return Err(EvalError::invalid_argument(
                name,
                format!("expected a number, got {}", other.type_name()),
            ))
        }
    };
    match digits {
        None => to_int(name, Value::Float(round_half_even(x))),
        Some(n) => {
            let n = i32::try_from(n.clamp(-308, 308)).unwrap_or(0);
            let scale = 10f64.powi(n);
            Ok(Value::Float(round_half_even(x * scale) / scale))
        }
    }
}

fn round_half_even(x: f64) -> f64 {
    let r = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> BuiltinResult {
        call_builtin(name, args)
    }

    fn ints(values: &[i64]) -> Value {
        Value::List(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn range_forms() {
        assert_eq!(call("range", vec![3.into()]).unwrap(), ints(&[0, 1, 2]));
        assert_eq!(call("range", vec![2.into(), 5.into()]).unwrap(), ints(&[2, 3, 4]));
        assert_eq!(
            call("range", vec![10.into(), 0.into(), (-3).into()]).unwrap(),
            ints(&[10, 7, 4, 1])
        );
        assert_eq!(call("range", vec![(-2).into()]).unwrap(), ints(&[]));
    }

    #[test]
    fn range_rejects_bad_arguments() {
        assert!(call("range", vec![]).is_err());
        assert!(call("range", vec![1.into(), 2.into(), 0.into()]).is_err());
        assert!(call("range", vec!["3".into()]).is_err());
        assert!(call("range", vec![(MAX_RANGE_LEN as i64 + 1).into()]).is_err());
        assert!(call("range", vec![i64::MIN.into(), i64::MAX.into()]).is_err());
    }

    #[test]
    fn len_of_sized_values() {
        assert_eq!(call("len", vec!["héllo".into()]).unwrap(), Value::Int(5));
        assert_eq!(call("len", vec![ints(&[1, 2])]).unwrap(), Value::Int(2));
        assert!(matches!(
            call("len", vec![Value::Int(1)]),
            Err(EvalError::InvalidArgument { .. })
        ));
        assert!(call("len", vec![]).is_err());
    }

    #[test]
    fn conversions() {
        assert_eq!(call("int", vec![Value::Float(-2.7)]).unwrap(), Value::Int(-2));
        assert_eq!(call("int", vec![" 42 ".into()]).unwrap(), Value::Int(42));
        assert_eq!(call("float", vec![Value::Int(2)]).unwrap(), Value::Float(2.0));
        assert_eq!(call("str", vec![Value::Float(1.0)]).unwrap(), Value::from("1.0"));
        assert_eq!(call("bool", vec![Value::from("")]).unwrap(), Value::Bool(false));
        assert!(call("int", vec!["x".into()]).is_err());
    }

    #[test]
    fn min_max_sum_abs() {
        assert_eq!(call("min", vec![ints(&[3, 1, 2])]).unwrap(), Value::Int(1));
        assert_eq!(call("max", vec![1.into(), Value::Float(2.5)]).unwrap(), Value::Float(2.5));
        assert!(call("max", vec![ints(&[])]).is_err());
        assert_eq!(call("sum", vec![ints(&[1, 2, 3])]).unwrap(), Value::Int(6));
        assert_eq!(call("abs", vec![Value::Int(-3)]).unwrap(), Value::Int(3));
    }

    #[test]
    fn round_half_to_even() {
        assert_eq!(call("round", vec![Value::Float(2.5)]).unwrap(), Value::Int(2));
        assert_eq!(call("round", vec![Value::Float(3.5)]).unwrap(), Value::Int(4));
        assert_eq!(call("round", vec![Value::Float(-1.2)]).unwrap(), Value::Int(-1));
        assert_eq!(
            call("round", vec![Value::Float(1.25), 1.into()]).unwrap(),
            Value::Float(1.2)
        );
    }

    #[test]
    fn case_conversion() {
        assert_eq!(call("upper", vec!["abc".into()]).unwrap(), Value::from("ABC"));
        assert_eq!(call("lower", vec!["ÀB".into()]).unwrap(), Value::from("àb"));
    }

    #[test]
    fn every_listed_builtin_dispatches() {
        for name in BUILTINS {
            let err = call(name, vec![Value::List(vec![]), Value::Null, Value::Null, Value::Null]);
            assert!(
                !matches!(err, Err(EvalError::UnknownFunction(_))),
                "{name} is not dispatched"
            );
        }
    }

    #[test]
    fn unknown_function() {
        assert_eq!(
            call("open", vec!["/etc/passwd".into()]),
            Err(EvalError::UnknownFunction("open".into()))
        );
    }
}
