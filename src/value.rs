use crate::ast::CmpOp;
use crate::error::EvalError;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// A value a template can read from its context or compute.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Num::Int(i) => i == 0,
            Num::Float(f) => f == 0.0,
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "mapping",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(a) => !a.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn as_num(&self) -> Option<Num> {
        match self {
            Value::Int(i) => Some(Num::Int(*i)),
            Value::Float(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    /// Number of elements in a string (characters), list or mapping.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::List(a) => Some(a.len()),
            Value::Map(m) => Some(m.len()),
            _ => None,
        }
    }

    /// Template equality: numbers compare by value across int and float.
    pub fn loose_eq(&self, rhs: &Value) -> bool {
        match (self, rhs) {
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map(|w| v.loose_eq(w)).unwrap_or(false))
            }
            _ => match (self.as_num(), rhs.as_num()) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
                (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
                _ => self == rhs,
            },
        }
    }

    /// `Ok(None)` means the operands are of orderable types but unordered (NaN).
    fn order(&self, rhs: &Value, op: &'static str) -> Result<Option<Ordering>, EvalError> {
        match (self, rhs) {
            (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    if !x.loose_eq(y) {
                        return x.order(y, op);
                    }
                }
                Ok(Some(a.len().cmp(&b.len())))
            }
            _ => match (self.as_num(), rhs.as_num()) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => Ok(Some(a.cmp(&b))),
                (Some(a), Some(b)) => Ok(a.as_f64().partial_cmp(&b.as_f64())),
                _ => Err(self.mismatch(op, rhs)),
            },
        }
    }

    /// Membership test: `self in container`.
    pub(crate) fn is_in(&self, container: &Value) -> Result<bool, EvalError> {
        match container {
            Value::List(items) => Ok(items.iter().any(|item| item.loose_eq(self))),
            Value::Map(m) => match self {
                Value::String(key) => Ok(m.contains_key(key)),
                _ => Ok(false),
            },
            Value::String(haystack) => match self {
                Value::String(needle) => Ok(haystack.contains(needle.as_str())),
                _ => Err(self.mismatch("in", container)),
            },
            _ => Err(self.mismatch("in", container)),
        }
    }

    pub(crate) fn compare(&self, op: CmpOp, rhs: &Value) -> Result<bool, EvalError> {
        let ord = |want: fn(Ordering) -> bool| -> Result<bool, EvalError> {
            Ok(self.order(rhs, op.symbol())?.map(want).unwrap_or(false))
        };
        match op {
            CmpOp::Eq => Ok(self.loose_eq(rhs)),
            CmpOp::Ne => Ok(!self.loose_eq(rhs)),
            CmpOp::Lt => ord(|o| o == Ordering::Less),
            CmpOp::Le => ord(|o| o != Ordering::Greater),
            CmpOp::Gt => ord(|o| o == Ordering::Greater),
            CmpOp::Ge => ord(|o| o != Ordering::Less),
            CmpOp::In => self.is_in(rhs),
            CmpOp::NotIn => self.is_in(rhs).map(|b| !b),
        }
    }

    fn mismatch(&self, op: &'static str, rhs: &Value) -> EvalError {
        EvalError::TypeMismatch {
            op,
            left: self.type_name(),
            right: rhs.type_name(),
        }
    }

    pub fn arith_add(&self, rhs: &Value) -> Result<Value, EvalError> {
        match (self, rhs) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                Ok(Value::List(a.iter().chain(b).cloned().collect()))
            }
            _ => self.numeric("+", rhs, i64::checked_add, |a, b| a + b),
        }
    }

    pub fn arith_sub(&self, rhs: &Value) -> Result<Value, EvalError> {
        self.numeric("-", rhs, i64::checked_sub, |a, b| a - b)
    }

    pub fn arith_mul(&self, rhs: &Value) -> Result<Value, EvalError> {
        match (self, rhs) {
            (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s)) => {
                Ok(Value::String(s.repeat(repeat_count(*n, s.len())?)))
            }
            (Value::List(a), Value::Int(n)) | (Value::Int(n), Value::List(a)) => {
                let count = repeat_count(*n, a.len())?;
                Ok(Value::List(
                    std::iter::repeat(a.iter().cloned())
                        .take(count)
                        .flatten()
                        .collect(),
                ))
            }
            _ => self.numeric("*", rhs, i64::checked_mul, |a, b| a * b),
        }
    }

    /// True division; always produces a float.
    pub fn arith_div(&self, rhs: &Value) -> Result<Value, EvalError> {
        let (a, b) = self.num_pair("/", rhs)?;
        if b.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        Ok(Value::Float(a.as_f64() / b.as_f64()))
    }

    /// Floor division; stays integral when both operands are integers.
    pub fn arith_floor_div(&self, rhs: &Value) -> Result<Value, EvalError> {
        let (a, b) = self.num_pair("//", rhs)?;
        if b.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        match (a, b) {
            (Num::Int(a), Num::Int(b)) => {
                let q = a.checked_div(b).ok_or(EvalError::Overflow("//"))?;
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    Ok(Value::Int(q - 1))
                } else {
                    Ok(Value::Int(q))
                }
            }
            (a, b) => Ok(Value::Float((a.as_f64() / b.as_f64()).floor())),
        }
    }

    /// Modulo whose result takes the sign of the divisor.
    pub fn arith_rem(&self, rhs: &Value) -> Result<Value, EvalError> {
        let (a, b) = self.num_pair("%", rhs)?;
        if b.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        match (a, b) {
            (Num::Int(a), Num::Int(b)) => {
                let r = a.checked_rem(b).ok_or(EvalError::Overflow("%"))?;
                if r != 0 && ((r < 0) != (b < 0)) {
                    Ok(Value::Int(r + b))
                } else {
                    Ok(Value::Int(r))
                }
            }
            (a, b) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                let r = a % b;
                if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                    Ok(Value::Float(r + b))
                } else {
                    Ok(Value::Float(r))
                }
            }
        }
    }

    pub fn arith_pow(&self, rhs: &Value) -> Result<Value, EvalError> {
        let (a, b) = self.num_pair("**", rhs)?;
        if a.is_zero() && b.as_f64() < 0.0 {
            return Err(EvalError::DivisionByZero);
        }
        match (a, b) {
            (Num::Int(base), Num::Int(exp)) if exp >= 0 => {
                let exp = u32::try_from(exp).map_err(|_| EvalError::Overflow("**"))?;
                base.checked_pow(exp)
                    .map(Value::Int)
                    .ok_or(EvalError::Overflow("**"))
            }
            (a, b) => Ok(Value::Float(a.as_f64().powf(b.as_f64()))),
        }
    }

    pub fn arith_neg(&self) -> Result<Value, EvalError> {
        match self {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or(EvalError::Overflow("unary -")),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(EvalError::TypeMismatch {
                op: "unary -",
                left: other.type_name(),
                right: "nothing",
            }),
        }
    }

    fn num_pair(&self, op: &'static str, rhs: &Value) -> Result<(Num, Num), EvalError> {
        match (self.as_num(), rhs.as_num()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(self.mismatch(op, rhs)),
        }
    }

    fn numeric(
        &self,
        op: &'static str,
        rhs: &Value,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value, EvalError> {
        match self.num_pair(op, rhs)? {
            (Num::Int(a), Num::Int(b)) => int_op(a, b)
                .map(Value::Int)
                .ok_or(EvalError::Overflow(op)),
            (a, b) => Ok(Value::Float(float_op(a.as_f64(), b.as_f64()))),
        }
    }

    /// Nested form used inside list and mapping renderings.
    fn write_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::String(s) => write_quoted(f, s),
            other => fmt::Display::fmt(other, f),
        }
    }
}

/// Upper bound on the element count produced by `*` repetition.
const MAX_REPEAT_LEN: usize = 10_000_000;

fn repeat_count(n: i64, unit_len: usize) -> Result<usize, EvalError> {
    // Empty units stay empty whatever the count; negative counts repeat zero times.
    if unit_len == 0 {
        return Ok(0);
    }
    let count = usize::try_from(n.max(0)).map_err(|_| EvalError::Overflow("*"))?;
    match count.checked_mul(unit_len) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(count),
        _ => Err(EvalError::Overflow("*")),
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("'")
}

pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let s = value.to_string();
    if s.contains('.') || s.contains('e') {
        s
    } else {
        format!("{s}.0")
    }
}

/// Canonical output form used by `{{ ... }}`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write_repr(f)?;
                }
                f.write_str("]")
            }
            Value::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, k)?;
                    f.write_str(": ")?;
                    v.write_repr(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        i64::try_from(n)
            .map(Value::Int)
            .unwrap_or(Value::Float(n as f64))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<IndexMap<String, T>> for Value {
    fn from(m: IndexMap<String, T>) -> Self {
        Value::Map(m.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(m: HashMap<String, T>) -> Self {
        let mut entries: Vec<(String, Value)> =
            m.into_iter().map(|(k, v)| (k, v.into())).collect();
        // HashMap order is unstable; sort for deterministic output.
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Value::Map(entries.into_iter().collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
