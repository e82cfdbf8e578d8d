use crate::ast::*;
use crate::builtins::call_builtin;
use crate::context::Context;
use crate::error::{EvalError, Result, TemplateError};
use crate::value::Value;
use indexmap::IndexMap;
use std::borrow::Cow;
use std::collections::HashMap;

/// Evaluation failure paired with the subexpression that raised it.
type Failure = (EvalError, String);

fn fail(expr: &Expr, err: EvalError) -> Failure {
    (err, expr.to_string())
}

/// Renders a resolved template against a borrowed context.
pub struct Evaluator<'ctx> {
    context: &'ctx Context,
    // Loop frames, innermost last. Lookups walk them before the context, so
    // a loop variable shadows a context entry only while its loop runs.
    scopes: Vec<HashMap<String, Value>>,
}

impl<'ctx> Evaluator<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self {
            context,
            scopes: Vec::new(),
        }
    }

    fn get_var(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.context.get(name))
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn set_local(&mut self, name: String, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, value);
        }
    }

    pub fn render(&mut self, template: &Template) -> Result<String> {
        let mut output = String::new();
        self.render_into(template, &mut output)?;
        Ok(output)
    }

    fn render_into(&mut self, nodes: &[Node], output: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(s) => output.push_str(s),
                Node::Var(expr) => {
                    let val = self.evaluate(expr)?;
                    output.push_str(&val.to_string());
                }
                Node::For {
                    target,
                    iterable,
                    body,
                    span,
                } => {
                    let items = match self.eval(iterable)? {
                        Value::List(items) => items,
                        Value::String(s) => {
                            s.chars().map(|c| Value::String(c.to_string())).collect()
                        }
                        Value::Map(m) => m.into_keys().map(Value::String).collect(),
                        other => {
                            return Err(TemplateError::NotIterable {
                                source_text: iterable.source.clone(),
                                type_name: other.type_name(),
                                span: *span,
                            })
                        }
                    };
                    let len = items.len();
                    for (i, item) in items.into_iter().enumerate() {
                        self.push_scope();
                        self.set_local("loop".to_string(), loop_info(i, len));
                        // Bound after `loop` so `for loop in ...` still sees its item
                        self.set_local(target.clone(), item);
                        let rendered = self.render_into(body, output);
                        self.pop_scope();
                        rendered?;
                    }
                }
                Node::If { cases, else_body } => {
                    let mut matched = false;
                    for (cond, body) in cases {
                        if self.evaluate(cond)?.is_truthy() {
                            self.render_into(body, output)?;
                            matched = true;
                            break;
                        }
                    }
                    if !matched {
                        if let Some(body) = else_body {
                            self.render_into(body, output)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Evaluates a parsed expression, attaching its source text to any failure.
    pub fn eval(&self, expr: &Expression) -> Result<Value> {
        self.evaluate(expr).map(Cow::into_owned)
    }

    fn evaluate<'e>(&'e self, expr: &Expression) -> Result<Cow<'e, Value>> {
        self.eval_ref(&expr.ast)
            .map_err(|(cause, subexpr)| TemplateError::Evaluation {
                source_text: expr.source.clone(),
                subexpr,
                cause,
            })
    }

    /// Evaluates variable, attribute and index paths without copying the
    /// containers they pass through; other expressions produce owned values.
    fn eval_ref<'e>(&'e self, expr: &Expr) -> std::result::Result<Cow<'e, Value>, Failure> {
        match expr {
            Expr::Var(name) => self
                .get_var(name)
                .map(Cow::Borrowed)
                .ok_or_else(|| fail(expr, EvalError::UndefinedVariable(name.clone()))),
            Expr::Attribute(obj, attr) => {
                let found = match self.eval_ref(obj)? {
                    Cow::Borrowed(val) => attribute(val, attr).map(Cow::Borrowed),
                    Cow::Owned(val) => attribute(&val, attr).map(|v| Cow::Owned(v.clone())),
                };
                found.map_err(|e| fail(expr, e))
            }
            Expr::Index(obj, idx) => {
                let val = self.eval_ref(obj)?;
                let idx_val = self.eval_ref(idx)?;
                let found = match val {
                    Cow::Borrowed(val) => index(val, &idx_val),
                    Cow::Owned(val) => index(&val, &idx_val).map(|v| Cow::Owned(v.into_owned())),
                };
                found.map_err(|e| fail(expr, e))
            }
            Expr::Compare(first, rest) => {
                let mut lhs = self.eval_ref(first)?;
                for (op, rhs_expr) in rest {
                    let rhs = self.eval_ref(rhs_expr)?;
                    if !lhs.compare(*op, &rhs).map_err(|e| fail(expr, e))? {
                        return Ok(Cow::Owned(Value::Bool(false)));
                    }
                    lhs = rhs;
                }
                Ok(Cow::Owned(Value::Bool(true)))
            }
            // Short-circuit; the deciding operand is the result
            Expr::And(lhs, rhs) => {
                let l = self.eval_ref(lhs)?;
                if l.is_truthy() {
                    self.eval_ref(rhs)
                } else {
                    Ok(l)
                }
            }
            Expr::Or(lhs, rhs) => {
                let l = self.eval_ref(lhs)?;
                if l.is_truthy() {
                    Ok(l)
                } else {
                    self.eval_ref(rhs)
                }
            }
            _ => self.eval_expr(expr).map(Cow::Owned),
        }
    }

    fn eval_expr(&self, expr: &Expr) -> std::result::Result<Value, Failure> {
        match expr {
            Expr::NullLit => Ok(Value::Null),
            Expr::BoolLit(b) => Ok(Value::Bool(*b)),
            Expr::IntLit(i) => Ok(Value::Int(*i)),
            Expr::FloatLit(f) => Ok(Value::Float(*f)),
            Expr::StringLit(s) => Ok(Value::String(s.clone())),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval_expr(item))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Map(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match self.eval_expr(key)? {
                        Value::String(s) => s,
                        other => {
                            return Err(fail(
                                expr,
                                EvalError::invalid_argument(
                                    "mapping literal",
                                    format!("keys must be strings, got {}", other.type_name()),
                                ),
                            ))
                        }
                    };
                    map.insert(key, self.eval_expr(value)?);
                }
                Ok(Value::Map(map))
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval_expr(arg))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                call_builtin(name, args).map_err(|e| fail(expr, e))
            }
            Expr::Unary(op, operand) => {
                let val = self.eval_expr(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!val.is_truthy())),
                    UnaryOp::Neg => val.arith_neg().map_err(|e| fail(expr, e)),
                    UnaryOp::Pos => match val {
                        Value::Int(_) | Value::Float(_) => Ok(val),
                        other => Err(fail(
                            expr,
                            EvalError::TypeMismatch {
                                op: "unary +",
                                left: other.type_name(),
                                right: "nothing",
                            },
                        )),
                    },
                }
            }
            Expr::BinOp(lhs, op, rhs) => {
                let l = self.eval_ref(lhs)?;
                let r = self.eval_ref(rhs)?;
                let result = match op {
                    BinOp::Add => l.arith_add(&r),
                    BinOp::Sub => l.arith_sub(&r),
                    BinOp::Mul => l.arith_mul(&r),
                    BinOp::Div => l.arith_div(&r),
                    BinOp::FloorDiv => l.arith_floor_div(&r),
                    BinOp::Mod => l.arith_rem(&r),
                    BinOp::Pow => l.arith_pow(&r),
                };
                result.map_err(|e| fail(expr, e))
            }
            Expr::Var(..)
            | Expr::Attribute(..)
            | Expr::Index(..)
            | Expr::Compare(..)
            | Expr::And(..)
            | Expr::Or(..) => self.eval_ref(expr).map(Cow::into_owned),
        }
    }
}

fn loop_info(i: usize, len: usize) -> Value {
    let mut loop_map = IndexMap::new();
    loop_map.insert("index".to_string(), Value::from(i + 1));
    loop_map.insert("index0".to_string(), Value::from(i));
    loop_map.insert("first".to_string(), Value::Bool(i == 0));
    loop_map.insert("last".to_string(), Value::Bool(i + 1 == len));
    loop_map.insert("length".to_string(), Value::from(len));
    Value::Map(loop_map)
}

/// Resolves a possibly negative index against a sequence length.
fn position(i: i64, len: usize) -> std::result::Result<usize, EvalError> {
    let resolved = if i < 0 {
        i64::try_from(len).ok().and_then(|n| n.checked_add(i))
    } else {
        Some(i)
    };
    resolved
        .and_then(|p| usize::try_from(p).ok())
        .filter(|p| *p < len)
        .ok_or(EvalError::IndexOutOfRange { index: i, len })
}

fn attribute<'v>(val: &'v Value, attr: &str) -> std::result::Result<&'v Value, EvalError> {
    match val {
        Value::Map(m) => m.get(attr).ok_or_else(|| EvalError::UndefinedAttribute {
            attr: attr.to_string(),
            type_name: "mapping",
        }),
        other => Err(EvalError::UndefinedAttribute {
            attr: attr.to_string(),
            type_name: other.type_name(),
        }),
    }
}

fn index<'v>(val: &'v Value, idx: &Value) -> std::result::Result<Cow<'v, Value>, EvalError> {
    match (val, idx) {
        (Value::Map(m), Value::String(key)) => {
            m.get(key).map(Cow::Borrowed).ok_or_else(|| EvalError::UndefinedAttribute {
                attr: key.clone(),
                type_name: "mapping",
            })
        }
        (Value::List(items), Value::Int(i)) => {
            let p = position(*i, items.len())?;
            Ok(Cow::Borrowed(&items[p]))
        }
        (Value::String(s), Value::Int(i)) => {
            let len = s.chars().count();
            let p = position(*i, len)?;
            Ok(Cow::Owned(
                s.chars().nth(p).map(|c| Value::String(c.to_string())).unwrap_or_default(),
            ))
        }
        (val, idx) => Err(EvalError::TypeMismatch {
            op: "[]",
            left: val.type_name(),
            right: idx.type_name(),
        }),
    }
}
