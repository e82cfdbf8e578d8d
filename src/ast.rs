use crate::error::Span;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    NullLit,
    BoolLit(bool),
    IntLit(i64),
    FloatLit(f64),
    StringLit(String),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Var(String),
    Attribute(Box<Expr>, String), // foo.bar
    Index(Box<Expr>, Box<Expr>),  // foo['bar']
    Call(String, Vec<Expr>),      // len(foo)
    Unary(UnaryOp, Box<Expr>),
    BinOp(Box<Expr>, BinOp, Box<Expr>),
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>), // a < b <= c
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Renders the expression back to source form for diagnostics.
/// Compound operands are parenthesized, so the output may differ
/// cosmetically from what was written.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::NullLit => f.write_str("null"),
            Expr::BoolLit(b) => write!(f, "{b}"),
            Expr::IntLit(i) => write!(f, "{i}"),
            Expr::FloatLit(x) => f.write_str(&crate::value::format_float(*x)),
            Expr::StringLit(s) => write!(f, "{s:?}"),
            Expr::List(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Expr::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Expr::Var(name) => f.write_str(name),
            Expr::Attribute(obj, attr) => write!(f, "{}.{attr}", Operand(obj)),
            Expr::Index(obj, idx) => write!(f, "{}[{idx}]", Operand(obj)),
            Expr::Call(name, args) => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Unary(UnaryOp::Not, e) => write!(f, "not {}", Operand(e)),
            Expr::Unary(UnaryOp::Neg, e) => write!(f, "-{}", Operand(e)),
            Expr::Unary(UnaryOp::Pos, e) => write!(f, "+{}", Operand(e)),
            Expr::BinOp(l, op, r) => write!(f, "{} {} {}", Operand(l), op.symbol(), Operand(r)),
            Expr::Compare(first, rest) => {
                write!(f, "{}", Operand(first))?;
                for (op, e) in rest {
                    write!(f, " {} {}", op.symbol(), Operand(e))?;
                }
                Ok(())
            }
            Expr::And(l, r) => write!(f, "{} and {}", Operand(l), Operand(r)),
            Expr::Or(l, r) => write!(f, "{} or {}", Operand(l), Operand(r)),
        }
    }
}

/// Parenthesizes compound subexpressions when displayed as an operand.
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expr::Unary(..)
            | Expr::BinOp(..)
            | Expr::Compare(..)
            | Expr::And(..)
            | Expr::Or(..) => write!(f, "({})", self.0),
            other => write!(f, "{other}"),
        }
    }
}

/// A parsed expression together with the text it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub ast: Expr,
    pub source: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Var(Expression),
    For {
        target: String,       // e.g., "item"
        iterable: Expression, // e.g., "items"
        body: Vec<Node>,
        span: Span,
    },
    If {
        cases: Vec<(Expression, Vec<Node>)>, // (condition, body). Includes if and elifs.
        else_body: Option<Vec<Node>>,
    },
}

pub type Template = Vec<Node>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parenthesizes_nested_operands() {
        let expr = Expr::BinOp(
            Box::new(Expr::BinOp(
                Box::new(Expr::IntLit(1)),
                BinOp::Add,
                Box::new(Expr::Var("x".into())),
            )),
            BinOp::Mul,
            Box::new(Expr::Attribute(Box::new(Expr::Var("user".into())), "age".into())),
        );
        assert_eq!(expr.to_string(), "(1 + x) * user.age");
    }

    #[test]
    fn display_calls_and_literals() {
        let expr = Expr::Call(
            "range".into(),
            vec![Expr::IntLit(3), Expr::FloatLit(2.0), Expr::StringLit("a".into())],
        );
        assert_eq!(expr.to_string(), "range(3, 2.0, \"a\")");
    }
}
