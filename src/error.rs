//! Error types for tokenizing, resolving and rendering templates

use std::fmt;
use thiserror::Error;

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Location of a marker in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset of the marker start.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Coarse classification of a [`TemplateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedTag,
    UnknownTag,
    UnexpectedTag,
    UnclosedBlock,
    InvalidForSyntax,
    EvaluationError,
    NotIterable,
    TemplateTooDeep,
    InvalidContext,
}

/// Errors that can occur while rendering a template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// `{{` or `{%` without a matching terminator
    #[error("malformed tag at {span}: {snippet:?}")]
    MalformedTag { snippet: String, span: Span },

    /// Tag name outside of `if`/`elif`/`else`/`for`/`endif`/`endfor`
    #[error("unknown tag '{name}' at {span}")]
    UnknownTag { name: String, span: Span },

    /// Known tag in a position where no open block accepts it
    #[error("unexpected tag '{name}' at {span}")]
    UnexpectedTag { name: String, span: Span },

    /// `if` or `for` without its end tag
    #[error("unclosed '{tag}' block opened at {span}: missing {{% end{tag} %}}")]
    UnclosedBlock { tag: &'static str, span: Span },

    /// `for` arguments not of the form `var in expr`
    #[error("invalid for syntax at {span}: expected 'name in expression', got {args:?}")]
    InvalidForSyntax { args: String, span: Span },

    /// Expression failed to parse or evaluate
    #[error("error evaluating expression '{source_text}' (at '{subexpr}'): {cause}")]
    Evaluation {
        source_text: String,
        subexpr: String,
        #[source]
        cause: EvalError,
    },

    /// `for` iterable did not produce a sequence
    #[error("'{source_text}' at {span} is not iterable (got {type_name})")]
    NotIterable {
        source_text: String,
        type_name: &'static str,
        span: Span,
    },

    /// Block nesting exceeded the configured bound
    #[error("template nesting exceeds the limit of {limit} at {span}")]
    TemplateTooDeep { limit: usize, span: Span },

    /// Context could not be built from the supplied data
    #[error("invalid context: {message}")]
    InvalidContext { message: String },
}

impl TemplateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TemplateError::MalformedTag { .. } => ErrorKind::MalformedTag,
            TemplateError::UnknownTag { .. } => ErrorKind::UnknownTag,
            TemplateError::UnexpectedTag { .. } => ErrorKind::UnexpectedTag,
            TemplateError::UnclosedBlock { .. } => ErrorKind::UnclosedBlock,
            TemplateError::InvalidForSyntax { .. } => ErrorKind::InvalidForSyntax,
            TemplateError::Evaluation { .. } => ErrorKind::EvaluationError,
            TemplateError::NotIterable { .. } => ErrorKind::NotIterable,
            TemplateError::TemplateTooDeep { .. } => ErrorKind::TemplateTooDeep,
            TemplateError::InvalidContext { .. } => ErrorKind::InvalidContext,
        }
    }

    /// The underlying evaluation failure, if this is an evaluation error.
    pub fn eval_cause(&self) -> Option<&EvalError> {
        match self {
            TemplateError::Evaluation { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Cause of an expression parse or evaluation failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("{type_name} has no attribute '{attr}'")]
    UndefinedAttribute {
        attr: String,
        type_name: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("unsupported operand types for {op}: {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("invalid argument to {function}: {message}")]
    InvalidArgument { function: String, message: String },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("integer overflow in {0}")]
    Overflow(&'static str),
}

impl EvalError {
    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        EvalError::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub(crate) fn invalid_argument(function: &str, message: impl Into<String>) -> Self {
        EvalError::InvalidArgument {
            function: function.to_string(),
            message: message.into(),
        }
    }
}
