//! mtmpl: a minimal Jinja-like text templating engine.
//!
//! A template is literal text interleaved with variable markers
//! (`{{ expression }}`) and control tags (`{% if %}`, `{% for %}`). Rendering
//! runs in three stages, each consuming the previous one's output:
//!
//! 1. [`lexer::tokenize`] scans the template into text runs, variable markers
//!    and tags in a single pass.
//! 2. [`parser::Parser`] groups `if`/`elif`/`else`/`endif` and
//!    `for`/`endfor` tags, with arbitrary nesting, into a tree of [`Node`]s.
//! 3. [`eval::Evaluator`] walks the tree against a [`Context`] and produces
//!    the output string.
//!
//! Supported subset:
//! - `{{ expr }}` with arithmetic (`+ - * / // % **`), comparisons
//!   (`== != < <= > >=`, chained), membership (`in`, `not in`), boolean logic
//!   (`and`, `or`, `not`), attribute access (`user.name`), indexing
//!   (`items[0]`, `user['name']`), list and mapping literals.
//! - Calls to a fixed set of built-ins: `range`, `len`, `str`, `int`,
//!   `float`, `bool`, `abs`, `min`, `max`, `sum`, `round`, `lower`, `upper`.
//! - `{% if cond %} ... {% elif cond %} ... {% else %} ... {% endif %}`.
//! - `{% for name in expr %} ... {% endfor %}` over lists, strings and
//!   mappings (keys), with a `loop` variable (`index`, `index0`, `first`,
//!   `last`, `length`).
//!
//! Not supported:
//! - Filters (`| upper`), macros, includes, template inheritance.
//! - Whitespace control (`{%-`) and auto-escaping.
//! - Calling anything outside the built-in table.
//!
//! Output semantics:
//! - Text outside markers is copied verbatim; no whitespace is added or
//!   trimmed.
//! - Integers render without a decimal point, floats always with one
//!   (`3.0`), booleans as `true`/`false`, null as the empty string.
//! - Every error aborts the render; there is no partial output.
//!
//! ```
//! use mtmpl::{render, Context};
//!
//! let ctx = Context::new().with("score", 85);
//! let out = render(
//!     "{% if score >= 90 %}A{% elif score >= 80 %}B{% else %}C{% endif %}",
//!     &ctx,
//! )
//! .unwrap();
//! assert_eq!(out, "B");
//! ```

pub mod ast;
pub mod builtins;
pub mod context;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{Expr, Expression, Node, Template};
pub use context::Context;
pub use error::{ErrorKind, EvalError, Result, Span, TemplateError};
pub use value::Value;

use tracing::{debug, trace};

/// Default bound on block nesting and expression nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configurable renderer. [`render`] uses the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderer {
    max_depth: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum nesting of `if`/`for` blocks; deeper templates fail with
    /// [`TemplateError::TemplateTooDeep`]. Also bounds expression nesting.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Tokenizes and resolves a template without rendering it.
    pub fn parse(&self, template: &str) -> Result<Template> {
        let tokens = lexer::tokenize(template)?;
        trace!(tokens = tokens.len(), "tokenized template");
        let nodes = parser::Parser::new(tokens, self.max_depth).parse()?;
        trace!(nodes = nodes.len(), "resolved template blocks");
        Ok(nodes)
    }

    /// Renders `template` against `context`.
    pub fn render(&self, template: &str, context: &Context) -> Result<String> {
        debug!(
            template_len = template.len(),
            context_vars = context.len(),
            "rendering template"
        );
        let result = self
            .parse(template)
            .and_then(|nodes| eval::Evaluator::new(context).render(&nodes));
        if let Err(err) = &result {
            debug!(kind = ?err.kind(), error = %err, "template rendering failed");
        }
        result
    }
}

/// Render `template` against `context` with the default settings.
pub fn render(template: &str, context: &Context) -> Result<String> {
    Renderer::default().render(template, context)
}
