use crate::ast::*;
use crate::error::{EvalError, Result, Span, TemplateError};
use crate::lexer::{tokenize_expr, ExprToken, PosToken, Spanned, Token};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    For,
}

impl BlockKind {
    fn tag(self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::For => "for",
        }
    }
}

/// A block-continuation tag (`elif`, `else`, `endif`, `endfor`) that ended a body.
struct Terminator {
    name: String,
    args: String,
    span: Span,
}

fn for_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\A([^\W\d]\w*)\s+in\s+(\S.*)\z").expect("valid for-loop regex")
    })
}

/// Groups a flat token stream into a tree of text, variable, `if` and `for` nodes.
pub struct Parser {
    tokens: std::vec::IntoIter<Spanned>,
    open: Vec<BlockKind>,
    max_depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>, max_depth: usize) -> Self {
        Self {
            tokens: tokens.into_iter(),
            open: Vec::new(),
            max_depth,
        }
    }

    pub fn parse(&mut self) -> Result<Template> {
        let (nodes, terminator) = self.parse_body()?;
        match terminator {
            Some(t) => Err(TemplateError::UnexpectedTag {
                name: t.name,
                span: t.span,
            }),
            None => Ok(nodes),
        }
    }

    /// Parses nodes until end of input or a block-continuation tag, which is
    /// consumed and handed back to the enclosing block.
    fn parse_body(&mut self) -> Result<(Vec<Node>, Option<Terminator>)> {
        let mut nodes = Vec::new();
        while let Some(Spanned { token, span }) = self.tokens.next() {
            match token {
                Token::Text(s) => nodes.push(Node::Text(s)),
                Token::Variable(source) => nodes.push(Node::Var(self.expression(source, span)?)),
                Token::Tag { name, args } => match name.as_str() {
                    "if" => nodes.push(self.parse_if(args, span)?),
                    "for" => nodes.push(self.parse_for(args, span)?),
                    "elif" | "else" | "endif" | "endfor" => {
                        return Ok((nodes, Some(Terminator { name, args, span })));
                    }
                    _ => return Err(TemplateError::UnknownTag { name, span }),
                },
            }
        }
        Ok((nodes, None))
    }

    fn enter(&mut self, kind: BlockKind, span: Span) -> Result<()> {
        if self.open.len() >= self.max_depth {
            return Err(TemplateError::TemplateTooDeep {
                limit: self.max_depth,
                span,
            });
        }
        self.open.push(kind);
        Ok(())
    }

    fn exit(&mut self) {
        self.open.pop();
    }

    /// Error for a terminator the innermost open block cannot accept. If an
    /// enclosing block would accept it, the innermost block is the one left
    /// unclosed; otherwise the tag itself is out of place.
    fn unmatched(
        &self,
        terminator: Terminator,
        current: BlockKind,
        opened_at: Span,
    ) -> TemplateError {
        let owner = match terminator.name.as_str() {
            "endfor" => BlockKind::For,
            _ => BlockKind::If,
        };
        let enclosing = &self.open[..self.open.len().saturating_sub(1)];
        if owner != current && enclosing.contains(&owner) {
            TemplateError::UnclosedBlock {
                tag: current.tag(),
                span: opened_at,
            }
        } else {
            TemplateError::UnexpectedTag {
                name: terminator.name,
                span: terminator.span,
            }
        }
    }

    fn parse_if(&mut self, args: String, span: Span) -> Result<Node> {
        self.enter(BlockKind::If, span)?;

        let mut cases = Vec::new();
        let mut else_body = None;
        // Condition waiting for its body; `None` once `else` was seen.
        let mut pending = Some(self.expression(args, span)?);

        loop {
            let (body, terminator) = self.parse_body()?;
            match pending.take() {
                Some(condition) => cases.push((condition, body)),
                None => else_body = Some(body),
            }

            let terminator = terminator.ok_or(TemplateError::UnclosedBlock { tag: "if", span })?;
            match terminator.name.as_str() {
                "endif" => break,
                "elif" if else_body.is_none() => {
                    pending = Some(self.expression(terminator.args, terminator.span)?);
                }
                "else" if else_body.is_none() => {}
                _ => return Err(self.unmatched(terminator, BlockKind::If, span)),
            }
        }

        self.exit();
        Ok(Node::If { cases, else_body })
    }

    fn parse_for(&mut self, args: String, span: Span) -> Result<Node> {
        let invalid = || TemplateError::InvalidForSyntax {
            args: args.clone(),
            span,
        };
        let caps = for_pattern().captures(&args).ok_or_else(invalid)?;
        let target = caps[1].to_string();
        if !matches!(tokenize_expr(&target).as_deref(), Ok([(ExprToken::Ident(_), _)])) {
            // Keywords such as `in` or `true` cannot be bound
            return Err(invalid());
        }
        let iterable = self.expression(caps[2].trim().to_string(), span)?;

        self.enter(BlockKind::For, span)?;
        let (body, terminator) = self.parse_body()?;
        let terminator = terminator.ok_or(TemplateError::UnclosedBlock { tag: "for", span })?;
        if terminator.name != "endfor" {
            return Err(self.unmatched(terminator, BlockKind::For, span));
        }
        self.exit();

        Ok(Node::For {
            target,
            iterable,
            body,
            span,
        })
    }

    fn expression(&self, source: String, span: Span) -> Result<Expression> {
        match parse_expr(&source, self.max_depth) {
            Ok(ast) => Ok(Expression { ast, source, span }),
            Err(cause) => Err(TemplateError::Evaluation {
                subexpr: source.clone(),
                source_text: source,
                cause,
            }),
        }
    }
}

/// Parses an expression source into its AST.
pub fn parse_expr(source: &str, max_depth: usize) -> std::result::Result<Expr, EvalError> {
    let tokens = tokenize_expr(source)?;
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        end: source.len(),
        depth: 0,
        max_depth,
    };
    let expr = parser.parse_expr()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some((token, offset)) => Err(EvalError::syntax(
            format!("unexpected {token:?} after expression"),
            *offset,
        )),
    }
}

struct ExprParser {
    tokens: Vec<PosToken>,
    pos: usize,
    end: usize,
    depth: usize,
    max_depth: usize,
}

type ParseResult<T> = std::result::Result<T, EvalError>;

impl ExprParser {
    fn peek(&self, n: usize) -> Option<&ExprToken> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, o)| *o).unwrap_or(self.end)
    }

    fn consume(&mut self) -> Option<ExprToken> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &ExprToken) -> bool {
        if self.peek(0) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: ExprToken) -> ParseResult<()> {
        let offset = self.offset();
        match self.consume() {
            Some(t) if t == token => Ok(()),
            Some(t) => Err(EvalError::syntax(format!("expected {token:?}, got {t:?}"), offset)),
            None => Err(EvalError::syntax(
                format!("expected {token:?}, got end of expression"),
                offset,
            )),
        }
    }

    /// Runs `f` one nesting level deeper, failing past the configured bound.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= self.max_depth {
            return Err(EvalError::syntax("expression nested too deeply", self.offset()));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Runs a left-associative chain whose loop calls [`ExprParser::deepen`]
    /// once per operator, restoring the depth when the chain ends.
    fn chain(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<Expr>) -> ParseResult<Expr> {
        let depth = self.depth;
        let result = f(self);
        self.depth = depth;
        result
    }

    /// Each operator in a chain wraps the tree built so far one level deeper.
    fn deepen(&mut self) -> ParseResult<()> {
        if self.depth >= self.max_depth {
            return Err(EvalError::syntax("expression nested too deeply", self.offset()));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.nested(Self::parse_or)
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        self.chain(|p| {
            let mut lhs = p.parse_and()?;
            while p.eat(&ExprToken::Or) {
                p.deepen()?;
                let rhs = p.parse_and()?;
                lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
            }
            Ok(lhs)
        })
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        self.chain(|p| {
            let mut lhs = p.parse_not()?;
            while p.eat(&ExprToken::And) {
                p.deepen()?;
                let rhs = p.parse_not()?;
                lhs = Expr::And(Box::new(lhs), Box::new(rhs));
            }
            Ok(lhs)
        })
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        if self.eat(&ExprToken::Not) {
            let operand = self.nested(Self::parse_not)?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.parse_compare()
    }

    fn compare_op(&mut self) -> Option<CmpOp> {
        let (op, width) = match (self.peek(0)?, self.peek(1)) {
            (ExprToken::EqEq, _) => (CmpOp::Eq, 1),
            (ExprToken::NotEq, _) => (CmpOp::Ne, 1),
            (ExprToken::Lt, _) => (CmpOp::Lt, 1),
            (ExprToken::LtEq, _) => (CmpOp::Le, 1),
            (ExprToken::Gt, _) => (CmpOp::Gt, 1),
            (ExprToken::GtEq, _) => (CmpOp::Ge, 1),
            (ExprToken::In, _) => (CmpOp::In, 1),
            (ExprToken::Not, Some(ExprToken::In)) => (CmpOp::NotIn, 2),
            _ => return None,
        };
        self.pos += width;
        Some(op)
    }

    fn parse_compare(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_additive()?;
        let mut rest = Vec::new();
        while let Some(op) = self.compare_op() {
            rest.push((op, self.parse_additive()?));
        }
        if rest.is_empty() {
            Ok(lhs)
        } else {
            Ok(Expr::Compare(Box::new(lhs), rest))
        }
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        self.chain(|p| {
            let mut lhs = p.parse_multiplicative()?;
            loop {
                let op = match p.peek(0) {
                    Some(ExprToken::Plus) => BinOp::Add,
                    Some(ExprToken::Minus) => BinOp::Sub,
                    _ => break,
                };
                p.pos += 1;
                p.deepen()?;
                let rhs = p.parse_multiplicative()?;
                lhs = Expr::BinOp(Box::new(lhs), op, Box::new(rhs));
            }
            Ok(lhs)
        })
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        self.chain(|p| {
            let mut lhs = p.parse_power()?;
            loop {
                let op = match p.peek(0) {
                    Some(ExprToken::Star) => BinOp::Mul,
                    Some(ExprToken::Slash) => BinOp::Div,
                    Some(ExprToken::SlashSlash) => BinOp::FloorDiv,
                    Some(ExprToken::Percent) => BinOp::Mod,
                    _ => break,
                };
                p.pos += 1;
                p.deepen()?;
                let rhs = p.parse_power()?;
                lhs = Expr::BinOp(Box::new(lhs), op, Box::new(rhs));
            }
            Ok(lhs)
        })
    }

    /// `**` is right-associative and binds looser than unary minus.
    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_unary()?;
        if self.eat(&ExprToken::StarStar) {
            let exponent = self.nested(Self::parse_power)?;
            return Ok(Expr::BinOp(Box::new(base), BinOp::Pow, Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek(0) {
            Some(ExprToken::Minus) => UnaryOp::Neg,
            Some(ExprToken::Plus) => UnaryOp::Pos,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        self.chain(Self::parse_suffixes)
    }

    fn parse_suffixes(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;

        // Handle suffixes: .attr, ['key']
        loop {
            match self.peek(0) {
                Some(ExprToken::Dot) => {
                    self.pos += 1;
                    self.deepen()?;
                    let offset = self.offset();
                    match self.consume() {
                        Some(ExprToken::Ident(attr)) => {
                            expr = Expr::Attribute(Box::new(expr), attr);
                        }
                        t => {
                            return Err(EvalError::syntax(
                                format!("expected identifier after dot, got {t:?}"),
                                offset,
                            ))
                        }
                    }
                }
                Some(ExprToken::LBracket) => {
                    self.pos += 1;
                    self.deepen()?;
                    let idx = self.parse_expr()?;
                    self.expect(ExprToken::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(idx));
                }
                Some(ExprToken::LParen) => {
                    return Err(EvalError::syntax(
                        format!("'{expr}' is not a function name"),
                        self.offset(),
                    ));
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Comma-separated items up to `close`; a trailing comma is allowed.
    fn parse_items<T>(
        &mut self,
        close: ExprToken,
        mut item: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        let mut items = Vec::new();
        while !self.eat(&close) {
            items.push(item(self)?);
            if !self.eat(&ExprToken::Comma) {
                self.expect(close.clone())?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let offset = self.offset();
        let expr = match self.consume() {
            Some(ExprToken::Int(i)) => Expr::IntLit(i),
            Some(ExprToken::Float(f)) => Expr::FloatLit(f),
            Some(ExprToken::StringLit(s)) => Expr::StringLit(s),
            Some(ExprToken::True) => Expr::BoolLit(true),
            Some(ExprToken::False) => Expr::BoolLit(false),
            Some(ExprToken::Null) => Expr::NullLit,
            Some(ExprToken::Ident(name)) => {
                if self.eat(&ExprToken::LParen) {
                    let args = self.nested(|p| p.parse_items(ExprToken::RParen, Self::parse_expr))?;
                    Expr::Call(name, args)
                } else {
                    Expr::Var(name)
                }
            }
            Some(ExprToken::LParen) => {
                let e = self.parse_expr()?;
                self.expect(ExprToken::RParen)?;
                e
            }
            Some(ExprToken::LBracket) => {
                let items = self.nested(|p| p.parse_items(ExprToken::RBracket, Self::parse_expr))?;
                Expr::List(items)
            }
            Some(ExprToken::LBrace) => {
                let entries = self.nested(|p| {
                    p.parse_items(ExprToken::RBrace, |p| {
                        let key = p.parse_expr()?;
                        p.expect(ExprToken::Colon)?;
                        Ok((key, p.parse_expr()?))
                    })
                })?;
                Expr::Map(entries)
            }
            Some(t) => {
                return Err(EvalError::syntax(format!("expected expression, got {t:?}"), offset))
            }
            None => return Err(EvalError::syntax("unexpected end of expression", offset)),
        };
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(template: &str) -> Result<Template> {
        Parser::new(tokenize(template)?, 64).parse()
    }

    fn expr(source: &str) -> Expr {
        parse_expr(source, 64).unwrap()
    }

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Var(name.into()))
    }

    #[test]
    fn precedence_multiplication_over_addition() {
        assert_eq!(expr("1 + 2 * 3").to_string(), "1 + (2 * 3)");
        assert_eq!(expr("(1 + 2) * 3").to_string(), "(1 + 2) * 3");
    }

    #[test]
    fn power_is_right_associative_and_below_unary_minus() {
        assert_eq!(expr("2 ** 3 ** 2").to_string(), "2 ** (3 ** 2)");
        assert_eq!(expr("-2 ** 2").to_string(), "(-2) ** 2");
    }

    #[test]
    fn not_binds_looser_than_comparison() {
        assert_eq!(
            expr("not a == b"),
            Expr::Unary(
                UnaryOp::Not,
                Box::new(Expr::Compare(var("a"), vec![(CmpOp::Eq, Expr::Var("b".into()))]))
            )
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            expr("a or b and c"),
            Expr::Or(var("a"), Box::new(Expr::And(var("b"), var("c"))))
        );
    }

    #[test]
    fn not_in_and_chained_comparisons() {
        assert_eq!(
            expr("x not in xs"),
            Expr::Compare(var("x"), vec![(CmpOp::NotIn, Expr::Var("xs".into()))])
        );
        assert_eq!(expr("1 < x <= 3").to_string(), "1 < x <= 3");
    }

    #[test]
    fn postfix_chain() {
        assert_eq!(
            expr("user.tags[0].name"),
            Expr::Attribute(
                Box::new(Expr::Index(
                    Box::new(Expr::Attribute(var("user"), "tags".into())),
                    Box::new(Expr::IntLit(0))
                )),
                "name".into()
            )
        );
    }

    #[test]
    fn calls_lists_and_maps() {
        assert_eq!(
            expr("range(1, 5, 2,)"),
            Expr::Call(
                "range".into(),
                vec![Expr::IntLit(1), Expr::IntLit(5), Expr::IntLit(2)]
            )
        );
        assert_eq!(expr("[]"), Expr::List(vec![]));
        assert_eq!(
            expr("{'a': 1}"),
            Expr::Map(vec![(Expr::StringLit("a".into()), Expr::IntLit(1))])
        );
    }

    #[test]
    fn expression_syntax_errors() {
        for source in ["", "1 +", "(1", "a.", "a.1", "f(1 2)", "(a)(1)", "1 2", "[1,,]"] {
            assert!(
                matches!(parse_expr(source, 64), Err(EvalError::Syntax { .. })),
                "{source:?} should fail"
            );
        }
    }

    #[test]
    fn expression_depth_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert!(parse_expr(&deep, 64).is_err());
        assert!(parse_expr(&deep, 200).is_ok());
    }

    #[test]
    fn operator_chains_count_toward_depth() {
        for chain in [
            format!("{}1", "1 + ".repeat(1_000)),
            format!("{}2", "2 * ".repeat(1_000)),
            format!("a{}", ".b".repeat(1_000)),
            format!("xs{}", "[0]".repeat(1_000)),
            format!("a{}", " or a".repeat(1_000)),
            format!("a{}", " and a".repeat(1_000)),
        ] {
            assert!(
                matches!(parse_expr(&chain, 64), Err(EvalError::Syntax { .. })),
                "{chain:.20} should exceed the depth bound"
            );
        }
        let short = format!("{}1", "1 + ".repeat(10));
        assert!(parse_expr(&short, 64).is_ok());
    }

    #[test]
    fn resolves_if_elif_else() {
        let nodes = parse("{% if a %}A{% elif b %}B{% else %}C{% endif %}").unwrap();
        match &nodes[..] {
            [Node::If { cases, else_body }] => {
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0].0.source, "a");
                assert_eq!(cases[1].0.source, "b");
                assert_eq!(cases[1].1, vec![Node::Text("B".into())]);
                assert_eq!(else_body.as_deref(), Some(&[Node::Text("C".into())][..]));
            }
            other => panic!("unexpected nodes {other:?}"),
        }
    }

    #[test]
    fn nested_if_does_not_steal_outer_branches() {
        let nodes =
            parse("{% if a %}{% if b %}x{% else %}y{% endif %}{% else %}z{% endif %}").unwrap();
        let Node::If { cases, else_body } = &nodes[0] else {
            panic!("expected if");
        };
        assert_eq!(cases.len(), 1);
        assert!(matches!(&cases[0].1[..], [Node::If { .. }]));
        assert_eq!(else_body.as_deref(), Some(&[Node::Text("z".into())][..]));
    }

    #[test]
    fn for_inside_if_and_if_inside_for() {
        let nodes = parse(
            "{% if a %}{% for x in xs %}{% if x %}1{% endif %}{% endfor %}{% endif %}",
        )
        .unwrap();
        let Node::If { cases, .. } = &nodes[0] else {
            panic!("expected if");
        };
        let Node::For { target, iterable, body, .. } = &cases[0].1[0] else {
            panic!("expected for");
        };
        assert_eq!(target, "x");
        assert_eq!(iterable.source, "xs");
        assert!(matches!(&body[..], [Node::If { .. }]));
    }

    #[test]
    fn unknown_tag() {
        let err = parse("{% unknown_tag %}Content{% endunknown_tag %}").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownTag { ref name, .. } if name == "unknown_tag"));
    }

    #[test]
    fn unclosed_blocks_report_their_opening_position() {
        let err = parse("ab{% if x %}y").unwrap_err();
        assert!(matches!(
            err,
            TemplateError::UnclosedBlock { tag: "if", span: Span { offset: 2, line: 1, column: 3 } }
        ));
        let err = parse("{% for i in xs %}{{ i }}").unwrap_err();
        assert!(matches!(err, TemplateError::UnclosedBlock { tag: "for", .. }));
    }

    #[test]
    fn endfor_never_closes_an_if() {
        let err = parse("{% for x in xs %}{% if x %}y{% endfor %}").unwrap_err();
        assert!(matches!(err, TemplateError::UnclosedBlock { tag: "if", .. }));
    }

    #[test]
    fn else_inside_for_belongs_to_enclosing_if() {
        let err = parse("{% if a %}{% for x in xs %}1{% else %}2{% endif %}").unwrap_err();
        assert!(matches!(err, TemplateError::UnclosedBlock { tag: "for", .. }));
    }

    #[test]
    fn stray_terminators_are_unexpected() {
        for template in [
            "{% endif %}",
            "{% else %}",
            "x{% endfor %}",
            "{% for x in xs %}{% else %}{% endfor %}",
            "{% if a %}{% else %}{% elif b %}{% endif %}",
            "{% if a %}{% else %}{% else %}{% endif %}",
        ] {
            let err = parse(template).unwrap_err();
            assert!(
                matches!(err, TemplateError::UnexpectedTag { .. }),
                "{template}: {err}"
            );
        }
    }

    #[test]
    fn invalid_for_syntax() {
        for template in [
            "{% for x %}{% endfor %}",
            "{% for in xs %}{% endfor %}",
            "{% for 1 in xs %}{% endfor %}",
            "{% for a, b in xs %}{% endfor %}",
            "{% for true in xs %}{% endfor %}",
        ] {
            let err = parse(template).unwrap_err();
            assert!(
                matches!(err, TemplateError::InvalidForSyntax { .. }),
                "{template}: {err}"
            );
        }
    }

    #[test]
    fn nesting_depth_is_capped() {
        let template = format!("{}{}", "{% if x %}".repeat(5), "{% endif %}".repeat(5));
        assert!(Parser::new(tokenize(&template).unwrap(), 5).parse().is_ok());
        let err = Parser::new(tokenize(&template).unwrap(), 4).parse().unwrap_err();
        assert!(matches!(err, TemplateError::TemplateTooDeep { limit: 4, .. }));
    }

    #[test]
    fn bad_condition_is_an_evaluation_error() {
        let err = parse("{% if 1 + %}x{% endif %}").unwrap_err();
        assert!(matches!(err, TemplateError::Evaluation { cause: EvalError::Syntax { .. }, .. }));
    }
}
