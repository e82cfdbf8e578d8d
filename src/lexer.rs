use crate::error::{EvalError, Result, Span, TemplateError};
use regex::Regex;
use std::sync::OnceLock;

/// Template-level token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    Variable(String), // {{ expr }}
    Tag { name: String, args: String }, // {% name args %}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

fn variable_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\A\{\{\s*(.*?)\s*\}\}").expect("valid variable regex"))
}

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\A\{%\s*(\w+)(.*?)\s*%\}").expect("valid tag regex"))
}

/// Splits a template into text runs, variable markers and tags, in source order.
pub struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
    line: usize,
    column: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            cursor: 0,
            line: 1,
            column: 1,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn span(&self) -> Span {
        Span {
            offset: self.cursor,
            line: self.line,
            column: self.column,
        }
    }

    fn advance(&mut self, n: usize) {
        let consumed = &self.input[self.cursor..self.cursor + n];
        match consumed.rfind('\n') {
            Some(nl) => {
                self.line += consumed.matches('\n').count();
                self.column = consumed[nl + 1..].chars().count() + 1;
            }
            None => self.column += consumed.chars().count(),
        }
        self.cursor += n;
    }

    pub fn next_token(&mut self) -> Result<Option<Spanned>> {
        let rest = self.remaining();
        if rest.is_empty() {
            return Ok(None);
        }
        let span = self.span();

        if let Some(caps) = variable_pattern().captures(rest) {
            let token = Token::Variable(caps[1].trim().to_string());
            self.advance(caps[0].len());
            return Ok(Some(Spanned { token, span }));
        }

        if let Some(caps) = tag_pattern().captures(rest) {
            let token = Token::Tag {
                name: caps[1].to_string(),
                args: caps[2].trim().to_string(),
            };
            self.advance(caps[0].len());
            return Ok(Some(Spanned { token, span }));
        }

        // Find next `{{` or `{%`
        let next_marker = rest.find("{{").into_iter().chain(rest.find("{%")).min();
        match next_marker {
            Some(0) => {
                // A marker prefix that neither pattern accepted
                let snippet: String = rest.chars().take(24).collect();
                Err(TemplateError::MalformedTag { snippet, span })
            }
            Some(idx) => {
                let text = rest[..idx].to_string();
                self.advance(idx);
                Ok(Some(Spanned {
                    token: Token::Text(text),
                    span,
                }))
            }
            None => {
                let text = rest.to_string();
                self.advance(rest.len());
                Ok(Some(Spanned {
                    token: Token::Text(text),
                    span,
                }))
            }
        }
    }
}

/// Tokenizes a whole template. Empty input yields no tokens.
pub fn tokenize(template: &str) -> Result<Vec<Spanned>> {
    let mut lexer = Tokenizer::new(template);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

/// Token inside a `{{ }}` or tag argument expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprToken {
    // Keywords
    And,
    Or,
    Not,
    In,
    True,
    False,
    Null,

    // Symbols
    EqEq,       // ==
    NotEq,      // !=
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    Plus,       // +
    Minus,      // -
    Star,       // *
    StarStar,   // **
    Slash,      // /
    SlashSlash, // //
    Percent,    // %
    Dot,        // .
    Comma,      // ,
    Colon,      // :
    LBracket,   // [
    RBracket,   // ]
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }

    // Data
    Ident(String),
    Int(i64),
    Float(f64),
    StringLit(String),
}

/// Expression token plus its byte offset within the expression source.
pub type PosToken = (ExprToken, usize);

/// Scans an expression source into tokens.
pub fn tokenize_expr(input: &str) -> std::result::Result<Vec<PosToken>, EvalError> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    while cursor < input.len() {
        let rest = &input[cursor..];
        let Some(first) = rest.chars().next() else {
            break;
        };

        if first.is_whitespace() {
            cursor += first.len_utf8();
            continue;
        }

        let start = cursor;

        // Two-character symbols first
        let two = match rest.get(..2) {
            Some("==") => Some(ExprToken::EqEq),
            Some("!=") => Some(ExprToken::NotEq),
            Some("<=") => Some(ExprToken::LtEq),
            Some(">=") => Some(ExprToken::GtEq),
            Some("**") => Some(ExprToken::StarStar),
            Some("//") => Some(ExprToken::SlashSlash),
            _ => None,
        };
        if let Some(token) = two {
            tokens.push((token, start));
            cursor += 2;
            continue;
        }

        let one = match first {
            '<' => Some(ExprToken::Lt),
            '>' => Some(ExprToken::Gt),
            '+' => Some(ExprToken::Plus),
            '-' => Some(ExprToken::Minus),
            '*' => Some(ExprToken::Star),
            '/' => Some(ExprToken::Slash),
            '%' => Some(ExprToken::Percent),
            '.' => Some(ExprToken::Dot),
            ',' => Some(ExprToken::Comma),
            ':' => Some(ExprToken::Colon),
            '[' => Some(ExprToken::LBracket),
            ']' => Some(ExprToken::RBracket),
            '(' => Some(ExprToken::LParen),
            ')' => Some(ExprToken::RParen),
            '{' => Some(ExprToken::LBrace),
            '}' => Some(ExprToken::RBrace),
            _ => None,
        };
        if let Some(token) = one {
            tokens.push((token, start));
            cursor += 1;
            continue;
        }

        // Strings
        if first == '\'' || first == '"' {
            let (s, len) = scan_string(rest, first)
                .ok_or_else(|| EvalError::syntax("unterminated string literal", start))?;
            tokens.push((ExprToken::StringLit(s), start));
            cursor += len;
            continue;
        }

        // Numbers
        if first.is_ascii_digit() {
            let (token, len) = scan_number(rest, start)?;
            tokens.push((token, start));
            cursor += len;
            continue;
        }

        // Identifiers / Keywords
        if first.is_alphabetic() || first == '_' {
            let len: usize = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .map(char::len_utf8)
                .sum();
            let ident = &rest[..len];
            let token = match ident {
                "and" => ExprToken::And,
                "or" => ExprToken::Or,
                "not" => ExprToken::Not,
                "in" => ExprToken::In,
                "true" | "True" => ExprToken::True,
                "false" | "False" => ExprToken::False,
                "null" | "none" | "None" => ExprToken::Null,
                _ => ExprToken::Ident(ident.to_string()),
            };
            tokens.push((token, start));
            cursor += len;
            continue;
        }

        return Err(EvalError::syntax(
            format!("unexpected character {first:?}"),
            start,
        ));
    }

    Ok(tokens)
}

/// Returns the unescaped contents and the byte length including both quotes.
fn scan_string(rest: &str, quote: char) -> Option<(String, usize)> {
    let mut s = String::new();
    let mut chars = rest.char_indices().skip(1);
    while let Some((idx, c)) = chars.next() {
        if c == quote {
            return Some((s, idx + c.len_utf8()));
        }
        if c == '\\' {
            let (_, esc) = chars.next()?;
            match esc {
                'n' => s.push('\n'),
                't' => s.push('\t'),
                'r' => s.push('\r'),
                '0' => s.push('\0'),
                _ => s.push(esc),
            }
        } else {
            s.push(c);
        }
    }
    // Unterminated string
    None
}

fn scan_number(rest: &str, start: usize) -> std::result::Result<(ExprToken, usize), EvalError> {
    let bytes = rest.as_bytes();
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b'_')
            .count()
    };

    let mut len = digits(0);
    let mut is_float = false;

    // `1.5` is a float; `1.foo` is left for the parser to reject
    if bytes.get(len) == Some(&b'.') && bytes.get(len + 1).is_some_and(u8::is_ascii_digit) {
        is_float = true;
        len += 1 + digits(len + 1);
    }
    if matches!(bytes.get(len), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(len + 1), Some(b'+' | b'-')));
        if bytes.get(len + 1 + sign).is_some_and(u8::is_ascii_digit) {
            is_float = true;
            len += 1 + sign + digits(len + 1 + sign);
        }
    }

    let literal: String = rest[..len].chars().filter(|c| *c != '_').collect();
    let token = if is_float {
        literal
            .parse::<f64>()
            .map(ExprToken::Float)
            .map_err(|_| EvalError::syntax(format!("invalid float literal {literal:?}"), start))?
    } else {
        literal
            .parse::<i64>()
            .map(ExprToken::Int)
            .map_err(|_| {
                EvalError::syntax(format!("integer literal {literal} out of range"), start)
            })?
    };
    Ok((token, len))
}
