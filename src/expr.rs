//! Free-text boolean expressions for expression-mode branch conditions.
//!
//! A small parse-then-evaluate pipeline: the input is tokenized, parsed into
//! an [`Expr`] tree, and evaluated against the run's variables. Supported
//! syntax is deliberately narrow: logical operators (`&&`, `||`, `!`),
//! the comparison operators shared with structured conditions, parentheses,
//! literals (numbers, quoted strings, `true`/`false`/`null`) and references
//! (`variableId.fieldPath`, `@TOKEN`).
//!
//! Comparison semantics are exactly those of [`CompareOp::evaluate`], so an
//! expression branch and a structured branch configured with the same
//! operands agree.
//!
//! Parsing is strict; evaluation is not. A malformed expression surfaces as
//! an [`ExprError`] for the branch executor to log and treat as `false`,
//! while unset references inside a well-formed expression simply evaluate as
//! null.

use serde_json::Value;
use thiserror::Error;

use crate::env::SessionIdentity;
use crate::resolver::system_value;
use crate::value::{CompareOp, truthy};
use crate::variables::VariableStore;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unexpected token '{found}'")]
    UnexpectedToken { found: String },

    #[error("expression ended unexpectedly")]
    UnexpectedEnd,

    #[error("unexpected trailing input '{found}'")]
    TrailingInput { found: String },
}

/// A parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// A variable path or `@` system token.
    Reference(String),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Evaluate to a dynamic value. References that resolve to nothing
    /// evaluate as null.
    #[must_use]
    pub fn eval(&self, vars: &VariableStore, identity: &dyn SessionIdentity) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Reference(path) => {
                if path.starts_with('@') {
                    system_value(path, identity)
                } else {
                    vars.resolve_path(path).unwrap_or(Value::Null)
                }
            }
            Expr::Compare { op, left, right } => {
                let left = left.eval(vars, identity);
                let right = right.eval(vars, identity);
                Value::Bool(op.evaluate(&left, &right))
            }
            Expr::And(left, right) => Value::Bool(
                truthy(&left.eval(vars, identity)) && truthy(&right.eval(vars, identity)),
            ),
            Expr::Or(left, right) => Value::Bool(
                truthy(&left.eval(vars, identity)) || truthy(&right.eval(vars, identity)),
            ),
            Expr::Not(inner) => Value::Bool(!truthy(&inner.eval(vars, identity))),
        }
    }
}

/// Parse an expression without evaluating it.
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(ExprError::TrailingInput {
            found: tok.describe(),
        }),
    }
}

/// Parse and evaluate an expression to a boolean.
pub fn evaluate(
    input: &str,
    vars: &VariableStore,
    identity: &dyn SessionIdentity,
) -> Result<bool, ExprError> {
    let expr = parse(input)?;
    Ok(truthy(&expr.eval(vars, identity)))
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Op(CompareOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => s.clone(),
            Token::Number(n) => n.to_string(),
            Token::Str(s) => format!("'{s}'"),
            Token::Op(op) => op.to_string(),
            Token::And => "&&".into(),
            Token::Or => "||".into(),
            Token::Not => "!".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$' || c == '@'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '.'
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CompareOp::Eq));
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CompareOp::Ne));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CompareOp::Ge));
                i += 2;
            }
            '>' => {
                tokens.push(Token::Op(CompareOp::Gt));
                i += 1;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CompareOp::Le));
                i += 2;
            }
            '<' => {
                tokens.push(Token::Op(CompareOp::Lt));
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ExprError::UnterminatedString),
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&'\\') => {
                            if let Some(&escaped) = chars.get(i + 1) {
                                value.push(escaped);
                                i += 2;
                            } else {
                                return Err(ExprError::UnterminatedString);
                            }
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) =>
            {
                let start = i;
                i += 1;
                while chars
                    .get(i)
                    .is_some_and(|&ch| ch.is_ascii_digit() || ch == '.')
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text.parse::<f64>().map_err(|_| ExprError::UnexpectedToken {
                    found: text.clone(),
                })?;
                tokens.push(Token::Number(number));
            }
            c if is_ident_start(c) => {
                let start = i;
                i += 1;
                while chars.get(i).is_some_and(|&ch| is_ident_continue(ch)) {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(text));
            }
            other => {
                return Err(ExprError::UnexpectedChar {
                    found: other,
                    offset: i,
                });
            }
        }
    }

    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let inner = self.unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.primary()?;
        if let Some(Token::Op(op)) = self.peek().cloned() {
            self.advance();
            let right = self.primary()?;
            return Ok(Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            None => Err(ExprError::UnexpectedEnd),
            Some(Token::Number(n)) => Ok(Expr::Literal(
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
            )),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Ident(name)) => {
                let keyword = match name.as_str() {
                    "true" => Some(Expr::Literal(Value::Bool(true))),
                    "false" => Some(Expr::Literal(Value::Bool(false))),
                    "null" => Some(Expr::Literal(Value::Null)),
                    _ => None,
                };
                Ok(keyword.unwrap_or(Expr::Reference(name)))
            }
            Some(Token::LParen) => {
                let inner = self.expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(tok) => Err(ExprError::UnexpectedToken {
                        found: tok.describe(),
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(tok) => Err(ExprError::UnexpectedToken {
                found: tok.describe(),
            }),
        }
    }
}
