//! Arithmetic expressions used by rule actions.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (("+" | "-") term)*
//! term    := unary (("*" | "/") unary)*
//! unary   := "-" unary | primary
//! primary := NUMBER | IDENT | IDENT "(" expr ("," expr)* ")" | "(" expr ")"
//! ```
//!
//! Functions: `min(a, b)`, `max(a, b)`, `round(x, dp)` (half-up).

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::value::Value;

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Decimal literal.
    Number(Decimal),
    /// Fact field reference.
    Field(String),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Binary arithmetic.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Built-in function call.
    Call(Function, Vec<Expr>),
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Smaller of two values.
    Min,
    /// Larger of two values.
    Max,
    /// Round half-up to a number of decimal places.
    Round,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "round" => Some(Function::Round),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Decimal),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = Decimal::from_str(&text)
                    .map_err(|_| format!("invalid number '{text}' at offset {start}"))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{other}' at offset {i}")),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {expected:?}, found {token:?}")),
            None => Err(format!("expected {expected:?}, found end of expression")),
        }
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() != Some(&Token::LParen) {
                    return Ok(Expr::Field(name));
                }
                let function =
                    Function::lookup(&name).ok_or_else(|| format!("unknown function '{name}'"))?;
                self.pos += 1;
                let mut args = vec![self.expr()?];
                while self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    args.push(self.expr()?);
                }
                self.expect(Token::RParen)?;
                if args.len() != 2 {
                    return Err(format!("{name}() takes 2 arguments, got {}", args.len()));
                }
                Ok(Expr::Call(function, args))
            }
            Some(token) => Err(format!("unexpected {token:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

impl Expr {
    /// Parses an expression.
    ///
    /// # Example
    ///
    /// ```
    /// use contribution_engine::rules::Expr;
    ///
    /// assert!(Expr::parse("round(a * 3 / 100, 2)").is_ok());
    /// assert!(Expr::parse("a +").is_err());
    /// ```
    pub fn parse(source: &str) -> Result<Expr, String> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err("empty expression".to_string());
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(token) => Err(format!("unexpected trailing {token:?}")),
        }
    }

    /// Evaluates the expression, resolving fields through `lookup`.
    ///
    /// Every operand must be a decimal. Division by zero and overflow are
    /// errors.
    pub fn evaluate<F>(&self, lookup: &F) -> Result<Decimal, String>
    where
        F: Fn(&str) -> Result<Value, String>,
    {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Field(name) => match lookup(name)? {
                Value::Decimal(d) => Ok(d),
                other => Err(format!(
                    "field '{name}' is {}, expected decimal",
                    other.type_name()
                )),
            },
            Expr::Neg(inner) => Ok(-inner.evaluate(lookup)?),
            Expr::Binary(op, left, right) => {
                let a = left.evaluate(lookup)?;
                let b = right.evaluate(lookup)?;
                let result = match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    BinaryOp::Mul => a.checked_mul(b),
                    BinaryOp::Div => {
                        if b.is_zero() {
                            return Err("division by zero".to_string());
                        }
                        a.checked_div(b)
                    }
                };
                result.ok_or_else(|| format!("arithmetic overflow in {a} {op:?} {b}"))
            }
            Expr::Call(function, args) => {
                let [first, second] = args.as_slice() else {
                    return Err(format!("{function:?} takes 2 arguments, got {}", args.len()));
                };
                let a = first.evaluate(lookup)?;
                let b = second.evaluate(lookup)?;
                match function {
                    Function::Min => Ok(a.min(b)),
                    Function::Max => Ok(a.max(b)),
                    Function::Round => {
                        let places = b
                            .fract()
                            .is_zero()
                            .then(|| b.to_u32())
                            .flatten()
                            .filter(|places| *places <= 28)
                            .ok_or_else(|| format!("round() places must be 0..=28, got {b}"))?;
                        Ok(a.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero))
                    }
                }
            }
        }
    }

    /// Every field the expression reads.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Field(name) => out.push(name),
            Expr::Neg(inner) => inner.collect_fields(out),
            Expr::Binary(_, left, right) => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
            Expr::Call(_, args) => args.iter().for_each(|arg| arg.collect_fields(out)),
        }
    }
}
