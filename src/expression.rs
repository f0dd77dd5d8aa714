//! Minimal expression language for `{...}` attribute bindings.
//!
//! The original tool handed brace expressions to a host scripting engine,
//! which meant arbitrary code execution at build time. This module replaces
//! that with a small closed language: literals, identifiers bound to scope,
//! property and index access, arithmetic, comparison and boolean operators.
//! Its own lexer, a recursive-descent parser and a tree-walking evaluator;
//! evaluation can reach nothing outside the scope it is given.
//!
//! Values are [`serde_json::Value`]: scope bindings are cloned into the
//! evaluation, never aliased, so an evaluation cannot mutate the caller's
//! scope (the original achieved the same with a JSON round-trip per binding).

use std::fmt;

pub type Value = serde_json::Value;

/// Expression parse/eval failure. Carries only a message; the resolution
/// engine wraps it with attribute, node and page context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    fn new(message: impl Into<String>) -> Self {
        EvalError {
            message: message.into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEXER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Number(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Number(n) => write!(f, "{}", n),
            Tok::Str(s) => write!(f, "'{}'", s),
            Tok::Ident(i) => write!(f, "{}", i),
            Tok::Plus => write!(f, "+"),
            Tok::Minus => write!(f, "-"),
            Tok::Star => write!(f, "*"),
            Tok::Slash => write!(f, "/"),
            Tok::Percent => write!(f, "%"),
            Tok::Bang => write!(f, "!"),
            Tok::EqEq => write!(f, "=="),
            Tok::NotEq => write!(f, "!="),
            Tok::Lt => write!(f, "<"),
            Tok::LtEq => write!(f, "<="),
            Tok::Gt => write!(f, ">"),
            Tok::GtEq => write!(f, ">="),
            Tok::AndAnd => write!(f, "&&"),
            Tok::OrOr => write!(f, "||"),
            Tok::LParen => write!(f, "("),
            Tok::RParen => write!(f, ")"),
            Tok::LBracket => write!(f, "["),
            Tok::RBracket => write!(f, "]"),
            Tok::Dot => write!(f, "."),
        }
    }
}

fn lex(input: &str) -> Result<Vec<Tok>, EvalError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Tok::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Tok::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Tok::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Tok::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Tok::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Tok::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Tok::RBracket);
                i += 1;
            }
            '.' => {
                tokens.push(Tok::Dot);
                i += 1;
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::NotEq);
                    i += 2;
                } else {
                    tokens.push(Tok::Bang);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::EqEq);
                    i += 2;
                } else {
                    return Err(EvalError::new("'=' is not an operator; use '=='"));
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::LtEq);
                    i += 2;
                } else {
                    tokens.push(Tok::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::GtEq);
                    i += 2;
                } else {
                    tokens.push(Tok::Gt);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Tok::AndAnd);
                    i += 2;
                } else {
                    return Err(EvalError::new("single '&'; use '&&'"));
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Tok::OrOr);
                    i += 2;
                } else {
                    return Err(EvalError::new("single '|'; use '||'"));
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end == chars.len() {
                    return Err(EvalError::new("unterminated string literal"));
                }
                tokens.push(Tok::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| EvalError::new(format!("bad number literal '{}'", text)))?;
                tokens.push(Tok::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                tokens.push(Tok::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(EvalError::new(format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Ident(String),
    Property(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Tok> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Tok) -> Result<(), EvalError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(found) => {
                    EvalError::new(format!("expected '{}', found '{}'", expected, found))
                }
                None => EvalError::new(format!("expected '{}', found end of expression", expected)),
            })
        }
    }

    fn expression(&mut self) -> Result<Expr, EvalError> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.and()?;
        while self.eat(&Tok::OrOr) {
            let right = self.and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.equality()?;
        while self.eat(&Tok::AndAnd) {
            let right = self.equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Tok::EqEq) => BinaryOp::Eq,
                Some(Tok::NotEq) => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.comparison()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Lt) => BinaryOp::Lt,
                Some(Tok::LtEq) => BinaryOp::LtEq,
                Some(Tok::Gt) => BinaryOp::Gt,
                Some(Tok::GtEq) => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinaryOp::Add,
                Some(Tok::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => BinaryOp::Mul,
                Some(Tok::Slash) => BinaryOp::Div,
                Some(Tok::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&Tok::Bang) {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat(&Tok::Minus) {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Tok::Dot) {
                match self.advance() {
                    Some(Tok::Ident(name)) => {
                        expr = Expr::Property(Box::new(expr), name);
                    }
                    other => {
                        return Err(match other {
                            Some(t) => {
                                EvalError::new(format!("expected property name after '.', found '{}'", t))
                            }
                            None => EvalError::new("expected property name after '.'"),
                        });
                    }
                }
            } else if self.eat(&Tok::LBracket) {
                let index = self.expression()?;
                self.expect(Tok::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Tok::Number(n)) => Ok(Expr::Literal(number_value(n)?)),
            Some(Tok::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Tok::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                _ => Ok(Expr::Ident(name)),
            },
            Some(Tok::LParen) => {
                let expr = self.expression()?;
                self.expect(Tok::RParen)?;
                Ok(expr)
            }
            Some(other) => Err(EvalError::new(format!("unexpected '{}'", other))),
            None => Err(EvalError::new("empty expression")),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Scope view handed to the evaluator: name lookups resolve through this and
/// nothing else.
pub trait Bindings {
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl Bindings for std::collections::HashMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Parse and evaluate `source` against `bindings`.
pub fn evaluate(source: &str, bindings: &dyn Bindings) -> Result<Value, EvalError> {
    let tokens = lex(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    if parser.peek().is_some() {
        return Err(EvalError::new(format!(
            "trailing input after expression: '{}'",
            parser.tokens[parser.pos..]
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        )));
    }
    eval(&expr, bindings)
}

fn eval(expr: &Expr, bindings: &dyn Bindings) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        // Clone gives the expression an independent deep copy; nothing the
        // evaluator does can reach back into the scope.
        Expr::Ident(name) => bindings
            .lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::new(format!("unknown identifier '{}'", name))),
        Expr::Property(object, name) => {
            let object = eval(object, bindings)?;
            match object {
                Value::Object(mut map) => map
                    .remove(name)
                    .ok_or_else(|| EvalError::new(format!("no property '{}'", name))),
                other => Err(EvalError::new(format!(
                    "cannot read property '{}' of {}",
                    name,
                    type_name(&other)
                ))),
            }
        }
        Expr::Index(object, index) => {
            let object = eval(object, bindings)?;
            let index = eval(index, bindings)?;
            match (object, index) {
                (Value::Array(mut items), Value::Number(n)) => {
                    let idx = n
                        .as_f64()
                        .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                        .map(|f| f as usize)
                        .ok_or_else(|| EvalError::new(format!("bad array index {}", n)))?;
                    if idx >= items.len() {
                        return Err(EvalError::new(format!(
                            "index {} out of bounds (length {})",
                            idx,
                            items.len()
                        )));
                    }
                    Ok(items.swap_remove(idx))
                }
                (Value::Object(mut map), Value::String(key)) => map
                    .remove(&key)
                    .ok_or_else(|| EvalError::new(format!("no property '{}'", key))),
                (object, index) => Err(EvalError::new(format!(
                    "cannot index {} with {}",
                    type_name(&object),
                    type_name(&index)
                ))),
            }
        }
        Expr::Unary(op, inner) => {
            let value = eval(inner, bindings)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!truthy(&value))),
                UnaryOp::Neg => match value.as_f64() {
                    Some(n) => number_value(-n),
                    None => Err(EvalError::new(format!(
                        "cannot negate {}",
                        type_name(&value)
                    ))),
                },
            }
        }
        Expr::Binary(op, left, right) => eval_binary(*op, left, right, bindings),
    }
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    bindings: &dyn Bindings,
) -> Result<Value, EvalError> {
    // Boolean operators short-circuit and yield the deciding operand.
    if op == BinaryOp::And {
        let lhs = eval(left, bindings)?;
        return if truthy(&lhs) { eval(right, bindings) } else { Ok(lhs) };
    }
    if op == BinaryOp::Or {
        let lhs = eval(left, bindings)?;
        return if truthy(&lhs) { Ok(lhs) } else { eval(right, bindings) };
    }

    let lhs = eval(left, bindings)?;
    let rhs = eval(right, bindings)?;

    match op {
        BinaryOp::Add => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => {
                number_value(a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0))
            }
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", display(&lhs), display(&rhs))))
            }
            _ => Err(EvalError::new(format!(
                "cannot add {} and {}",
                type_name(&lhs),
                type_name(&rhs)
            ))),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (a, b) = match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    return Err(EvalError::new(format!(
                        "arithmetic needs numbers, got {} and {}",
                        type_name(&lhs),
                        type_name(&rhs)
                    )))
                }
            };
            let result = match op {
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => unreachable!(),
            };
            number_value(result)
        }
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::NotEq => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => a
                    .as_f64()
                    .unwrap_or(f64::NAN)
                    .partial_cmp(&b.as_f64().unwrap_or(f64::NAN))
                    .ok_or_else(|| EvalError::new("numbers are not comparable"))?,
                (Value::String(a), Value::String(b)) => a.cmp(b),
                _ => {
                    return Err(EvalError::new(format!(
                        "cannot compare {} and {}",
                        type_name(&lhs),
                        type_name(&rhs)
                    )))
                }
            };
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::GtEq => ordering.is_ge(),
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!(),
    }
}

fn number_value(n: f64) -> Result<Value, EvalError> {
    // Integral results print without a trailing ".0" in attributes.
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Ok(Value::Number(serde_json::Number::from(n as i64)));
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| EvalError::new("arithmetic produced a non-finite number"))
}

/// Truthiness used by `!`, `&&` and `||`: null, false, zero and the empty
/// string are false; everything else (including empty lists) is true.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a value into attribute text. Strings are raw (no quotes); compound
/// values serialize as JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}
