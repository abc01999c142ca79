//! Custom conversion formulas
//!
//! A small arithmetic language over [`Number`]: `+ - * / ^`, unary minus,
//! parentheses, decimal literals (scientific notation allowed) and the input
//! variable, spelled `value` or `x`. Exponents must be integers.
//!
//! Parsing splits the text at the loosest-binding operator outside
//! parentheses and recurses on both halves. Recursion is capped at
//! `MAX_DEPTH` levels; anything deeper is an invalid formula.

use std::fmt;
use gauge_core::{ConversionError, Number};

/// Deepest parser recursion a formula may need
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(Number),
    Variable,
    BinaryOp(Box<Expr>, BinOp, Box<Expr>),
    UnaryOp(UnaryOp, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp { Add, Sub, Mul, Div, Pow }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp { Neg }

/// A parsed formula together with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, ConversionError> {
        let expr = parse_expr(source, 0)
            .map_err(|details| ConversionError::invalid_formula(source, details))?;
        Ok(Formula { source: source.trim().to_string(), expr })
    }

    /// Evaluate with the input variable bound to `value`
    pub fn evaluate(&self, value: &Number) -> Result<Number, ConversionError> {
        eval(&self.expr, value)
            .map_err(|details| ConversionError::invalid_formula(&self.source, details))
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn eval(expr: &Expr, value: &Number) -> Result<Number, String> {
    match expr {
        Expr::Number(n) => Ok(n.clone()),
        Expr::Variable => Ok(value.clone()),
        Expr::UnaryOp(UnaryOp::Neg, inner) => Ok(eval(inner, value)?.neg()),
        Expr::BinaryOp(left, op, right) => {
            let l = eval(left, value)?;
            let r = eval(right, value)?;
            match op {
                BinOp::Add => Ok(l.add(&r)),
                BinOp::Sub => Ok(l.sub(&r)),
                BinOp::Mul => Ok(l.mul(&r)),
                BinOp::Div => l.checked_div(&r).map_err(|_| "division by zero".to_string()),
                BinOp::Pow => {
                    let exp = r.to_i64()
                        .and_then(|e| i32::try_from(e).ok())
                        .ok_or_else(|| format!("exponent {} is not an integer", r))?;
                    l.checked_pow(exp).map_err(|e| e.to_string())
                }
            }
        }
    }
}

fn enter(depth: usize) -> Result<usize, String> {
    if depth >= MAX_DEPTH {
        Err(format!("expression nests deeper than {} levels", MAX_DEPTH))
    } else {
        Ok(depth + 1)
    }
}

fn parse_expr(input: &str, depth: usize) -> Result<Expr, String> {
    let depth = enter(depth)?;
    let input = input.trim();
    if input.is_empty() {
        return Err("empty expression".to_string());
    }
    check_parens(input)?;
    parse_additive(input, depth)
}

fn check_parens(input: &str) -> Result<(), String> {
    let mut depth = 0i32;
    for c in input.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced ')'".to_string());
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced '('".to_string());
    }
    Ok(())
}

/// Whether a `+`/`-` at this position is a sign rather than a binary operator
fn is_sign(left: &str) -> bool {
    match left.chars().last() {
        None => true,
        Some(c) if "+-*/^(".contains(c) => true,
        // exponent of a literal such as 1e-3
        Some('e') | Some('E') => {
            let mantissa = &left[..left.len() - 1];
            let token_start = mantissa
                .rfind(|c: char| !(c.is_ascii_digit() || c == '.'))
                .map_or(0, |i| i + 1);
            let token = &mantissa[token_start..];
            !token.is_empty() && token.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        }
        _ => false,
    }
}

fn parse_additive(input: &str, depth: usize) -> Result<Expr, String> {
    let depth = enter(depth)?;
    let mut paren_depth = 0;
    let char_indices: Vec<(usize, char)> = input.char_indices().collect();

    for idx in (0..char_indices.len()).rev() {
        let (byte_pos, c) = char_indices[idx];
        match c {
            ')' => paren_depth += 1,
            '(' => paren_depth -= 1,
            '+' | '-' if paren_depth == 0 => {
                let left = input[..byte_pos].trim();
                let right = input[byte_pos + c.len_utf8()..].trim();
                if !is_sign(left) {
                    if right.is_empty() {
                        return Err(format!("missing operand after '{}'", c));
                    }
                    let op = if c == '+' { BinOp::Add } else { BinOp::Sub };
                    return Ok(Expr::BinaryOp(
                        Box::new(parse_additive(left, depth)?),
                        op,
                        Box::new(parse_multiplicative(right, depth)?),
                    ));
                }
            }
            _ => {}
        }
    }

    parse_multiplicative(input, depth)
}

fn parse_multiplicative(input: &str, depth: usize) -> Result<Expr, String> {
    let depth = enter(depth)?;
    let mut paren_depth = 0;
    let char_indices: Vec<(usize, char)> = input.char_indices().collect();

    for idx in (0..char_indices.len()).rev() {
        let (byte_pos, c) = char_indices[idx];
        match c {
            ')' => paren_depth += 1,
            '(' => paren_depth -= 1,
            '*' | '/' if paren_depth == 0 => {
                let left = input[..byte_pos].trim();
                let right = input[byte_pos + c.len_utf8()..].trim();
                if left.is_empty() || right.is_empty() {
                    return Err(format!("missing operand around '{}'", c));
                }
                let op = if c == '*' { BinOp::Mul } else { BinOp::Div };
                return Ok(Expr::BinaryOp(
                    Box::new(parse_multiplicative(left, depth)?),
                    op,
                    Box::new(parse_unary(right, depth)?),
                ));
            }
            _ => {}
        }
    }

    parse_unary(input, depth)
}

fn parse_unary(input: &str, depth: usize) -> Result<Expr, String> {
    let depth = enter(depth)?;
    let input = input.trim();
    if let Some(rest) = input.strip_prefix('-') {
        return Ok(Expr::UnaryOp(UnaryOp::Neg, Box::new(parse_unary(rest, depth)?)));
    }
    if let Some(rest) = input.strip_prefix('+') {
        return parse_unary(rest, depth);
    }
    parse_power(input, depth)
}

fn parse_power(input: &str, depth: usize) -> Result<Expr, String> {
    let depth = enter(depth)?;
    let mut paren_depth = 0;

    // Leftmost '^' splits, giving right associativity
    for (byte_pos, c) in input.char_indices() {
        match c {
            '(' => paren_depth += 1,
            ')' => paren_depth -= 1,
            '^' if paren_depth == 0 => {
                let left = input[..byte_pos].trim();
                let right = input[byte_pos + c.len_utf8()..].trim();
                if left.is_empty() || right.is_empty() {
                    return Err("missing operand around '^'".to_string());
                }
                return Ok(Expr::BinaryOp(
                    Box::new(parse_primary(left, depth)?),
                    BinOp::Pow,
                    Box::new(parse_unary(right, depth)?),
                ));
            }
            _ => {}
        }
    }

    parse_primary(input, depth)
}

fn parse_primary(input: &str, depth: usize) -> Result<Expr, String> {
    let depth = enter(depth)?;
    let input = input.trim();
    if input.is_empty() {
        return Err("missing operand".to_string());
    }

    if input.starts_with('(') && input.ends_with(')') && encloses(input) {
        return parse_expr(&input[1..input.len() - 1], depth);
    }

    if input.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return Number::from_str(input)
            .map(Expr::Number)
            .map_err(|_| format!("invalid number literal '{}'", input));
    }

    match input {
        "value" | "x" => Ok(Expr::Variable),
        _ => Err(format!("unknown identifier '{}'", input)),
    }
}

/// Whether the opening parenthesis at the start closes at the very end
fn encloses(input: &str) -> bool {
    let mut depth = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i == input.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}
