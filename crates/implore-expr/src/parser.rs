//! Arithmetic grammar parser using nom
//!
//! Grammar:
//! ```text
//! expr      := additive
//! additive  := term (('+' | '-') term)*
//! term      := unary (('*' | '/' | '%') unary)*
//! unary     := '-' unary | power
//! power     := atom ('^' unary)?
//! atom      := call | ident | number | '(' expr ')'
//! call      := ident '(' (expr (',' expr)*)? ')'
//! ```

use crate::ast::*;
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0, one_of},
    combinator::{map, opt, recognize},
    multi::{many0, separated_list0},
    number::complete::double,
    sequence::{delimited, pair, preceded},
    IResult,
};
use thiserror::Error;

/// Parse errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty expression")]
    Empty,
}

/// Parse an arithmetic expression from a string
pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    match expr(input) {
        Ok(("", result)) => Ok(result),
        Ok((remaining, _)) => Err(ParseError::Parse(format!(
            "Unexpected characters at end: '{}'",
            remaining
        ))),
        Err(e) => Err(ParseError::Parse(format!("{:?}", e))),
    }
}

/// Parse whitespace
fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Parse an expression (entry point)
fn expr(input: &str) -> IResult<&str, Expr> {
    additive(input)
}

/// Parse addition and subtraction (left-associative)
fn additive(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), term))(input)?;

    let result = rest.into_iter().fold(first, |acc, (op, e)| {
        let op = if op == '+' { BinaryOp::Add } else { BinaryOp::Sub };
        Expr::binary(op, acc, e)
    });
    Ok((input, result))
}

/// Parse multiplication, division and remainder (left-associative)
fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(ws(one_of("*/%")), unary))(input)?;

    let result = rest.into_iter().fold(first, |acc, (op, e)| {
        let op = match op {
            '*' => BinaryOp::Mul,
            '/' => BinaryOp::Div,
            _ => BinaryOp::Rem,
        };
        Expr::binary(op, acc, e)
    });
    Ok((input, result))
}

/// Parse unary negation
fn unary(input: &str) -> IResult<&str, Expr> {
    alt((map(preceded(ws(char('-')), unary), Expr::neg), power))(input)
}

/// Parse exponentiation (right-associative through `unary`)
fn power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = atom(input)?;
    let (input, exponent) = opt(preceded(ws(char('^')), unary))(input)?;

    let result = match exponent {
        Some(exponent) => Expr::binary(BinaryOp::Pow, base, exponent),
        None => base,
    };
    Ok((input, result))
}

/// Parse atomic expressions
fn atom(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        // Function call (must come before identifier)
        function_call,
        // Identifier (must come before number so `inf`/`nan` stay names)
        map(identifier, Expr::var),
        map(double, Expr::Number),
        // Parenthesized expression
        delimited(char('('), expr, char(')')),
    )))(input)
}

/// Parse an identifier (starts with letter or underscore, followed by alphanumeric or underscore)
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

/// Parse a function call
fn function_call(input: &str) -> IResult<&str, Expr> {
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, args) = delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), expr),
        ws(char(')')),
    )(input)?;

    Ok((input, Expr::Call(name.to_string(), args)))
}
