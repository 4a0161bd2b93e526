//! Expression evaluation
//!
//! Compiles expressions once and evaluates them against a variable scope.

use crate::ast::*;
use crate::parser::{parse_expression, ParseError};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

/// Compilation and evaluation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function {name} expects {expected} argument(s), got {actual}")]
    Arity {
        name: String,
        expected: String,
        actual: usize,
    },
}

/// Result type for compilation and evaluation
pub type ExprResult<T> = Result<T, ExprError>;

/// Provides variable values during evaluation
pub trait Scope {
    /// Look up the value bound to `name`
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl Scope for HashMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Scope for BTreeMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl<F> Scope for F
where
    F: Fn(&str) -> Option<f64>,
{
    fn lookup(&self, name: &str) -> Option<f64> {
        self(name)
    }
}

/// A parsed, reusable expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    source: String,
    ast: Expr,
    identifiers: BTreeSet<String>,
}

/// Compile an expression for repeated evaluation
pub fn compile(source: &str) -> ExprResult<CompiledExpr> {
    let ast = parse_expression(source)?;
    let identifiers = ast.identifiers();
    Ok(CompiledExpr {
        source: source.to_string(),
        ast,
        identifiers,
    })
}

impl CompiledExpr {
    /// The source text this expression was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed syntax tree
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Free variable names referenced by the expression
    pub fn identifiers(&self) -> &BTreeSet<String> {
        &self.identifiers
    }

    /// Check whether `name` appears as a free variable
    pub fn references(&self, name: &str) -> bool {
        self.identifiers.contains(name)
    }

    /// Evaluate against a scope
    pub fn evaluate<S: Scope + ?Sized>(&self, scope: &S) -> ExprResult<f64> {
        evaluate_expr(&self.ast, scope)
    }
}

fn evaluate_expr<S: Scope + ?Sized>(expr: &Expr, scope: &S) -> ExprResult<f64> {
    match expr {
        Expr::Number(n) => Ok(*n),

        Expr::Variable(name) => scope
            .lookup(name)
            .or_else(|| constant(name))
            .ok_or_else(|| ExprError::UnknownVariable(name.clone())),

        Expr::Unary(UnaryOp::Neg, inner) => Ok(-evaluate_expr(inner, scope)?),

        Expr::Binary(op, left, right) => {
            let lhs = evaluate_expr(left, scope)?;
            let rhs = evaluate_expr(right, scope)?;
            Ok(op.apply(lhs, rhs))
        }

        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|arg| evaluate_expr(arg, scope))
                .collect::<ExprResult<Vec<f64>>>()?;
            call_function(name, &values)
        }
    }
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

fn call_function(name: &str, args: &[f64]) -> ExprResult<f64> {
    let unary = |f: fn(f64) -> f64| -> ExprResult<f64> {
        match args {
            [x] => Ok(f(*x)),
            _ => Err(ExprError::Arity {
                name: name.to_string(),
                expected: "1".to_string(),
                actual: args.len(),
            }),
        }
    };
    let binary = |f: fn(f64, f64) -> f64| -> ExprResult<f64> {
        match args {
            [x, y] => Ok(f(*x, *y)),
            _ => Err(ExprError::Arity {
                name: name.to_string(),
                expected: "2".to_string(),
                actual: args.len(),
            }),
        }
    };

    match name {
        "abs" => unary(f64::abs),
        "sqrt" => unary(f64::sqrt),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "round" => unary(f64::round),
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "exp" => unary(f64::exp),
        "ln" => unary(f64::ln),
        "log10" => unary(f64::log10),
        "pow" => binary(f64::powf),
        "hypot" => binary(f64::hypot),
        "min" | "max" => {
            if args.is_empty() {
                return Err(ExprError::Arity {
                    name: name.to_string(),
                    expected: "at least 1".to_string(),
                    actual: 0,
                });
            }
            let fold: fn(f64, f64) -> f64 = if name == "min" { f64::min } else { f64::max };
            Ok(args[1..].iter().fold(args[0], |acc, &x| fold(acc, x)))
        }
        _ => Err(ExprError::UnknownFunction(name.to_string())),
    }
}
