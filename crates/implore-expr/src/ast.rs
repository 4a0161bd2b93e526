//! Abstract Syntax Tree for arithmetic expressions
//!
//! This module defines the AST produced by the expression parser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An arithmetic expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A numeric literal
    Number(f64),

    /// A named variable, bound by the evaluation scope
    Variable(String),

    /// A unary operation
    Unary(UnaryOp, Box<Expr>),

    /// A binary operation
    Binary(BinaryOp, Box<Expr>, Box<Expr>),

    /// A builtin function call
    Call(String, Vec<Expr>),
}

impl Expr {
    /// Create a binary expression
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    /// Create a negation
    pub fn neg(expr: Expr) -> Self {
        Expr::Unary(UnaryOp::Neg, Box::new(expr))
    }

    /// Create a variable reference
    pub fn var(name: &str) -> Self {
        Expr::Variable(name.to_string())
    }

    /// Collect the free variable names referenced by this expression.
    ///
    /// Function names are not variables and are never included.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_identifiers(&mut names);
        names
    }

    fn collect_identifiers(&self, names: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                names.insert(name.clone());
            }
            Expr::Unary(_, inner) => inner.collect_identifiers(names),
            Expr::Binary(_, left, right) => {
                left.collect_identifiers(names);
                right.collect_identifiers(names);
            }
            Expr::Call(_, args) => {
                for arg in args {
                    arg.collect_identifiers(names);
                }
            }
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// Remainder (%)
    Rem,
    /// Exponentiation (^)
    Pow,
}

impl BinaryOp {
    /// Apply the operator to two f64 values
    pub fn apply(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Rem => lhs % rhs,
            BinaryOp::Pow => lhs.powf(rhs),
        }
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_operators() {
        assert_eq!(BinaryOp::Add.apply(1.0, 2.0), 3.0);
        assert_eq!(BinaryOp::Sub.apply(1.0, 2.0), -1.0);
        assert_eq!(BinaryOp::Mul.apply(3.0, 2.0), 6.0);
        assert_eq!(BinaryOp::Div.apply(3.0, 2.0), 1.5);
        assert_eq!(BinaryOp::Rem.apply(7.0, 2.0), 1.0);
        assert_eq!(BinaryOp::Pow.apply(2.0, 10.0), 1024.0);
    }

    #[test]
    fn test_identifiers_skip_function_names() {
        let expr = Expr::Call(
            "max".to_string(),
            vec![
                Expr::var("height"),
                Expr::binary(BinaryOp::Mul, Expr::var("width"), Expr::Number(2.0)),
            ],
        );
        let names: Vec<String> = expr.identifiers().into_iter().collect();
        assert_eq!(names, vec!["height".to_string(), "width".to_string()]);
    }
}
