//! implore-expr - Arithmetic expressions over named scalars
//!
//! This crate compiles small textual formulas once and evaluates them many
//! times against a flat scope of `name -> f64` bindings. It backs the Math
//! rule of `implore-rules` and the `!{...}` templates of the property
//! resolver in `implore-scene`.
//!
//! # Expression Syntax
//!
//! - **Arithmetic**: `a + b * 2`, `(x - y) / z`, `n % 2`
//! - **Powers**: `r ^ 2` (right-associative, binds tighter than unary minus)
//! - **Functions**: `sqrt(x)`, `min(a, b, c)`, `hypot(dx, dy)`
//! - **Constants**: `pi`, `e` (only when the scope leaves them unbound)
//!
//! # Examples
//!
//! ```ignore
//! use implore_expr::compile;
//! use std::collections::HashMap;
//!
//! let expr = compile("a * b + 1")?;
//! let scope = HashMap::from([("a".to_string(), 2.0), ("b".to_string(), 3.0)]);
//! assert_eq!(expr.evaluate(&scope)?, 7.0);
//! ```

pub mod ast;
pub mod eval;
pub mod parser;

pub use ast::*;
pub use eval::*;
pub use parser::*;
