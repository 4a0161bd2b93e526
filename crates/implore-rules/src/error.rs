//! Error types for rule execution

use implore_expr::ExprError;
use thiserror::Error;

use crate::rule::RuleKind;
use crate::value::ValueType;

/// Errors raised while configuring or running rules
#[derive(Debug, Error)]
pub enum RuleError {
    /// A rule that reads a primary input was built without its name
    #[error("{rule} rule has no input variable name")]
    MissingInputName { rule: RuleKind },

    /// Every rule needs a name to append its output under
    #[error("{rule} rule has no output variable name")]
    MissingOutputName { rule: RuleKind },

    /// No ledger entry carries the requested name
    #[error("Input variable not found: {name}")]
    InputNotFound { name: String },

    /// Primary input type outside the rule's accepted set, under strict checking
    #[error("{rule} rule cannot read '{name}' of type {actual} (accepts: {expected})")]
    InvalidInputType {
        rule: RuleKind,
        name: String,
        actual: ValueType,
        expected: String,
    },

    /// Second input of a binary rule has a type the rule cannot use
    #[error("{rule} rule cannot read secondary input '{name}' of type {actual} (accepts: {expected})")]
    InvalidSecondaryInputType {
        rule: RuleKind,
        name: String,
        actual: ValueType,
        expected: String,
    },

    /// Reference list length differs from the value collection length
    #[error("'{name}' holds {values} values but {references} references")]
    ShapeMismatch {
        name: String,
        values: usize,
        references: usize,
    },

    /// Arrays bound into one expression differ in length
    #[error("Array length mismatch: '{name}' has {actual} elements, expected {expected}")]
    ArrayLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Two geometric kinds with no distance algorithm between them
    #[error("No distance algorithm for {first} and {second}")]
    UnsupportedCombination { first: String, second: String },

    /// Ledger name with whitespace used inside an expression
    #[error("Variable name '{name}' contains whitespace and cannot appear in an expression")]
    NamingConflict { name: String },

    /// Expression failed to compile or evaluate
    #[error("Expression error: {0}")]
    Expression(#[from] ExprError),

    /// A string that had to be read as a number
    #[error("Value '{value}' in '{name}' is not numeric")]
    NotNumeric { name: String, value: String },

    /// min, max or average over nothing
    #[error("Cannot compute {operation} of an empty collection")]
    EmptyCollection { operation: String },

    /// Distance cross product above `max_distance_pairs`
    #[error("Distance request covers {pairs} pairs, limit is {limit}")]
    TooManyPairs { pairs: usize, limit: usize },

    /// Nested process results changed type between elements
    #[error("Nested process output '{name}' has type {actual}, expected {expected}")]
    NestedOutput {
        name: String,
        actual: ValueType,
        expected: ValueType,
    },

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Reading a configuration file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rule operations
pub type RuleResult<T> = Result<T, RuleError>;

/// Comma-separated rendering of an allowed-type list, for error messages
pub(crate) fn describe_types(types: &[ValueType]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_errors_name_rule_input_and_accepted_types() {
        let err = RuleError::InvalidInputType {
            rule: RuleKind::Reducer,
            name: "scene".to_string(),
            actual: ValueType::Scene,
            expected: describe_types(&[ValueType::Numbers, ValueType::Strings]),
        };
        assert_eq!(
            err.to_string(),
            "reducer rule cannot read 'scene' of type scene (accepts: numbers, strings)"
        );
    }
}
