//! Node predicates used by the filter rule
//!
//! A condition resolves a property path on a node and compares it against a
//! literal. Numeric-looking strings on either side are compared as numbers.

use implore_scene::{resolve_or_undefined, AttrValue, SceneNode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    /// Case-insensitive substring match
    #[serde(rename = "*")]
    Contains,
}

impl ConditionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOp::Eq => "=",
            ConditionOp::Ne => "!=",
            ConditionOp::Lt => "<",
            ConditionOp::Gt => ">",
            ConditionOp::Contains => "*",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.trim() {
            "=" | "==" => Some(ConditionOp::Eq),
            "!=" => Some(ConditionOp::Ne),
            "<" => Some(ConditionOp::Lt),
            ">" => Some(ConditionOp::Gt),
            "*" => Some(ConditionOp::Contains),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a list of conditions combines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    /// `And` over no conditions keeps everything, `Or` keeps nothing.
    pub fn evaluate(&self, conditions: &[Condition], node: &SceneNode) -> bool {
        match self {
            Combinator::And => conditions.iter().all(|c| c.matches(node)),
            Combinator::Or => conditions.iter().any(|c| c.matches(node)),
        }
    }
}

/// `key operation value`, e.g. `category = wall`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub key: String,
    pub operation: ConditionOp,
    pub value: AttrValue,
}

impl Condition {
    pub fn new(key: impl Into<String>, operation: ConditionOp, value: impl Into<AttrValue>) -> Self {
        Self {
            key: key.into(),
            operation,
            value: value.into(),
        }
    }

    pub fn matches(&self, node: &SceneNode) -> bool {
        let resolved = resolve_or_undefined(node, &self.key);
        self.test(resolved.as_ref())
    }

    /// Compare an already-resolved value. `None` means undefined, which
    /// satisfies only `!=`.
    pub fn test(&self, resolved: Option<&AttrValue>) -> bool {
        let Some(actual) = resolved.filter(|v| !v.is_null()) else {
            return self.operation == ConditionOp::Ne;
        };

        if self.operation == ConditionOp::Contains {
            return match (actual.to_text(), self.value.to_text()) {
                (Some(haystack), Some(needle)) => {
                    haystack.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            };
        }

        if let (Some(a), Some(b)) = (numeric(actual), numeric(&self.value)) {
            return match self.operation {
                ConditionOp::Eq => a == b,
                ConditionOp::Ne => a != b,
                ConditionOp::Lt => a < b,
                ConditionOp::Gt => a > b,
                ConditionOp::Contains => false,
            };
        }

        if let AttrValue::Bool(a) = actual {
            let b = match &self.value {
                AttrValue::Bool(b) => Some(*b),
                AttrValue::String(s) => s.trim().to_lowercase().parse::<bool>().ok(),
                _ => None,
            };
            return match self.operation {
                ConditionOp::Eq => b == Some(*a),
                ConditionOp::Ne => b != Some(*a),
                _ => false,
            };
        }

        let (Some(a), Some(b)) = (actual.to_text(), self.value.to_text()) else {
            return self.operation == ConditionOp::Ne;
        };
        match self.operation {
            ConditionOp::Eq => a == b,
            ConditionOp::Ne => a != b,
            ConditionOp::Lt => a < b,
            ConditionOp::Gt => a > b,
            ConditionOp::Contains => false,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.key,
            self.operation,
            self.value.to_text().unwrap_or_else(|| "null".to_string())
        )
    }
}

fn numeric(value: &AttrValue) -> Option<f64> {
    if value.looks_numeric() {
        value.coerce_number()
    } else {
        None
    }
}
