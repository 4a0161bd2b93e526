//! Attribute values stored on scene nodes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node's attribute bag.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Dynamic value type for node attributes.
///
/// Closed on purpose: anything structured beyond a scalar lives in `Json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Json(serde_json::Value),
}

impl AttrValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Strict numeric view: only `Number` qualifies.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Lenient numeric view: numbers, numeric-looking strings, booleans
    /// (as 0/1) and JSON numbers.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            AttrValue::String(s) => parse_number(s),
            AttrValue::Json(v) => v.as_f64(),
            AttrValue::Null => None,
        }
    }

    /// Whether this is a number or a string that parses as one.
    pub fn looks_numeric(&self) -> bool {
        match self {
            AttrValue::Number(_) => true,
            AttrValue::String(s) => parse_number(s).is_some(),
            _ => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Null => false,
            AttrValue::Bool(b) => *b,
            AttrValue::Number(n) => *n != 0.0 && !n.is_nan(),
            AttrValue::String(s) => !s.is_empty(),
            AttrValue::Json(_) => true,
        }
    }

    /// Textual rendering, `None` for null.
    pub fn to_text(&self) -> Option<String> {
        match self {
            AttrValue::Null => None,
            AttrValue::Bool(b) => Some(b.to_string()),
            AttrValue::Number(n) => Some(format_number(*n)),
            AttrValue::String(s) => Some(s.clone()),
            AttrValue::Json(v) => Some(v.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttrValue::Null => serde_json::Value::Null,
            AttrValue::Bool(b) => serde_json::Value::Bool(*b),
            AttrValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttrValue::String(s) => serde_json::Value::String(s.clone()),
            AttrValue::Json(v) => v.clone(),
        }
    }
}

/// Parse a trimmed, non-empty string as a finite or infinite f64.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Render a number without a trailing `.0` for integral values.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Number(n as f64)
    }
}

impl From<i32> for AttrValue {
    fn from(n: i32) -> Self {
        AttrValue::Number(f64::from(n))
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<serde_json::Value> for AttrValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => AttrValue::Null,
            serde_json::Value::Bool(b) => AttrValue::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(AttrValue::Number)
                .unwrap_or(AttrValue::Json(serde_json::Value::Number(n))),
            serde_json::Value::String(s) => AttrValue::String(s),
            other => AttrValue::Json(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_number_accepts_numeric_strings() {
        assert_eq!(AttrValue::from("  42.5 ").coerce_number(), Some(42.5));
        assert_eq!(AttrValue::from("wall").coerce_number(), None);
        assert_eq!(AttrValue::from("").coerce_number(), None);
        assert_eq!(AttrValue::Bool(true).coerce_number(), Some(1.0));
        assert_eq!(AttrValue::Null.coerce_number(), None);
    }

    #[test]
    fn to_text_formats_integers_plainly() {
        assert_eq!(AttrValue::Number(3.0).to_text().as_deref(), Some("3"));
        assert_eq!(AttrValue::Number(2.5).to_text().as_deref(), Some("2.5"));
        assert_eq!(AttrValue::Null.to_text(), None);
    }

    #[test]
    fn from_json_unwraps_scalars() {
        assert_eq!(AttrValue::from(json!(1.5)), AttrValue::Number(1.5));
        assert_eq!(AttrValue::from(json!("a")), AttrValue::String("a".into()));
        assert_eq!(AttrValue::from(json!([1, 2])), AttrValue::Json(json!([1, 2])));
    }

    #[test]
    fn untagged_serde_round_trip() {
        let values = vec![
            AttrValue::Null,
            AttrValue::Bool(false),
            AttrValue::Number(7.0),
            AttrValue::String("concrete".into()),
            AttrValue::Json(json!({"fire_rating": 60})),
        ];
        let encoded = serde_json::to_string(&values).unwrap();
        let decoded: Vec<AttrValue> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(values, decoded);
    }
}
