//! Property path resolution
//!
//! Paths are dotted: the first segment names an attribute (or the built-ins
//! `name` / `id`), later segments walk into JSON objects and arrays. Before
//! lookup, inline templates are expanded:
//!
//! - `#{path}` is replaced by the text of another resolved path
//! - `!{expr}` is replaced by an arithmetic expression evaluated over the
//!   node's numeric attributes
//!
//! A path made of a single template yields the template's value directly
//! instead of being looked up again.

use implore_expr::{compile, ExprError};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::node::SceneNode;
use crate::value::{format_number, AttrValue};

lazy_static! {
    static ref TEMPLATE: Regex = Regex::new(r"([#!])\{([^}]*)\}").unwrap();
}

/// Resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Empty property path")]
    EmptyPath,

    #[error("Template expression '{expression}' failed: {source}")]
    Expression {
        expression: String,
        #[source]
        source: ExprError,
    },
}

/// Resolve `path` on `node`.
///
/// `Ok(None)` means the path does not exist on this node.
pub fn resolve(node: &SceneNode, path: &str) -> Result<Option<AttrValue>, ResolveError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ResolveError::EmptyPath);
    }

    if let Some(caps) = TEMPLATE.captures(path) {
        if caps[0].len() == path.len() {
            let body = caps[2].trim();
            return match &caps[1] {
                "!" => evaluate_template(node, body).map(|n| Some(AttrValue::Number(n))),
                _ => resolve(node, body),
            };
        }
    }

    let expanded = expand_templates(node, path)?;
    Ok(lookup(node, &expanded))
}

/// Resolve and fold any failure into "undefined".
pub fn resolve_or_undefined(node: &SceneNode, path: &str) -> Option<AttrValue> {
    match resolve(node, path) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to resolve '{}' on node {}: {}", path, node.name(), e);
            None
        }
    }
}

fn expand_templates(node: &SceneNode, path: &str) -> Result<String, ResolveError> {
    let mut expanded = String::with_capacity(path.len());
    let mut last = 0;

    for caps in TEMPLATE.captures_iter(path) {
        let Some(whole) = caps.get(0) else { continue };
        expanded.push_str(&path[last..whole.start()]);
        let body = caps[2].trim();
        let text = match &caps[1] {
            "!" => format_number(evaluate_template(node, body)?),
            _ => resolve(node, body)?
                .and_then(|v| v.to_text())
                .unwrap_or_default(),
        };
        expanded.push_str(&text);
        last = whole.end();
    }

    expanded.push_str(&path[last..]);
    Ok(expanded)
}

fn evaluate_template(node: &SceneNode, body: &str) -> Result<f64, ResolveError> {
    let to_error = |source| ResolveError::Expression {
        expression: body.to_string(),
        source,
    };
    let expr = compile(body).map_err(to_error)?;
    let scope = |name: &str| node.attribute(name).and_then(|v| v.coerce_number());
    expr.evaluate(&scope).map_err(to_error)
}

fn lookup(node: &SceneNode, path: &str) -> Option<AttrValue> {
    // Keys written verbatim (dots included) win over nested lookup
    if let Some(value) = node.attribute(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let head = segments.next()?;
    let mut current = node.attribute(head).or_else(|| builtin(node, head))?;

    for segment in segments {
        let AttrValue::Json(json) = current else {
            return None;
        };
        let next = match &json {
            serde_json::Value::Object(map) => map.get(segment)?.clone(),
            serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?.clone(),
            _ => return None,
        };
        current = AttrValue::from(next);
    }

    Some(current)
}

fn builtin(node: &SceneNode, key: &str) -> Option<AttrValue> {
    match key {
        "name" => Some(AttrValue::String(node.name().to_string())),
        "id" => Some(AttrValue::String(node.id().to_string())),
        _ => None,
    }
}
