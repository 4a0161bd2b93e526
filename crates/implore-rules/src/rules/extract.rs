//! Extract rule: pull properties or geometry out of nodes

use async_trait::async_trait;
use implore_scene::{resolve_or_undefined, AttrValue, Mesh, SceneNode};
use serde::{Deserialize, Serialize};

use super::require_input;
use crate::error::RuleResult;
use crate::rule::{Rule, RuleContext, RuleCore, RuleKind, RuleOutput};
use crate::value::{Payload, Provenance, Reference, TypedValue, ValueType};

const ALLOWED: &[ValueType] = &[ValueType::NodeCollection, ValueType::Scene, ValueType::Node];

/// What to pull out of each node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ExtractMode {
    /// Resolve a property path; `as_number` forces a numeric result
    Property {
        path: String,
        #[serde(default)]
        as_number: bool,
    },
    /// Every triangle of the node's mesh
    Faces,
    /// Feature edges: boundary edges plus interior edges whose faces meet
    /// at more than the threshold angle
    Edges {
        #[serde(default)]
        threshold_degrees: Option<f64>,
    },
    /// Every unique triangle edge
    Wireframe,
    /// Unique vertex positions
    Vertices,
    /// Axis-aligned bounds of the mesh
    Bounds,
}

impl ExtractMode {
    pub fn property(path: impl Into<String>) -> Self {
        ExtractMode::Property {
            path: path.into(),
            as_number: false,
        }
    }

    pub fn number(path: impl Into<String>) -> Self {
        ExtractMode::Property {
            path: path.into(),
            as_number: true,
        }
    }
}

/// Runtime kind chosen for a property collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertyKind {
    Number,
    Boolean,
    String,
    Json,
}

impl PropertyKind {
    fn of(value: &AttrValue) -> Self {
        match value {
            AttrValue::Number(_) => PropertyKind::Number,
            AttrValue::Bool(_) => PropertyKind::Boolean,
            AttrValue::String(_) => PropertyKind::String,
            AttrValue::Json(_) | AttrValue::Null => PropertyKind::Json,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractRule {
    core: RuleCore,
    mode: ExtractMode,
}

impl ExtractRule {
    pub fn new(input: impl Into<String>, output: impl Into<String>, mode: ExtractMode) -> Self {
        Self {
            core: RuleCore::new(input, output),
            mode,
        }
    }

    pub fn mode(&self) -> &ExtractMode {
        &self.mode
    }
}

#[async_trait]
impl Rule for ExtractRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Extract
    }

    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RuleCore {
        &mut self.core
    }

    fn allowed_input_types(&self) -> &'static [ValueType] {
        ALLOWED
    }

    async fn transform(
        &mut self,
        input: Option<&TypedValue>,
        ctx: &RuleContext<'_>,
    ) -> RuleResult<RuleOutput> {
        let input = require_input(input, self.kind())?;
        let nodes = input.value.nodes().unwrap_or_default();

        let output = match &self.mode {
            ExtractMode::Property { path, as_number } => match &input.value {
                Payload::Node(node) => extract_single(node, path, *as_number),
                _ => extract_many(&nodes, path, *as_number),
            },
            ExtractMode::Faces => collect_geometry(&nodes, Mesh::triangles, Payload::Triangles),
            ExtractMode::Edges { threshold_degrees } => {
                let threshold = threshold_degrees.unwrap_or(ctx.config.silhouette_threshold_degrees);
                collect_geometry(
                    &nodes,
                    |mesh| mesh.silhouette_edges(threshold),
                    Payload::LineSegments,
                )
            }
            ExtractMode::Wireframe => collect_geometry(&nodes, Mesh::wireframe, Payload::LineSegments),
            ExtractMode::Vertices => collect_geometry(&nodes, Mesh::vertices, Payload::Points),
            ExtractMode::Bounds => collect_geometry(
                &nodes,
                |mesh| mesh.bounds().into_iter().collect(),
                Payload::Boxes,
            ),
        };
        Ok(output)
    }
}

fn extract_single(node: &SceneNode, path: &str, as_number: bool) -> RuleOutput {
    let value = resolve_or_undefined(node, path);
    let payload = if as_number {
        Payload::Number(number_of(value.as_ref()))
    } else {
        match value {
            Some(AttrValue::Number(n)) => Payload::Number(n),
            Some(AttrValue::Bool(b)) => Payload::Boolean(b),
            Some(AttrValue::String(s)) => Payload::String(s),
            Some(AttrValue::Json(v)) => Payload::Json(v),
            Some(AttrValue::Null) | None => Payload::Json(serde_json::Value::Null),
        }
    };
    RuleOutput::new(payload).with_reference(Reference::One(Provenance::Node(node.clone())))
}

/// Property values for several nodes, typed after the first defined value.
/// Later values are converted to that kind.
fn extract_many(nodes: &[SceneNode], path: &str, as_number: bool) -> RuleOutput {
    let values: Vec<Option<AttrValue>> = nodes
        .iter()
        .map(|node| resolve_or_undefined(node, path))
        .collect();

    let kind = if as_number {
        PropertyKind::Number
    } else {
        values
            .iter()
            .flatten()
            .find(|v| !v.is_null())
            .map(PropertyKind::of)
            .unwrap_or(PropertyKind::Json)
    };

    let payload = match kind {
        PropertyKind::Number => {
            Payload::Numbers(values.iter().map(|v| number_of(v.as_ref())).collect())
        }
        PropertyKind::Boolean => Payload::Booleans(
            values
                .iter()
                .map(|v| v.as_ref().is_some_and(AttrValue::is_truthy))
                .collect(),
        ),
        PropertyKind::String => Payload::Strings(
            values
                .iter()
                .map(|v| v.as_ref().and_then(AttrValue::to_text).unwrap_or_default())
                .collect(),
        ),
        PropertyKind::Json => Payload::Json(serde_json::Value::Array(
            values
                .iter()
                .map(|v| v.as_ref().map(AttrValue::to_json).unwrap_or_default())
                .collect(),
        )),
    };

    let reference = match kind {
        // A JSON array is not a collection type; it carries no parallel references
        PropertyKind::Json => Reference::None,
        _ => Reference::nodes(nodes.iter().cloned()),
    };
    RuleOutput::new(payload).with_reference(reference)
}

fn number_of(value: Option<&AttrValue>) -> f64 {
    value.and_then(AttrValue::coerce_number).unwrap_or(f64::NAN)
}

/// Concatenate per-node geometry, one provenance entry per produced element
fn collect_geometry<T>(
    nodes: &[SceneNode],
    extract: impl Fn(&Mesh) -> Vec<T>,
    wrap: impl FnOnce(Vec<T>) -> Payload,
) -> RuleOutput {
    let mut items = Vec::new();
    let mut references = Vec::new();

    for node in nodes {
        let Some(mesh) = node.geometry() else {
            continue;
        };
        let extracted = extract(mesh.as_ref());
        references.extend(std::iter::repeat(Provenance::Node(node.clone())).take(extracted.len()));
        items.extend(extracted);
    }

    RuleOutput::new(wrap(items)).with_reference(Reference::Many(references))
}
