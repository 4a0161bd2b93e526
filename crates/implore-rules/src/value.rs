//! Typed ledger values and their provenance
//!
//! Every value a rule produces is a [`TypedValue`]: a name, a [`Payload`]
//! whose variant fixes its [`ValueType`], and a [`Reference`] recording which
//! scene nodes each element came from.

use implore_scene::{format_number, AttrValue, BoundingBox, Point3, SceneNode, Segment, Triangle};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of a ledger value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    Scene,
    NodeCollection,
    Node,
    Triangle,
    Triangles,
    LineSegment,
    LineSegments,
    Point,
    Points,
    Box,
    Boxes,
    String,
    Strings,
    Number,
    Numbers,
    Boolean,
    Booleans,
    Json,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Scene => "scene",
            ValueType::NodeCollection => "node-collection",
            ValueType::Node => "node",
            ValueType::Triangle => "triangle",
            ValueType::Triangles => "triangles",
            ValueType::LineSegment => "line-segment",
            ValueType::LineSegments => "line-segments",
            ValueType::Point => "point",
            ValueType::Points => "points",
            ValueType::Box => "box",
            ValueType::Boxes => "boxes",
            ValueType::String => "string",
            ValueType::Strings => "strings",
            ValueType::Number => "number",
            ValueType::Numbers => "numbers",
            ValueType::Boolean => "boolean",
            ValueType::Booleans => "booleans",
            ValueType::Json => "json",
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            ValueType::NodeCollection
                | ValueType::Triangles
                | ValueType::LineSegments
                | ValueType::Points
                | ValueType::Boxes
                | ValueType::Strings
                | ValueType::Numbers
                | ValueType::Booleans
        )
    }

    /// Collection tag for this element tag. Collections map to themselves.
    pub fn plural(&self) -> ValueType {
        match self {
            ValueType::Scene | ValueType::Node => ValueType::NodeCollection,
            ValueType::Triangle => ValueType::Triangles,
            ValueType::LineSegment => ValueType::LineSegments,
            ValueType::Point => ValueType::Points,
            ValueType::Box => ValueType::Boxes,
            ValueType::String => ValueType::Strings,
            ValueType::Number => ValueType::Numbers,
            ValueType::Boolean => ValueType::Booleans,
            other => *other,
        }
    }

    /// Element tag for this collection tag. Singular tags map to themselves.
    pub fn singular(&self) -> ValueType {
        match self {
            ValueType::NodeCollection => ValueType::Node,
            ValueType::Triangles => ValueType::Triangle,
            ValueType::LineSegments => ValueType::LineSegment,
            ValueType::Points => ValueType::Point,
            ValueType::Boxes => ValueType::Box,
            ValueType::Strings => ValueType::String,
            ValueType::Numbers => ValueType::Number,
            ValueType::Booleans => ValueType::Boolean,
            other => *other,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The data carried by a ledger value. The variant determines the type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Root of a scene hierarchy
    Scene(SceneNode),
    Nodes(Vec<SceneNode>),
    Node(SceneNode),
    Triangle(Triangle),
    Triangles(Vec<Triangle>),
    LineSegment(Segment),
    LineSegments(Vec<Segment>),
    Point(Point3),
    Points(Vec<Point3>),
    Box(BoundingBox),
    Boxes(Vec<BoundingBox>),
    String(String),
    Strings(Vec<String>),
    Number(f64),
    Numbers(Vec<f64>),
    Boolean(bool),
    Booleans(Vec<bool>),
    Json(serde_json::Value),
}

impl Payload {
    pub fn value_type(&self) -> ValueType {
        match self {
            Payload::Scene(_) => ValueType::Scene,
            Payload::Nodes(_) => ValueType::NodeCollection,
            Payload::Node(_) => ValueType::Node,
            Payload::Triangle(_) => ValueType::Triangle,
            Payload::Triangles(_) => ValueType::Triangles,
            Payload::LineSegment(_) => ValueType::LineSegment,
            Payload::LineSegments(_) => ValueType::LineSegments,
            Payload::Point(_) => ValueType::Point,
            Payload::Points(_) => ValueType::Points,
            Payload::Box(_) => ValueType::Box,
            Payload::Boxes(_) => ValueType::Boxes,
            Payload::String(_) => ValueType::String,
            Payload::Strings(_) => ValueType::Strings,
            Payload::Number(_) => ValueType::Number,
            Payload::Numbers(_) => ValueType::Numbers,
            Payload::Boolean(_) => ValueType::Boolean,
            Payload::Booleans(_) => ValueType::Booleans,
            Payload::Json(_) => ValueType::Json,
        }
    }

    /// Element count of a collection, `None` for singular values
    pub fn len(&self) -> Option<usize> {
        match self {
            Payload::Nodes(v) => Some(v.len()),
            Payload::Triangles(v) => Some(v.len()),
            Payload::LineSegments(v) => Some(v.len()),
            Payload::Points(v) => Some(v.len()),
            Payload::Boxes(v) => Some(v.len()),
            Payload::Strings(v) => Some(v.len()),
            Payload::Numbers(v) => Some(v.len()),
            Payload::Booleans(v) => Some(v.len()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Element `index` of a collection as a singular payload
    pub fn element(&self, index: usize) -> Option<Payload> {
        match self {
            Payload::Nodes(v) => v.get(index).cloned().map(Payload::Node),
            Payload::Triangles(v) => v.get(index).copied().map(Payload::Triangle),
            Payload::LineSegments(v) => v.get(index).copied().map(Payload::LineSegment),
            Payload::Points(v) => v.get(index).copied().map(Payload::Point),
            Payload::Boxes(v) => v.get(index).copied().map(Payload::Box),
            Payload::Strings(v) => v.get(index).cloned().map(Payload::String),
            Payload::Numbers(v) => v.get(index).copied().map(Payload::Number),
            Payload::Booleans(v) => v.get(index).copied().map(Payload::Boolean),
            _ => None,
        }
    }

    /// Split into singular payloads. A singular value yields itself.
    pub fn elements(&self) -> Vec<Payload> {
        match self.len() {
            Some(len) => (0..len).filter_map(|i| self.element(i)).collect(),
            None => vec![self.clone()],
        }
    }

    /// Build a collection of type `ty` from singular payloads.
    ///
    /// Returns `None` if an item does not belong in that collection.
    pub fn from_elements(ty: ValueType, items: Vec<Payload>) -> Option<Payload> {
        fn gather<T>(items: Vec<Payload>, pick: impl Fn(Payload) -> Option<T>) -> Option<Vec<T>> {
            items.into_iter().map(pick).collect()
        }

        let payload = match ty.plural() {
            ValueType::NodeCollection => Payload::Nodes(gather(items, |p| match p {
                Payload::Node(n) | Payload::Scene(n) => Some(n),
                _ => None,
            })?),
            ValueType::Triangles => Payload::Triangles(gather(items, |p| match p {
                Payload::Triangle(t) => Some(t),
                _ => None,
            })?),
            ValueType::LineSegments => Payload::LineSegments(gather(items, |p| match p {
                Payload::LineSegment(s) => Some(s),
                _ => None,
            })?),
            ValueType::Points => Payload::Points(gather(items, |p| match p {
                Payload::Point(p) => Some(p),
                _ => None,
            })?),
            ValueType::Boxes => Payload::Boxes(gather(items, |p| match p {
                Payload::Box(b) => Some(b),
                _ => None,
            })?),
            ValueType::Strings => Payload::Strings(gather(items, |p| match p {
                Payload::String(s) => Some(s),
                _ => None,
            })?),
            ValueType::Numbers => Payload::Numbers(gather(items, |p| match p {
                Payload::Number(n) => Some(n),
                _ => None,
            })?),
            ValueType::Booleans => Payload::Booleans(gather(items, |p| match p {
                Payload::Boolean(b) => Some(b),
                _ => None,
            })?),
            _ => Payload::Json(serde_json::Value::Array(
                items.iter().map(Payload::to_json).collect(),
            )),
        };
        Some(payload)
    }

    /// Node view: a scene flattens to its full hierarchy (root included)
    pub fn nodes(&self) -> Option<Vec<SceneNode>> {
        match self {
            Payload::Scene(root) => Some(root.traverse()),
            Payload::Nodes(nodes) => Some(nodes.clone()),
            Payload::Node(node) => Some(vec![node.clone()]),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        fn node_json(node: &SceneNode) -> serde_json::Value {
            serde_json::json!({ "id": node.id().to_string(), "name": node.name() })
        }

        match self {
            Payload::Scene(n) | Payload::Node(n) => node_json(n),
            Payload::Nodes(v) => serde_json::Value::Array(v.iter().map(node_json).collect()),
            Payload::String(s) => serde_json::Value::String(s.clone()),
            Payload::Number(n) => AttrValue::Number(*n).to_json(),
            Payload::Boolean(b) => serde_json::Value::Bool(*b),
            Payload::Json(v) => v.clone(),
            Payload::Triangle(t) => serde_json::to_value(t).unwrap_or_default(),
            Payload::LineSegment(s) => serde_json::to_value(s).unwrap_or_default(),
            Payload::Point(p) => serde_json::to_value(p).unwrap_or_default(),
            Payload::Box(b) => serde_json::to_value(b).unwrap_or_default(),
            collection => serde_json::Value::Array(
                collection.elements().iter().map(Payload::to_json).collect(),
            ),
        }
    }

    /// Attribute form used when writing this value onto a node
    pub fn to_attr_value(&self) -> AttrValue {
        match self {
            Payload::Number(n) => AttrValue::Number(*n),
            Payload::String(s) => AttrValue::String(s.clone()),
            Payload::Boolean(b) => AttrValue::Bool(*b),
            other => AttrValue::from(other.to_json()),
        }
    }

    /// Short human-readable rendering
    pub fn summary(&self) -> String {
        match self {
            Payload::Scene(root) => format!("scene '{}'", root.name()),
            Payload::Node(node) => format!("node '{}'", node.name()),
            Payload::Nodes(v) => {
                let names = preview(v, |n| n.name().to_string());
                format!("{} nodes {}", v.len(), names)
            }
            Payload::Triangle(_) => "1 triangle".to_string(),
            Payload::Triangles(v) => format!("{} triangles", v.len()),
            Payload::LineSegment(s) => format!("line segment of length {}", format_number(s.length())),
            Payload::LineSegments(v) => format!("{} line segments", v.len()),
            Payload::Point(p) => format_point(p),
            Payload::Points(v) => format!("{} points", v.len()),
            Payload::Box(b) => format!("box {} to {}", format_point(&b.min), format_point(&b.max)),
            Payload::Boxes(v) => format!("{} boxes", v.len()),
            Payload::String(s) => format!("\"{}\"", s),
            Payload::Strings(v) => preview(v, |s| format!("\"{}\"", s)),
            Payload::Number(n) => format_number(*n),
            Payload::Numbers(v) => preview(v, |n| format_number(*n)),
            Payload::Boolean(b) => b.to_string(),
            Payload::Booleans(v) => preview(v, |b| b.to_string()),
            Payload::Json(v) => {
                let text = v.to_string();
                if text.chars().count() > PREVIEW_CHARS {
                    let cut: String = text.chars().take(PREVIEW_CHARS).collect();
                    format!("{}...", cut)
                } else {
                    text
                }
            }
        }
    }
}

const PREVIEW_ITEMS: usize = 5;
const PREVIEW_CHARS: usize = 80;

fn preview<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    let shown: Vec<String> = items.iter().take(PREVIEW_ITEMS).map(render).collect();
    if items.len() > PREVIEW_ITEMS {
        format!("[{}, ... (+{} more)]", shown.join(", "), items.len() - PREVIEW_ITEMS)
    } else {
        format!("[{}]", shown.join(", "))
    }
}

fn format_point(p: &Point3) -> String {
    format!(
        "({}, {}, {})",
        format_number(p[0]),
        format_number(p[1]),
        format_number(p[2])
    )
}

/// Where one output element came from
#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    Node(SceneNode),
    /// Element derived from two nodes, e.g. a pairwise distance
    Pair(SceneNode, SceneNode),
}

impl Provenance {
    /// The node an element is primarily attributed to
    pub fn primary(&self) -> &SceneNode {
        match self {
            Provenance::Node(node) | Provenance::Pair(node, _) => node,
        }
    }

    pub fn nodes(&self) -> Vec<&SceneNode> {
        match self {
            Provenance::Node(node) => vec![node],
            Provenance::Pair(a, b) => vec![a, b],
        }
    }
}

/// Provenance of a whole value.
///
/// For collections carrying `Many`, the reference list runs parallel to the
/// value: element `i` came from `references[i]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reference {
    #[default]
    None,
    One(Provenance),
    Many(Vec<Provenance>),
}

impl Reference {
    /// One `Provenance::Node` per node, in order
    pub fn nodes(nodes: impl IntoIterator<Item = SceneNode>) -> Self {
        Reference::Many(nodes.into_iter().map(Provenance::Node).collect())
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Reference::None)
    }

    pub fn get(&self, index: usize) -> Option<&Provenance> {
        self.as_slice().get(index)
    }

    pub fn as_slice(&self) -> &[Provenance] {
        match self {
            Reference::None => &[],
            Reference::One(p) => std::slice::from_ref(p),
            Reference::Many(v) => v,
        }
    }
}

/// A named, typed entry in the process ledger
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub name: String,
    pub value: Payload,
    pub reference: Reference,
}

impl TypedValue {
    pub fn new(name: impl Into<String>, value: Payload) -> Self {
        Self {
            name: name.into(),
            value,
            reference: Reference::None,
        }
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = reference;
        self
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    pub fn summary(&self) -> String {
        self.value.summary()
    }
}
