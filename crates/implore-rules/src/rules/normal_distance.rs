//! NormalDistance rule: pairwise minimum distances between geometry
//!
//! Both inputs are geometric values with per-element node provenance. Every
//! element of the first input is measured against every element of the
//! second; distances are then merged per unordered node pair, so two walls
//! contributing many triangles each yield a single distance.

use async_trait::async_trait;
use implore_scene::{
    box_box_distance, point_box_distance, point_point_distance, point_segment_distance,
    point_triangle_distance, segment_segment_distance, segment_triangle_distance,
    triangle_triangle_distance, BoundingBox, NodeId, Point3, SceneNode, Segment, Triangle,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::{require_input, second_input};
use crate::error::{describe_types, RuleError, RuleResult};
use crate::rule::{Rule, RuleContext, RuleCore, RuleKind, RuleOutput};
use crate::value::{Payload, Provenance, Reference, TypedValue, ValueType};

const GEOMETRY: &[ValueType] = &[
    ValueType::Point,
    ValueType::Points,
    ValueType::LineSegment,
    ValueType::LineSegments,
    ValueType::Triangle,
    ValueType::Triangles,
    ValueType::Box,
    ValueType::Boxes,
];

/// How distances for the same node pair are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceOp {
    #[default]
    Min,
    Max,
}

impl DistanceOp {
    fn merge(&self, current: f64, candidate: f64) -> f64 {
        match self {
            DistanceOp::Min => current.min(candidate),
            DistanceOp::Max => current.max(candidate),
        }
    }
}

/// A single geometric primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Point(Point3),
    Segment(Segment),
    Triangle(Triangle),
    Box(BoundingBox),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShapeKind {
    Point,
    Segment,
    Triangle,
    Box,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Point => "point",
            ShapeKind::Segment => "line segment",
            ShapeKind::Triangle => "triangle",
            ShapeKind::Box => "box",
        };
        f.write_str(name)
    }
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Point(_) => ShapeKind::Point,
            Shape::Segment(_) => ShapeKind::Segment,
            Shape::Triangle(_) => ShapeKind::Triangle,
            Shape::Box(_) => ShapeKind::Box,
        }
    }

    /// Split a geometric payload into shapes. Non-geometric payloads yield none.
    pub fn from_payload(payload: &Payload) -> Vec<Shape> {
        match payload {
            Payload::Point(p) => vec![Shape::Point(*p)],
            Payload::Points(v) => v.iter().copied().map(Shape::Point).collect(),
            Payload::LineSegment(s) => vec![Shape::Segment(*s)],
            Payload::LineSegments(v) => v.iter().copied().map(Shape::Segment).collect(),
            Payload::Triangle(t) => vec![Shape::Triangle(*t)],
            Payload::Triangles(v) => v.iter().copied().map(Shape::Triangle).collect(),
            Payload::Box(b) => vec![Shape::Box(*b)],
            Payload::Boxes(v) => v.iter().copied().map(Shape::Box).collect(),
            _ => Vec::new(),
        }
    }
}

/// Minimum distance between two shapes.
///
/// Boxes pair only with points and other boxes.
pub fn shape_distance(first: &Shape, second: &Shape) -> RuleResult<f64> {
    let (a, b) = if first.kind() <= second.kind() {
        (first, second)
    } else {
        (second, first)
    };

    let distance = match (a, b) {
        (Shape::Point(p), Shape::Point(q)) => point_point_distance(*p, *q),
        (Shape::Point(p), Shape::Segment(s)) => point_segment_distance(*p, s),
        (Shape::Point(p), Shape::Triangle(t)) => point_triangle_distance(*p, t),
        (Shape::Point(p), Shape::Box(b)) => point_box_distance(*p, b),
        (Shape::Segment(s), Shape::Segment(r)) => segment_segment_distance(s, r),
        (Shape::Segment(s), Shape::Triangle(t)) => segment_triangle_distance(s, t),
        (Shape::Triangle(t), Shape::Triangle(u)) => triangle_triangle_distance(t, u),
        (Shape::Box(b), Shape::Box(c)) => box_box_distance(b, c),
        _ => {
            return Err(RuleError::UnsupportedCombination {
                first: a.kind().to_string(),
                second: b.kind().to_string(),
            })
        }
    };
    Ok(distance)
}

/// Collects distances keyed by unordered node pair, in first-seen order
struct PairAccumulator {
    operation: DistanceOp,
    index: HashMap<(NodeId, NodeId), usize>,
    distances: Vec<f64>,
    pairs: Vec<Provenance>,
}

impl PairAccumulator {
    fn new(operation: DistanceOp) -> Self {
        Self {
            operation,
            index: HashMap::new(),
            distances: Vec::new(),
            pairs: Vec::new(),
        }
    }

    fn record(&mut self, a: &SceneNode, b: &SceneNode, distance: f64) {
        let slot = self
            .index
            .get(&(a.id(), b.id()))
            .or_else(|| self.index.get(&(b.id(), a.id())))
            .copied();

        match slot {
            Some(i) => self.distances[i] = self.operation.merge(self.distances[i], distance),
            None => {
                self.index.insert((a.id(), b.id()), self.distances.len());
                self.distances.push(distance);
                self.pairs.push(Provenance::Pair(a.clone(), b.clone()));
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalDistanceRule {
    core: RuleCore,
    operation: DistanceOp,
    compared: usize,
}

impl NormalDistanceRule {
    pub fn new(first: impl Into<String>, second: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            core: RuleCore::new(first, output).with_second_input(second),
            operation: DistanceOp::Min,
            compared: 0,
        }
    }

    pub fn with_operation(mut self, operation: DistanceOp) -> Self {
        self.operation = operation;
        self
    }

    /// Element pairs measured in the last run
    pub fn compared_pairs(&self) -> usize {
        self.compared
    }
}

/// Shapes paired with the node each came from
fn attributed_shapes(value: &TypedValue) -> RuleResult<Vec<(Shape, SceneNode)>> {
    let shapes = Shape::from_payload(&value.value);
    let references = value.reference.as_slice();
    if references.len() != shapes.len() {
        return Err(RuleError::ShapeMismatch {
            name: value.name.clone(),
            values: shapes.len(),
            references: references.len(),
        });
    }
    Ok(shapes
        .into_iter()
        .zip(references.iter().map(|p| p.primary().clone()))
        .collect())
}

#[async_trait]
impl Rule for NormalDistanceRule {
    fn kind(&self) -> RuleKind {
        RuleKind::NormalDistance
    }

    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RuleCore {
        &mut self.core
    }

    fn allowed_input_types(&self) -> &'static [ValueType] {
        GEOMETRY
    }

    async fn transform(
        &mut self,
        input: Option<&TypedValue>,
        ctx: &RuleContext<'_>,
    ) -> RuleResult<RuleOutput> {
        self.compared = 0;
        let first = require_input(input, self.kind())?;
        let second = second_input(self.core.input_var_name2.as_deref(), ctx.ledger, self.kind())?;

        let actual = second.value_type();
        if !GEOMETRY.contains(&actual) {
            return Err(RuleError::InvalidSecondaryInputType {
                rule: self.kind(),
                name: second.name.clone(),
                actual,
                expected: describe_types(GEOMETRY),
            });
        }

        let a = attributed_shapes(first)?;
        let b = attributed_shapes(second)?;
        // Comparing a set against itself visits each unordered element pair once
        let symmetric = self.core.input_var_name.as_deref().map(str::trim)
            == self.core.input_var_name2.as_deref().map(str::trim);

        let pairs = if symmetric {
            a.len() * a.len().saturating_sub(1) / 2
        } else {
            a.len() * b.len()
        };
        if let Some(limit) = ctx.config.max_distance_pairs {
            if pairs > limit {
                return Err(RuleError::TooManyPairs { pairs, limit });
            }
        }

        let mut accumulator = PairAccumulator::new(self.operation);
        let mut measure = |(sa, na): &(Shape, SceneNode), (sb, nb): &(Shape, SceneNode)| -> RuleResult<()> {
            self.compared += 1;
            // Geometry of a node against itself is not a distance between nodes
            if na == nb {
                return Ok(());
            }
            accumulator.record(na, nb, shape_distance(sa, sb)?);
            Ok(())
        };

        if symmetric {
            for (i, left) in a.iter().enumerate() {
                for right in &a[i + 1..] {
                    measure(left, right)?;
                }
            }
        } else {
            for left in &a {
                for right in &b {
                    measure(left, right)?;
                }
            }
        }

        tracing::debug!(
            "Measured {} element pairs into {} node pairs",
            self.compared,
            accumulator.pairs.len()
        );
        Ok(RuleOutput::new(Payload::Numbers(accumulator.distances))
            .with_reference(Reference::Many(accumulator.pairs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessConfig;
    use crate::ledger::Ledger;
    use crate::rule::apply;

    fn points(nodes: &[SceneNode], coords: &[Point3]) -> TypedValue {
        TypedValue::new("points", Payload::Points(coords.to_vec()))
            .with_reference(Reference::nodes(nodes.iter().cloned()))
    }

    async fn measure(
        rule: &mut NormalDistanceRule,
        entries: Vec<TypedValue>,
        config: ProcessConfig,
    ) -> RuleResult<Option<TypedValue>> {
        let mut ledger = Ledger::new();
        for entry in entries {
            ledger.push(entry);
        }
        apply(rule, &RuleContext::new(&ledger, &config)).await
    }

    fn pair_names(reference: &Reference) -> Vec<(String, String)> {
        reference
            .as_slice()
            .iter()
            .map(|p| match p {
                Provenance::Pair(a, b) => (a.name().to_string(), b.name().to_string()),
                Provenance::Node(n) => (n.name().to_string(), String::new()),
            })
            .collect()
    }

    #[tokio::test]
    async fn symmetric_points_yield_each_pair_once() {
        let nodes = vec![SceneNode::new("a"), SceneNode::new("b"), SceneNode::new("c")];
        let input = points(&nodes, &[[0.0, 0.0, 0.0], [3.0, 4.0, 0.0], [0.0, 0.0, 2.0]]);
        let mut rule = NormalDistanceRule::new("points", "points", "gaps");

        let out = measure(&mut rule, vec![input], ProcessConfig::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(out.value, Payload::Numbers(vec![5.0, 2.0, 29f64.sqrt()]));
        assert_eq!(
            pair_names(&out.reference),
            vec![
                ("a".to_string(), "b".to_string()),
                ("a".to_string(), "c".to_string()),
                ("b".to_string(), "c".to_string()),
            ]
        );
        assert_eq!(rule.compared_pairs(), 3);
    }

    #[tokio::test]
    async fn distances_merge_per_node_pair() {
        let wall = SceneNode::new("wall");
        let column = SceneNode::new("column");
        let wall_points = TypedValue::new(
            "wall",
            Payload::Points(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]),
        )
        .with_reference(Reference::nodes(vec![wall.clone(), wall.clone()]));
        let column_points = TypedValue::new("column", Payload::Point([4.0, 0.0, 0.0]))
            .with_reference(Reference::One(Provenance::Node(column.clone())));

        let mut min = NormalDistanceRule::new("wall", "column", "gap");
        let out = measure(
            &mut min,
            vec![wall_points.clone(), column_points.clone()],
            ProcessConfig::default(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(out.value, Payload::Numbers(vec![3.0]));
        assert_eq!(out.reference.len(), 1);

        let mut max = NormalDistanceRule::new("wall", "column", "gap").with_operation(DistanceOp::Max);
        let out = measure(&mut max, vec![wall_points, column_points], ProcessConfig::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.value, Payload::Numbers(vec![4.0]));
    }

    #[tokio::test]
    async fn same_node_pairs_are_skipped() {
        let node = SceneNode::new("solo");
        let input = points(&[node.clone(), node], &[[0.0; 3], [1.0, 0.0, 0.0]]);
        let mut rule = NormalDistanceRule::new("points", "points", "gaps");
        let out = measure(&mut rule, vec![input], ProcessConfig::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.value, Payload::Numbers(vec![]));
    }

    #[tokio::test]
    async fn missing_references_are_a_shape_mismatch() {
        let input = TypedValue::new("points", Payload::Points(vec![[0.0; 3], [1.0; 3]]));
        let mut rule = NormalDistanceRule::new("points", "points", "gaps");
        let result = measure(&mut rule, vec![input], ProcessConfig::default()).await;
        assert!(matches!(
            result,
            Err(RuleError::ShapeMismatch { values: 2, references: 0, .. })
        ));
    }

    #[tokio::test]
    async fn pair_limit_is_enforced() {
        let nodes: Vec<SceneNode> = (0..4).map(|i| SceneNode::new(format!("n{}", i))).collect();
        let input = points(&nodes, &[[0.0; 3], [1.0; 3], [2.0; 3], [3.0; 3]]);
        let config = ProcessConfig {
            max_distance_pairs: Some(5),
            ..ProcessConfig::default()
        };
        let mut rule = NormalDistanceRule::new("points", "points", "gaps");
        let result = measure(&mut rule, vec![input], config).await;
        assert!(matches!(result, Err(RuleError::TooManyPairs { pairs: 6, limit: 5 })));
    }

    #[tokio::test]
    async fn rejects_non_geometric_second_input() {
        let nodes = vec![SceneNode::new("a")];
        let mut rule = NormalDistanceRule::new("points", "labels", "gaps");
        let result = measure(
            &mut rule,
            vec![
                points(&nodes, &[[0.0; 3]]),
                TypedValue::new("labels", Payload::Strings(vec!["x".into()])),
            ],
            ProcessConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(RuleError::InvalidSecondaryInputType { .. })));
    }

    #[test]
    fn dispatch_is_order_independent() {
        let tri = Shape::Triangle(Triangle::new([0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]));
        let point = Shape::Point([0.2, 0.2, 2.0]);
        let forward = shape_distance(&tri, &point).unwrap();
        let backward = shape_distance(&point, &tri).unwrap();
        assert!((forward - 2.0).abs() < 1e-9);
        assert_eq!(forward, backward);
    }

    #[test]
    fn boxes_only_pair_with_points_and_boxes() {
        let bounds = Shape::Box(BoundingBox::new([0.0; 3], [1.0; 3]));
        let seg = Shape::Segment(Segment::new([3.0; 3], [4.0; 3]));
        assert!(shape_distance(&bounds, &Shape::Point([1.0, 1.0, 3.0])).is_ok());
        assert!(matches!(
            shape_distance(&seg, &bounds),
            Err(RuleError::UnsupportedCombination { .. })
        ));
    }
}
