//! Geometry primitives and mesh decomposition
//!
//! A [`Mesh`] is a position buffer with an optional triangle index buffer.
//! The rule pipeline never looks at buffers directly; it asks a mesh for
//! triangles, wireframe segments, silhouette edges, unique vertices or its
//! bounding box.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::vector::{self, Point3};

/// Positions closer than this (per axis) are treated as the same vertex.
const WELD_PRECISION: f64 = 1e4;

/// A triangle given by its three corners
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub a: Point3,
    pub b: Point3,
    pub c: Point3,
}

impl Triangle {
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        Self { a, b, c }
    }

    /// Unit normal following the right-hand rule, zero for degenerate triangles
    pub fn normal(&self) -> Point3 {
        vector::normalize(self.raw_normal())
    }

    /// Whether the triangle has (numerically) no area
    pub fn is_degenerate(&self) -> bool {
        vector::length_sq(self.raw_normal()) <= f64::EPSILON
    }

    pub fn edges(&self) -> [Segment; 3] {
        [
            Segment::new(self.a, self.b),
            Segment::new(self.b, self.c),
            Segment::new(self.c, self.a),
        ]
    }

    fn raw_normal(&self) -> Point3 {
        vector::cross(vector::sub(self.b, self.a), vector::sub(self.c, self.a))
    }
}

/// A line segment between two points
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point3,
    pub end: Point3,
}

impl Segment {
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        vector::distance(self.start, self.end)
    }
}

/// A 3D axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox {
    /// Create a bounding box from min/max corners
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (invalid) bounding box
    pub fn empty() -> Self {
        Self {
            min: [f64::INFINITY, f64::INFINITY, f64::INFINITY],
            max: [f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
        }
    }

    /// Smallest box containing every point, `None` when there are no points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut bounds = Self::empty();
        for point in points {
            bounds.expand_to_include(*point);
        }
        if bounds.is_empty() {
            None
        } else {
            Some(bounds)
        }
    }

    /// Check if the bounding box is empty/invalid
    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1] || self.min[2] > self.max[2]
    }

    /// Expand to include a point
    pub fn expand_to_include(&mut self, point: Point3) {
        for (i, &p) in point.iter().enumerate() {
            self.min[i] = self.min[i].min(p);
            self.max[i] = self.max[i].max(p);
        }
    }

    /// Check if a point is contained
    pub fn contains_point(&self, point: Point3) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Calculate the center of the bounding box
    pub fn center(&self) -> Point3 {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    /// Calculate squared distance from a point to the nearest point on the box
    pub fn distance_sq_to_point(&self, point: Point3) -> f64 {
        let mut dist_sq = 0.0;
        for (i, &p) in point.iter().enumerate() {
            if p < self.min[i] {
                dist_sq += (self.min[i] - p).powi(2);
            } else if p > self.max[i] {
                dist_sq += (p - self.max[i]).powi(2);
            }
        }
        dist_sq
    }

    /// Calculate squared gap between two boxes (zero when they touch or overlap)
    pub fn distance_sq_to_box(&self, other: &BoundingBox) -> f64 {
        (0..3)
            .map(|i| {
                let gap = (self.min[i] - other.max[i]).max(other.min[i] - self.max[i]);
                gap.max(0.0).powi(2)
            })
            .sum()
    }
}

/// Triangle geometry attached to a scene node
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub positions: Vec<Point3>,
    /// Triangle list indices; when absent every three positions form a triangle
    pub indices: Option<Vec<u32>>,
}

type VertexKey = [i64; 3];

fn vertex_key(p: Point3) -> VertexKey {
    [
        (p[0] * WELD_PRECISION).round() as i64,
        (p[1] * WELD_PRECISION).round() as i64,
        (p[2] * WELD_PRECISION).round() as i64,
    ]
}

fn edge_key(a: VertexKey, b: VertexKey) -> (VertexKey, VertexKey) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Mesh {
    /// Non-indexed mesh: positions are consumed three at a time
    pub fn new(positions: Vec<Point3>) -> Self {
        Self {
            positions,
            indices: None,
        }
    }

    pub fn indexed(positions: Vec<Point3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices: Some(indices),
        }
    }

    /// Build a non-indexed mesh from triangles
    pub fn from_triangles(triangles: &[Triangle]) -> Self {
        Self::new(triangles.iter().flat_map(|t| [t.a, t.b, t.c]).collect())
    }

    /// Every face of the mesh. Index triples pointing outside the position
    /// buffer are skipped.
    pub fn triangles(&self) -> Vec<Triangle> {
        match &self.indices {
            Some(indices) => indices
                .chunks_exact(3)
                .filter_map(|tri| {
                    Some(Triangle::new(
                        *self.positions.get(tri[0] as usize)?,
                        *self.positions.get(tri[1] as usize)?,
                        *self.positions.get(tri[2] as usize)?,
                    ))
                })
                .collect(),
            None => self
                .positions
                .chunks_exact(3)
                .map(|tri| Triangle::new(tri[0], tri[1], tri[2]))
                .collect(),
        }
    }

    /// Every distinct triangle edge, once, in first-seen order
    pub fn wireframe(&self) -> Vec<Segment> {
        let mut seen = HashSet::new();
        let mut segments = Vec::new();
        for triangle in self.triangles() {
            for edge in triangle.edges() {
                let key = edge_key(vertex_key(edge.start), vertex_key(edge.end));
                if key.0 != key.1 && seen.insert(key) {
                    segments.push(edge);
                }
            }
        }
        segments
    }

    /// Outline edges: boundary edges plus edges whose two adjacent faces
    /// meet at an angle larger than `threshold_degrees`.
    pub fn silhouette_edges(&self, threshold_degrees: f64) -> Vec<Segment> {
        let threshold_dot = threshold_degrees.to_radians().cos();

        // Half-edges waiting for their twin, in insertion order
        let mut pending: HashMap<(VertexKey, VertexKey), usize> = HashMap::new();
        let mut open: Vec<Option<(Segment, Point3)>> = Vec::new();
        let mut segments = Vec::new();

        for triangle in self.triangles() {
            let keys = [
                vertex_key(triangle.a),
                vertex_key(triangle.b),
                vertex_key(triangle.c),
            ];
            if keys[0] == keys[1] || keys[1] == keys[2] || keys[2] == keys[0] {
                continue;
            }
            let normal = triangle.normal();

            for (i, edge) in triangle.edges().into_iter().enumerate() {
                let from = keys[i];
                let to = keys[(i + 1) % 3];
                if let Some(slot) = pending.remove(&(to, from)) {
                    if let Some((_, twin_normal)) = open[slot].take() {
                        if vector::dot(normal, twin_normal) <= threshold_dot {
                            segments.push(edge);
                        }
                    }
                } else if !pending.contains_key(&(from, to)) {
                    pending.insert((from, to), open.len());
                    open.push(Some((edge, normal)));
                }
            }
        }

        segments.extend(open.into_iter().flatten().map(|(edge, _)| edge));
        segments
    }

    /// Unique positions in first-seen order
    pub fn vertices(&self) -> Vec<Point3> {
        let mut seen = HashSet::new();
        self.positions
            .iter()
            .filter(|p| seen.insert(vertex_key(**p)))
            .copied()
            .collect()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.positions)
    }
}
