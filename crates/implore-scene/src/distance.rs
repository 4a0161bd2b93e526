//! Closest-point and minimum-distance queries
//!
//! Every distance here is the length between the closest pair of points on
//! the two primitives. Composite cases (segment–triangle, triangle–triangle)
//! take the minimum over the candidate sub-queries.

use crate::geometry::{BoundingBox, Segment, Triangle};
use crate::vector::{self, Point3};

const EPSILON: f64 = 1e-12;

/// Closest point on a segment to `p`
pub fn closest_point_on_segment(p: Point3, segment: &Segment) -> Point3 {
    let d = vector::sub(segment.end, segment.start);
    let len_sq = vector::length_sq(d);
    if len_sq <= EPSILON {
        return segment.start;
    }
    let t = (vector::dot(vector::sub(p, segment.start), d) / len_sq).clamp(0.0, 1.0);
    vector::add(segment.start, vector::scale(d, t))
}

/// Closest point on a triangle to `p`, by Voronoi region of the triangle
pub fn closest_point_on_triangle(p: Point3, triangle: &Triangle) -> Point3 {
    if triangle.is_degenerate() {
        return closest_point_on_edges(p, triangle);
    }

    let Triangle { a, b, c } = *triangle;
    let ab = vector::sub(b, a);
    let ac = vector::sub(c, a);

    // Vertex region A
    let ap = vector::sub(p, a);
    let d1 = vector::dot(ab, ap);
    let d2 = vector::dot(ac, ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    // Vertex region B
    let bp = vector::sub(p, b);
    let d3 = vector::dot(ab, bp);
    let d4 = vector::dot(ac, bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    // Edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return vector::add(a, vector::scale(ab, v));
    }

    // Vertex region C
    let cp = vector::sub(p, c);
    let d5 = vector::dot(ab, cp);
    let d6 = vector::dot(ac, cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return vector::add(a, vector::scale(ac, w));
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return vector::add(b, vector::scale(vector::sub(c, b), w));
    }

    // Face region
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    vector::add(a, vector::add(vector::scale(ab, v), vector::scale(ac, w)))
}

fn closest_point_on_edges(p: Point3, triangle: &Triangle) -> Point3 {
    let [first, rest @ ..] = triangle.edges();
    rest.iter().fold(closest_point_on_segment(p, &first), |best, edge| {
        let candidate = closest_point_on_segment(p, edge);
        if vector::distance(p, candidate) < vector::distance(p, best) {
            candidate
        } else {
            best
        }
    })
}

/// Closest pair of points between two segments, `(on_first, on_second)`
pub fn closest_points_between_segments(first: &Segment, second: &Segment) -> (Point3, Point3) {
    let d1 = vector::sub(first.end, first.start);
    let d2 = vector::sub(second.end, second.start);
    let r = vector::sub(first.start, second.start);
    let a = vector::dot(d1, d1);
    let e = vector::dot(d2, d2);
    let f = vector::dot(d2, r);

    let (s, t) = if a <= EPSILON && e <= EPSILON {
        (0.0, 0.0)
    } else if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = vector::dot(d1, r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = vector::dot(d1, d2);
            let denom = a * e - b * b;
            let s = if denom.abs() > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    (
        vector::add(first.start, vector::scale(d1, s)),
        vector::add(second.start, vector::scale(d2, t)),
    )
}

/// Point where a segment pierces a triangle, if it does
pub fn segment_triangle_intersection(segment: &Segment, triangle: &Triangle) -> Option<Point3> {
    let dir = vector::sub(segment.end, segment.start);
    let e1 = vector::sub(triangle.b, triangle.a);
    let e2 = vector::sub(triangle.c, triangle.a);
    let h = vector::cross(dir, e2);
    let det = vector::dot(e1, h);
    if det.abs() <= EPSILON {
        // Parallel; coplanar contact is caught by the edge queries
        return None;
    }

    let inv = 1.0 / det;
    let s = vector::sub(segment.start, triangle.a);
    let u = inv * vector::dot(s, h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = vector::cross(s, e1);
    let v = inv * vector::dot(dir, q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = inv * vector::dot(e2, q);
    if (0.0..=1.0).contains(&t) {
        Some(vector::add(segment.start, vector::scale(dir, t)))
    } else {
        None
    }
}

pub fn point_point_distance(a: Point3, b: Point3) -> f64 {
    vector::distance(a, b)
}

pub fn point_segment_distance(p: Point3, segment: &Segment) -> f64 {
    vector::distance(p, closest_point_on_segment(p, segment))
}

pub fn point_triangle_distance(p: Point3, triangle: &Triangle) -> f64 {
    vector::distance(p, closest_point_on_triangle(p, triangle))
}

pub fn segment_segment_distance(first: &Segment, second: &Segment) -> f64 {
    let (p, q) = closest_points_between_segments(first, second);
    vector::distance(p, q)
}

pub fn segment_triangle_distance(segment: &Segment, triangle: &Triangle) -> f64 {
    if segment_triangle_intersection(segment, triangle).is_some() {
        return 0.0;
    }
    let endpoints = [
        point_triangle_distance(segment.start, triangle),
        point_triangle_distance(segment.end, triangle),
    ];
    triangle
        .edges()
        .iter()
        .map(|edge| segment_segment_distance(segment, edge))
        .chain(endpoints)
        .fold(f64::INFINITY, f64::min)
}

pub fn triangle_triangle_distance(first: &Triangle, second: &Triangle) -> f64 {
    let forward = first
        .edges()
        .into_iter()
        .map(|edge| segment_triangle_distance(&edge, second));
    let backward = second
        .edges()
        .into_iter()
        .map(|edge| segment_triangle_distance(&edge, first));
    forward.chain(backward).fold(f64::INFINITY, f64::min)
}

pub fn point_box_distance(p: Point3, bounds: &BoundingBox) -> f64 {
    bounds.distance_sq_to_point(p).sqrt()
}

pub fn box_box_distance(first: &BoundingBox, second: &BoundingBox) -> f64 {
    first.distance_sq_to_box(second).sqrt()
}
