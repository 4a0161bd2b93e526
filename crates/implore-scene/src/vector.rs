//! Small `[f64; 3]` vector helpers

/// A point or direction in 3D space.
pub type Point3 = [f64; 3];

pub fn add(a: Point3, b: Point3) -> Point3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn sub(a: Point3, b: Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: Point3, s: f64) -> Point3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub fn dot(a: Point3, b: Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: Point3, b: Point3) -> Point3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn length_sq(a: Point3) -> f64 {
    dot(a, a)
}

pub fn length(a: Point3) -> f64 {
    length_sq(a).sqrt()
}

pub fn distance(a: Point3, b: Point3) -> f64 {
    length(sub(a, b))
}

/// Unit vector in the direction of `a`, or `a` unchanged if it has no length.
pub fn normalize(a: Point3) -> Point3 {
    let len = length(a);
    if len > 0.0 {
        [a[0] / len, a[1] / len, a[2] / len]
    } else {
        a
    }
}
