//! Shared scenes and fixture loading for integration tests

use implore_scene::{Mesh, Point3, SceneNode, Triangle};
use std::path::PathBuf;

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name)
}

/// Route `tracing` output through the test harness (RUST_LOG to enable)
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Axis-aligned box as 12 outward-facing triangles
pub fn box_mesh(min: Point3, max: Point3) -> Mesh {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    let p = [
        [x0, y0, z0],
        [x1, y0, z0],
        [x1, y1, z0],
        [x0, y1, z0],
        [x0, y0, z1],
        [x1, y0, z1],
        [x1, y1, z1],
        [x0, y1, z1],
    ];
    let faces: [[usize; 3]; 12] = [
        [0, 2, 1], [0, 3, 2],
        [4, 5, 6], [4, 6, 7],
        [0, 1, 5], [0, 5, 4],
        [1, 2, 6], [1, 6, 5],
        [2, 3, 7], [2, 7, 6],
        [3, 0, 4], [3, 4, 7],
    ];
    let triangles: Vec<Triangle> = faces
        .iter()
        .map(|[a, b, c]| Triangle::new(p[*a], p[*b], p[*c]))
        .collect();
    Mesh::from_triangles(&triangles)
}

/// A small building: two storeys, three walls, a door and a column.
///
/// ```text
/// building
/// ├── level-1
/// │   ├── wall-a   (x 0..4,  3.0 high)
/// │   ├── wall-b   (x 6..10, 2.4 high)
/// │   └── door-1
/// └── level-2
///     ├── wall-c   (x 0..4, z 4..7)
///     └── column-1
/// ```
pub fn building() -> SceneNode {
    let wall = |name: &str, x: f64, z: f64, height: f64| {
        SceneNode::new(name)
            .with_attribute("category", "wall")
            .with_attribute("height", height)
            .with_attribute("material", "Concrete")
            .with_geometry(box_mesh([x, 0.0, z], [x + 4.0, 0.3, z + height]))
    };

    SceneNode::new("building")
        .with_attribute("category", "building")
        .with_child(
            SceneNode::new("level-1")
                .with_attribute("category", "level")
                .with_child(wall("wall-a", 0.0, 0.0, 3.0))
                .with_child(wall("wall-b", 6.0, 0.0, 2.4))
                .with_child(
                    SceneNode::new("door-1")
                        .with_attribute("category", "door")
                        .with_attribute("height", "2.1")
                        .with_attribute("material", "Oak"),
                ),
        )
        .with_child(
            SceneNode::new("level-2")
                .with_attribute("category", "level")
                .with_child(wall("wall-c", 0.0, 4.0, 3.0))
                .with_child(
                    SceneNode::new("column-1")
                        .with_attribute("category", "column")
                        .with_attribute("material", "Steel"),
                ),
        )
}
