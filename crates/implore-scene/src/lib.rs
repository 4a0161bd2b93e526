//! implore-scene - Scene graph collaborator for implore rules
//!
//! This crate provides the pieces of a scene that the rule pipeline reads and
//! writes:
//!
//! - **SceneNode**: shared, identity-keyed hierarchy nodes with an attribute bag
//!   and an optional mesh
//! - **Mesh**: triangle soup / indexed geometry decomposed into faces, edges,
//!   wireframe segments, unique vertices and bounds
//! - **Distance**: closest-point queries between points, segments, triangles
//!   and boxes
//! - **Resolver**: dotted attribute paths with `#{path}` and `!{expr}` templates

pub mod distance;
pub mod geometry;
pub mod node;
pub mod resolve;
pub mod value;
pub mod vector;

pub use distance::*;
pub use geometry::*;
pub use node::*;
pub use resolve::*;
pub use value::*;
pub use vector::Point3;
