#![warn(missing_docs)]

//! Mesh generation for skelform skeleton documents.
//!
//! The document never calls into a mesher directly. It hands a fully owned
//! [`MeshGenerationInput`] (a [`Snapshot`](skelform_ir::Snapshot) plus a few
//! options) and the cross-run [`GeneratedCacheContext`] to a
//! [`MeshGenerator`] on a worker thread, and receives a
//! [`MeshGenerationOutput`] back:
//!
//! - the result [`Object`]: raw geometry plus the position → source node
//!   table the rig generator relies on,
//! - a renderable [`ModelMesh`] and a [`MonochromeMesh`] wireframe,
//! - preview meshes and silhouette images for the components whose parts
//!   were dirty.
//!
//! [`SkeletonMeshGenerator`] is the built-in implementation: a low-poly
//! sphere per node and a tube per edge.
//!
//! # Coordinate convention
//!
//! Document coordinates grow downward and away from the viewer. Generated
//! geometry is expressed relative to the canvas origin with Y up, see
//! [`to_mesh_space`].

pub mod cache;
pub mod generator;
pub mod model;
pub mod object;
pub mod preview;
pub mod skeleton;

pub use cache::{part_fingerprint, GeneratedCacheContext};
pub use generator::{MeshGenerationInput, MeshGenerationOutput, MeshGenerator};
pub use model::{next_mesh_id, ModelMesh, MonochromeMesh};
pub use object::{Object, ObjectNode, PartGeometry};
pub use skeleton::SkeletonMeshGenerator;

use skelform_ir::{to_float, value_or_empty, Attributes, Snapshot};
use skelform_math::Point3;

/// Canvas origin recorded in a snapshot (zero when absent).
pub fn canvas_origin(snapshot: &Snapshot) -> Point3 {
    Point3::new(
        to_float(value_or_empty(&snapshot.canvas, "originX")),
        to_float(value_or_empty(&snapshot.canvas, "originY")),
        to_float(value_or_empty(&snapshot.canvas, "originZ")),
    )
}

/// Convert a document-space position into origin-relative mesh space.
pub fn to_mesh_space(position: &Point3, origin: &Point3) -> Point3 {
    Point3::new(
        position.x - origin.x,
        origin.y - position.y,
        origin.z - position.z,
    )
}

/// Mesh-space position of a node record.
pub fn node_mesh_position(node: &Attributes, origin: &Point3) -> Point3 {
    let position = Point3::new(
        to_float(value_or_empty(node, "x")),
        to_float(value_or_empty(node, "y")),
        to_float(value_or_empty(node, "z")),
    );
    to_mesh_space(&position, origin)
}
