#![warn(missing_docs)]

//! Skin rigging for skelform generated meshes.
//!
//! Given generated geometry and the skeleton's bones, [`BoneGenerator`]:
//!
//! 1. builds vertex adjacency from the triangles,
//! 2. resolves each vertex to the skeleton node it came from, by exact
//!    position or, failing that, by breadth-first search to the nearest
//!    resolved neighbour,
//! 3. groups vertices by the bones their source nodes are bound to,
//! 4. records joint positions and segment directions per bone,
//! 5. assigns each bone's vertices to one joint segment with weight 1.0,
//! 6. builds colorized per-bone and whole-body preview meshes.
//!
//! [`BoneGenerationJob`] adapts a snapshot and an [`Object`](skelform_mesh::Object)
//! to the generator and converts its previews to renderable meshes.

pub mod generator;
pub mod job;

pub use generator::{Bone, BoneGenerator, BonePreview, NodeBinding, VertexWeight, BONE_PALETTE};
pub use job::{BoneGenerationInput, BoneGenerationJob, BoneGenerationOutput};
