//! The mesh generation job contract.

use std::collections::{BTreeMap, BTreeSet};

use image::RgbaImage;
use skelform_ir::Snapshot;
use skelform_math::Color;

use crate::cache::GeneratedCacheContext;
use crate::model::{ModelMesh, MonochromeMesh};
use crate::object::Object;

/// Everything a mesh job needs, owned outright.
#[derive(Debug, Clone)]
pub struct MeshGenerationInput {
    /// Full document snapshot.
    pub snapshot: Snapshot,
    /// Color for parts without one.
    pub default_part_color: Color,
    /// Normal smoothing threshold in degrees; zero means flat shading.
    pub smooth_shading_threshold_degrees: f64,
    /// Merge coincident vertices.
    pub weld_enabled: bool,
}

impl MeshGenerationInput {
    /// Input with default options.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            default_part_color: Color::white(),
            smooth_shading_threshold_degrees: 60.0,
            weld_enabled: true,
        }
    }
}

/// What a mesh job hands back.
#[derive(Debug, Default)]
pub struct MeshGenerationOutput {
    /// False when generation failed; other fields may still hold partial
    /// results.
    pub successful: bool,
    /// Result geometry.
    pub object: Option<Object>,
    /// Renderable result.
    pub result_mesh: Option<ModelMesh>,
    /// Wireframe of the result.
    pub wireframe: Option<MonochromeMesh>,
    /// Preview meshes keyed by component ID.
    pub component_preview_meshes: BTreeMap<String, ModelMesh>,
    /// Preview images keyed by component ID.
    pub component_preview_images: BTreeMap<String, RgbaImage>,
    /// Components whose previews were regenerated this run.
    pub generated_preview_component_ids: BTreeSet<String>,
}

impl MeshGenerationOutput {
    /// An unsuccessful, empty result.
    pub fn failed() -> Self {
        Self::default()
    }
}

/// Turns a snapshot into geometry. Runs on a worker thread.
pub trait MeshGenerator: Send + Sync {
    /// Generate geometry for `input`, reusing and refreshing `cache`.
    fn generate(
        &self,
        input: &MeshGenerationInput,
        cache: &mut GeneratedCacheContext,
    ) -> MeshGenerationOutput;
}
