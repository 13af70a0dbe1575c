//! Background mesh, texture and bone generation.
//!
//! Each kind runs at most one job at a time on its own worker thread. A
//! job owns copies of everything it reads (a snapshot, and the last mesh
//! object for texture and bone jobs) and sends its output back over a
//! channel; the document applies results when the host calls
//! [`Document::process_generation_events`]. A request that arrives while
//! a job of the same kind is running marks that kind obsolete, and a
//! fresh job starts as soon as the running one is applied.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use image::RgbaImage;
use skelform_mesh::{
    GeneratedCacheContext, MeshGenerationInput, MeshGenerationOutput, MeshGenerator, ModelMesh,
    MonochromeMesh, Object, SkeletonMeshGenerator,
};
use skelform_rig::{BoneGenerationInput, BoneGenerationJob, BoneGenerationOutput};
use skelform_uv::{TextureGenerationInput, TextureGenerationOutput, TextureGenerator, UvMapGenerator};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::Document;
use crate::event::DocumentEvent;

// =========================================================================
// Job bookkeeping
// =========================================================================

/// A generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Skeleton to mesh.
    Mesh,
    /// Mesh to UV map and baked textures.
    Texture,
    /// Mesh and bones to vertex weights.
    Bone,
}

impl JobKind {
    /// Lowercase name, also used for worker thread names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mesh => "mesh",
            Self::Texture => "texture",
            Self::Bone => "bone",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind state: whether a job is in flight, and whether its result
/// will already be stale.
#[derive(Debug, Clone, Copy, Default)]
struct JobState {
    generating: bool,
    obsolete: bool,
}

/// Output of a finished job.
enum JobResult {
    Mesh {
        output: MeshGenerationOutput,
        cache: GeneratedCacheContext,
    },
    Texture(TextureGenerationOutput),
    Bone(BoneGenerationOutput),
}

/// Baked texture images from the last texture job.
#[derive(Debug, Default)]
struct TextureImages {
    color: Option<RgbaImage>,
    normal: Option<RgbaImage>,
    metalness: Option<RgbaImage>,
    roughness: Option<RgbaImage>,
    ambient_occlusion: Option<RgbaImage>,
}

/// Generation state owned by a [`Document`].
pub(crate) struct Pipeline {
    sender: Sender<JobResult>,
    receiver: Receiver<JobResult>,
    mesh_generator: Arc<dyn MeshGenerator>,
    texture_generator: Arc<dyn TextureGenerator>,
    mesh: JobState,
    texture: JobState,
    bone: JobState,
    /// `None` while lent to a running mesh job.
    cache: Option<GeneratedCacheContext>,
    batch_change_ref_count: usize,
    result_mesh: Option<ModelMesh>,
    wireframe_mesh: Option<MonochromeMesh>,
    mesh_generation_succeed: bool,
    current_object: Option<Object>,
    result_texture_mesh: Option<ModelMesh>,
    texture_images: TextureImages,
    texture_image_update_version: u64,
    current_uv_mapped_object: Option<Object>,
    body_bone_preview_mesh: Option<ModelMesh>,
}

impl Pipeline {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            mesh_generator: Arc::new(SkeletonMeshGenerator::default()),
            texture_generator: Arc::new(UvMapGenerator::new()),
            mesh: JobState::default(),
            texture: JobState::default(),
            bone: JobState::default(),
            cache: Some(GeneratedCacheContext::new()),
            batch_change_ref_count: 0,
            result_mesh: None,
            wireframe_mesh: None,
            mesh_generation_succeed: false,
            current_object: None,
            result_texture_mesh: None,
            texture_images: TextureImages::default(),
            texture_image_update_version: 0,
            current_uv_mapped_object: None,
            body_bone_preview_mesh: None,
        }
    }

    fn state_mut(&mut self, kind: JobKind) -> &mut JobState {
        match kind {
            JobKind::Mesh => &mut self.mesh,
            JobKind::Texture => &mut self.texture,
            JobKind::Bone => &mut self.bone,
        }
    }

    fn state(&self, kind: JobKind) -> JobState {
        match kind {
            JobKind::Mesh => self.mesh,
            JobKind::Texture => self.texture,
            JobKind::Bone => self.bone,
        }
    }

    fn any_generating(&self) -> bool {
        self.mesh.generating || self.texture.generating || self.bone.generating
    }
}

/// Run `work` on a named worker thread and send what it returns. A panic
/// or a failed spawn sends `fallback()` instead.
fn spawn_job<W>(kind: JobKind, sender: Sender<JobResult>, work: W, fallback: fn() -> JobResult)
where
    W: FnOnce() -> JobResult + Send + 'static,
{
    let worker_sender = sender.clone();
    let spawned = thread::Builder::new()
        .name(format!("skelform-{kind}"))
        .spawn(move || {
            let result = match panic::catch_unwind(AssertUnwindSafe(work)) {
                Ok(result) => result,
                Err(_) => {
                    warn!(%kind, "generator panicked");
                    fallback()
                }
            };
            // The receiver only goes away with the document.
            let _ = worker_sender.send(result);
        });
    if let Err(err) = spawned {
        warn!(%kind, error = %err, "failed to start worker");
        let _ = sender.send(fallback());
    }
}

impl Document {
    // =====================================================================
    // Requests
    // =====================================================================

    /// Generate the mesh from the whole document.
    ///
    /// Deferred while a batch change is open or a mesh job is running.
    /// Settles an unsettled origin first. Capturing the snapshot clears
    /// every dirty flag.
    pub fn generate_mesh(&mut self) {
        if self.pipeline.mesh.generating || self.pipeline.batch_change_ref_count > 0 {
            self.pipeline.mesh.obsolete = true;
            return;
        }
        self.settle_origin();
        let Some(mut cache) = self.pipeline.cache.take() else {
            self.pipeline.mesh.obsolete = true;
            return;
        };
        self.pipeline.mesh.obsolete = false;

        let snapshot = self.to_snapshot();
        self.reset_dirty_flags();
        let input = MeshGenerationInput {
            snapshot,
            default_part_color: self.config.default_part_color,
            smooth_shading_threshold_degrees: if self.config.smooth_normal {
                self.config.smooth_shading_threshold_degrees
            } else {
                0.0
            },
            weld_enabled: self.config.weld_enabled,
        };
        let generator = Arc::clone(&self.pipeline.mesh_generator);
        self.pipeline.mesh.generating = true;
        info!(nodes = input.snapshot.nodes.len(), "mesh generation started");
        spawn_job(
            JobKind::Mesh,
            self.pipeline.sender.clone(),
            move || {
                let output = match panic::catch_unwind(AssertUnwindSafe(|| {
                    generator.generate(&input, &mut cache)
                })) {
                    Ok(output) => output,
                    Err(_) => {
                        warn!("mesh generator panicked");
                        cache.clear();
                        MeshGenerationOutput::failed()
                    }
                };
                JobResult::Mesh { output, cache }
            },
            || JobResult::Mesh {
                output: MeshGenerationOutput::failed(),
                cache: GeneratedCacheContext::new(),
            },
        );
        self.emit(DocumentEvent::MeshGenerating);
    }

    /// Bake textures for the last generated mesh. Does nothing before a
    /// mesh exists.
    pub fn generate_texture(&mut self) {
        if self.pipeline.texture.generating {
            self.pipeline.texture.obsolete = true;
            return;
        }
        self.pipeline.texture.obsolete = false;
        let Some(object) = self.pipeline.current_object.clone() else {
            debug!("no mesh to texture");
            return;
        };
        let input = TextureGenerationInput {
            object,
            snapshot: self.to_snapshot(),
            texture_size: self.config.texture_size,
        };
        let generator = Arc::clone(&self.pipeline.texture_generator);
        self.pipeline.texture.generating = true;
        info!(size = input.texture_size, "texture generation started");
        spawn_job(
            JobKind::Texture,
            self.pipeline.sender.clone(),
            move || JobResult::Texture(generator.generate(&input)),
            || JobResult::Texture(TextureGenerationOutput::default()),
        );
        self.emit(DocumentEvent::TextureGenerating);
    }

    /// Weight the last generated mesh's vertices to bones. Does nothing
    /// before a mesh exists.
    pub fn generate_bone(&mut self) {
        if self.pipeline.bone.generating {
            self.pipeline.bone.obsolete = true;
            return;
        }
        self.pipeline.bone.obsolete = false;
        let Some(object) = self.pipeline.current_object.clone() else {
            debug!("no mesh to rig");
            return;
        };
        let input = BoneGenerationInput {
            object,
            snapshot: self.to_snapshot(),
        };
        self.pipeline.bone.generating = true;
        info!(bones = input.snapshot.bone_id_list.len(), "bone generation started");
        spawn_job(
            JobKind::Bone,
            self.pipeline.sender.clone(),
            move || JobResult::Bone(BoneGenerationJob::run(&input)),
            || JobResult::Bone(BoneGenerationOutput::default()),
        );
        self.emit(DocumentEvent::BoneGenerating);
    }

    /// Mark every part dirty and generate the mesh.
    pub fn regenerate_mesh(&mut self) {
        self.mark_all_dirty();
        self.generate_mesh();
    }

    /// Flip normal smoothing and regenerate.
    pub fn toggle_smooth_normal(&mut self) {
        self.config.smooth_normal = !self.config.smooth_normal;
        self.regenerate_mesh();
    }

    /// Turn vertex welding on or off and regenerate.
    pub fn enable_weld(&mut self, enabled: bool) {
        if self.config.weld_enabled == enabled {
            return;
        }
        self.config.weld_enabled = enabled;
        self.regenerate_mesh();
    }

    /// Open a batch change; mesh requests wait for the outermost
    /// [`batch_change_end`](Self::batch_change_end).
    pub fn batch_change_begin(&mut self) {
        self.pipeline.batch_change_ref_count += 1;
    }

    /// Close a batch change. Closing the outermost one generates the mesh
    /// once if it was requested meanwhile.
    pub fn batch_change_end(&mut self) {
        if self.pipeline.batch_change_ref_count == 0 {
            return;
        }
        self.pipeline.batch_change_ref_count -= 1;
        if self.pipeline.batch_change_ref_count == 0 && self.pipeline.mesh.obsolete {
            self.generate_mesh();
        }
    }

    /// Replace the mesh generator used by later jobs.
    pub fn set_mesh_generator(&mut self, generator: Arc<dyn MeshGenerator>) {
        self.pipeline.mesh_generator = generator;
    }

    /// Replace the texture generator used by later jobs.
    pub fn set_texture_generator(&mut self, generator: Arc<dyn TextureGenerator>) {
        self.pipeline.texture_generator = generator;
    }

    // =====================================================================
    // Completion
    // =====================================================================

    /// Apply every finished job without blocking. Returns how many were
    /// applied.
    pub fn process_generation_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(result) = self.pipeline.receiver.try_recv() {
            self.apply_job_result(result);
            applied += 1;
        }
        applied
    }

    /// Apply finished jobs until [`is_export_ready`](Self::is_export_ready)
    /// holds or `timeout` passes. Returns false on timeout, or when nothing
    /// is running but a deferred request is still pending.
    pub fn wait_until_export_ready(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_generation_events();
            if self.is_export_ready() {
                return true;
            }
            if !self.pipeline.any_generating() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            match self.pipeline.receiver.recv_timeout(deadline - now) {
                Ok(result) => self.apply_job_result(result),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => return self.is_export_ready(),
            }
        }
    }

    /// Nothing is generating and no request is pending.
    pub fn is_export_ready(&self) -> bool {
        [JobKind::Mesh, JobKind::Texture, JobKind::Bone]
            .iter()
            .all(|kind| {
                let state = self.pipeline.state(*kind);
                !state.generating && !state.obsolete
            })
    }

    /// Emit [`DocumentEvent::ExportReady`] if export is ready.
    pub fn check_export_ready(&mut self) {
        if self.is_export_ready() {
            self.emit(DocumentEvent::ExportReady);
        }
    }

    fn apply_job_result(&mut self, result: JobResult) {
        let kind = match result {
            JobResult::Mesh { output, cache } => {
                self.pipeline.cache = Some(cache);
                self.mesh_ready(output);
                JobKind::Mesh
            }
            JobResult::Texture(output) => {
                self.texture_ready(output);
                JobKind::Texture
            }
            JobResult::Bone(output) => {
                self.bone_ready(output);
                JobKind::Bone
            }
        };
        self.pipeline.state_mut(kind).generating = false;

        if self.pipeline.state(kind).obsolete {
            debug!(%kind, "result obsolete, regenerating");
            match kind {
                JobKind::Mesh => self.generate_mesh(),
                JobKind::Texture => self.generate_texture(),
                JobKind::Bone => self.generate_bone(),
            }
        } else if kind == JobKind::Mesh && self.config.chain_after_mesh {
            self.generate_texture();
            self.generate_bone();
        }
        self.check_export_ready();
    }

    fn mesh_ready(&mut self, output: MeshGenerationOutput) {
        let MeshGenerationOutput {
            successful,
            object,
            result_mesh,
            wireframe,
            mut component_preview_meshes,
            mut component_preview_images,
            generated_preview_component_ids,
        } = output;

        if successful {
            info!(
                vertices = result_mesh.as_ref().map_or(0, ModelMesh::num_vertices),
                "mesh generation finished"
            );
        } else {
            warn!("mesh generation failed");
        }
        self.pipeline.mesh_generation_succeed = successful;
        self.pipeline.result_mesh = result_mesh;
        self.pipeline.wireframe_mesh = wireframe;
        self.pipeline.current_object = object;

        for id in &generated_preview_component_ids {
            let Ok(component_id) = Uuid::parse_str(id) else {
                continue;
            };
            let Some(component) = self.components.get_mut(&component_id) else {
                continue;
            };
            if let Some(mesh) = component_preview_meshes.remove(id) {
                component.update_preview_mesh(mesh);
            }
            if let Some(image) = component_preview_images.remove(id) {
                component.preview_image = Some(image);
            }
            self.emit(DocumentEvent::ComponentPreviewChanged(component_id));
        }
        self.emit(DocumentEvent::ResultComponentPreviewMeshesChanged);
        self.emit(DocumentEvent::ResultMeshChanged);
    }

    fn texture_ready(&mut self, output: TextureGenerationOutput) {
        let pipeline = &mut self.pipeline;
        pipeline.texture_images = TextureImages {
            color: output.color_image,
            normal: output.normal_image,
            metalness: output.metalness_image,
            roughness: output.roughness_image,
            ambient_occlusion: output.ambient_occlusion_image,
        };
        pipeline.result_texture_mesh = output.result_texture_mesh;
        if let Some(object) = output.object {
            pipeline.current_uv_mapped_object = Some(object);
        }
        pipeline.texture_image_update_version += 1;
        debug!(version = pipeline.texture_image_update_version, "texture generation finished");
        self.emit(DocumentEvent::ResultTextureChanged);
    }

    fn bone_ready(&mut self, output: BoneGenerationOutput) {
        let BoneGenerationOutput {
            mut bone_preview_meshes,
            body_preview_mesh,
            mut bone_vertex_weights,
            vertex_source_nodes,
        } = output;
        debug!(
            resolved = vertex_source_nodes.iter().filter(|n| n.is_some()).count(),
            vertices = vertex_source_nodes.len(),
            "bone generation finished"
        );

        let mut previewed = Vec::new();
        for bone in self.bones.values_mut() {
            let key = bone.id.to_string();
            bone.vertex_weights = bone_vertex_weights.remove(&key).unwrap_or_default();
            bone.preview_mesh = bone_preview_meshes.remove(&key);
            if bone.preview_mesh.is_some() {
                previewed.push(bone.id);
            }
        }
        self.pipeline.body_bone_preview_mesh = body_preview_mesh;
        for bone_id in previewed {
            self.emit(DocumentEvent::BonePreviewChanged(bone_id));
        }
        self.emit(DocumentEvent::ResultBonePreviewMeshesChanged);
        self.emit(DocumentEvent::ResultBodyBonePreviewMeshChanged);
        self.emit(DocumentEvent::ResultBoneChanged);
    }

    // =====================================================================
    // Results
    // =====================================================================

    /// A mesh job is running.
    pub fn is_mesh_generating(&self) -> bool {
        self.pipeline.mesh.generating
    }

    /// A texture job is running.
    pub fn is_texture_generating(&self) -> bool {
        self.pipeline.texture.generating
    }

    /// A bone job is running.
    pub fn is_bone_generating(&self) -> bool {
        self.pipeline.bone.generating
    }

    /// Whether the last mesh job succeeded.
    pub fn is_mesh_generation_succeed(&self) -> bool {
        self.pipeline.mesh_generation_succeed
    }

    /// Copy of the last result mesh.
    pub fn take_result_mesh(&self) -> Option<ModelMesh> {
        self.pipeline.result_mesh.clone()
    }

    /// ID of the last result mesh.
    pub fn result_mesh_id(&self) -> Option<u64> {
        self.pipeline.result_mesh.as_ref().map(|mesh| mesh.id)
    }

    /// Copy of the last wireframe.
    pub fn take_wireframe_mesh(&self) -> Option<MonochromeMesh> {
        self.pipeline.wireframe_mesh.clone()
    }

    /// Copy of the last UV-mapped mesh.
    pub fn take_result_texture_mesh(&self) -> Option<ModelMesh> {
        self.pipeline.result_texture_mesh.clone()
    }

    /// ID of the last UV-mapped mesh.
    pub fn result_texture_mesh_id(&self) -> Option<u64> {
        self.pipeline.result_texture_mesh.as_ref().map(|mesh| mesh.id)
    }

    /// Copy of the last whole-body bone preview.
    pub fn take_result_body_bone_preview_mesh(&self) -> Option<ModelMesh> {
        self.pipeline.body_bone_preview_mesh.clone()
    }

    /// ID of the last whole-body bone preview.
    pub fn result_body_bone_preview_mesh_id(&self) -> Option<u64> {
        self.pipeline.body_bone_preview_mesh.as_ref().map(|mesh| mesh.id)
    }

    /// Baked color texture.
    pub fn texture_color_image(&self) -> Option<&RgbaImage> {
        self.pipeline.texture_images.color.as_ref()
    }

    /// Baked normal map.
    pub fn texture_normal_image(&self) -> Option<&RgbaImage> {
        self.pipeline.texture_images.normal.as_ref()
    }

    /// Baked metalness map.
    pub fn texture_metalness_image(&self) -> Option<&RgbaImage> {
        self.pipeline.texture_images.metalness.as_ref()
    }

    /// Baked roughness map.
    pub fn texture_roughness_image(&self) -> Option<&RgbaImage> {
        self.pipeline.texture_images.roughness.as_ref()
    }

    /// Baked ambient occlusion map.
    pub fn texture_ambient_occlusion_image(&self) -> Option<&RgbaImage> {
        self.pipeline.texture_images.ambient_occlusion.as_ref()
    }

    /// Bumped whenever the texture images are replaced.
    pub fn result_texture_image_update_version(&self) -> u64 {
        self.pipeline.texture_image_update_version
    }

    /// Geometry of the last mesh result.
    pub fn current_object(&self) -> Option<&Object> {
        self.pipeline.current_object.as_ref()
    }

    /// UV-mapped geometry of the last texture result.
    pub fn current_uv_mapped_object(&self) -> Option<&Object> {
        self.pipeline.current_uv_mapped_object.as_ref()
    }

    /// The mesh cache, unless a mesh job has borrowed it.
    pub fn generated_cache_context(&self) -> Option<&GeneratedCacheContext> {
        self.pipeline.cache.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentConfig;
    use approx::relative_eq;
    use skelform_math::Point3;

    const WAIT: Duration = Duration::from_secs(30);

    fn count(events: &[DocumentEvent], wanted: &DocumentEvent) -> usize {
        events.iter().filter(|event| *event == wanted).count()
    }

    /// Two nodes two units apart joined by one edge, one bone over both.
    fn capsule(doc: &mut Document) -> (Uuid, Uuid, Uuid) {
        doc.disable_all_position_related_locks();
        let a = doc.add_node(Point3::new(0.0, 0.0, 0.0), 1.0, None).unwrap();
        let b = doc.add_node(Point3::new(2.0, 0.0, 0.0), 1.0, Some(a)).unwrap();
        let bone = Uuid::new_v4();
        doc.add_bone(bone);
        doc.apply_bone_joints(bone, &[a, b]);
        doc.add_nodes_to_bone(bone, &[a, b]);
        (a, b, bone)
    }

    struct PanickingGenerator;

    impl MeshGenerator for PanickingGenerator {
        fn generate(
            &self,
            _input: &MeshGenerationInput,
            _cache: &mut GeneratedCacheContext,
        ) -> MeshGenerationOutput {
            panic!("kernel blew up");
        }
    }

    struct ObjectlessTextureGenerator;

    impl TextureGenerator for ObjectlessTextureGenerator {
        fn generate(&self, _input: &TextureGenerationInput) -> TextureGenerationOutput {
            TextureGenerationOutput::default()
        }
    }

    #[test]
    fn test_capsule_runs_mesh_texture_and_bone() {
        let mut doc = Document::new();
        let (a, b, bone) = capsule(&mut doc);
        let snapshot = doc.to_snapshot();
        assert_eq!(snapshot.parts.len(), 1);
        assert_eq!(snapshot.edges.len(), 1);
        assert_eq!(snapshot.components.len(), 1);
        let edge = snapshot.edges.values().next().unwrap();
        assert_eq!(edge["from"], a.to_string());
        assert_eq!(edge["to"], b.to_string());

        doc.generate_mesh();
        assert!(doc.is_mesh_generating());
        assert!(!doc.is_export_ready());
        assert!(doc.wait_until_export_ready(WAIT));

        assert!(doc.is_mesh_generation_succeed());
        assert!(doc.take_result_mesh().is_some_and(|mesh| mesh.num_vertices() > 0));
        assert!(doc.texture_color_image().is_some());
        assert_eq!(doc.result_texture_image_update_version(), 1);
        assert!(doc.take_result_body_bone_preview_mesh().is_some());

        let weights = &doc.find_bone(bone).unwrap().vertex_weights;
        assert_eq!(weights.len(), 2);
        assert!(!weights[0].is_empty());
        assert!(weights[1].is_empty());
        assert!(weights[0].iter().all(|w| relative_eq!(w.weight, 1.0)));

        let events = doc.drain_events();
        assert_eq!(count(&events, &DocumentEvent::ResultMeshChanged), 1);
        assert_eq!(count(&events, &DocumentEvent::ResultTextureChanged), 1);
        assert_eq!(count(&events, &DocumentEvent::ResultBoneChanged), 1);
        assert_eq!(events.last(), Some(&DocumentEvent::ExportReady));
        assert!(doc.parts().values().all(|part| !part.dirty));
    }

    #[test]
    fn test_request_during_job_reruns_once() {
        let mut doc = Document::new();
        capsule(&mut doc);
        doc.generate_mesh();
        doc.generate_mesh();
        doc.generate_mesh();
        assert!(!doc.is_export_ready());
        assert!(doc.wait_until_export_ready(WAIT));

        let events = doc.drain_events();
        assert_eq!(count(&events, &DocumentEvent::MeshGenerating), 2);
        assert_eq!(count(&events, &DocumentEvent::ResultMeshChanged), 2);
        assert_eq!(count(&events, &DocumentEvent::TextureGenerating), 1);
        assert!(doc.generated_cache_context().is_some());
    }

    #[test]
    fn test_batch_coalesces_requests() {
        let mut doc = Document::new();
        capsule(&mut doc);
        doc.drain_events();

        doc.batch_change_begin();
        doc.batch_change_begin();
        doc.generate_mesh();
        doc.regenerate_mesh();
        doc.batch_change_end();
        assert!(!doc.is_mesh_generating());
        doc.batch_change_end();
        assert!(doc.is_mesh_generating());
        assert!(doc.wait_until_export_ready(WAIT));

        let events = doc.drain_events();
        assert_eq!(count(&events, &DocumentEvent::MeshGenerating), 1);
    }

    #[test]
    fn test_texture_and_bone_need_a_mesh() {
        let mut doc = Document::new();
        capsule(&mut doc);
        doc.drain_events();
        doc.generate_texture();
        doc.generate_bone();
        assert!(!doc.is_texture_generating());
        assert!(!doc.is_bone_generating());
        assert!(doc.is_export_ready());
        assert!(doc.drain_events().is_empty());
    }

    #[test]
    fn test_panicking_generator_reports_failure() {
        let mut doc = Document::new();
        capsule(&mut doc);
        doc.set_mesh_generator(Arc::new(PanickingGenerator));
        doc.generate_mesh();
        assert!(doc.wait_until_export_ready(WAIT));

        assert!(!doc.is_mesh_generation_succeed());
        assert!(doc.take_result_mesh().is_none());
        assert!(doc.current_object().is_none());
        assert!(doc.generated_cache_context().is_some());
        assert!(!doc.is_mesh_generating());
    }

    #[test]
    fn test_generate_mesh_settles_origin() {
        let mut doc = Document::new();
        doc.disable_all_position_related_locks();
        let a = doc.add_node(Point3::new(0.2, 0.4, 0.6), 0.1, None).unwrap();
        doc.add_node(Point3::new(0.4, 0.6, 0.8), 0.1, Some(a)).unwrap();
        assert!(!doc.origin_settled());

        doc.generate_mesh();

        assert!(doc.origin_settled());
        let origin = doc.origin();
        assert!(relative_eq!(origin.x, 0.3, epsilon = 1e-9));
        assert!(relative_eq!(origin.y, 0.5, epsilon = 1e-9));
        assert!(relative_eq!(origin.z, 0.7, epsilon = 1e-9));
        assert!(doc.drain_events().contains(&DocumentEvent::OriginChanged));
        assert!(doc.wait_until_export_ready(WAIT));
        assert!(doc.parts().values().all(|part| !part.dirty));
    }

    #[test]
    fn test_failed_texture_keeps_last_uv_mapped_object() {
        let mut doc = Document::new();
        capsule(&mut doc);
        doc.generate_mesh();
        assert!(doc.wait_until_export_ready(WAIT));
        assert!(doc.current_uv_mapped_object().is_some());

        doc.set_texture_generator(Arc::new(ObjectlessTextureGenerator));
        doc.generate_texture();
        assert!(doc.wait_until_export_ready(WAIT));

        assert_eq!(doc.result_texture_image_update_version(), 2);
        assert!(doc.current_uv_mapped_object().is_some());
    }

    #[test]
    fn test_auto_generate_follows_skeleton_changes() {
        let config = DocumentConfig {
            auto_generate: true,
            ..DocumentConfig::default()
        };
        let mut doc = Document::with_config(config);
        doc.add_node(Point3::new(0.5, 0.5, 0.5), 0.1, None);
        assert!(doc.is_mesh_generating());
        assert!(doc.wait_until_export_ready(WAIT));
        assert!(doc.take_result_mesh().is_some());
    }

    #[test]
    fn test_job_kind_names() {
        assert_eq!(JobKind::Mesh.to_string(), "mesh");
        assert_eq!(JobKind::Texture.as_str(), "texture");
        assert_eq!(format!("skelform-{}", JobKind::Bone), "skelform-bone");
    }
}
