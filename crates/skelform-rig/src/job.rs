//! Running the bone generator against a snapshot.

use std::collections::{BTreeMap, BTreeSet};

use skelform_ir::{split_list, to_int, value_or_empty, Snapshot};
use skelform_mesh::{canvas_origin, node_mesh_position, ModelMesh, Object};
use tracing::debug;

use crate::generator::{Bone, BoneGenerator, BonePreview, NodeBinding, VertexWeight};

/// Everything a bone job needs, owned outright.
#[derive(Debug, Clone)]
pub struct BoneGenerationInput {
    /// Result of the last mesh generation.
    pub object: Object,
    /// Snapshot carrying bones, joints and node bindings.
    pub snapshot: Snapshot,
}

/// What a bone job hands back.
#[derive(Debug, Default)]
pub struct BoneGenerationOutput {
    /// Colorized preview per bone.
    pub bone_preview_meshes: BTreeMap<String, ModelMesh>,
    /// Whole-body preview colored by bone influence.
    pub body_preview_mesh: Option<ModelMesh>,
    /// Per-joint vertex weights per bone.
    pub bone_vertex_weights: BTreeMap<String, Vec<Vec<VertexWeight>>>,
    /// Source node of each object vertex.
    pub vertex_source_nodes: Vec<Option<String>>,
}

impl BoneGenerationOutput {
    /// Number of vertices that resolved to a skeleton node.
    pub fn resolved_vertex_count(&self) -> usize {
        self.vertex_source_nodes.iter().filter(|s| s.is_some()).count()
    }
}

/// Feeds a [`BoneGenerator`] from an object and snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoneGenerationJob;

impl BoneGenerationJob {
    /// Run the generator. Bones are indexed in `bone_id_list` order.
    pub fn run(input: &BoneGenerationInput) -> BoneGenerationOutput {
        let snapshot = &input.snapshot;
        let origin = canvas_origin(snapshot);

        let mut generator = BoneGenerator::new();
        generator.set_vertices(input.object.vertices.clone());
        generator.set_triangles(input.object.triangles.clone());
        generator.set_position_to_node_map(input.object.position_to_node.clone());

        for bone_id in &snapshot.bone_id_list {
            let Some(record) = snapshot.bones.get(bone_id) else {
                debug!(bone_id = %bone_id, "bone listed but not present");
                continue;
            };
            let attach = value_or_empty(record, "attachBoneId");
            let bone = Bone {
                attach_bone_id: (!attach.is_empty()).then(|| attach.to_string()),
                attach_bone_joint_index: to_int(value_or_empty(record, "attachBoneJointIndex"))
                    .max(0) as usize,
                ..Bone::new(
                    split_list(value_or_empty(record, "jointNodeIdList"))
                        .map(str::to_string)
                        .collect(),
                )
            };
            generator.add_bone(bone_id, bone);
        }

        for (node_id, node) in &snapshot.nodes {
            generator.add_node(node_id, node_mesh_position(node, &origin));
            let bone_ids: BTreeSet<String> =
                split_list(value_or_empty(node, "boneIdList"))
                    .map(str::to_string)
                    .collect();
            if !bone_ids.is_empty() {
                generator.add_node_binding(node_id, NodeBinding { bone_ids });
            }
        }

        generator.generate();

        let bone_vertex_weights = generator
            .bones()
            .iter()
            .map(|(id, bone)| (id.clone(), bone.vertex_weights.clone()))
            .collect();
        let vertex_source_nodes = generator.vertex_source_nodes().to_vec();
        let bone_preview_meshes = generator
            .take_bone_previews()
            .into_iter()
            .map(|(id, preview)| (id, to_model_mesh(&preview)))
            .collect();
        let body_preview_mesh = Some(to_model_mesh(&generator.take_body_preview()));

        BoneGenerationOutput {
            bone_preview_meshes,
            body_preview_mesh,
            bone_vertex_weights,
            vertex_source_nodes,
        }
    }
}

fn to_model_mesh(preview: &BonePreview) -> ModelMesh {
    ModelMesh::from_vertex_colors(&preview.vertices, &preview.triangles, &preview.vertex_colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skelform_ir::Attributes;
    use skelform_mesh::{
        GeneratedCacheContext, MeshGenerationInput, MeshGenerator, SkeletonMeshGenerator,
    };

    fn record(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Nodes A(0,0,0,r=1) and B(2,0,0,r=1), one edge, one bone over [A, B].
    fn capsule() -> Snapshot {
        let mut s = Snapshot::new();
        s.nodes.insert(
            "A".into(),
            record(&[
                ("id", "A"), ("x", "0"), ("y", "0"), ("z", "0"), ("radius", "1"),
                ("partId", "p"), ("boneIdList", "bone"),
            ]),
        );
        s.nodes.insert(
            "B".into(),
            record(&[
                ("id", "B"), ("x", "2"), ("y", "0"), ("z", "0"), ("radius", "1"),
                ("partId", "p"), ("boneIdList", "bone"),
            ]),
        );
        s.edges.insert(
            "e".into(),
            record(&[("id", "e"), ("from", "A"), ("to", "B"), ("partId", "p")]),
        );
        s.parts.insert("p".into(), record(&[("id", "p"), ("__dirty", "true")]));
        s.components.insert(
            "c".into(),
            record(&[("id", "c"), ("linkData", "p"), ("linkDataType", "partId")]),
        );
        s.root_component.insert("children".into(), "c".into());
        s.bones.insert(
            "bone".into(),
            record(&[("id", "bone"), ("jointNodeIdList", "A,B")]),
        );
        s.bone_id_list.push("bone".into());
        s
    }

    fn object_for(snapshot: &Snapshot) -> Object {
        let mut cache = GeneratedCacheContext::new();
        SkeletonMeshGenerator::default()
            .generate(&MeshGenerationInput::new(snapshot.clone()), &mut cache)
            .object
            .unwrap()
    }

    #[test]
    fn test_capsule_assigns_everything_to_first_segment() {
        let snapshot = capsule();
        let object = object_for(&snapshot);
        let vertex_count = object.num_vertices();
        let output = BoneGenerationJob::run(&BoneGenerationInput { object, snapshot });

        assert_eq!(output.resolved_vertex_count(), vertex_count);
        let weights = &output.bone_vertex_weights["bone"];
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].len(), vertex_count);
        assert!(weights[1].is_empty());

        assert!(output.bone_preview_meshes.contains_key("bone"));
        let body = output.body_preview_mesh.unwrap();
        assert!(body.colors.iter().all(|c| c.a > 0.0));
    }

    #[test]
    fn test_unbound_nodes_produce_no_weights() {
        let mut snapshot = capsule();
        for node in snapshot.nodes.values_mut() {
            node.remove("boneIdList");
        }
        let object = object_for(&snapshot);
        let output = BoneGenerationJob::run(&BoneGenerationInput { object, snapshot });
        assert!(output.bone_vertex_weights["bone"].is_empty());
        assert!(output.bone_preview_meshes.is_empty());
        let body = output.body_preview_mesh.unwrap();
        assert!(body.colors.iter().all(|c| c.a == 0.0));
    }

    #[test]
    fn test_missing_listed_bone_is_skipped() {
        let mut snapshot = capsule();
        snapshot.bone_id_list.insert(0, "ghost".into());
        let object = object_for(&snapshot);
        let output = BoneGenerationJob::run(&BoneGenerationInput { object, snapshot });
        assert!(!output.bone_vertex_weights.contains_key("ghost"));
        assert_eq!(output.bone_vertex_weights["bone"].len(), 2);
    }
}
