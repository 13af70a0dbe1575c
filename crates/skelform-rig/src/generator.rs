//! Vertex source resolution and per-bone weighting.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use skelform_math::{normalized_or_zero, Color, Point3, PositionKey, Vec3};
use tracing::debug;

/// Debug palette, cycled by bone index.
pub const BONE_PALETTE: [Color; 7] = [
    Color::rgb(1.0, 0.0, 0.0),
    Color::rgb(1.0, 128.0 / 255.0, 216.0 / 64.0),
    Color::rgb(1.0, 1.0, 0.0),
    Color::rgb(0.0, 1.0, 0.0),
    Color::rgb(0.0, 128.0 / 255.0, 1.0),
    Color::rgb(0.0, 0.0, 44.0 / 128.0),
    Color::rgb(128.0 / 255.0, 0.0, 128.0 / 255.0),
];

/// One vertex's influence on a joint segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexWeight {
    /// Vertex index into the generator's vertices.
    pub vertex: usize,
    /// Influence; currently always `1.0`.
    pub weight: f64,
}

/// A bone as the generator sees it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bone {
    /// Joint node IDs in chain order.
    pub joints: Vec<String>,
    /// Parent bone, if attached.
    pub attach_bone_id: Option<String>,
    /// Joint of the parent bone this bone hangs from.
    pub attach_bone_joint_index: usize,
    /// Insertion order; selects the preview color.
    pub index: usize,
    /// Position of each joint.
    pub start_positions: Vec<Point3>,
    /// `start_positions[i + 1] - start_positions[i]`; the last entry is zero.
    pub forward_vectors: Vec<Vec3>,
    /// Vertices assigned to each segment, indexed by joint.
    pub vertex_weights: Vec<Vec<VertexWeight>>,
}

impl Bone {
    /// A bone over the given joints.
    pub fn new(joints: Vec<String>) -> Self {
        Self {
            joints,
            ..Self::default()
        }
    }
}

/// The bones a node's vertices contribute to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeBinding {
    /// Bone IDs.
    pub bone_ids: BTreeSet<String>,
}

/// A colorized mesh for rig previews.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BonePreview {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangles indexing `vertices`.
    pub triangles: Vec<[usize; 3]>,
    /// Color per vertex.
    pub vertex_colors: Vec<Color>,
}

/// Assigns mesh vertices to bones.
///
/// Feed it the mesh, the position → node table from mesh generation, the
/// bones, joint node positions and node bindings, then call
/// [`generate`](Self::generate). Missing nodes, bones or bindings only
/// affect the element that references them.
#[derive(Debug, Default)]
pub struct BoneGenerator {
    vertices: Vec<Point3>,
    triangles: Vec<[usize; 3]>,
    position_to_node: BTreeMap<PositionKey, String>,
    bones: BTreeMap<String, Bone>,
    nodes: BTreeMap<String, Point3>,
    node_bindings: BTreeMap<String, NodeBinding>,

    edges: Vec<BTreeSet<usize>>,
    vertex_source_nodes: Vec<Option<String>>,
    bone_vertices: BTreeMap<String, BTreeSet<usize>>,
    bone_previews: BTreeMap<String, BonePreview>,
    body_preview: BonePreview,
}

impl BoneGenerator {
    /// Create an empty generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mesh vertices.
    pub fn set_vertices(&mut self, vertices: Vec<Point3>) {
        self.vertices = vertices;
    }

    /// Mesh triangles.
    pub fn set_triangles(&mut self, triangles: Vec<[usize; 3]>) {
        self.triangles = triangles;
    }

    /// Exact vertex positions that were generated from a node.
    pub fn set_position_to_node_map(&mut self, map: BTreeMap<PositionKey, String>) {
        self.position_to_node = map;
    }

    /// Add a bone; its index is the number of bones added before it.
    pub fn add_bone(&mut self, bone_id: &str, bone: Bone) {
        let index = self.bones.len();
        self.bones
            .insert(bone_id.to_string(), Bone { index, ..bone });
    }

    /// Record a joint node's position.
    pub fn add_node(&mut self, node_id: &str, position: Point3) {
        self.nodes.insert(node_id.to_string(), position);
    }

    /// Record which bones a node belongs to.
    pub fn add_node_binding(&mut self, node_id: &str, binding: NodeBinding) {
        self.node_bindings.insert(node_id.to_string(), binding);
    }

    /// Run every stage in order.
    pub fn generate(&mut self) {
        self.build_edges();
        self.resolve_vertex_sources();
        self.group_bone_vertices();
        self.build_bone_joints();
        self.calculate_bone_vertex_weights();
        self.generate_bone_previews();
    }

    // =========================================================================
    // Stages
    // =========================================================================

    fn build_edges(&mut self) {
        let count = self.vertices.len();
        self.triangles
            .retain(|t| t.iter().all(|&v| v < count));
        self.edges = vec![BTreeSet::new(); count];
        for triangle in &self.triangles {
            for i in 0..3 {
                let (a, b) = (triangle[i], triangle[(i + 1) % 3]);
                self.edges[a].insert(b);
                self.edges[b].insert(a);
            }
        }
    }

    fn resolve_vertex_sources(&mut self) {
        self.vertex_source_nodes = self
            .vertices
            .iter()
            .map(|v| self.position_to_node.get(&PositionKey::from(v)).cloned())
            .collect();

        for i in 0..self.vertex_source_nodes.len() {
            if self.vertex_source_nodes[i].is_some() {
                continue;
            }
            self.vertex_source_nodes[i] = self.resolve_by_breadth_first_search(i);
        }
    }

    /// Nearest (in hops) resolved vertex reachable from `start`.
    fn resolve_by_breadth_first_search(&self, start: usize) -> Option<String> {
        let mut visited = vec![false; self.vertices.len()];
        let mut queue = VecDeque::from([start]);
        visited[start] = true;
        while let Some(vertex) = queue.pop_front() {
            for &neighbor in &self.edges[vertex] {
                if visited[neighbor] {
                    continue;
                }
                if let Some(node_id) = &self.vertex_source_nodes[neighbor] {
                    return Some(node_id.clone());
                }
                visited[neighbor] = true;
                queue.push_back(neighbor);
            }
        }
        None
    }

    fn group_bone_vertices(&mut self) {
        for (vertex, source) in self.vertex_source_nodes.iter().enumerate() {
            let Some(node_id) = source else {
                continue;
            };
            let Some(binding) = self.node_bindings.get(node_id) else {
                continue;
            };
            for bone_id in &binding.bone_ids {
                self.bone_vertices
                    .entry(bone_id.clone())
                    .or_default()
                    .insert(vertex);
            }
        }
    }

    fn build_bone_joints(&mut self) {
        for (bone_id, bone) in &mut self.bones {
            bone.start_positions = bone
                .joints
                .iter()
                .map(|node_id| match self.nodes.get(node_id) {
                    Some(position) => *position,
                    None => {
                        debug!(bone_id = %bone_id, node_id = %node_id, "joint node missing");
                        Point3::origin()
                    }
                })
                .collect();
            bone.forward_vectors = vec![Vec3::zeros(); bone.start_positions.len()];
            for i in 0..bone.start_positions.len().saturating_sub(1) {
                bone.forward_vectors[i] = bone.start_positions[i + 1] - bone.start_positions[i];
            }
        }
    }

    /// A vertex belongs to the first segment whose next joint it does not
    /// lie beyond; the rest go to the last segment.
    fn calculate_bone_vertex_weights(&mut self) {
        for (bone_id, bone) in &mut self.bones {
            let Some(vertices) = self.bone_vertices.get(bone_id) else {
                continue;
            };
            let joint_count = bone.start_positions.len();
            if joint_count < 2 {
                continue;
            }

            let mut segments: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); joint_count];
            let mut used = BTreeSet::new();
            for joint in 0..joint_count - 1 {
                let next_joint = bone.start_positions[joint + 1];
                let forward = normalized_or_zero(&bone.forward_vectors[joint]);
                for &vertex in vertices {
                    if used.contains(&vertex) {
                        continue;
                    }
                    let to_vertex = normalized_or_zero(&(self.vertices[vertex] - next_joint));
                    if forward.dot(&to_vertex) <= 0.0 {
                        segments[joint].insert(vertex);
                        used.insert(vertex);
                    }
                }
            }
            for &vertex in vertices {
                if !used.contains(&vertex) {
                    segments[joint_count - 2].insert(vertex);
                }
            }

            bone.vertex_weights = segments
                .into_iter()
                .map(|segment| {
                    segment
                        .into_iter()
                        .map(|vertex| VertexWeight {
                            vertex,
                            weight: 1.0,
                        })
                        .collect()
                })
                .collect();
        }
    }

    fn generate_bone_previews(&mut self) {
        let palette = BONE_PALETTE.len();

        for (bone_id, members) in &self.bone_vertices {
            let Some(bone) = self.bones.get(bone_id) else {
                continue;
            };
            let color = BONE_PALETTE[bone.index % palette];
            let mut preview = BonePreview::default();
            let mut old_to_new: BTreeMap<usize, usize> = BTreeMap::new();
            for triangle in &self.triangles {
                if !triangle.iter().any(|v| members.contains(v)) {
                    continue;
                }
                let mut new_triangle = [0usize; 3];
                for (slot, &v) in new_triangle.iter_mut().zip(triangle) {
                    *slot = *old_to_new.entry(v).or_insert_with(|| {
                        preview.vertices.push(self.vertices[v]);
                        preview.vertex_colors.push(color);
                        preview.vertices.len() - 1
                    });
                }
                preview.triangles.push(new_triangle);
            }
            self.bone_previews.insert(bone_id.clone(), preview);
        }

        let mut skin_colors: BTreeMap<usize, Vec<Color>> = BTreeMap::new();
        for bone_id in self.bone_vertices.keys() {
            let Some(bone) = self.bones.get(bone_id) else {
                continue;
            };
            let color = BONE_PALETTE[bone.index % palette];
            let alternative = BONE_PALETTE[(bone.index + palette / 2) % palette];
            for (joint, weights) in bone.vertex_weights.iter().enumerate() {
                let use_color = if joint % 2 == 0 { color } else { alternative };
                for weight in weights {
                    skin_colors.entry(weight.vertex).or_default().push(use_color);
                }
            }
        }

        let mut body_colors = vec![Color::transparent(); self.vertices.len()];
        for (vertex, colors) in skin_colors {
            let sum = colors
                .iter()
                .fold(Color::transparent(), |sum, &c| sum + c);
            body_colors[vertex] = sum * (1.0 / colors.len() as f64);
        }
        self.body_preview = BonePreview {
            vertices: self.vertices.clone(),
            triangles: self.triangles.clone(),
            vertex_colors: body_colors,
        };
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Source node of each vertex (`None` when unresolved).
    pub fn vertex_source_nodes(&self) -> &[Option<String>] {
        &self.vertex_source_nodes
    }

    /// Vertices grouped by bone.
    pub fn bone_vertices(&self) -> &BTreeMap<String, BTreeSet<usize>> {
        &self.bone_vertices
    }

    /// A bone with its derived joint data.
    pub fn bone(&self, bone_id: &str) -> Option<&Bone> {
        self.bones.get(bone_id)
    }

    /// All bones.
    pub fn bones(&self) -> &BTreeMap<String, Bone> {
        &self.bones
    }

    /// Per-bone previews.
    pub fn bone_previews(&self) -> &BTreeMap<String, BonePreview> {
        &self.bone_previews
    }

    /// Whole-body preview.
    pub fn body_preview(&self) -> &BonePreview {
        &self.body_preview
    }

    /// Move the per-bone previews out.
    pub fn take_bone_previews(&mut self) -> BTreeMap<String, BonePreview> {
        std::mem::take(&mut self.bone_previews)
    }

    /// Move the whole-body preview out.
    pub fn take_body_preview(&mut self) -> BonePreview {
        std::mem::take(&mut self.body_preview)
    }
}
