//! Skeleton entities owned by a [`Document`](crate::Document).

use std::collections::BTreeSet;

use image::RgbaImage;
use skelform_ir::{CombineMode, CutFace, PartTarget};
use skelform_math::{Color, Point3, Tolerance};
use skelform_mesh::ModelMesh;
use skelform_rig::VertexWeight;
use uuid::Uuid;

/// Smallest node radius.
pub const MIN_NODE_RADIUS: f64 = 0.005;

/// Largest node radius.
pub const MAX_NODE_RADIUS: f64 = 1.0;

fn clamp_cut_rotation(rotation: f64) -> f64 {
    rotation.clamp(-1.0, 1.0)
}

fn clamp_deform(value: f64) -> f64 {
    value.clamp(0.0, 2.0)
}

// =========================================================================
// Node
// =========================================================================

/// A sphere in the skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node ID.
    pub id: Uuid,
    /// Owning part.
    pub part_id: Uuid,
    /// Optional display name.
    pub name: String,
    /// Center.
    pub position: Point3,
    /// Radius, within [`MIN_NODE_RADIUS`]..=[`MAX_NODE_RADIUS`].
    pub radius: f64,
    /// Whether the node is a joint of at least one bone.
    pub bone_joint: bool,
    /// Bones this node's geometry is bound to.
    pub bone_ids: BTreeSet<Uuid>,
    /// Bones listing this node in their joint sequence.
    pub as_bone_joints: BTreeSet<Uuid>,
    /// Incident edges, in connection order.
    pub edge_ids: Vec<Uuid>,
    /// Whether the cut settings below override the part's.
    pub has_cut_face_settings: bool,
    /// Cut rotation override, within `-1..=1`.
    pub cut_rotation: f64,
    /// Cut face override.
    pub cut_face: CutFace,
    /// Part donating the profile when `cut_face` is user defined.
    pub cut_face_linked_id: Option<Uuid>,
}

impl Node {
    /// Node at the origin with the smallest radius.
    pub fn new(id: Uuid, part_id: Uuid) -> Self {
        Self {
            id,
            part_id,
            name: String::new(),
            position: Point3::origin(),
            radius: MIN_NODE_RADIUS,
            bone_joint: false,
            bone_ids: BTreeSet::new(),
            as_bone_joints: BTreeSet::new(),
            edge_ids: Vec::new(),
            has_cut_face_settings: false,
            cut_rotation: 0.0,
            cut_face: CutFace::Quad,
            cut_face_linked_id: None,
        }
    }

    /// Set the radius, clamped to the allowed range.
    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius.clamp(MIN_NODE_RADIUS, MAX_NODE_RADIUS);
    }

    /// Override the cut rotation (clamped to `-1..=1`).
    pub fn set_cut_rotation(&mut self, rotation: f64) {
        self.cut_rotation = clamp_cut_rotation(rotation);
        self.has_cut_face_settings = true;
    }

    /// Override the cut face with a built-in profile.
    pub fn set_cut_face(&mut self, face: CutFace) {
        self.cut_face = face;
        self.cut_face_linked_id = None;
        self.has_cut_face_settings = true;
    }

    /// Override the cut face with another part's profile; `None` reverts
    /// to [`CutFace::Quad`].
    pub fn set_cut_face_linked_id(&mut self, linked_id: Option<Uuid>) {
        match linked_id {
            Some(id) => {
                self.cut_face = CutFace::UserDefined;
                self.cut_face_linked_id = Some(id);
                self.has_cut_face_settings = true;
            }
            None => self.set_cut_face(CutFace::Quad),
        }
    }

    /// Drop every cut override.
    pub fn clear_cut_face_settings(&mut self) {
        self.cut_face = CutFace::Quad;
        self.cut_face_linked_id = None;
        self.cut_rotation = 0.0;
        self.has_cut_face_settings = false;
    }
}

// =========================================================================
// Edge
// =========================================================================

/// Connection between two nodes of the same part.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Edge ID.
    pub id: Uuid,
    /// Owning part.
    pub part_id: Uuid,
    /// Optional display name.
    pub name: String,
    /// Endpoints, `[from, to]`.
    pub node_ids: [Uuid; 2],
}

impl Edge {
    /// Edge from `from` to `to`.
    pub fn new(id: Uuid, part_id: Uuid, from: Uuid, to: Uuid) -> Self {
        Self {
            id,
            part_id,
            name: String::new(),
            node_ids: [from, to],
        }
    }

    /// The endpoint that is not `node_id`, if `node_id` is an endpoint.
    pub fn neighbor_of(&self, node_id: Uuid) -> Option<Uuid> {
        match self.node_ids {
            [a, b] if a == node_id => Some(b),
            [a, b] if b == node_id => Some(a),
            _ => None,
        }
    }
}

// =========================================================================
// Part
// =========================================================================

/// A connected group of nodes and edges generated as one mesh region.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    /// Part ID.
    pub id: Uuid,
    /// Link component in the tree.
    pub component_id: Option<Uuid>,
    /// Nodes owned by this part.
    pub node_ids: Vec<Uuid>,
    /// Optional display name.
    pub name: String,
    /// Shown in the editor.
    pub visible: bool,
    /// Rejects edits.
    pub locked: bool,
    /// Excluded from generation.
    pub disabled: bool,
    /// Subdivided.
    pub subdived: bool,
    /// Mirrored about the canvas origin's X.
    pub x_mirrored: bool,
    /// Rounded ends.
    pub rounded: bool,
    /// Chamfered.
    pub chamfered: bool,
    /// Thickness scale, within `0..=2`.
    pub deform_thickness: f64,
    /// Width scale, within `0..=2`.
    pub deform_width: f64,
    /// Thickness and width scale together.
    pub deform_unified: bool,
    /// Cut rotation, within `-1..=1`.
    pub cut_rotation: f64,
    /// Cross-section profile.
    pub cut_face: CutFace,
    /// Part donating the profile when `cut_face` is user defined.
    pub cut_face_linked_id: Option<Uuid>,
    /// What the part contributes to generation.
    pub target: PartTarget,
    /// Whether `color` applies.
    pub has_color: bool,
    /// Base color.
    pub color: Color,
    /// Image used as the part's color, by image ID.
    pub color_image_id: Option<Uuid>,
    /// How far the color bleeds into neighbors.
    pub color_solubility: f64,
    /// Metalness.
    pub metalness: f64,
    /// Roughness.
    pub roughness: f64,
    /// Shell thickness; zero is solid.
    pub hollow_thickness: f64,
    /// Lighten downward-facing surfaces.
    pub countershaded: bool,
    /// Smoothing cutoff in degrees; zero uses the document setting.
    pub smooth_cutoff_degrees: f64,
    /// Needs regeneration.
    pub dirty: bool,
}

impl Part {
    /// Part with default attributes, marked dirty.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            component_id: None,
            node_ids: Vec::new(),
            name: String::new(),
            visible: true,
            locked: false,
            disabled: false,
            subdived: false,
            x_mirrored: false,
            rounded: false,
            chamfered: false,
            deform_thickness: 1.0,
            deform_width: 1.0,
            deform_unified: false,
            cut_rotation: 0.0,
            cut_face: CutFace::Quad,
            cut_face_linked_id: None,
            target: PartTarget::Model,
            has_color: false,
            color: Color::white(),
            color_image_id: None,
            color_solubility: 0.0,
            metalness: 0.0,
            roughness: 1.0,
            hollow_thickness: 0.0,
            countershaded: false,
            smooth_cutoff_degrees: 0.0,
            dirty: true,
        }
    }

    /// Locked or hidden parts reject node and edge edits.
    pub fn is_readonly(&self) -> bool {
        self.locked || !self.visible
    }

    /// Visible and not disabled.
    pub fn is_edit_visible(&self) -> bool {
        self.visible && !self.disabled
    }

    /// Set the thickness scale, clamped to `0..=2`.
    pub fn set_deform_thickness(&mut self, thickness: f64) {
        self.deform_thickness = clamp_deform(thickness);
    }

    /// Set the width scale, clamped to `0..=2`.
    pub fn set_deform_width(&mut self, width: f64) {
        self.deform_width = clamp_deform(width);
    }

    /// Set the cut rotation, clamped to `-1..=1`.
    pub fn set_cut_rotation(&mut self, rotation: f64) {
        self.cut_rotation = clamp_cut_rotation(rotation);
    }

    /// Use a built-in profile; clears any linked part.
    pub fn set_cut_face(&mut self, face: CutFace) {
        self.cut_face = face;
        self.cut_face_linked_id = None;
    }

    /// Use another part's profile; `None` reverts to [`CutFace::Quad`].
    pub fn set_cut_face_linked_id(&mut self, linked_id: Option<Uuid>) {
        match linked_id {
            Some(id) => {
                self.cut_face = CutFace::UserDefined;
                self.cut_face_linked_id = Some(id);
            }
            None => self.set_cut_face(CutFace::Quad),
        }
    }

    /// Copy every attribute except identity and node membership.
    pub fn copy_attributes(&mut self, other: &Part) {
        self.visible = other.visible;
        self.locked = other.locked;
        self.subdived = other.subdived;
        self.disabled = other.disabled;
        self.x_mirrored = other.x_mirrored;
        self.deform_thickness = other.deform_thickness;
        self.deform_width = other.deform_width;
        self.deform_unified = other.deform_unified;
        self.rounded = other.rounded;
        self.chamfered = other.chamfered;
        self.color = other.color;
        self.has_color = other.has_color;
        self.cut_rotation = other.cut_rotation;
        self.cut_face = other.cut_face;
        self.cut_face_linked_id = other.cut_face_linked_id;
        self.component_id = other.component_id;
        self.dirty = other.dirty;
        self.target = other.target;
        self.color_solubility = other.color_solubility;
        self.countershaded = other.countershaded;
        self.metalness = other.metalness;
        self.roughness = other.roughness;
        self.smooth_cutoff_degrees = other.smooth_cutoff_degrees;
        self.color_image_id = other.color_image_id;
        self.hollow_thickness = other.hollow_thickness;
    }

    // --- Sparse-encoding predicates ----------------------------------------

    /// Thickness differs from 1.
    pub fn deform_thickness_adjusted(&self) -> bool {
        Tolerance::DEFAULT.is_adjusted(self.deform_thickness, 1.0)
    }

    /// Width differs from 1.
    pub fn deform_width_adjusted(&self) -> bool {
        Tolerance::DEFAULT.is_adjusted(self.deform_width, 1.0)
    }

    /// Any deform setting differs from its default.
    pub fn deform_adjusted(&self) -> bool {
        self.deform_thickness_adjusted() || self.deform_width_adjusted() || self.deform_unified
    }

    /// Color solubility differs from 0.
    pub fn color_solubility_adjusted(&self) -> bool {
        Tolerance::DEFAULT.is_adjusted(self.color_solubility, 0.0)
    }

    /// Metalness differs from 0.
    pub fn metalness_adjusted(&self) -> bool {
        Tolerance::DEFAULT.is_adjusted(self.metalness, 0.0)
    }

    /// Roughness differs from 1.
    pub fn roughness_adjusted(&self) -> bool {
        Tolerance::DEFAULT.is_adjusted(self.roughness, 1.0)
    }

    /// Cut rotation differs from 0.
    pub fn cut_rotation_adjusted(&self) -> bool {
        Tolerance::DEFAULT.is_adjusted(self.cut_rotation, 0.0)
    }

    /// Hollow thickness differs from 0.
    pub fn hollow_thickness_adjusted(&self) -> bool {
        Tolerance::DEFAULT.is_adjusted(self.hollow_thickness, 0.0)
    }

    /// Cut face is not [`CutFace::Quad`].
    pub fn cut_face_adjusted(&self) -> bool {
        self.cut_face != CutFace::Quad
    }

    /// Any cut setting differs from its default.
    pub fn cut_adjusted(&self) -> bool {
        self.cut_rotation_adjusted() || self.cut_face_adjusted() || self.hollow_thickness_adjusted()
    }

    // --- Capabilities ------------------------------------------------------

    fn is_model(&self) -> bool {
        self.target == PartTarget::Model
    }

    /// Whether polygon-count settings apply.
    pub fn has_poly_function(&self) -> bool {
        self.is_model()
    }

    /// Whether smoothing applies.
    pub fn has_smooth_function(&self) -> bool {
        self.is_model()
    }

    /// Whether subdivision applies.
    pub fn has_subdiv_function(&self) -> bool {
        self.is_model()
    }

    /// Whether rounded ends apply.
    pub fn has_round_end_function(&self) -> bool {
        self.is_model()
    }

    /// Whether mirroring applies.
    pub fn has_mirror_function(&self) -> bool {
        self.is_model()
    }

    /// Whether chamfering applies.
    pub fn has_chamfer_function(&self) -> bool {
        self.is_model()
    }

    /// Whether cut rotation applies.
    pub fn has_rotation_function(&self) -> bool {
        self.is_model()
    }

    /// Whether hollowing applies.
    pub fn has_hollow_function(&self) -> bool {
        self.is_model()
    }

    /// Whether the cut face applies.
    pub fn has_cut_face_function(&self) -> bool {
        self.is_model()
    }

    /// Whether layering applies.
    pub fn has_layer_function(&self) -> bool {
        self.is_model()
    }

    /// The target can always be changed.
    pub fn has_target_function(&self) -> bool {
        true
    }

    /// Whether base settings apply.
    pub fn has_base_function(&self) -> bool {
        self.is_model()
    }

    /// Whether the combine mode applies.
    pub fn has_combine_mode_function(&self) -> bool {
        self.is_model()
    }

    /// Whether deform settings apply.
    pub fn has_deform_function(&self) -> bool {
        self.is_model()
    }

    /// Whether color settings apply.
    pub fn has_color_function(&self) -> bool {
        self.is_model()
    }
}

// =========================================================================
// Component
// =========================================================================

/// Link data type naming a part.
pub const LINK_DATA_TYPE_PART: &str = "partId";

/// A node of the component tree: a group, or a leaf linking one part.
#[derive(Debug, Clone)]
pub struct Component {
    /// Component ID; `nil` only for the root.
    pub id: Uuid,
    /// Parent, or `None` under the root.
    pub parent_id: Option<Uuid>,
    /// Linked part, for leaf components.
    pub link_to_part_id: Option<Uuid>,
    /// Ordered children.
    pub children_ids: Vec<Uuid>,
    /// Optional display name.
    pub name: String,
    /// Expanded in the editor tree.
    pub expanded: bool,
    /// How the subtree is composited.
    pub combine_mode: CombineMode,
    /// Needs regeneration.
    pub dirty: bool,
    /// Preview mesh from the last generation.
    pub preview_mesh: Option<ModelMesh>,
    /// Preview image from the last generation.
    pub preview_image: Option<RgbaImage>,
    /// The preview no longer matches the part's appearance.
    pub is_preview_mesh_obsolete: bool,
}

impl Component {
    /// Empty group component.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            parent_id: None,
            link_to_part_id: None,
            children_ids: Vec::new(),
            name: String::new(),
            expanded: true,
            combine_mode: CombineMode::Normal,
            dirty: true,
            preview_mesh: None,
            preview_image: None,
            is_preview_mesh_obsolete: false,
        }
    }

    /// The tree root.
    pub fn root() -> Self {
        Self::new(Uuid::nil())
    }

    /// Link payload for the snapshot codec (the part ID, or empty).
    pub fn link_data(&self) -> String {
        self.link_to_part_id
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    /// Link payload type (`"partId"`, or empty).
    pub fn link_data_type(&self) -> &'static str {
        if self.link_to_part_id.is_some() {
            LINK_DATA_TYPE_PART
        } else {
            ""
        }
    }

    /// Replace the preview mesh; the preview is current again.
    pub fn update_preview_mesh(&mut self, mesh: ModelMesh) {
        self.preview_mesh = Some(mesh);
        self.is_preview_mesh_obsolete = false;
    }

    /// Append a child unless already present.
    pub fn add_child(&mut self, child_id: Uuid) {
        if !self.children_ids.contains(&child_id) {
            self.children_ids.push(child_id);
        }
    }

    /// Remove a child if present.
    pub fn remove_child(&mut self, child_id: Uuid) {
        self.children_ids.retain(|id| *id != child_id);
    }

    /// Put `to` in `from`'s slot.
    pub fn replace_child(&mut self, from: Uuid, to: Uuid) {
        if let Some(slot) = self.children_ids.iter_mut().find(|id| **id == from) {
            *slot = to;
        }
    }

    /// Splice `others` into `from`'s slot.
    pub fn replace_child_with_others(&mut self, from: Uuid, others: &[Uuid]) {
        if let Some(index) = self.children_ids.iter().position(|id| *id == from) {
            self.children_ids.splice(index..=index, others.iter().copied());
        }
    }

    /// Swap a child with its predecessor.
    pub fn move_child_up(&mut self, child_id: Uuid) {
        if let Some(index) = self.children_ids.iter().position(|id| *id == child_id) {
            if index > 0 {
                self.children_ids.swap(index - 1, index);
            }
        }
    }

    /// Swap a child with its successor.
    pub fn move_child_down(&mut self, child_id: Uuid) {
        if let Some(index) = self.children_ids.iter().position(|id| *id == child_id) {
            if index + 1 < self.children_ids.len() {
                self.children_ids.swap(index, index + 1);
            }
        }
    }

    /// Move a child to the front.
    pub fn move_child_to_top(&mut self, child_id: Uuid) {
        if let Some(index) = self.children_ids.iter().position(|id| *id == child_id) {
            let id = self.children_ids.remove(index);
            self.children_ids.insert(0, id);
        }
    }

    /// Move a child to the back.
    pub fn move_child_to_bottom(&mut self, child_id: Uuid) {
        if let Some(index) = self.children_ids.iter().position(|id| *id == child_id) {
            let id = self.children_ids.remove(index);
            self.children_ids.push(id);
        }
    }
}

// =========================================================================
// Bone
// =========================================================================

/// A skinning bone: a chain of joint nodes.
#[derive(Debug, Clone)]
pub struct Bone {
    /// Bone ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Joint nodes in chain order.
    pub joints: Vec<Uuid>,
    /// Parent bone.
    pub attach_bone_id: Option<Uuid>,
    /// Joint of the parent bone this bone hangs from.
    pub attach_bone_joint_index: usize,
    /// Colorized preview from the last bone generation.
    pub preview_mesh: Option<ModelMesh>,
    /// Per-joint vertex weights from the last bone generation.
    pub vertex_weights: Vec<Vec<VertexWeight>>,
}

impl Bone {
    /// Bone without joints.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            name: String::new(),
            joints: Vec::new(),
            attach_bone_id: None,
            attach_bone_joint_index: 0,
            preview_mesh: None,
            vertex_weights: Vec::new(),
        }
    }
}

/// What the editor's pointer does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Select and move.
    #[default]
    Select,
    /// Add nodes.
    Add,
    /// Drag the view.
    Drag,
    /// Paint materials.
    Paint,
    /// Pick bone joints.
    Pick,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_node_clamps() {
        let mut node = Node::new(Uuid::new_v4(), Uuid::new_v4());
        node.set_radius(5.0);
        assert_relative_eq!(node.radius, MAX_NODE_RADIUS);
        node.set_radius(0.0);
        assert_relative_eq!(node.radius, MIN_NODE_RADIUS);
        node.set_cut_rotation(-3.0);
        assert_relative_eq!(node.cut_rotation, -1.0);
        assert!(node.has_cut_face_settings);
    }

    #[test]
    fn test_cut_face_link_rules() {
        let linked = Uuid::new_v4();
        let mut part = Part::new(Uuid::new_v4());
        part.set_cut_face_linked_id(Some(linked));
        assert_eq!(part.cut_face, CutFace::UserDefined);
        part.set_cut_face(CutFace::Hexagon);
        assert_eq!(part.cut_face_linked_id, None);
        part.set_cut_face_linked_id(Some(linked));
        part.set_cut_face_linked_id(None);
        assert_eq!(part.cut_face, CutFace::Quad);
        assert!(!part.cut_face_adjusted());
    }

    #[test]
    fn test_part_adjustment_predicates() {
        let mut part = Part::new(Uuid::new_v4());
        assert!(!part.deform_adjusted());
        assert!(!part.roughness_adjusted());
        part.roughness = 0.995;
        assert!(!part.roughness_adjusted());
        part.roughness = 0.5;
        assert!(part.roughness_adjusted());
        part.set_deform_width(3.0);
        assert_relative_eq!(part.deform_width, 2.0);
        assert!(part.deform_adjusted());
    }

    #[test]
    fn test_readonly_policy() {
        let mut part = Part::new(Uuid::new_v4());
        assert!(!part.is_readonly());
        part.visible = false;
        assert!(part.is_readonly());
        part.visible = true;
        part.locked = true;
        assert!(part.is_readonly());
    }

    #[test]
    fn test_capabilities_follow_target() {
        let mut part = Part::new(Uuid::new_v4());
        assert!(part.has_color_function());
        part.target = PartTarget::CutFace;
        assert!(!part.has_color_function());
        assert!(!part.has_mirror_function());
        assert!(part.has_target_function());
    }

    #[test]
    fn test_child_reordering() {
        let [a, b, c] = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let mut group = Component::new(Uuid::new_v4());
        for id in [a, b, c] {
            group.add_child(id);
        }
        group.add_child(a);
        assert_eq!(group.children_ids, vec![a, b, c]);
        group.move_child_up(c);
        assert_eq!(group.children_ids, vec![a, c, b]);
        group.move_child_to_top(b);
        assert_eq!(group.children_ids, vec![b, a, c]);
        group.move_child_to_bottom(b);
        assert_eq!(group.children_ids, vec![a, c, b]);
        group.move_child_down(a);
        assert_eq!(group.children_ids, vec![c, a, b]);

        let d = Uuid::new_v4();
        group.replace_child_with_others(a, &[d, a]);
        assert_eq!(group.children_ids, vec![c, d, a, b]);
    }

    #[test]
    fn test_edge_neighbor() {
        let [a, b] = [Uuid::new_v4(), Uuid::new_v4()];
        let edge = Edge::new(Uuid::new_v4(), Uuid::new_v4(), a, b);
        assert_eq!(edge.neighbor_of(a), Some(b));
        assert_eq!(edge.neighbor_of(b), Some(a));
        assert_eq!(edge.neighbor_of(Uuid::new_v4()), None);
    }
}
