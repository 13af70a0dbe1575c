//! The document: entity maps, queries, change events and canvas state.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use skelform_ir::{CutFace, PartTarget, Snapshot};
use skelform_math::{Point3, Tolerance, Vec3};
use tracing::debug;
use uuid::Uuid;

use crate::config::DocumentConfig;
use crate::entity::{Bone, Component, Edge, EditMode, Node, Part};
use crate::event::{DocumentEvent, LockAxis};
use crate::pipeline::{JobKind, Pipeline};

/// In-progress joint picking for one bone.
#[derive(Debug, Clone, Default)]
pub(crate) struct BonePicking {
    pub(crate) bone_id: Option<Uuid>,
    pub(crate) joint_count: usize,
    pub(crate) picked: Vec<Uuid>,
}

/// A skeleton document.
///
/// The document exclusively owns its nodes, edges, parts, components and
/// bones. Operations that do not apply (unknown IDs, read-only parts,
/// locked axes, structurally impossible requests) are ignored; they never
/// fail. Every change is announced through [`DocumentEvent`]s collected
/// with [`drain_events`](Self::drain_events).
///
/// Generation runs on worker threads; see
/// [`generate_mesh`](Self::generate_mesh) and
/// [`process_generation_events`](Self::process_generation_events).
pub struct Document {
    pub(crate) config: DocumentConfig,
    pub(crate) nodes: BTreeMap<Uuid, Node>,
    pub(crate) edges: BTreeMap<Uuid, Edge>,
    pub(crate) parts: BTreeMap<Uuid, Part>,
    pub(crate) components: BTreeMap<Uuid, Component>,
    pub(crate) root_component: Component,
    pub(crate) bones: BTreeMap<Uuid, Bone>,
    pub(crate) bone_id_list: Vec<Uuid>,
    pub(crate) origin: Point3,
    pub(crate) x_locked: bool,
    pub(crate) y_locked: bool,
    pub(crate) z_locked: bool,
    pub(crate) radius_locked: bool,
    pub(crate) all_position_related_locks_enabled: bool,
    pub(crate) edit_mode: EditMode,
    pub(crate) current_canvas_component_id: Option<Uuid>,
    pub(crate) bone_picking: BonePicking,
    pub(crate) undo_items: VecDeque<Snapshot>,
    pub(crate) redo_items: Vec<Snapshot>,
    pub(crate) events: Vec<DocumentEvent>,
    pub(crate) pipeline: Pipeline,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with default options.
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    /// Empty document with the given options.
    pub fn with_config(config: DocumentConfig) -> Self {
        Self {
            config,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            parts: BTreeMap::new(),
            components: BTreeMap::new(),
            root_component: Component::root(),
            bones: BTreeMap::new(),
            bone_id_list: Vec::new(),
            origin: Point3::origin(),
            x_locked: false,
            y_locked: false,
            z_locked: false,
            radius_locked: false,
            all_position_related_locks_enabled: true,
            edit_mode: EditMode::Select,
            current_canvas_component_id: None,
            bone_picking: BonePicking::default(),
            undo_items: VecDeque::new(),
            redo_items: Vec::new(),
            events: Vec::new(),
            pipeline: Pipeline::new(),
        }
    }

    /// Options the document was created with.
    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    // =====================================================================
    // Events
    // =====================================================================

    /// Queue an event. With `auto_generate` on, coarse events request the
    /// generation pass they make stale.
    pub(crate) fn emit(&mut self, event: DocumentEvent) {
        let request = match event {
            DocumentEvent::SkeletonChanged => Some(JobKind::Mesh),
            DocumentEvent::RigChanged => Some(JobKind::Bone),
            DocumentEvent::TextureChanged => Some(JobKind::Texture),
            _ => None,
        };
        self.events.push(event);
        if !self.config.auto_generate {
            return;
        }
        match request {
            Some(JobKind::Mesh) => self.generate_mesh(),
            Some(JobKind::Bone) => self.generate_bone(),
            Some(JobKind::Texture) => self.generate_texture(),
            None => {}
        }
    }

    /// Take every event queued since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.events)
    }

    // =====================================================================
    // Entity access
    // =====================================================================

    /// All nodes.
    pub fn nodes(&self) -> &BTreeMap<Uuid, Node> {
        &self.nodes
    }

    /// All edges.
    pub fn edges(&self) -> &BTreeMap<Uuid, Edge> {
        &self.edges
    }

    /// All parts.
    pub fn parts(&self) -> &BTreeMap<Uuid, Part> {
        &self.parts
    }

    /// All components except the root.
    pub fn components(&self) -> &BTreeMap<Uuid, Component> {
        &self.components
    }

    /// The component tree root.
    pub fn root_component(&self) -> &Component {
        &self.root_component
    }

    /// All bones.
    pub fn bones(&self) -> &BTreeMap<Uuid, Bone> {
        &self.bones
    }

    /// Bone IDs in display order.
    pub fn bone_id_list(&self) -> &[Uuid] {
        &self.bone_id_list
    }

    /// Node by ID.
    pub fn find_node(&self, node_id: Uuid) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Edge by ID.
    pub fn find_edge(&self, edge_id: Uuid) -> Option<&Edge> {
        self.edges.get(&edge_id)
    }

    /// Part by ID.
    pub fn find_part(&self, part_id: Uuid) -> Option<&Part> {
        self.parts.get(&part_id)
    }

    /// Component by ID; `None` is the root.
    pub fn find_component(&self, component_id: Option<Uuid>) -> Option<&Component> {
        match component_id {
            None => Some(&self.root_component),
            Some(id) => self.components.get(&id),
        }
    }

    pub(crate) fn find_component_mut(&mut self, component_id: Option<Uuid>) -> Option<&mut Component> {
        match component_id {
            None => Some(&mut self.root_component),
            Some(id) => self.components.get_mut(&id),
        }
    }

    /// Bone by ID.
    pub fn find_bone(&self, bone_id: Uuid) -> Option<&Bone> {
        self.bones.get(&bone_id)
    }

    /// The edge joining two nodes, in either direction.
    pub fn find_edge_by_nodes(&self, first_node_id: Uuid, second_node_id: Uuid) -> Option<&Edge> {
        let first = self.nodes.get(&first_node_id)?;
        first
            .edge_ids
            .iter()
            .filter_map(|edge_id| self.edges.get(edge_id))
            .find(|edge| edge.node_ids.contains(&second_node_id))
    }

    /// Every node reachable from `node_id` through edges.
    ///
    /// The start node is included whenever it has at least one edge.
    pub fn find_all_neighbors(&self, node_id: Uuid) -> BTreeSet<Uuid> {
        let mut neighbors = BTreeSet::new();
        let mut stack = vec![node_id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            for edge_id in &node.edge_ids {
                let Some(neighbor) = self.edges.get(edge_id).and_then(|e| e.neighbor_of(current))
                else {
                    continue;
                };
                if neighbors.insert(neighbor) {
                    stack.push(neighbor);
                }
            }
        }
        neighbors
    }

    /// True when the node has fewer than two edges.
    pub fn is_node_connectable(&self, node_id: Uuid) -> bool {
        self.nodes
            .get(&node_id)
            .is_some_and(|node| node.edge_ids.len() < 2)
    }

    /// Locked, hidden or missing parts are read-only.
    pub fn is_part_readonly(&self, part_id: Uuid) -> bool {
        self.parts.get(&part_id).map_or(true, Part::is_readonly)
    }

    /// The node exists and its part accepts edits.
    pub fn is_node_editable(&self, node_id: Uuid) -> bool {
        match self.nodes.get(&node_id) {
            Some(node) => !self.is_part_readonly(node.part_id),
            None => {
                debug!(%node_id, "node not found");
                false
            }
        }
    }

    /// The edge exists and its part accepts edits.
    pub fn is_edge_editable(&self, edge_id: Uuid) -> bool {
        match self.edges.get(&edge_id) {
            Some(edge) => !self.is_part_readonly(edge.part_id),
            None => {
                debug!(%edge_id, "edge not found");
                false
            }
        }
    }

    /// Cut face choices: the built-in profiles, then every part usable as
    /// a profile (cut-face targets and linked parts) ordered by the mean X
    /// of its nodes.
    pub fn collect_cut_face_list(&self) -> Vec<String> {
        let mut part_ids: Vec<Uuid> = Vec::new();
        let mut seen = BTreeSet::new();
        for (id, part) in &self.parts {
            if part.target == PartTarget::CutFace && seen.insert(*id) {
                part_ids.push(*id);
            }
            if let Some(linked) = part.cut_face_linked_id {
                if seen.insert(linked) {
                    part_ids.push(linked);
                }
            }
        }

        let center_x = |part_id: &Uuid| -> f64 {
            let Some(part) = self.parts.get(part_id) else {
                return 0.0;
            };
            if part.node_ids.is_empty() {
                return 0.0;
            }
            let sum: f64 = part
                .node_ids
                .iter()
                .filter_map(|id| self.nodes.get(id))
                .map(|node| node.position.x)
                .sum();
            sum / part.node_ids.len() as f64
        };
        part_ids.sort_by(|a, b| center_x(a).total_cmp(&center_x(b)));

        CutFace::BUILT_IN
            .iter()
            .map(|face| face.as_str().to_string())
            .chain(part_ids.iter().map(Uuid::to_string))
            .collect()
    }

    // =====================================================================
    // Dirty flags
    // =====================================================================

    pub(crate) fn mark_part_dirty(&mut self, part_id: Uuid) {
        if let Some(part) = self.parts.get_mut(&part_id) {
            part.dirty = true;
        }
    }

    /// Mark every part for regeneration.
    pub fn mark_all_dirty(&mut self) {
        for part in self.parts.values_mut() {
            part.dirty = true;
        }
    }

    pub(crate) fn reset_dirty_flags(&mut self) {
        for part in self.parts.values_mut() {
            part.dirty = false;
        }
        for component in self.components.values_mut() {
            component.dirty = false;
        }
    }

    // =====================================================================
    // Canvas origin
    // =====================================================================

    /// Canvas origin.
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    /// Origin X.
    pub fn origin_x(&self) -> f64 {
        self.origin.x
    }

    /// Origin Y.
    pub fn origin_y(&self) -> f64 {
        self.origin.y
    }

    /// Origin Z.
    pub fn origin_z(&self) -> f64 {
        self.origin.z
    }

    /// Set origin X.
    pub fn set_origin_x(&mut self, x: f64) {
        self.origin.x = x;
    }

    /// Set origin Y.
    pub fn set_origin_y(&mut self, y: f64) {
        self.origin.y = y;
    }

    /// Set origin Z.
    pub fn set_origin_z(&mut self, z: f64) {
        self.origin.z = z;
    }

    /// True once every origin coordinate is non-zero.
    pub fn origin_settled(&self) -> bool {
        let tolerance = Tolerance::DEFAULT;
        !tolerance.is_zero(self.origin.x)
            && !tolerance.is_zero(self.origin.y)
            && !tolerance.is_zero(self.origin.z)
    }

    /// Move the origin, honoring axis locks.
    pub fn move_origin_by(&mut self, delta: Vec3) {
        if !self.is_axis_locked(LockAxis::X) {
            self.origin.x += delta.x;
        }
        if !self.is_axis_locked(LockAxis::Y) {
            self.origin.y += delta.y;
        }
        if !self.is_axis_locked(LockAxis::Z) {
            self.origin.z += delta.z;
        }
        self.mark_all_dirty();
        self.emit(DocumentEvent::OriginChanged);
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Put an unsettled origin at the center of the nodes' bounding box.
    pub fn settle_origin(&mut self) {
        if self.origin_settled() {
            return;
        }
        let Some(bounds) = self.to_snapshot().node_bounds() else {
            return;
        };
        let [x, y, z] = bounds.center();
        self.origin = Point3::new(x, y, z);
        self.mark_all_dirty();
        self.emit(DocumentEvent::OriginChanged);
    }

    // =====================================================================
    // Position locks
    // =====================================================================

    /// Whether a lock applies right now.
    pub(crate) fn is_axis_locked(&self, axis: LockAxis) -> bool {
        self.all_position_related_locks_enabled && self.lock_state(axis)
    }

    /// The stored state of a lock, whether or not locks are enabled.
    pub fn lock_state(&self, axis: LockAxis) -> bool {
        match axis {
            LockAxis::X => self.x_locked,
            LockAxis::Y => self.y_locked,
            LockAxis::Z => self.z_locked,
            LockAxis::Radius => self.radius_locked,
        }
    }

    fn set_lock_state(&mut self, axis: LockAxis, locked: bool) {
        let slot = match axis {
            LockAxis::X => &mut self.x_locked,
            LockAxis::Y => &mut self.y_locked,
            LockAxis::Z => &mut self.z_locked,
            LockAxis::Radius => &mut self.radius_locked,
        };
        if *slot == locked {
            return;
        }
        *slot = locked;
        self.emit(DocumentEvent::LockStateChanged(axis));
    }

    /// Lock or unlock X.
    pub fn set_xlock_state(&mut self, locked: bool) {
        self.set_lock_state(LockAxis::X, locked);
    }

    /// Lock or unlock Y.
    pub fn set_ylock_state(&mut self, locked: bool) {
        self.set_lock_state(LockAxis::Y, locked);
    }

    /// Lock or unlock Z.
    pub fn set_zlock_state(&mut self, locked: bool) {
        self.set_lock_state(LockAxis::Z, locked);
    }

    /// Lock or unlock radius.
    pub fn set_radius_lock_state(&mut self, locked: bool) {
        self.set_lock_state(LockAxis::Radius, locked);
    }

    /// Apply axis locks and read-only checks to position edits (the default).
    pub fn enable_all_position_related_locks(&mut self) {
        self.all_position_related_locks_enabled = true;
    }

    /// Bypass axis locks and read-only checks for position edits, so
    /// imported geometry lands exactly as given.
    pub fn disable_all_position_related_locks(&mut self) {
        self.all_position_related_locks_enabled = false;
    }

    // =====================================================================
    // Edit mode
    // =====================================================================

    /// Current edit mode.
    pub fn edit_mode(&self) -> EditMode {
        self.edit_mode
    }

    /// Switch edit mode; leaving [`EditMode::Pick`] abandons joint picking.
    pub fn set_edit_mode(&mut self, mode: EditMode) {
        if self.edit_mode == mode {
            return;
        }
        if self.edit_mode == EditMode::Pick {
            self.bone_picking = BonePicking::default();
        }
        self.edit_mode = mode;
        self.emit(DocumentEvent::EditModeChanged);
    }

    /// Component new parts are created under.
    pub fn current_canvas_component_id(&self) -> Option<Uuid> {
        self.current_canvas_component_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn chain(doc: &mut Document, xs: &[f64]) -> Vec<Uuid> {
        let mut ids = Vec::new();
        let mut previous = None;
        for &x in xs {
            let id = doc
                .add_node(Point3::new(x, 0.5, 0.5), 0.1, previous)
                .unwrap();
            ids.push(id);
            previous = Some(id);
        }
        ids
    }

    #[test]
    fn test_find_edge_by_nodes_either_direction() {
        let mut doc = Document::new();
        let ids = chain(&mut doc, &[0.1, 0.2]);
        let forward = doc.find_edge_by_nodes(ids[0], ids[1]).unwrap().id;
        let backward = doc.find_edge_by_nodes(ids[1], ids[0]).unwrap().id;
        assert_eq!(forward, backward);
        assert!(doc.find_edge_by_nodes(ids[0], Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_find_all_neighbors_covers_component() {
        let mut doc = Document::new();
        let ids = chain(&mut doc, &[0.1, 0.2, 0.3]);
        let lone = doc.add_node(Point3::new(0.9, 0.5, 0.5), 0.1, None).unwrap();
        let reached = doc.find_all_neighbors(ids[0]);
        assert_eq!(reached, ids.iter().copied().collect());
        assert!(doc.find_all_neighbors(lone).is_empty());
    }

    #[test]
    fn test_node_connectable_below_two_edges() {
        let mut doc = Document::new();
        let ids = chain(&mut doc, &[0.1, 0.2, 0.3]);
        assert!(doc.is_node_connectable(ids[0]));
        assert!(!doc.is_node_connectable(ids[1]));
        assert!(!doc.is_node_connectable(Uuid::new_v4()));
    }

    #[test]
    fn test_readonly_when_locked_or_hidden() {
        let mut doc = Document::new();
        let ids = chain(&mut doc, &[0.1]);
        let part_id = doc.find_node(ids[0]).unwrap().part_id;
        assert!(doc.is_node_editable(ids[0]));
        doc.set_part_visible_state(part_id, false);
        assert!(doc.is_part_readonly(part_id));
        assert!(!doc.is_node_editable(ids[0]));
        doc.set_part_visible_state(part_id, true);
        doc.set_part_lock_state(part_id, true);
        assert!(doc.is_part_readonly(part_id));
        assert!(doc.is_part_readonly(Uuid::new_v4()));
    }

    #[test]
    fn test_settle_origin_centers_bounds() {
        let mut doc = Document::new();
        chain(&mut doc, &[0.2, 0.6]);
        assert!(!doc.origin_settled());
        doc.settle_origin();
        assert!(doc.origin_settled());
        assert_relative_eq!(doc.origin_x(), 0.4, epsilon = 1e-9);
        assert_relative_eq!(doc.origin_y(), 0.5, epsilon = 1e-9);
        assert_relative_eq!(doc.origin_z(), 0.5, epsilon = 1e-9);
        assert!(doc.drain_events().contains(&DocumentEvent::OriginChanged));
    }

    #[test]
    fn test_move_origin_respects_locks() {
        let mut doc = Document::new();
        doc.set_ylock_state(true);
        doc.move_origin_by(Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(doc.origin_x(), 1.0);
        assert_relative_eq!(doc.origin_y(), 0.0);

        doc.disable_all_position_related_locks();
        doc.move_origin_by(Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(doc.origin_y(), 1.0);
    }

    #[test]
    fn test_lock_events_only_on_change() {
        let mut doc = Document::new();
        doc.set_radius_lock_state(true);
        doc.set_radius_lock_state(true);
        let events = doc.drain_events();
        assert_eq!(events, vec![DocumentEvent::LockStateChanged(LockAxis::Radius)]);
        assert!(doc.lock_state(LockAxis::Radius));
    }

    #[test]
    fn test_cut_face_list_sorted_by_center() {
        let mut doc = Document::new();
        let right = chain(&mut doc, &[0.8]);
        let left = chain(&mut doc, &[0.2]);
        let right_part = doc.find_node(right[0]).unwrap().part_id;
        let left_part = doc.find_node(left[0]).unwrap().part_id;
        doc.set_part_target(right_part, PartTarget::CutFace);
        doc.set_part_target(left_part, PartTarget::CutFace);

        let list = doc.collect_cut_face_list();
        assert_eq!(&list[..4], &["Quad", "Pentagon", "Hexagon", "Triangle"]);
        assert_eq!(list[4], left_part.to_string());
        assert_eq!(list[5], right_part.to_string());
    }
}
