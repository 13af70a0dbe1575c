//! Converting between the live entity graph and [`Snapshot`]s.
//!
//! Writing is sparse: attributes at their default value are left out,
//! except IDs and boolean state flags. Reading always mints fresh part,
//! bone and component IDs and remaps every cross-reference through an
//! [`IdTable`]; node and edge IDs are kept when they are valid UUIDs not
//! already in use, so undo and redo replay the same IDs.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use skelform_ir::{
    bool_text, float_text, is_true, join_list, split_list, to_float, to_int, value_or_empty,
    Attributes, CombineMode, CutFace, PartTarget, Snapshot,
};
use skelform_math::{Color, Point3};
use tracing::debug;
use uuid::Uuid;

use crate::document::{BonePicking, Document};
use crate::entity::{Bone, Component, Edge, Node, Part, LINK_DATA_TYPE_PART};
use crate::event::DocumentEvent;

/// Which parts of the document a snapshot carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFor {
    /// Nodes, edges, parts and components.
    Nodes,
    /// Bones only.
    Bones,
    /// Everything, including the canvas origin.
    Document,
}

impl SnapshotFor {
    /// Whether nodes, edges, parts and components are written.
    pub fn includes_nodes(self) -> bool {
        matches!(self, Self::Nodes | Self::Document)
    }

    /// Whether bones are written.
    pub fn includes_bones(self) -> bool {
        matches!(self, Self::Bones | Self::Document)
    }
}

/// Where a snapshot being added comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotSource {
    /// History replay or file load; the canvas origin is applied.
    #[default]
    Unknown,
    /// Clipboard; the current origin is kept.
    Paste,
    /// Import into an existing document; the current origin is kept.
    Import,
}

/// Old snapshot ID to new document ID, per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdTable {
    /// Part IDs.
    pub parts: BTreeMap<String, Uuid>,
    /// Bone IDs.
    pub bones: BTreeMap<String, Uuid>,
    /// Node IDs.
    pub nodes: BTreeMap<String, Uuid>,
    /// Edge IDs.
    pub edges: BTreeMap<String, Uuid>,
    /// Component IDs.
    pub components: BTreeMap<String, Uuid>,
}

/// A `cutFace` attribute: a built-in profile name or a donor part ID.
enum CutFaceValue<'a> {
    BuiltIn(CutFace),
    Linked(&'a str),
}

fn parse_cut_face(value: &str) -> CutFaceValue<'_> {
    match CutFace::from_str(value) {
        Ok(face) => CutFaceValue::BuiltIn(face),
        Err(_) => CutFaceValue::Linked(value),
    }
}

fn write_cut_face(record: &mut Attributes, cut_face: CutFace, linked_id: Option<Uuid>) {
    if cut_face == CutFace::UserDefined {
        if let Some(id) = linked_id {
            record.insert("cutFace".into(), id.to_string());
        }
    } else {
        record.insert("cutFace".into(), cut_face.as_str().into());
    }
}

fn put(record: &mut Attributes, key: &str, value: impl Into<String>) {
    record.insert(key.to_string(), value.into());
}

/// Reuse `old` as the new ID when it is a UUID not taken in `live`.
fn reusable_id<V>(old: &str, live: &BTreeMap<Uuid, V>) -> Uuid {
    match Uuid::parse_str(old) {
        Ok(id) if !id.is_nil() && !live.contains_key(&id) => id,
        _ => Uuid::new_v4(),
    }
}

impl Document {
    // =====================================================================
    // Writing
    // =====================================================================

    /// Snapshot of the whole document.
    pub fn to_snapshot(&self) -> Snapshot {
        self.to_snapshot_for(&BTreeSet::new(), SnapshotFor::Document)
    }

    /// Snapshot limited to `limit_node_ids` (all nodes when empty).
    ///
    /// A limited snapshot also carries the parts owning those nodes, the
    /// components above them, and only the edges with both ends included.
    pub fn to_snapshot_for(&self, limit_node_ids: &BTreeSet<Uuid>, for_what: SnapshotFor) -> Snapshot {
        let mut snapshot = Snapshot::new();
        if for_what.includes_nodes() {
            self.write_skeleton(&mut snapshot, limit_node_ids);
        }
        if for_what.includes_bones() {
            self.write_bones(&mut snapshot);
        }
        if for_what == SnapshotFor::Document {
            put(&mut snapshot.canvas, "originX", float_text(self.origin.x));
            put(&mut snapshot.canvas, "originY", float_text(self.origin.y));
            put(&mut snapshot.canvas, "originZ", float_text(self.origin.z));
        }
        snapshot
    }

    fn write_skeleton(&self, snapshot: &mut Snapshot, limit_node_ids: &BTreeSet<Uuid>) {
        let mut limit_part_ids = BTreeSet::new();
        let mut limit_component_ids = BTreeSet::new();
        let mut include_root = limit_node_ids.is_empty();
        for node_id in limit_node_ids {
            let Some(part) = self.nodes.get(node_id).and_then(|n| self.parts.get(&n.part_id)) else {
                continue;
            };
            limit_part_ids.insert(part.id);
            let mut current = part.component_id;
            while let Some(id) = current {
                if !limit_component_ids.insert(id) {
                    break;
                }
                current = self.components.get(&id).and_then(|c| c.parent_id);
            }
            include_root = true;
        }
        let limited = !limit_node_ids.is_empty();

        for part in self.parts.values() {
            if limited && !limit_part_ids.contains(&part.id) {
                continue;
            }
            snapshot.parts.insert(part.id.to_string(), part_record(part));
        }
        for node in self.nodes.values() {
            if limited && !limit_node_ids.contains(&node.id) {
                continue;
            }
            snapshot.nodes.insert(node.id.to_string(), node_record(node));
        }
        for edge in self.edges.values() {
            if limited && !edge.node_ids.iter().all(|id| limit_node_ids.contains(id)) {
                continue;
            }
            let mut record = Attributes::new();
            put(&mut record, "id", edge.id.to_string());
            put(&mut record, "from", edge.node_ids[0].to_string());
            put(&mut record, "to", edge.node_ids[1].to_string());
            put(&mut record, "partId", edge.part_id.to_string());
            if !edge.name.is_empty() {
                put(&mut record, "name", edge.name.clone());
            }
            snapshot.edges.insert(edge.id.to_string(), record);
        }
        for component in self.components.values() {
            if limited && !limit_component_ids.contains(&component.id) {
                continue;
            }
            snapshot
                .components
                .insert(component.id.to_string(), component_record(component));
        }
        if include_root && !self.root_component.children_ids.is_empty() {
            put(
                &mut snapshot.root_component,
                "children",
                join_list(self.root_component.children_ids.iter().map(Uuid::to_string)),
            );
        }
    }

    fn write_bones(&self, snapshot: &mut Snapshot) {
        if self.bone_id_list.is_empty() {
            return;
        }
        snapshot.bone_id_list = self.bone_id_list.iter().map(Uuid::to_string).collect();
        for bone in self.bones.values() {
            let mut record = Attributes::new();
            put(&mut record, "id", bone.id.to_string());
            if let Some(attach) = bone.attach_bone_id {
                put(&mut record, "attachBoneId", attach.to_string());
                put(&mut record, "attachBoneJointIndex", bone.attach_bone_joint_index.to_string());
            }
            if !bone.name.is_empty() {
                put(&mut record, "name", bone.name.clone());
            }
            if !bone.joints.is_empty() {
                put(
                    &mut record,
                    "jointNodeIdList",
                    join_list(bone.joints.iter().map(Uuid::to_string)),
                );
            }
            snapshot.bones.insert(bone.id.to_string(), record);
        }
    }

    // =====================================================================
    // Reading
    // =====================================================================

    /// Empty the document without announcing it.
    pub(crate) fn silent_reset(&mut self) {
        self.origin = Point3::origin();
        self.nodes.clear();
        self.edges.clear();
        self.parts.clear();
        self.components.clear();
        self.root_component = Component::root();
        self.bones.clear();
        self.bone_id_list.clear();
        self.current_canvas_component_id = None;
        self.bone_picking = BonePicking::default();
    }

    /// Empty the document.
    pub fn reset(&mut self) {
        self.silent_reset();
        self.emit(DocumentEvent::Cleanup);
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Replace the document's content with a snapshot.
    pub fn from_snapshot(&mut self, snapshot: &Snapshot) {
        self.reset();
        self.add_from_snapshot(snapshot, SnapshotSource::Unknown);
    }

    /// Merge a snapshot into the document and return how its IDs were
    /// translated.
    ///
    /// Records that cannot be resolved (nodes or edges of unknown parts,
    /// edges with unknown endpoints, link components of unknown parts) are
    /// skipped. New parts without a component, and new components without
    /// a parent, are attached to the root.
    pub fn add_from_snapshot(&mut self, snapshot: &Snapshot, source: SnapshotSource) -> IdTable {
        let mut table = IdTable::default();

        let mut origin_changed = false;
        if source == SnapshotSource::Unknown {
            let canvas = &snapshot.canvas;
            if ["originX", "originY", "originZ"].iter().all(|key| canvas.contains_key(*key)) {
                self.origin = Point3::new(
                    to_float(value_or_empty(canvas, "originX")),
                    to_float(value_or_empty(canvas, "originY")),
                    to_float(value_or_empty(canvas, "originZ")),
                );
                origin_changed = true;
            }
        }

        let (new_part_ids, inverse_part_ids) = self.read_parts(snapshot, &mut table);
        let new_bone_ids = self.read_bones(snapshot, &mut table);
        let new_node_ids = self.read_nodes(snapshot, &mut table);
        self.read_bone_joints(snapshot, &table);
        let new_edge_ids = self.read_edges(snapshot, &mut table);
        for node_id in &new_node_ids {
            let Some(part_id) = self.nodes.get(node_id).map(|n| n.part_id) else {
                continue;
            };
            if let Some(part) = self.parts.get_mut(&part_id) {
                part.node_ids.push(*node_id);
            }
        }
        let new_component_ids = self.read_components(snapshot, &mut table, &inverse_part_ids);

        for part_id in &new_part_ids {
            let has_component = self
                .parts
                .get(part_id)
                .and_then(|part| part.component_id)
                .is_some_and(|id| self.components.contains_key(&id));
            if !has_component {
                self.add_part_to_component(*part_id, None);
            }
        }
        for component_id in &new_component_ids {
            let orphan = self
                .components
                .get(component_id)
                .is_some_and(|c| c.parent_id.is_none())
                && !self.root_component.children_ids.contains(component_id);
            if orphan {
                self.root_component.add_child(*component_id);
            }
        }

        for id in &new_node_ids {
            self.emit(DocumentEvent::NodeAdded(*id));
        }
        for id in &new_edge_ids {
            self.emit(DocumentEvent::EdgeAdded(*id));
        }
        for id in &new_part_ids {
            self.emit(DocumentEvent::PartAdded(*id));
        }
        self.emit(DocumentEvent::ComponentChildrenChanged(None));
        if origin_changed {
            self.emit(DocumentEvent::OriginChanged);
        }
        for id in &new_bone_ids {
            self.emit(DocumentEvent::BoneAdded(*id));
        }
        self.emit(DocumentEvent::BoneIdListChanged);
        self.emit(DocumentEvent::SkeletonChanged);
        for id in &new_part_ids {
            self.emit(DocumentEvent::PartVisibleStateChanged(*id));
        }
        table
    }

    /// Resolve a donor part reference: a part from this snapshot, else a
    /// part already in the document.
    fn resolve_part_link(&self, table: &IdTable, old: &str) -> Option<Uuid> {
        table.parts.get(old).copied().or_else(|| {
            Uuid::parse_str(old)
                .ok()
                .filter(|id| self.parts.contains_key(id))
        })
    }

    /// Returns the new part IDs and those of legacy `inverse` parts.
    fn read_parts(&mut self, snapshot: &Snapshot, table: &mut IdTable) -> (Vec<Uuid>, BTreeSet<Uuid>) {
        let mut new_part_ids = Vec::new();
        let mut inverse_part_ids = BTreeSet::new();
        let mut pending_links = Vec::new();

        for (old_id, record) in &snapshot.parts {
            let mut part = Part::new(Uuid::new_v4());
            let part_id = part.id;
            table.parts.insert(old_id.clone(), part_id);

            part.name = value_or_empty(record, "name").to_string();
            part.visible = record.get("visible").map_or(true, |v| is_true(v));
            part.locked = is_true(value_or_empty(record, "locked"));
            part.subdived = is_true(value_or_empty(record, "subdived"));
            part.disabled = is_true(value_or_empty(record, "disabled"));
            part.x_mirrored = is_true(value_or_empty(record, "xMirrored"));
            part.rounded = is_true(value_or_empty(record, "rounded"));
            part.chamfered = is_true(value_or_empty(record, "chamfered"));
            part.target = PartTarget::from_str(value_or_empty(record, "target")).unwrap_or_default();
            if let Some(value) = record.get("cutRotation") {
                part.set_cut_rotation(to_float(value));
            }
            if let Some(value) = record.get("cutFace") {
                match parse_cut_face(value) {
                    CutFaceValue::BuiltIn(face) => part.set_cut_face(face),
                    CutFaceValue::Linked(old) => pending_links.push((part_id, old.to_string())),
                }
            }
            if let Some(value) = record.get("colorImageId") {
                part.color_image_id = Uuid::parse_str(value).ok();
            }
            if is_true(value_or_empty(record, "inverse")) {
                inverse_part_ids.insert(part_id);
            }
            if let Some(color) = record.get("color").and_then(|v| Color::from_hex(v)) {
                part.color = color;
                part.has_color = true;
            }
            if let Some(value) = record.get("colorSolubility") {
                part.color_solubility = to_float(value);
            }
            if let Some(value) = record.get("metallic") {
                part.metalness = to_float(value);
            }
            if let Some(value) = record.get("roughness") {
                part.roughness = to_float(value);
            }
            if let Some(value) = record.get("deformThickness") {
                part.set_deform_thickness(to_float(value));
            }
            if let Some(value) = record.get("deformWidth") {
                part.set_deform_width(to_float(value));
            }
            part.deform_unified = is_true(value_or_empty(record, "deformUnified"));
            if let Some(value) = record.get("hollowThickness") {
                part.hollow_thickness = to_float(value);
            }
            part.countershaded = is_true(value_or_empty(record, "countershaded"));
            if let Some(value) = record.get("smoothCutoffDegrees") {
                part.smooth_cutoff_degrees = to_float(value);
            }
            self.parts.insert(part_id, part);
            new_part_ids.push(part_id);
        }

        for (part_id, old) in pending_links {
            let linked = self.resolve_part_link(table, &old);
            if let Some(part) = self.parts.get_mut(&part_id) {
                part.set_cut_face_linked_id(linked);
            }
        }
        (new_part_ids, inverse_part_ids)
    }

    fn read_bones(&mut self, snapshot: &Snapshot, table: &mut IdTable) -> Vec<Uuid> {
        let mut new_bone_ids = Vec::new();
        for (old_id, record) in &snapshot.bones {
            let mut bone = Bone::new(Uuid::new_v4());
            table.bones.insert(old_id.clone(), bone.id);
            bone.name = value_or_empty(record, "name").to_string();
            bone.attach_bone_joint_index =
                usize::try_from(to_int(value_or_empty(record, "attachBoneJointIndex"))).unwrap_or(0);
            new_bone_ids.push(bone.id);
            self.bones.insert(bone.id, bone);
        }
        for old_id in &snapshot.bone_id_list {
            match table.bones.get(old_id) {
                Some(id) => self.bone_id_list.push(*id),
                None => debug!(bone_id = %old_id, "listed bone not in snapshot"),
            }
        }
        for (old_id, record) in &snapshot.bones {
            let attach = value_or_empty(record, "attachBoneId");
            if attach.is_empty() {
                continue;
            }
            let attach_id = table.bones.get(attach).copied();
            if let Some(bone) = table.bones.get(old_id).and_then(|id| self.bones.get_mut(id)) {
                bone.attach_bone_id = attach_id;
            }
        }
        new_bone_ids
    }

    fn read_nodes(&mut self, snapshot: &Snapshot, table: &mut IdTable) -> Vec<Uuid> {
        let mut new_node_ids = Vec::new();
        for (old_id, record) in &snapshot.nodes {
            if !["radius", "x", "y", "z", "partId"]
                .iter()
                .all(|key| record.contains_key(*key))
            {
                continue;
            }
            let Some(part_id) = table.parts.get(value_or_empty(record, "partId")).copied() else {
                debug!(node_id = %old_id, "node part not in snapshot");
                continue;
            };
            let node_id = reusable_id(old_id, &self.nodes);
            table.nodes.insert(old_id.clone(), node_id);

            let mut node = Node::new(node_id, part_id);
            node.name = value_or_empty(record, "name").to_string();
            node.radius = to_float(value_or_empty(record, "radius"));
            node.position = Point3::new(
                to_float(value_or_empty(record, "x")),
                to_float(value_or_empty(record, "y")),
                to_float(value_or_empty(record, "z")),
            );
            if let Some(value) = record.get("cutRotation") {
                node.set_cut_rotation(to_float(value));
            }
            if let Some(value) = record.get("cutFace") {
                match parse_cut_face(value) {
                    CutFaceValue::BuiltIn(face) => node.set_cut_face(face),
                    CutFaceValue::Linked(old) => {
                        let linked = self.resolve_part_link(table, old);
                        node.set_cut_face_linked_id(linked);
                    }
                }
            }
            for old_bone in split_list(value_or_empty(record, "boneIdList")) {
                if let Some(bone_id) = table.bones.get(old_bone) {
                    node.bone_ids.insert(*bone_id);
                }
            }
            self.nodes.insert(node_id, node);
            new_node_ids.push(node_id);
        }
        new_node_ids
    }

    fn read_bone_joints(&mut self, snapshot: &Snapshot, table: &IdTable) {
        for (old_id, record) in &snapshot.bones {
            let Some(bone_id) = table.bones.get(old_id).copied() else {
                continue;
            };
            let mut joints = Vec::new();
            for old_node in split_list(value_or_empty(record, "jointNodeIdList")) {
                let Some(node_id) = table.nodes.get(old_node).copied() else {
                    continue;
                };
                if let Some(node) = self.nodes.get_mut(&node_id) {
                    node.bone_joint = true;
                    node.as_bone_joints.insert(bone_id);
                }
                joints.push(node_id);
            }
            if let Some(bone) = self.bones.get_mut(&bone_id) {
                bone.joints = joints;
            }
        }
    }

    fn read_edges(&mut self, snapshot: &Snapshot, table: &mut IdTable) -> Vec<Uuid> {
        let mut new_edge_ids = Vec::new();
        for (old_id, record) in &snapshot.edges {
            let part_id = table.parts.get(value_or_empty(record, "partId")).copied();
            let from = table.nodes.get(value_or_empty(record, "from")).copied();
            let to = table.nodes.get(value_or_empty(record, "to")).copied();
            let (Some(part_id), Some(from), Some(to)) = (part_id, from, to) else {
                debug!(edge_id = %old_id, "edge references outside snapshot");
                continue;
            };
            let edge_id = reusable_id(old_id, &self.edges);
            table.edges.insert(old_id.clone(), edge_id);

            let mut edge = Edge::new(edge_id, part_id, from, to);
            edge.name = value_or_empty(record, "name").to_string();
            for node_id in [from, to] {
                if let Some(node) = self.nodes.get_mut(&node_id) {
                    node.edge_ids.push(edge_id);
                }
            }
            self.edges.insert(edge_id, edge);
            new_edge_ids.push(edge_id);
        }
        new_edge_ids
    }

    fn read_components(
        &mut self,
        snapshot: &Snapshot,
        table: &mut IdTable,
        inverse_part_ids: &BTreeSet<Uuid>,
    ) -> Vec<Uuid> {
        let mut new_component_ids = Vec::new();
        for (old_id, record) in &snapshot.components {
            let link_to_part_id = if value_or_empty(record, "linkDataType") == LINK_DATA_TYPE_PART {
                match table.parts.get(value_or_empty(record, "linkData")) {
                    Some(id) => Some(*id),
                    None => {
                        debug!(component_id = %old_id, "linked part not in snapshot");
                        continue;
                    }
                }
            } else {
                None
            };

            let mut component = Component::new(Uuid::new_v4());
            let component_id = component.id;
            table.components.insert(old_id.clone(), component_id);
            component.name = value_or_empty(record, "name").to_string();
            component.expanded = is_true(value_or_empty(record, "expanded"));
            component.combine_mode =
                CombineMode::from_str(value_or_empty(record, "combineMode")).unwrap_or_default();
            if component.combine_mode == CombineMode::Normal
                && is_true(value_or_empty(record, "inverse"))
            {
                component.combine_mode = CombineMode::Inversion;
            }
            if let Some(part_id) = link_to_part_id {
                component.link_to_part_id = Some(part_id);
                if let Some(part) = self.parts.get_mut(&part_id) {
                    part.component_id = Some(component_id);
                }
                if inverse_part_ids.contains(&part_id) {
                    component.combine_mode = CombineMode::Inversion;
                }
            }
            self.components.insert(component_id, component);
            new_component_ids.push(component_id);
        }

        for old_child in split_list(value_or_empty(&snapshot.root_component, "children")) {
            if let Some(child_id) = table.components.get(old_child) {
                self.root_component.add_child(*child_id);
            }
        }
        for (old_id, record) in &snapshot.components {
            let Some(component_id) = table.components.get(old_id).copied() else {
                continue;
            };
            for old_child in split_list(value_or_empty(record, "children")) {
                let Some(child_id) = table.components.get(old_child).copied() else {
                    continue;
                };
                if let Some(component) = self.components.get_mut(&component_id) {
                    component.add_child(child_id);
                }
                if let Some(child) = self.components.get_mut(&child_id) {
                    child.parent_id = Some(component_id);
                }
            }
        }
        new_component_ids
    }
}

fn part_record(part: &Part) -> Attributes {
    let mut record = Attributes::new();
    put(&mut record, "id", part.id.to_string());
    put(&mut record, "visible", bool_text(part.visible));
    put(&mut record, "locked", bool_text(part.locked));
    put(&mut record, "subdived", bool_text(part.subdived));
    put(&mut record, "disabled", bool_text(part.disabled));
    put(&mut record, "xMirrored", bool_text(part.x_mirrored));
    put(&mut record, "rounded", bool_text(part.rounded));
    put(&mut record, "chamfered", bool_text(part.chamfered));
    if part.target != PartTarget::Model {
        put(&mut record, "target", part.target.as_str());
    }
    if part.cut_rotation_adjusted() {
        put(&mut record, "cutRotation", float_text(part.cut_rotation));
    }
    if part.cut_face_adjusted() {
        write_cut_face(&mut record, part.cut_face, part.cut_face_linked_id);
    }
    if let Some(image_id) = part.color_image_id {
        put(&mut record, "colorImageId", image_id.to_string());
    }
    put(&mut record, "__dirty", bool_text(part.dirty));
    if part.has_color {
        put(&mut record, "color", part.color.to_hex_argb());
    }
    if part.color_solubility_adjusted() {
        put(&mut record, "colorSolubility", float_text(part.color_solubility));
    }
    if part.metalness_adjusted() {
        put(&mut record, "metallic", float_text(part.metalness));
    }
    if part.roughness_adjusted() {
        put(&mut record, "roughness", float_text(part.roughness));
    }
    if part.deform_thickness_adjusted() {
        put(&mut record, "deformThickness", float_text(part.deform_thickness));
    }
    if part.deform_width_adjusted() {
        put(&mut record, "deformWidth", float_text(part.deform_width));
    }
    if part.deform_unified {
        put(&mut record, "deformUnified", "true");
    }
    if part.hollow_thickness_adjusted() {
        put(&mut record, "hollowThickness", float_text(part.hollow_thickness));
    }
    if !part.name.is_empty() {
        put(&mut record, "name", part.name.clone());
    }
    if part.countershaded {
        put(&mut record, "countershaded", "true");
    }
    if part.smooth_cutoff_degrees > 0.0 {
        put(&mut record, "smoothCutoffDegrees", float_text(part.smooth_cutoff_degrees));
    }
    record
}

fn node_record(node: &Node) -> Attributes {
    let mut record = Attributes::new();
    put(&mut record, "id", node.id.to_string());
    put(&mut record, "radius", float_text(node.radius));
    put(&mut record, "x", float_text(node.position.x));
    put(&mut record, "y", float_text(node.position.y));
    put(&mut record, "z", float_text(node.position.z));
    put(&mut record, "partId", node.part_id.to_string());
    if node.has_cut_face_settings {
        put(&mut record, "cutRotation", float_text(node.cut_rotation));
        write_cut_face(&mut record, node.cut_face, node.cut_face_linked_id);
    }
    if !node.name.is_empty() {
        put(&mut record, "name", node.name.clone());
    }
    if !node.bone_ids.is_empty() {
        put(
            &mut record,
            "boneIdList",
            join_list(node.bone_ids.iter().map(Uuid::to_string)),
        );
    }
    record
}

fn component_record(component: &Component) -> Attributes {
    let mut record = Attributes::new();
    put(&mut record, "id", component.id.to_string());
    if !component.name.is_empty() {
        put(&mut record, "name", component.name.clone());
    }
    put(&mut record, "expanded", bool_text(component.expanded));
    put(&mut record, "combineMode", component.combine_mode.as_str());
    put(&mut record, "__dirty", bool_text(component.dirty));
    if !component.children_ids.is_empty() {
        put(
            &mut record,
            "children",
            join_list(component.children_ids.iter().map(Uuid::to_string)),
        );
    }
    let link_data = component.link_data();
    if !link_data.is_empty() {
        put(&mut record, "linkData", link_data);
        put(&mut record, "linkDataType", component.link_data_type());
    }
    record
}
