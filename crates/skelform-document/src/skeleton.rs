//! Node and edge operations, including part splitting and merging.
//!
//! Removing a node or an edge can disconnect its part. The remaining nodes
//! are partitioned into connected groups, each group becomes a new part
//! carrying the old part's attributes, and the old part is removed. The
//! largest group inherits any cut-face links to the old part; on a tie the
//! group found first wins.
//!
//! Connecting nodes of two different parts moves the whole connected group
//! of the destination node into the source node's part and removes the
//! emptied part.

use std::collections::BTreeSet;

use skelform_ir::CutFace;
use skelform_math::{Point3, Tolerance, Vec3};
use tracing::debug;
use uuid::Uuid;

use crate::document::Document;
use crate::entity::{Edge, Node, Part};
use crate::event::{DocumentEvent, LockAxis};

impl Document {
    // =====================================================================
    // Connectivity
    // =====================================================================

    /// Nodes connected to `start` without crossing `skip_edge`, in
    /// depth-first order. Nodes already in `visited` are not entered.
    pub(crate) fn join_node_and_neighbors_to_group(
        &self,
        start: Uuid,
        visited: &mut BTreeSet<Uuid>,
        skip_edge: Option<Uuid>,
    ) -> Vec<Uuid> {
        let mut group = Vec::new();
        let mut stack = vec![start];
        while let Some(node_id) = stack.pop() {
            if visited.contains(&node_id) {
                continue;
            }
            let Some(node) = self.nodes.get(&node_id) else {
                continue;
            };
            visited.insert(node_id);
            group.push(node_id);
            let mut next = Vec::new();
            for edge_id in &node.edge_ids {
                if Some(*edge_id) == skip_edge {
                    continue;
                }
                if let Some(edge) = self.edges.get(edge_id) {
                    next.extend(edge.node_ids);
                }
            }
            stack.extend(next.into_iter().rev());
        }
        group
    }

    /// Connected groups left after removing `node_id`.
    pub(crate) fn split_part_by_node(&self, node_id: Uuid) -> Vec<Vec<Uuid>> {
        let Some(node) = self.nodes.get(&node_id) else {
            return Vec::new();
        };
        let mut visited = BTreeSet::from([node_id]);
        let mut groups = Vec::new();
        for edge_id in &node.edge_ids {
            let Some(neighbor) = self.edges.get(edge_id).and_then(|e| e.neighbor_of(node_id))
            else {
                continue;
            };
            let group = self.join_node_and_neighbors_to_group(neighbor, &mut visited, Some(*edge_id));
            if !group.is_empty() {
                groups.push(group);
            }
        }
        groups
    }

    /// Connected groups left after removing `edge_id`.
    pub(crate) fn split_part_by_edge(&self, edge_id: Uuid) -> Vec<Vec<Uuid>> {
        let Some(edge) = self.edges.get(&edge_id) else {
            return Vec::new();
        };
        let mut visited = BTreeSet::new();
        let mut groups = Vec::new();
        for node_id in edge.node_ids {
            let group = self.join_node_and_neighbors_to_group(node_id, &mut visited, Some(edge_id));
            if !group.is_empty() {
                groups.push(group);
            }
        }
        groups
    }

    /// Move each group into a fresh copy of `old_part_id`, placed beside
    /// the old part's link component. Returns `(new part, node count)`.
    fn split_part_into_groups(&mut self, old_part_id: Uuid, groups: &[Vec<Uuid>]) -> Vec<(Uuid, usize)> {
        let Some(old_part) = self.parts.get(&old_part_id).cloned() else {
            return Vec::new();
        };
        let parent_id = old_part
            .component_id
            .and_then(|id| self.find_component_parent_id(id));

        let mut new_parts = Vec::with_capacity(groups.len());
        for group in groups {
            let part_id = Uuid::new_v4();
            let mut part = Part::new(part_id);
            part.copy_attributes(&old_part);
            part.name = old_part.name.clone();
            part.dirty = true;
            for node_id in group {
                let Some(node) = self.nodes.get_mut(node_id) else {
                    continue;
                };
                node.part_id = part_id;
                part.node_ids.push(*node_id);
                for edge_id in node.edge_ids.clone() {
                    if let Some(edge) = self.edges.get_mut(&edge_id) {
                        edge.part_id = part_id;
                    }
                }
            }
            new_parts.push((part_id, part.node_ids.len()));
            self.parts.insert(part_id, part);
            self.add_part_to_component(part_id, parent_id);
            self.emit(DocumentEvent::PartAdded(part_id));
        }
        new_parts
    }

    /// Remove the split part and hand its cut-face links to the largest
    /// replacement.
    fn retire_split_part(&mut self, old_part_id: Uuid, mut new_parts: Vec<(Uuid, usize)>) {
        self.remove_part(old_part_id);
        new_parts.sort_by(|a, b| b.1.cmp(&a.1));
        if let Some((largest, _)) = new_parts.first() {
            self.update_linked_part(old_part_id, *largest);
        }
    }

    /// Point every cut-face link to `old_part_id` at `new_part_id`.
    pub(crate) fn update_linked_part(&mut self, old_part_id: Uuid, new_part_id: Uuid) {
        for part in self.parts.values_mut() {
            if part.cut_face_linked_id == Some(old_part_id) {
                part.dirty = true;
                part.set_cut_face_linked_id(Some(new_part_id));
            }
        }
        let mut dirty_part_ids = BTreeSet::new();
        for node in self.nodes.values_mut() {
            if node.cut_face_linked_id == Some(old_part_id) {
                dirty_part_ids.insert(node.part_id);
                node.set_cut_face_linked_id(Some(new_part_id));
            }
        }
        for part_id in dirty_part_ids {
            self.mark_part_dirty(part_id);
        }
    }

    // =====================================================================
    // Creation
    // =====================================================================

    /// Add a node. Without `from_node_id` the node starts a new part under
    /// the current canvas component; otherwise it joins that node's part
    /// connected by a new edge.
    pub fn add_node(&mut self, position: Point3, radius: f64, from_node_id: Option<Uuid>) -> Option<Uuid> {
        self.create_node(Uuid::new_v4(), position, radius, from_node_id)
    }

    /// [`add_node`](Self::add_node) with a caller-chosen ID. Ignored when
    /// the ID is taken.
    pub fn add_node_with_id(
        &mut self,
        node_id: Uuid,
        position: Point3,
        radius: f64,
        from_node_id: Option<Uuid>,
    ) -> Option<Uuid> {
        self.create_node(node_id, position, radius, from_node_id)
    }

    fn create_node(
        &mut self,
        node_id: Uuid,
        position: Point3,
        radius: f64,
        from_node_id: Option<Uuid>,
    ) -> Option<Uuid> {
        if self.nodes.contains_key(&node_id) {
            debug!(%node_id, "node already exists");
            return None;
        }
        let (part_id, new_part) = match from_node_id {
            None => {
                let part_id = Uuid::new_v4();
                self.parts.insert(part_id, Part::new(part_id));
                self.emit(DocumentEvent::PartAdded(part_id));
                (part_id, true)
            }
            Some(from_id) => {
                let part_id = self.nodes.get(&from_id)?.part_id;
                if self.is_part_readonly(part_id) {
                    return None;
                }
                self.mark_part_dirty(part_id);
                (part_id, false)
            }
        };

        let mut node = Node::new(node_id, part_id);
        node.set_radius(radius);
        node.position = position;
        self.nodes.insert(node_id, node);
        if let Some(part) = self.parts.get_mut(&part_id) {
            part.node_ids.push(node_id);
        }
        self.emit(DocumentEvent::NodeAdded(node_id));

        if let Some(from_id) = from_node_id {
            let edge_id = Uuid::new_v4();
            self.edges
                .insert(edge_id, Edge::new(edge_id, part_id, from_id, node_id));
            for id in [node_id, from_id] {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.edge_ids.push(edge_id);
                }
            }
            self.emit(DocumentEvent::EdgeAdded(edge_id));
        }

        if new_part {
            self.add_part_to_component(part_id, self.current_canvas_component_id);
        }
        self.emit(DocumentEvent::SkeletonChanged);
        Some(node_id)
    }

    /// Connect two nodes. Nodes of different parts merge the destination's
    /// connected group into the source's part.
    pub fn add_edge(&mut self, from_node_id: Uuid, to_node_id: Uuid) {
        if from_node_id == to_node_id || self.find_edge_by_nodes(from_node_id, to_node_id).is_some() {
            return;
        }
        let Some(from_part_id) = self.nodes.get(&from_node_id).map(|n| n.part_id) else {
            return;
        };
        if self.is_part_readonly(from_part_id) {
            return;
        }
        let Some(to_part_id) = self.nodes.get(&to_node_id).map(|n| n.part_id) else {
            return;
        };
        if self.is_part_readonly(to_part_id) {
            return;
        }
        self.mark_part_dirty(from_part_id);

        let merging = from_part_id != to_part_id;
        if merging {
            let group = self.join_node_and_neighbors_to_group(to_node_id, &mut BTreeSet::new(), None);
            for node_id in group {
                let Some(node) = self.nodes.get_mut(&node_id) else {
                    continue;
                };
                node.part_id = from_part_id;
                for edge_id in node.edge_ids.clone() {
                    if let Some(edge) = self.edges.get_mut(&edge_id) {
                        edge.part_id = from_part_id;
                    }
                }
                if let Some(part) = self.parts.get_mut(&from_part_id) {
                    part.node_ids.push(node_id);
                }
            }
        }

        let edge_id = Uuid::new_v4();
        self.edges.insert(
            edge_id,
            Edge::new(edge_id, from_part_id, from_node_id, to_node_id),
        );
        for id in [to_node_id, from_node_id] {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.edge_ids.push(edge_id);
            }
        }
        self.emit(DocumentEvent::EdgeAdded(edge_id));

        if merging {
            self.update_linked_part(to_part_id, from_part_id);
            self.remove_part(to_part_id);
        }
        self.emit(DocumentEvent::SkeletonChanged);
    }

    // =====================================================================
    // Removal
    // =====================================================================

    /// Remove a node and its edges, splitting its part as needed.
    pub fn remove_node(&mut self, node_id: Uuid) {
        let Some(node) = self.nodes.get(&node_id).cloned() else {
            return;
        };
        if self.is_part_readonly(node.part_id) {
            return;
        }
        let old_part_id = node.part_id;
        let groups = self.split_part_by_node(node_id);
        let new_parts = self.split_part_into_groups(old_part_id, &groups);

        for edge_id in &node.edge_ids {
            let Some(neighbor_id) = self.edges.get(edge_id).and_then(|e| e.neighbor_of(node_id))
            else {
                continue;
            };
            let Some(neighbor) = self.nodes.get_mut(&neighbor_id) else {
                continue;
            };
            neighbor.edge_ids.retain(|id| id != edge_id);
            self.edges.remove(edge_id);
            self.emit(DocumentEvent::EdgeRemoved(*edge_id));
        }
        self.nodes.remove(&node_id);
        self.emit(DocumentEvent::NodeRemoved(node_id));

        self.retire_split_part(old_part_id, new_parts);
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Remove an edge, splitting its part if it was a bridge.
    pub fn remove_edge(&mut self, edge_id: Uuid) {
        let Some(edge) = self.edges.get(&edge_id).cloned() else {
            return;
        };
        if self.is_part_readonly(edge.part_id) {
            return;
        }
        let old_part_id = edge.part_id;
        let groups = self.split_part_by_edge(edge_id);
        let new_parts = self.split_part_into_groups(old_part_id, &groups);

        for node_id in edge.node_ids {
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };
            node.edge_ids.retain(|id| *id != edge_id);
            self.emit(DocumentEvent::NodeOriginChanged(node_id));
        }
        self.edges.remove(&edge_id);
        self.emit(DocumentEvent::EdgeRemoved(edge_id));

        self.retire_split_part(old_part_id, new_parts);
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Replace a node that has exactly two edges by a direct edge between
    /// its neighbors.
    pub fn reduce_node(&mut self, node_id: Uuid) {
        let Some(node) = self.nodes.get(&node_id) else {
            return;
        };
        if node.edge_ids.len() != 2 || self.is_part_readonly(node.part_id) {
            return;
        }
        let neighbors: Vec<Uuid> = node
            .edge_ids
            .iter()
            .filter_map(|id| self.edges.get(id))
            .filter_map(|edge| edge.neighbor_of(node_id))
            .collect();
        let [first, second] = neighbors[..] else {
            return;
        };
        self.remove_node(node_id);
        self.add_edge(first, second);
    }

    /// Insert a node halfway along an edge.
    pub fn break_edge(&mut self, edge_id: Uuid) {
        let Some(edge) = self.edges.get(&edge_id) else {
            return;
        };
        if self.is_part_readonly(edge.part_id) {
            return;
        }
        let [first_id, second_id] = edge.node_ids;
        let (Some(first), Some(second)) = (self.nodes.get(&first_id), self.nodes.get(&second_id))
        else {
            return;
        };
        let middle = Point3::from((first.position.coords + second.position.coords) / 2.0);
        let radius = (first.radius + second.radius) / 2.0;

        self.remove_edge(edge_id);
        let Some(middle_id) = self.create_node(Uuid::new_v4(), middle, radius, Some(first_id)) else {
            return;
        };
        self.add_edge(middle_id, second_id);
    }

    /// Swap an edge's endpoints.
    pub fn reverse_edge(&mut self, edge_id: Uuid) {
        let Some(part_id) = self.edges.get(&edge_id).map(|e| e.part_id) else {
            return;
        };
        if self.is_part_readonly(part_id) {
            return;
        }
        if let Some(edge) = self.edges.get_mut(&edge_id) {
            edge.node_ids.swap(0, 1);
        }
        self.mark_part_dirty(part_id);
        self.emit(DocumentEvent::EdgeReversed(edge_id));
        self.emit(DocumentEvent::SkeletonChanged);
    }

    // =====================================================================
    // Node geometry
    // =====================================================================

    /// Whether position edits on this part are refused.
    fn position_edit_refused(&self, part_id: Uuid) -> bool {
        self.all_position_related_locks_enabled && self.is_part_readonly(part_id)
    }

    fn finish_node_move(&mut self, node_id: Uuid, part_id: Uuid) {
        self.mark_part_dirty(part_id);
        self.emit(DocumentEvent::NodeOriginChanged(node_id));
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Move a node, honoring axis locks.
    pub fn move_node_by(&mut self, node_id: Uuid, delta: Vec3) {
        let Some(part_id) = self.nodes.get(&node_id).map(|n| n.part_id) else {
            return;
        };
        if self.position_edit_refused(part_id) {
            return;
        }
        let free = [
            !self.is_axis_locked(LockAxis::X),
            !self.is_axis_locked(LockAxis::Y),
            !self.is_axis_locked(LockAxis::Z),
        ];
        if !free.iter().any(|f| *f) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            for axis in 0..3 {
                if free[axis] {
                    node.position[axis] += delta[axis];
                }
            }
        }
        self.finish_node_move(node_id, part_id);
    }

    /// Place a node, honoring axis locks.
    pub fn set_node_origin(&mut self, node_id: Uuid, position: Point3) {
        let Some(part_id) = self.nodes.get(&node_id).map(|n| n.part_id) else {
            return;
        };
        if self.position_edit_refused(part_id) {
            return;
        }
        let free = [
            !self.is_axis_locked(LockAxis::X),
            !self.is_axis_locked(LockAxis::Y),
            !self.is_axis_locked(LockAxis::Z),
        ];
        if let Some(node) = self.nodes.get_mut(&node_id) {
            for axis in 0..3 {
                if free[axis] {
                    node.position[axis] = position[axis];
                }
            }
        }
        self.finish_node_move(node_id, part_id);
    }

    /// Exchange a node's X and Z.
    pub fn switch_node_xz(&mut self, node_id: Uuid) {
        let Some(part_id) = self.nodes.get(&node_id).map(|n| n.part_id) else {
            return;
        };
        if self.is_part_readonly(part_id) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            let position = &mut node.position;
            position.coords.swap_rows(0, 2);
        }
        self.finish_node_move(node_id, part_id);
    }

    /// Set a node's radius unless radius is locked.
    pub fn set_node_radius(&mut self, node_id: Uuid, radius: f64) {
        let Some(part_id) = self.nodes.get(&node_id).map(|n| n.part_id) else {
            return;
        };
        if self.is_part_readonly(part_id) {
            return;
        }
        if !self.radius_locked {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.set_radius(radius);
            }
        }
        self.mark_part_dirty(part_id);
        self.emit(DocumentEvent::NodeRadiusChanged(node_id));
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Grow or shrink a node's radius by `amount`.
    pub fn scale_node_by_add_radius(&mut self, node_id: Uuid, amount: f64) {
        let Some(part_id) = self.nodes.get(&node_id).map(|n| n.part_id) else {
            return;
        };
        if self.is_part_readonly(part_id) || self.radius_locked {
            return;
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.set_radius(node.radius + amount);
        }
        self.mark_part_dirty(part_id);
        self.emit(DocumentEvent::NodeRadiusChanged(node_id));
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Flag a node as a bone joint.
    pub fn set_node_bone_joint_state(&mut self, node_id: Uuid, bone_joint: bool) {
        let Some(node) = self.nodes.get(&node_id) else {
            return;
        };
        if self.is_part_readonly(node.part_id) || node.bone_joint == bone_joint {
            return;
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.bone_joint = bone_joint;
        }
        self.emit(DocumentEvent::NodeBoneJointStateChanged(node_id));
        self.emit(DocumentEvent::RigChanged);
    }

    // =====================================================================
    // Node cut settings
    // =====================================================================

    /// Apply `change` to a node's cut settings when `unchanged` is false.
    fn edit_node_cut(
        &mut self,
        node_id: Uuid,
        unchanged: impl FnOnce(&Node) -> bool,
        change: impl FnOnce(&mut Node),
        event: DocumentEvent,
    ) {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            debug!(%node_id, "node not found");
            return;
        };
        if unchanged(node) {
            return;
        }
        change(node);
        let part_id = node.part_id;
        self.mark_part_dirty(part_id);
        self.emit(event);
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Override a node's cut rotation.
    pub fn set_node_cut_rotation(&mut self, node_id: Uuid, cut_rotation: f64) {
        self.edit_node_cut(
            node_id,
            |node| Tolerance::DEFAULT.is_equal(node.cut_rotation, cut_rotation),
            |node| node.set_cut_rotation(cut_rotation),
            DocumentEvent::NodeCutRotationChanged(node_id),
        );
    }

    /// Override a node's cut face with a built-in profile.
    pub fn set_node_cut_face(&mut self, node_id: Uuid, cut_face: CutFace) {
        self.edit_node_cut(
            node_id,
            |node| node.cut_face == cut_face,
            |node| node.set_cut_face(cut_face),
            DocumentEvent::NodeCutFaceChanged(node_id),
        );
    }

    /// Override a node's cut face with another part's profile.
    pub fn set_node_cut_face_linked_id(&mut self, node_id: Uuid, linked_id: Option<Uuid>) {
        self.edit_node_cut(
            node_id,
            |node| node.cut_face == CutFace::UserDefined && node.cut_face_linked_id == linked_id,
            |node| node.set_cut_face_linked_id(linked_id),
            DocumentEvent::NodeCutFaceChanged(node_id),
        );
    }

    /// Drop a node's cut overrides.
    pub fn clear_node_cut_face_settings(&mut self, node_id: Uuid) {
        self.edit_node_cut(
            node_id,
            |node| !node.has_cut_face_settings,
            Node::clear_cut_face_settings,
            DocumentEvent::NodeCutFaceChanged(node_id),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(x: f64) -> Point3 {
        Point3::new(x, 0.5, 0.5)
    }

    /// Star: a center node with three arms of one node each.
    fn star(doc: &mut Document) -> (Uuid, [Uuid; 3]) {
        let center = doc.add_node(at(0.5), 0.1, None).unwrap();
        let arms = [0.2, 0.7, 0.9].map(|x| doc.add_node(at(x), 0.05, Some(center)).unwrap());
        (center, arms)
    }

    fn assert_referential_integrity(doc: &Document) {
        for (id, node) in doc.nodes() {
            assert!(doc.parts().contains_key(&node.part_id), "node {id} has no part");
            for edge_id in &node.edge_ids {
                assert!(doc.edges().contains_key(edge_id));
            }
        }
        for edge in doc.edges().values() {
            for node_id in edge.node_ids {
                let node = &doc.nodes()[&node_id];
                assert_eq!(node.part_id, edge.part_id);
            }
        }
        for (part_id, part) in doc.parts() {
            let component = doc.find_component(part.component_id).unwrap();
            assert_eq!(component.link_to_part_id, Some(*part_id));
        }
    }

    #[test]
    fn test_add_node_creates_part_and_link_component() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        let b = doc.add_node(at(0.3), 0.1, Some(a)).unwrap();
        assert_eq!(doc.parts().len(), 1);
        assert_eq!(doc.edges().len(), 1);
        assert_eq!(doc.components().len(), 1);
        assert_eq!(doc.root_component().children_ids.len(), 1);
        assert_eq!(doc.nodes()[&a].part_id, doc.nodes()[&b].part_id);
        assert_referential_integrity(&doc);

        let events = doc.drain_events();
        assert!(events.contains(&DocumentEvent::NodeAdded(b)));
        assert_eq!(events.last(), Some(&DocumentEvent::SkeletonChanged));
    }

    #[test]
    fn test_add_node_with_taken_id_is_ignored() {
        let mut doc = Document::new();
        let id = Uuid::new_v4();
        assert_eq!(doc.add_node_with_id(id, at(0.1), 0.1, None), Some(id));
        assert_eq!(doc.add_node_with_id(id, at(0.2), 0.1, None), None);
        assert_eq!(doc.nodes().len(), 1);
    }

    #[test]
    fn test_remove_cut_vertex_splits_part() {
        let mut doc = Document::new();
        let (center, arms) = star(&mut doc);
        let old_part = doc.nodes()[&center].part_id;

        doc.remove_node(center);

        assert_eq!(doc.parts().len(), 3);
        assert!(!doc.parts().contains_key(&old_part));
        let owners: BTreeSet<Uuid> = arms.iter().map(|id| doc.nodes()[id].part_id).collect();
        assert_eq!(owners.len(), 3);
        let remaining: BTreeSet<Uuid> = doc
            .parts()
            .values()
            .flat_map(|part| part.node_ids.iter().copied())
            .collect();
        assert_eq!(remaining, arms.iter().copied().collect());
        assert!(doc.edges().is_empty());
        assert_eq!(doc.components().len(), 3);
        assert_referential_integrity(&doc);
    }

    #[test]
    fn test_remove_bridge_edge_splits_part() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        let b = doc.add_node(at(0.2), 0.1, Some(a)).unwrap();
        let c = doc.add_node(at(0.3), 0.1, Some(b)).unwrap();
        let bridge = doc.find_edge_by_nodes(a, b).unwrap().id;

        doc.remove_edge(bridge);

        assert_eq!(doc.parts().len(), 2);
        assert_ne!(doc.nodes()[&a].part_id, doc.nodes()[&b].part_id);
        assert_eq!(doc.nodes()[&b].part_id, doc.nodes()[&c].part_id);
        assert!(doc.nodes()[&a].edge_ids.is_empty());
        assert_referential_integrity(&doc);
    }

    #[test]
    fn test_remove_cycle_edge_keeps_one_part() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        let b = doc.add_node(at(0.2), 0.1, Some(a)).unwrap();
        let c = doc.add_node(at(0.3), 0.1, Some(b)).unwrap();
        doc.add_edge(c, a);
        let closing = doc.find_edge_by_nodes(c, a).unwrap().id;

        doc.remove_edge(closing);

        assert_eq!(doc.parts().len(), 1);
        assert_eq!(doc.edges().len(), 2);
        assert_referential_integrity(&doc);
    }

    #[test]
    fn test_largest_group_inherits_cut_face_links() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        let b = doc.add_node(at(0.2), 0.1, Some(a)).unwrap();
        let c = doc.add_node(at(0.3), 0.1, Some(b)).unwrap();
        let d = doc.add_node(at(0.4), 0.1, Some(c)).unwrap();
        let donor = doc.nodes()[&a].part_id;
        let user = doc.add_node(at(0.9), 0.1, None).unwrap();
        let user_part = doc.nodes()[&user].part_id;
        doc.set_part_cut_face_linked_id(user_part, Some(donor));
        doc.set_node_cut_face_linked_id(user, Some(donor));

        doc.remove_edge(doc.find_edge_by_nodes(a, b).unwrap().id);

        let largest = doc.nodes()[&c].part_id;
        assert_eq!(doc.nodes()[&d].part_id, largest);
        assert_eq!(doc.parts()[&user_part].cut_face_linked_id, Some(largest));
        assert_eq!(doc.nodes()[&user].cut_face_linked_id, Some(largest));
        assert_eq!(doc.parts()[&user_part].cut_face, CutFace::UserDefined);
    }

    #[test]
    fn test_add_edge_merges_parts_and_relinks() {
        let mut doc = Document::new();
        let n1 = doc.add_node(at(0.1), 0.1, None).unwrap();
        let n2 = doc.add_node(at(0.5), 0.1, None).unwrap();
        let n3 = doc.add_node(at(0.6), 0.1, Some(n2)).unwrap();
        let surviving = doc.nodes()[&n1].part_id;
        let removed = doc.nodes()[&n2].part_id;
        let other = doc.add_node(at(0.9), 0.1, None).unwrap();
        let other_part = doc.nodes()[&other].part_id;
        doc.set_part_cut_face_linked_id(other_part, Some(removed));

        doc.add_edge(n1, n2);

        assert!(!doc.parts().contains_key(&removed));
        for id in [n1, n2, n3] {
            assert_eq!(doc.nodes()[&id].part_id, surviving);
        }
        assert!(doc.edges().values().all(|e| e.part_id != removed));
        assert_eq!(doc.parts()[&other_part].cut_face_linked_id, Some(surviving));
        assert_eq!(doc.parts().len(), 2);
        assert_eq!(doc.components().len(), 2);
        assert_referential_integrity(&doc);
    }

    #[test]
    fn test_add_edge_duplicate_or_self_is_ignored() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        let b = doc.add_node(at(0.2), 0.1, Some(a)).unwrap();
        doc.add_edge(b, a);
        doc.add_edge(a, a);
        assert_eq!(doc.edges().len(), 1);
    }

    #[test]
    fn test_readonly_part_rejects_mutations() {
        let mut doc = Document::new();
        let (center, arms) = star(&mut doc);
        let part_id = doc.nodes()[&center].part_id;
        let edge_id = doc.nodes()[&center].edge_ids[0];
        doc.set_part_lock_state(part_id, true);
        doc.drain_events();
        let nodes_before = doc.nodes().clone();
        let edges_before = doc.edges().clone();

        doc.remove_node(center);
        doc.remove_edge(edge_id);
        doc.break_edge(edge_id);
        doc.reverse_edge(edge_id);
        doc.move_node_by(arms[0], Vec3::new(0.1, 0.1, 0.1));
        doc.set_node_radius(arms[0], 0.5);
        doc.switch_node_xz(arms[0]);
        doc.reduce_node(arms[0]);
        assert!(doc.add_node(at(0.3), 0.1, Some(center)).is_none());
        let outsider = doc.add_node(at(0.95), 0.1, None).unwrap();
        doc.add_edge(center, outsider);

        assert_eq!(doc.nodes().len(), nodes_before.len() + 1);
        for (id, node) in &nodes_before {
            assert_eq!(&doc.nodes()[id], node);
        }
        assert_eq!(doc.edges(), &edges_before);
    }

    #[test]
    fn test_disabled_locks_bypass_readonly_for_positions() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        let part_id = doc.nodes()[&a].part_id;
        doc.set_part_lock_state(part_id, true);
        doc.set_xlock_state(true);
        doc.disable_all_position_related_locks();
        doc.set_node_origin(a, Point3::new(0.3, 0.4, 0.6));
        assert_relative_eq!(doc.nodes()[&a].position.x, 0.3);
        assert_relative_eq!(doc.nodes()[&a].position.z, 0.6);
    }

    #[test]
    fn test_axis_locks_limit_moves() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        doc.set_xlock_state(true);
        doc.move_node_by(a, Vec3::new(0.2, 0.2, 0.2));
        let p = doc.nodes()[&a].position;
        assert_relative_eq!(p.x, 0.1);
        assert_relative_eq!(p.y, 0.7);

        doc.set_ylock_state(true);
        doc.set_zlock_state(true);
        doc.drain_events();
        doc.move_node_by(a, Vec3::new(0.2, 0.2, 0.2));
        assert!(doc.drain_events().is_empty());
    }

    #[test]
    fn test_break_edge_inserts_midpoint() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        let b = doc.add_node(at(0.5), 0.3, Some(a)).unwrap();
        let edge = doc.find_edge_by_nodes(a, b).unwrap().id;

        doc.break_edge(edge);

        assert_eq!(doc.nodes().len(), 3);
        assert_eq!(doc.edges().len(), 2);
        assert_eq!(doc.parts().len(), 1);
        let middle = doc
            .nodes()
            .values()
            .find(|n| n.id != a && n.id != b)
            .unwrap();
        assert_relative_eq!(middle.position.x, 0.3);
        assert_relative_eq!(middle.radius, 0.2);
        assert!(doc.find_edge_by_nodes(a, middle.id).is_some());
        assert!(doc.find_edge_by_nodes(middle.id, b).is_some());
        assert_referential_integrity(&doc);
    }

    #[test]
    fn test_reduce_node_joins_neighbors() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        let b = doc.add_node(at(0.2), 0.1, Some(a)).unwrap();
        let c = doc.add_node(at(0.3), 0.1, Some(b)).unwrap();

        doc.reduce_node(a);
        assert_eq!(doc.nodes().len(), 3);

        doc.reduce_node(b);
        assert_eq!(doc.nodes().len(), 2);
        assert!(doc.find_edge_by_nodes(a, c).is_some());
        assert_eq!(doc.parts().len(), 1);
        assert_referential_integrity(&doc);
    }

    #[test]
    fn test_reverse_edge_swaps_endpoints() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        let b = doc.add_node(at(0.2), 0.1, Some(a)).unwrap();
        let edge = doc.find_edge_by_nodes(a, b).unwrap().id;
        doc.reverse_edge(edge);
        assert_eq!(doc.edges()[&edge].node_ids, [b, a]);
    }

    #[test]
    fn test_radius_lock_and_clamp() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        doc.scale_node_by_add_radius(a, 5.0);
        assert_relative_eq!(doc.nodes()[&a].radius, 1.0);
        doc.set_radius_lock_state(true);
        doc.set_node_radius(a, 0.2);
        doc.scale_node_by_add_radius(a, -0.5);
        assert_relative_eq!(doc.nodes()[&a].radius, 1.0);
    }

    #[test]
    fn test_switch_xz() {
        let mut doc = Document::new();
        let a = doc.add_node(Point3::new(0.1, 0.2, 0.3), 0.1, None).unwrap();
        doc.switch_node_xz(a);
        let p = doc.nodes()[&a].position;
        assert_relative_eq!(p.x, 0.3);
        assert_relative_eq!(p.z, 0.1);
    }

    #[test]
    fn test_node_cut_settings() {
        let mut doc = Document::new();
        let a = doc.add_node(at(0.1), 0.1, None).unwrap();
        doc.set_node_cut_face(a, CutFace::Hexagon);
        doc.set_node_cut_rotation(a, 0.5);
        let node = &doc.nodes()[&a];
        assert!(node.has_cut_face_settings);
        assert_eq!(node.cut_face, CutFace::Hexagon);

        doc.drain_events();
        doc.set_node_cut_face(a, CutFace::Hexagon);
        assert!(doc.drain_events().is_empty());

        doc.clear_node_cut_face_settings(a);
        let node = &doc.nodes()[&a];
        assert!(!node.has_cut_face_settings);
        assert_eq!(node.cut_face, CutFace::Quad);
        assert_relative_eq!(node.cut_rotation, 0.0);
    }
}
