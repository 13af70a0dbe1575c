//! Component tree edits.
//!
//! The tree hangs off [`Document::root_component`]; `None` names the root
//! wherever a component ID is optional. Leaf components link exactly one
//! part, group components only hold children.

use std::collections::BTreeSet;

use skelform_ir::CombineMode;
use tracing::debug;
use uuid::Uuid;

use crate::document::Document;
use crate::entity::Component;
use crate::event::DocumentEvent;

impl Document {
    // =====================================================================
    // Queries
    // =====================================================================

    /// Parent of a component; the root for top-level components.
    pub fn find_component_parent(&self, component_id: Uuid) -> Option<&Component> {
        let component = self.components.get(&component_id)?;
        self.find_component(component.parent_id)
    }

    /// Parent ID of a component; `None` for top-level or unknown
    /// components.
    pub fn find_component_parent_id(&self, component_id: Uuid) -> Option<Uuid> {
        self.components
            .get(&component_id)
            .and_then(|component| component.parent_id)
    }

    /// True when `suspicious_id` sits somewhere below `component_id`.
    pub fn is_descendant_component(&self, component_id: Uuid, suspicious_id: Uuid) -> bool {
        let mut current = self.find_component_parent_id(suspicious_id);
        let mut steps = 0;
        while let Some(id) = current {
            if id == component_id {
                return true;
            }
            steps += 1;
            if steps > self.components.len() {
                return false;
            }
            current = self.find_component_parent_id(id);
        }
        false
    }

    /// Parts linked anywhere below (or by) a component, in tree order.
    pub fn collect_component_descendant_parts(&self, component_id: Option<Uuid>) -> Vec<Uuid> {
        let mut part_ids = Vec::new();
        let mut stack = vec![component_id];
        while let Some(id) = stack.pop() {
            let Some(component) = self.find_component(id) else {
                continue;
            };
            if let Some(part_id) = component.link_to_part_id {
                part_ids.push(part_id);
                continue;
            }
            stack.extend(component.children_ids.iter().rev().map(|child| Some(*child)));
        }
        part_ids
    }

    /// Every component below a group component, in tree order.
    pub fn collect_component_descendant_components(&self, component_id: Option<Uuid>) -> Vec<Uuid> {
        let mut component_ids = Vec::new();
        let mut stack: Vec<Uuid> = match self.find_component(component_id) {
            Some(component) if component.link_to_part_id.is_none() => {
                component.children_ids.iter().rev().copied().collect()
            }
            _ => return component_ids,
        };
        while let Some(id) = stack.pop() {
            component_ids.push(id);
            if let Some(component) = self.components.get(&id) {
                if component.link_to_part_id.is_none() {
                    stack.extend(component.children_ids.iter().rev().copied());
                }
            }
        }
        component_ids
    }

    // =====================================================================
    // Creation
    // =====================================================================

    /// Wrap a part in a new link component under `component_id`, or under
    /// the root when that component does not exist.
    pub(crate) fn add_part_to_component(&mut self, part_id: Uuid, component_id: Option<Uuid>) {
        let parent_id = component_id.filter(|id| self.components.contains_key(id));
        let mut child = Component::new(Uuid::new_v4());
        let child_id = child.id;
        child.link_to_part_id = Some(part_id);
        child.parent_id = parent_id;
        if let Some(parent) = self.find_component_mut(parent_id) {
            parent.add_child(child_id);
        }
        if let Some(part) = self.parts.get_mut(&part_id) {
            part.component_id = Some(child_id);
        }
        self.components.insert(child_id, child);
        self.emit(DocumentEvent::ComponentChildrenChanged(parent_id));
        self.emit(DocumentEvent::ComponentAdded(child_id));
    }

    /// Add an empty group component. Returns `None` when the parent does
    /// not exist.
    pub fn add_component(&mut self, parent_id: Option<Uuid>) -> Option<Uuid> {
        let parent = self.find_component_mut(parent_id)?;
        let mut component = Component::new(Uuid::new_v4());
        let component_id = component.id;
        parent.add_child(component_id);
        component.parent_id = parent_id;
        self.components.insert(component_id, component);
        self.emit(DocumentEvent::ComponentChildrenChanged(parent_id));
        self.emit(DocumentEvent::ComponentAdded(component_id));
        Some(component_id)
    }

    /// Name for the next group: `Group N`, N counting group components.
    fn next_group_name(&self) -> String {
        let groups = self.components.len().saturating_sub(self.parts.len());
        format!("Group {}", groups + 1)
    }

    /// Add a named group component. A leaf target puts the group beside
    /// the leaf instead.
    pub fn create_new_child_component(&mut self, parent_id: Option<Uuid>) -> Option<Uuid> {
        let mut parent_id = parent_id;
        let parent = self.find_component(parent_id)?;
        if parent.link_to_part_id.is_some() {
            parent_id = parent.parent_id;
        }
        let mut component = Component::new(Uuid::new_v4());
        let component_id = component.id;
        component.name = self.next_group_name();
        component.parent_id = parent_id;
        self.find_component_mut(parent_id)?.add_child(component_id);
        self.components.insert(component_id, component);
        self.emit(DocumentEvent::ComponentChildrenChanged(parent_id));
        self.emit(DocumentEvent::ComponentAdded(component_id));
        self.emit(DocumentEvent::OptionsChanged);
        Some(component_id)
    }

    // =====================================================================
    // Removal
    // =====================================================================

    /// Remove a component, its subtree and every part linked in it.
    pub fn remove_component(&mut self, component_id: Uuid) {
        self.remove_component_recursively(component_id);
        self.emit(DocumentEvent::SkeletonChanged);
    }

    fn remove_component_recursively(&mut self, component_id: Uuid) {
        let Some(component) = self.components.get(&component_id) else {
            return;
        };
        let link_to_part_id = component.link_to_part_id;
        let children_ids = component.children_ids.clone();
        let parent_id = component.parent_id;

        if let Some(part_id) = link_to_part_id {
            self.remove_part_dont_care_component(part_id);
        }
        for child_id in children_ids {
            self.remove_component_recursively(child_id);
        }
        match parent_id {
            Some(id) => {
                if let Some(parent) = self.components.get_mut(&id) {
                    parent.dirty = true;
                    parent.remove_child(component_id);
                }
            }
            None => self.root_component.remove_child(component_id),
        }
        self.components.remove(&component_id);
        self.emit(DocumentEvent::ComponentRemoved(component_id));
        self.emit(DocumentEvent::ComponentChildrenChanged(parent_id));
    }

    // =====================================================================
    // Arrangement
    // =====================================================================

    fn reorder_in_parent(&mut self, component_id: Uuid, reorder: fn(&mut Component, Uuid)) {
        if !self.components.contains_key(&component_id) {
            return;
        }
        let parent_id = self.find_component_parent_id(component_id);
        let Some(parent) = self.find_component_mut(parent_id) else {
            return;
        };
        reorder(parent, component_id);
        parent.dirty = true;
        self.emit(DocumentEvent::ComponentChildrenChanged(parent_id));
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Swap a component with its previous sibling.
    pub fn move_component_up(&mut self, component_id: Uuid) {
        self.reorder_in_parent(component_id, Component::move_child_up);
    }

    /// Swap a component with its next sibling.
    pub fn move_component_down(&mut self, component_id: Uuid) {
        self.reorder_in_parent(component_id, Component::move_child_down);
    }

    /// Make a component its parent's first child.
    pub fn move_component_to_top(&mut self, component_id: Uuid) {
        self.reorder_in_parent(component_id, Component::move_child_to_top);
    }

    /// Make a component its parent's last child.
    pub fn move_component_to_bottom(&mut self, component_id: Uuid) {
        self.reorder_in_parent(component_id, Component::move_child_to_bottom);
    }

    /// Reparent a component. Moves onto itself, onto a missing component or
    /// below its own subtree are ignored.
    pub fn move_component(&mut self, component_id: Uuid, to_parent_id: Option<Uuid>) {
        if Some(component_id) == to_parent_id {
            return;
        }
        let Some(component) = self.components.get(&component_id) else {
            return;
        };
        let old_parent_id = component.parent_id;
        if old_parent_id == to_parent_id {
            return;
        }
        if let Some(target) = to_parent_id {
            if !self.components.contains_key(&target) || self.is_descendant_component(component_id, target) {
                return;
            }
        }

        if let Some(old_parent) = self.find_component_mut(old_parent_id) {
            old_parent.dirty = true;
            old_parent.remove_child(component_id);
        }
        self.emit(DocumentEvent::ComponentChildrenChanged(old_parent_id));

        if let Some(component) = self.components.get_mut(&component_id) {
            component.parent_id = to_parent_id;
        }
        if let Some(new_parent) = self.find_component_mut(to_parent_id) {
            new_parent.dirty = true;
            new_parent.add_child(component_id);
        }
        self.emit(DocumentEvent::ComponentChildrenChanged(to_parent_id));
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Wrap sibling components in a new group that takes the first one's
    /// slot. Returns the group.
    pub fn group_components(&mut self, component_ids: &[Uuid]) -> Option<Uuid> {
        let (&first, rest) = component_ids.split_first()?;
        if !self.components.contains_key(&first) {
            debug!(component_id = %first, "component not found");
            return None;
        }
        let old_parent_id = self.find_component_parent_id(first);
        let mut group = Component::new(Uuid::new_v4());
        let group_id = group.id;

        let old_parent = self.find_component_mut(old_parent_id)?;
        old_parent.replace_child(first, group_id);
        for id in rest {
            if let Some(parent_id) = self.components.get(id).map(|c| c.parent_id) {
                if let Some(parent) = self.find_component_mut(parent_id) {
                    parent.remove_child(*id);
                }
            }
        }

        for id in component_ids {
            let Some(component) = self.components.get_mut(id) else {
                continue;
            };
            component.parent_id = Some(group_id);
            group.add_child(*id);
        }
        group.parent_id = old_parent_id;
        group.name = self.next_group_name();
        self.components.insert(group_id, group);

        self.emit(DocumentEvent::ComponentChildrenChanged(old_parent_id));
        self.emit(DocumentEvent::ComponentAdded(group_id));
        self.emit(DocumentEvent::SkeletonChanged);
        Some(group_id)
    }

    /// Splice a group's children into the group's slot and delete the
    /// group.
    pub fn ungroup_component(&mut self, component_id: Uuid) {
        let Some(component) = self.components.get(&component_id) else {
            debug!(%component_id, "component not found");
            return;
        };
        if component.children_ids.is_empty() {
            return;
        }
        let children_ids = component.children_ids.clone();
        let new_parent_id = component.parent_id;
        let Some(new_parent) = self.find_component_mut(new_parent_id) else {
            debug!(%component_id, "parent component not found");
            return;
        };
        new_parent.replace_child_with_others(component_id, &children_ids);
        for child_id in &children_ids {
            if let Some(child) = self.components.get_mut(child_id) {
                child.parent_id = new_parent_id;
            }
        }
        self.components.remove(&component_id);
        self.emit(DocumentEvent::ComponentRemoved(component_id));
        self.emit(DocumentEvent::ComponentChildrenChanged(new_parent_id));
        self.emit(DocumentEvent::SkeletonChanged);
    }

    // =====================================================================
    // Attributes
    // =====================================================================

    /// Rename a component. Blank names are ignored.
    pub fn rename_component(&mut self, component_id: Uuid, name: &str) {
        let Some(component) = self.components.get_mut(&component_id) else {
            return;
        };
        if component.name == name || name.trim().is_empty() {
            return;
        }
        component.name = name.to_string();
        self.emit(DocumentEvent::ComponentNameChanged(component_id));
        self.emit(DocumentEvent::OptionsChanged);
    }

    /// Expand or collapse a component in the editor tree.
    pub fn set_component_expand_state(&mut self, component_id: Uuid, expanded: bool) {
        let Some(component) = self.components.get_mut(&component_id) else {
            return;
        };
        if component.expanded == expanded {
            return;
        }
        component.expanded = expanded;
        self.emit(DocumentEvent::ComponentExpandStateChanged(component_id));
        self.emit(DocumentEvent::OptionsChanged);
    }

    /// Change how a component's subtree is composited.
    pub fn set_component_combine_mode(&mut self, component_id: Uuid, combine_mode: CombineMode) {
        let Some(component) = self.components.get_mut(&component_id) else {
            debug!(%component_id, "component not found");
            return;
        };
        if component.combine_mode == combine_mode {
            return;
        }
        component.combine_mode = combine_mode;
        component.dirty = true;
        self.emit(DocumentEvent::ComponentCombineModeChanged(component_id));
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Choose where new parts are created. A leaf redirects to its parent;
    /// unknown components fall back to the root.
    pub fn set_current_canvas_component_id(&mut self, component_id: Option<Uuid>) {
        self.current_canvas_component_id = match component_id.and_then(|id| self.components.get(&id)) {
            None => None,
            Some(component) if component.link_to_part_id.is_some() => component.parent_id,
            Some(component) => Some(component.id),
        };
    }

    // =====================================================================
    // Bulk visibility and locking
    // =====================================================================

    fn part_ids(&self) -> Vec<Uuid> {
        self.parts.keys().copied().collect()
    }

    fn parts_outside(&self, component_id: Option<Uuid>) -> Vec<Uuid> {
        let inside: BTreeSet<Uuid> = self
            .collect_component_descendant_parts(component_id)
            .into_iter()
            .collect();
        self.parts
            .keys()
            .filter(|id| !inside.contains(id))
            .copied()
            .collect()
    }

    /// Hide every part outside a component.
    pub fn hide_other_components(&mut self, component_id: Option<Uuid>) {
        for part_id in self.parts_outside(component_id) {
            self.set_part_visible_state(part_id, false);
        }
    }

    /// Lock every part outside a component.
    pub fn lock_other_components(&mut self, component_id: Option<Uuid>) {
        for part_id in self.parts_outside(component_id) {
            self.set_part_lock_state(part_id, true);
        }
    }

    /// Hide every part.
    pub fn hide_all_components(&mut self) {
        for part_id in self.part_ids() {
            self.set_part_visible_state(part_id, false);
        }
    }

    /// Show every part.
    pub fn show_all_components(&mut self) {
        for part_id in self.part_ids() {
            self.set_part_visible_state(part_id, true);
        }
    }

    /// Hide everything if anything is visible, otherwise show everything.
    pub fn show_or_hide_all_components(&mut self) {
        if self.parts.values().any(|part| part.visible) {
            self.hide_all_components();
        } else {
            self.show_all_components();
        }
    }

    fn group_ids(&self) -> Vec<Uuid> {
        self.components
            .values()
            .filter(|component| component.link_to_part_id.is_none())
            .map(|component| component.id)
            .collect()
    }

    /// Collapse every group in the editor tree.
    pub fn collapse_all_components(&mut self) {
        for id in self.group_ids() {
            self.set_component_expand_state(id, false);
        }
    }

    /// Expand every group in the editor tree.
    pub fn expand_all_components(&mut self) {
        for id in self.group_ids() {
            self.set_component_expand_state(id, true);
        }
    }

    /// Lock every part.
    pub fn lock_all_components(&mut self) {
        for part_id in self.part_ids() {
            self.set_part_lock_state(part_id, true);
        }
    }

    /// Unlock every part.
    pub fn unlock_all_components(&mut self) {
        for part_id in self.part_ids() {
            self.set_part_lock_state(part_id, false);
        }
    }

    /// Hide the parts below a component.
    pub fn hide_descendant_components(&mut self, component_id: Option<Uuid>) {
        for part_id in self.collect_component_descendant_parts(component_id) {
            self.set_part_visible_state(part_id, false);
        }
    }

    /// Show the parts below a component.
    pub fn show_descendant_components(&mut self, component_id: Option<Uuid>) {
        for part_id in self.collect_component_descendant_parts(component_id) {
            self.set_part_visible_state(part_id, true);
        }
    }

    /// Lock the parts below a component.
    pub fn lock_descendant_components(&mut self, component_id: Option<Uuid>) {
        for part_id in self.collect_component_descendant_parts(component_id) {
            self.set_part_lock_state(part_id, true);
        }
    }

    /// Unlock the parts below a component.
    pub fn unlock_descendant_components(&mut self, component_id: Option<Uuid>) {
        for part_id in self.collect_component_descendant_parts(component_id) {
            self.set_part_lock_state(part_id, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skelform_math::Point3;

    /// Three single-node parts under the root; returns their link
    /// components.
    fn three_leaves(doc: &mut Document) -> [Uuid; 3] {
        [0.2, 0.5, 0.8].map(|x| {
            let node = doc.add_node(Point3::new(x, 0.5, 0.5), 0.1, None).unwrap();
            let part_id = doc.find_node(node).unwrap().part_id;
            doc.find_part(part_id).unwrap().component_id.unwrap()
        })
    }

    #[test]
    fn test_group_then_ungroup_restores_children() {
        let mut doc = Document::new();
        let leaves = three_leaves(&mut doc);

        let group = doc.group_components(&leaves).unwrap();
        assert_eq!(doc.root_component().children_ids, vec![group]);
        assert_eq!(doc.components()[&group].children_ids, leaves.to_vec());
        assert_eq!(doc.components()[&group].name, "Group 1");
        for leaf in leaves {
            assert_eq!(doc.find_component_parent_id(leaf), Some(group));
        }

        doc.ungroup_component(group);
        assert!(!doc.components().contains_key(&group));
        let restored: BTreeSet<Uuid> = doc.root_component().children_ids.iter().copied().collect();
        assert_eq!(restored, leaves.into_iter().collect());
        for leaf in leaves {
            assert_eq!(doc.find_component_parent_id(leaf), None);
        }
    }

    #[test]
    fn test_group_takes_first_slot() {
        let mut doc = Document::new();
        let [a, b, c] = three_leaves(&mut doc);
        let group = doc.group_components(&[b, c]).unwrap();
        assert_eq!(doc.root_component().children_ids, vec![a, group]);
    }

    #[test]
    fn test_move_component_rejects_cycles_and_missing_targets() {
        let mut doc = Document::new();
        let outer = doc.add_component(None).unwrap();
        let inner = doc.add_component(Some(outer)).unwrap();
        let deepest = doc.add_component(Some(inner)).unwrap();

        assert!(doc.is_descendant_component(outer, deepest));
        assert!(!doc.is_descendant_component(deepest, outer));

        doc.move_component(outer, Some(deepest));
        doc.move_component(outer, Some(Uuid::new_v4()));
        assert_eq!(doc.find_component_parent_id(outer), None);

        doc.move_component(deepest, None);
        assert_eq!(doc.find_component_parent_id(deepest), None);
        assert!(doc.components()[&inner].children_ids.is_empty());
        assert_eq!(doc.root_component().children_ids, vec![outer, deepest]);
    }

    #[test]
    fn test_reorder_within_parent() {
        let mut doc = Document::new();
        let [a, b, c] = three_leaves(&mut doc);
        doc.move_component_to_bottom(a);
        assert_eq!(doc.root_component().children_ids, vec![b, c, a]);
        doc.move_component_up(a);
        assert_eq!(doc.root_component().children_ids, vec![b, a, c]);
        doc.move_component_to_top(c);
        assert_eq!(doc.root_component().children_ids, vec![c, b, a]);
        doc.move_component_down(c);
        assert_eq!(doc.root_component().children_ids, vec![b, c, a]);
    }

    #[test]
    fn test_remove_component_removes_subtree_and_parts() {
        let mut doc = Document::new();
        let leaves = three_leaves(&mut doc);
        let group = doc.group_components(&leaves[..2]).unwrap();

        doc.remove_component(group);

        assert_eq!(doc.parts().len(), 1);
        assert_eq!(doc.nodes().len(), 1);
        assert_eq!(doc.components().len(), 1);
        assert_eq!(doc.root_component().children_ids, vec![leaves[2]]);
    }

    #[test]
    fn test_new_parts_land_under_canvas_component() {
        let mut doc = Document::new();
        let group = doc.create_new_child_component(None).unwrap();
        doc.set_current_canvas_component_id(Some(group));
        let node = doc.add_node(Point3::new(0.5, 0.5, 0.5), 0.1, None).unwrap();
        let part_id = doc.find_node(node).unwrap().part_id;
        let leaf = doc.find_part(part_id).unwrap().component_id.unwrap();
        assert_eq!(doc.find_component_parent_id(leaf), Some(group));

        doc.set_current_canvas_component_id(Some(leaf));
        assert_eq!(doc.current_canvas_component_id(), Some(group));
        doc.set_current_canvas_component_id(Some(Uuid::new_v4()));
        assert_eq!(doc.current_canvas_component_id(), None);
    }

    #[test]
    fn test_new_child_of_leaf_goes_beside_it() {
        let mut doc = Document::new();
        let [leaf, ..] = three_leaves(&mut doc);
        let group = doc.create_new_child_component(Some(leaf)).unwrap();
        assert_eq!(doc.find_component_parent_id(group), None);
        assert_eq!(doc.root_component().children_ids.last(), Some(&group));
    }

    #[test]
    fn test_split_parts_stay_in_group() {
        let mut doc = Document::new();
        let group = doc.add_component(None).unwrap();
        doc.set_current_canvas_component_id(Some(group));
        let a = doc.add_node(Point3::new(0.1, 0.5, 0.5), 0.1, None).unwrap();
        let b = doc.add_node(Point3::new(0.2, 0.5, 0.5), 0.1, Some(a)).unwrap();
        let c = doc.add_node(Point3::new(0.3, 0.5, 0.5), 0.1, Some(b)).unwrap();

        doc.remove_node(b);

        assert_eq!(doc.components()[&group].children_ids.len(), 2);
        for node in [a, c] {
            let part_id = doc.find_node(node).unwrap().part_id;
            let leaf = doc.find_part(part_id).unwrap().component_id.unwrap();
            assert_eq!(doc.find_component_parent_id(leaf), Some(group));
        }
    }

    #[test]
    fn test_descendant_collection_and_bulk_visibility() {
        let mut doc = Document::new();
        let leaves = three_leaves(&mut doc);
        let group = doc.group_components(&leaves[..2]).unwrap();
        let grouped_parts = doc.collect_component_descendant_parts(Some(group));
        assert_eq!(grouped_parts.len(), 2);
        assert_eq!(
            doc.collect_component_descendant_components(Some(group)),
            leaves[..2].to_vec()
        );
        assert_eq!(doc.collect_component_descendant_components(None).len(), 4);

        doc.hide_other_components(Some(group));
        let hidden: Vec<bool> = doc.parts().values().map(|p| p.visible).collect();
        assert_eq!(hidden.iter().filter(|v| !**v).count(), 1);

        doc.show_or_hide_all_components();
        assert!(doc.parts().values().all(|p| !p.visible));
        doc.show_or_hide_all_components();
        assert!(doc.parts().values().all(|p| p.visible));

        doc.lock_descendant_components(Some(group));
        for part_id in &grouped_parts {
            assert!(doc.find_part(*part_id).unwrap().locked);
        }
        doc.unlock_all_components();
        assert!(doc.parts().values().all(|p| !p.locked));

        doc.collapse_all_components();
        assert!(!doc.components()[&group].expanded);
    }

    #[test]
    fn test_rename_ignores_blank() {
        let mut doc = Document::new();
        let group = doc.add_component(None).unwrap();
        doc.rename_component(group, "Legs");
        doc.rename_component(group, "   ");
        assert_eq!(doc.components()[&group].name, "Legs");
    }
}
