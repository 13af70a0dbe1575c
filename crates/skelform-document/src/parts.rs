//! Part attribute edits and part removal.

use skelform_ir::{CutFace, PartTarget};
use skelform_math::{Color, Tolerance};
use tracing::debug;
use uuid::Uuid;

use crate::document::Document;
use crate::entity::Part;
use crate::event::DocumentEvent;

impl Document {
    /// Apply `change` to a part. The change returns false when it had
    /// nothing to do; otherwise the part is marked dirty.
    fn update_part(&mut self, part_id: Uuid, change: impl FnOnce(&mut Part) -> bool) -> bool {
        let Some(part) = self.parts.get_mut(&part_id) else {
            debug!(%part_id, "part not found");
            return false;
        };
        if !change(part) {
            return false;
        }
        part.dirty = true;
        true
    }

    /// [`update_part`](Self::update_part) followed by the geometry events.
    fn update_part_geometry(&mut self, part_id: Uuid, change: impl FnOnce(&mut Part) -> bool) {
        if self.update_part(part_id, change) {
            self.emit(DocumentEvent::PartChanged(part_id));
            self.emit(DocumentEvent::SkeletonChanged);
        }
    }

    // =====================================================================
    // Editor state
    // =====================================================================

    /// Lock or unlock a part against edits.
    pub fn set_part_lock_state(&mut self, part_id: Uuid, locked: bool) {
        let Some(part) = self.parts.get_mut(&part_id) else {
            return;
        };
        if part.locked == locked {
            return;
        }
        part.locked = locked;
        self.emit(DocumentEvent::PartLockStateChanged(part_id));
        self.emit(DocumentEvent::OptionsChanged);
    }

    /// Show or hide a part.
    pub fn set_part_visible_state(&mut self, part_id: Uuid, visible: bool) {
        let Some(part) = self.parts.get_mut(&part_id) else {
            return;
        };
        if part.visible == visible {
            return;
        }
        part.visible = visible;
        self.emit(DocumentEvent::PartVisibleStateChanged(part_id));
        self.emit(DocumentEvent::OptionsChanged);
    }

    /// Exclude a part from generation, or include it again.
    pub fn set_part_disable_state(&mut self, part_id: Uuid, disabled: bool) {
        if self.update_part(part_id, |part| {
            let changed = part.disabled != disabled;
            part.disabled = disabled;
            changed
        }) {
            self.emit(DocumentEvent::PartDisableStateChanged(part_id));
            self.emit(DocumentEvent::SkeletonChanged);
        }
    }

    // =====================================================================
    // Shape
    // =====================================================================

    /// Subdivide a part.
    pub fn set_part_subdiv_state(&mut self, part_id: Uuid, subdived: bool) {
        self.update_part_geometry(part_id, |part| {
            let changed = part.subdived != subdived;
            part.subdived = subdived;
            changed
        });
    }

    /// Mirror a part about the canvas origin. The origin is settled first
    /// so the mirror plane stays put.
    pub fn set_part_xmirror_state(&mut self, part_id: Uuid, mirrored: bool) {
        if !self.update_part(part_id, |part| {
            let changed = part.x_mirrored != mirrored;
            part.x_mirrored = mirrored;
            changed
        }) {
            return;
        }
        self.settle_origin();
        self.emit(DocumentEvent::PartChanged(part_id));
        self.emit(DocumentEvent::SkeletonChanged);
    }

    /// Scale a part's thickness, clamped to `0..=2`.
    pub fn set_part_deform_thickness(&mut self, part_id: Uuid, thickness: f64) {
        self.update_part_geometry(part_id, |part| {
            let before = part.deform_thickness;
            part.set_deform_thickness(thickness);
            !Tolerance::DEFAULT.is_equal(before, part.deform_thickness)
        });
    }

    /// Scale a part's width, clamped to `0..=2`.
    pub fn set_part_deform_width(&mut self, part_id: Uuid, width: f64) {
        self.update_part_geometry(part_id, |part| {
            let before = part.deform_width;
            part.set_deform_width(width);
            !Tolerance::DEFAULT.is_equal(before, part.deform_width)
        });
    }

    /// Scale thickness and width together.
    pub fn set_part_deform_unified(&mut self, part_id: Uuid, unified: bool) {
        self.update_part_geometry(part_id, |part| {
            let changed = part.deform_unified != unified;
            part.deform_unified = unified;
            changed
        });
    }

    /// Round a part's ends.
    pub fn set_part_round_state(&mut self, part_id: Uuid, rounded: bool) {
        self.update_part_geometry(part_id, |part| {
            let changed = part.rounded != rounded;
            part.rounded = rounded;
            changed
        });
    }

    /// Chamfer a part.
    pub fn set_part_chamfer_state(&mut self, part_id: Uuid, chamfered: bool) {
        self.update_part_geometry(part_id, |part| {
            let changed = part.chamfered != chamfered;
            part.chamfered = chamfered;
            changed
        });
    }

    /// Change what a part contributes to generation.
    pub fn set_part_target(&mut self, part_id: Uuid, target: PartTarget) {
        self.update_part_geometry(part_id, |part| {
            let changed = part.target != target;
            part.target = target;
            changed
        });
    }

    /// Set a part's shell thickness; zero is solid.
    pub fn set_part_hollow_thickness(&mut self, part_id: Uuid, thickness: f64) {
        self.update_part_geometry(part_id, |part| {
            if Tolerance::DEFAULT.is_equal(part.hollow_thickness, thickness) {
                return false;
            }
            part.hollow_thickness = thickness;
            true
        });
    }

    /// Set a part's smoothing cutoff; zero uses the document setting.
    pub fn set_part_smooth_cutoff_degrees(&mut self, part_id: Uuid, degrees: f64) {
        self.update_part_geometry(part_id, |part| {
            if Tolerance::DEFAULT.is_equal(part.smooth_cutoff_degrees, degrees) {
                return false;
            }
            part.smooth_cutoff_degrees = degrees;
            true
        });
    }

    // =====================================================================
    // Cut face
    // =====================================================================

    /// Rotate a part's cross-section, clamped to `-1..=1`.
    pub fn set_part_cut_rotation(&mut self, part_id: Uuid, cut_rotation: f64) {
        self.update_part_geometry(part_id, |part| {
            if Tolerance::DEFAULT.is_equal(part.cut_rotation, cut_rotation) {
                return false;
            }
            part.set_cut_rotation(cut_rotation);
            true
        });
    }

    /// Use a built-in cross-section.
    pub fn set_part_cut_face(&mut self, part_id: Uuid, cut_face: CutFace) {
        self.update_part_geometry(part_id, |part| {
            if part.cut_face == cut_face {
                return false;
            }
            part.set_cut_face(cut_face);
            true
        });
    }

    /// Borrow another part's cross-section; `None` reverts to
    /// [`CutFace::Quad`].
    pub fn set_part_cut_face_linked_id(&mut self, part_id: Uuid, linked_id: Option<Uuid>) {
        self.update_part_geometry(part_id, |part| {
            if part.cut_face == CutFace::UserDefined && part.cut_face_linked_id == linked_id {
                return false;
            }
            part.set_cut_face_linked_id(linked_id);
            true
        });
    }

    // =====================================================================
    // Material
    // =====================================================================

    /// Give a part its own color, or fall back to the default.
    pub fn set_part_color_state(&mut self, part_id: Uuid, has_color: bool, color: Color) {
        self.update_part_geometry(part_id, |part| {
            if part.has_color == has_color && part.color == color {
                return false;
            }
            part.has_color = has_color;
            part.color = color;
            true
        });
    }

    /// Set how far a part's color bleeds into its neighbors.
    pub fn set_part_color_solubility(&mut self, part_id: Uuid, solubility: f64) {
        self.update_part_geometry(part_id, |part| {
            if Tolerance::DEFAULT.is_equal(part.color_solubility, solubility) {
                return false;
            }
            part.color_solubility = solubility;
            true
        });
    }

    /// Set a part's metalness.
    pub fn set_part_metalness(&mut self, part_id: Uuid, metalness: f64) {
        self.update_part_geometry(part_id, |part| {
            if Tolerance::DEFAULT.is_equal(part.metalness, metalness) {
                return false;
            }
            part.metalness = metalness;
            true
        });
    }

    /// Set a part's roughness.
    pub fn set_part_roughness(&mut self, part_id: Uuid, roughness: f64) {
        self.update_part_geometry(part_id, |part| {
            if Tolerance::DEFAULT.is_equal(part.roughness, roughness) {
                return false;
            }
            part.roughness = roughness;
            true
        });
    }

    /// Lighten downward-facing surfaces. Only the texture goes stale.
    pub fn set_part_countershaded(&mut self, part_id: Uuid, countershaded: bool) {
        if self.update_part(part_id, |part| {
            let changed = part.countershaded != countershaded;
            part.countershaded = countershaded;
            changed
        }) {
            self.emit(DocumentEvent::PartChanged(part_id));
            self.emit(DocumentEvent::TextureChanged);
        }
    }

    /// Use an image as a part's color. Only the texture goes stale, and the
    /// link component's preview no longer matches.
    pub fn set_part_color_image(&mut self, part_id: Uuid, image_id: Option<Uuid>) {
        if !self.update_part(part_id, |part| {
            let changed = part.color_image_id != image_id;
            part.color_image_id = image_id;
            changed
        }) {
            return;
        }
        let component_id = self.parts.get(&part_id).and_then(|part| part.component_id);
        if let Some(component) = component_id.and_then(|id| self.components.get_mut(&id)) {
            component.is_preview_mesh_obsolete = true;
        }
        self.emit(DocumentEvent::PartColorImageChanged(part_id));
        self.emit(DocumentEvent::TextureChanged);
    }

    // =====================================================================
    // Removal
    // =====================================================================

    /// Remove a part together with its link component.
    pub fn remove_part(&mut self, part_id: Uuid) {
        let Some(part) = self.parts.get(&part_id) else {
            return;
        };
        match part.component_id {
            Some(component_id) if self.components.contains_key(&component_id) => {
                self.remove_component(component_id);
            }
            _ => self.remove_part_dont_care_component(part_id),
        }
    }

    /// Remove a part and every node and edge it still owns, leaving the
    /// component tree alone.
    pub(crate) fn remove_part_dont_care_component(&mut self, part_id: Uuid) {
        if !self.parts.contains_key(&part_id) {
            return;
        }
        let removed_node_ids: Vec<Uuid> = self
            .nodes
            .values()
            .filter(|node| node.part_id == part_id)
            .map(|node| node.id)
            .collect();
        let removed_edge_ids: Vec<Uuid> = self
            .edges
            .values()
            .filter(|edge| edge.part_id == part_id)
            .map(|edge| edge.id)
            .collect();
        for id in &removed_node_ids {
            self.nodes.remove(id);
        }
        for id in &removed_edge_ids {
            self.edges.remove(id);
        }
        self.parts.remove(&part_id);

        for id in removed_node_ids {
            self.emit(DocumentEvent::NodeRemoved(id));
        }
        for id in removed_edge_ids {
            self.emit(DocumentEvent::EdgeRemoved(id));
        }
        self.emit(DocumentEvent::PartRemoved(part_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skelform_math::Point3;

    fn single_part(doc: &mut Document) -> Uuid {
        let node = doc.add_node(Point3::new(0.3, 0.5, 0.5), 0.1, None).unwrap();
        let part_id = doc.find_node(node).unwrap().part_id;
        doc.reset_dirty_flags();
        doc.drain_events();
        part_id
    }

    #[test]
    fn test_geometry_setter_marks_dirty_and_notifies() {
        let mut doc = Document::new();
        let part_id = single_part(&mut doc);
        doc.set_part_round_state(part_id, true);
        assert!(doc.find_part(part_id).unwrap().rounded);
        assert!(doc.find_part(part_id).unwrap().dirty);
        assert_eq!(
            doc.drain_events(),
            vec![
                DocumentEvent::PartChanged(part_id),
                DocumentEvent::SkeletonChanged
            ]
        );
    }

    #[test]
    fn test_unchanged_value_is_silent() {
        let mut doc = Document::new();
        let part_id = single_part(&mut doc);
        doc.set_part_roughness(part_id, 1.0);
        doc.set_part_target(part_id, PartTarget::Model);
        doc.set_part_cut_face(part_id, CutFace::Quad);
        assert!(doc.drain_events().is_empty());
        assert!(!doc.find_part(part_id).unwrap().dirty);
    }

    #[test]
    fn test_unknown_part_is_ignored() {
        let mut doc = Document::new();
        doc.set_part_metalness(Uuid::new_v4(), 0.5);
        doc.set_part_lock_state(Uuid::new_v4(), true);
        doc.remove_part(Uuid::new_v4());
        assert!(doc.drain_events().is_empty());
    }

    #[test]
    fn test_lock_and_visibility_are_editor_options() {
        let mut doc = Document::new();
        let part_id = single_part(&mut doc);
        doc.set_part_visible_state(part_id, false);
        doc.set_part_lock_state(part_id, true);
        assert!(!doc.find_part(part_id).unwrap().dirty);
        assert_eq!(
            doc.drain_events(),
            vec![
                DocumentEvent::PartVisibleStateChanged(part_id),
                DocumentEvent::OptionsChanged,
                DocumentEvent::PartLockStateChanged(part_id),
                DocumentEvent::OptionsChanged,
            ]
        );
    }

    #[test]
    fn test_texture_only_changes() {
        let mut doc = Document::new();
        let part_id = single_part(&mut doc);
        let component_id = doc.find_part(part_id).unwrap().component_id;

        doc.set_part_countershaded(part_id, true);
        let image = Uuid::new_v4();
        doc.set_part_color_image(part_id, Some(image));

        let events = doc.drain_events();
        assert!(!events.contains(&DocumentEvent::SkeletonChanged));
        assert!(events.contains(&DocumentEvent::PartColorImageChanged(part_id)));
        assert_eq!(
            events.iter().filter(|e| **e == DocumentEvent::TextureChanged).count(),
            2
        );
        let component = doc.find_component(component_id).unwrap();
        assert!(component.is_preview_mesh_obsolete);
        assert_eq!(doc.find_part(part_id).unwrap().color_image_id, Some(image));
    }

    #[test]
    fn test_disable_state_marks_dirty() {
        let mut doc = Document::new();
        let part_id = single_part(&mut doc);
        doc.set_part_disable_state(part_id, true);
        let part = doc.find_part(part_id).unwrap();
        assert!(part.disabled);
        assert!(part.dirty);
        assert!(!part.is_edit_visible());
        assert!(doc
            .drain_events()
            .contains(&DocumentEvent::PartDisableStateChanged(part_id)));
    }

    #[test]
    fn test_deform_is_clamped() {
        let mut doc = Document::new();
        let part_id = single_part(&mut doc);
        doc.set_part_deform_thickness(part_id, 9.0);
        doc.set_part_deform_width(part_id, -1.0);
        let part = doc.find_part(part_id).unwrap();
        assert_relative_eq!(part.deform_thickness, 2.0);
        assert_relative_eq!(part.deform_width, 0.0);
    }

    #[test]
    fn test_xmirror_settles_origin() {
        let mut doc = Document::new();
        let part_id = single_part(&mut doc);
        assert!(!doc.origin_settled());
        doc.set_part_xmirror_state(part_id, true);
        assert!(doc.origin_settled());
        assert_relative_eq!(doc.origin_x(), 0.3, epsilon = 1e-9);
        assert!(doc.find_part(part_id).unwrap().x_mirrored);
    }

    #[test]
    fn test_color_state() {
        let mut doc = Document::new();
        let part_id = single_part(&mut doc);
        let red = Color::rgb(1.0, 0.0, 0.0);
        doc.set_part_color_state(part_id, true, red);
        let part = doc.find_part(part_id).unwrap();
        assert!(part.has_color);
        assert_eq!(part.color, red);
    }

    #[test]
    fn test_remove_part_drops_nodes_and_component() {
        let mut doc = Document::new();
        let a = doc.add_node(Point3::new(0.1, 0.5, 0.5), 0.1, None).unwrap();
        doc.add_node(Point3::new(0.2, 0.5, 0.5), 0.1, Some(a)).unwrap();
        let part_id = doc.find_node(a).unwrap().part_id;

        doc.remove_part(part_id);

        assert!(doc.parts().is_empty());
        assert!(doc.nodes().is_empty());
        assert!(doc.edges().is_empty());
        assert!(doc.components().is_empty());
        assert!(doc.root_component().children_ids.is_empty());
        let events = doc.drain_events();
        assert!(events.contains(&DocumentEvent::PartRemoved(part_id)));
        assert!(events.contains(&DocumentEvent::NodeRemoved(a)));
    }
}
