//! Bones, node bindings and interactive joint picking.

use std::collections::BTreeSet;

use tracing::debug;
use uuid::Uuid;

use crate::document::{BonePicking, Document};
use crate::entity::{Bone, EditMode};
use crate::event::DocumentEvent;

impl Document {
    /// Add a bone named `Bone<N>`. Existing IDs are ignored.
    pub fn add_bone(&mut self, bone_id: Uuid) {
        if self.bones.contains_key(&bone_id) {
            return;
        }
        let mut bone = Bone::new(bone_id);
        bone.name = format!("Bone{}", self.bones.len() + 1);
        self.bones.insert(bone_id, bone);
        self.bone_id_list.push(bone_id);
        self.emit(DocumentEvent::BoneAdded(bone_id));
        self.emit(DocumentEvent::BoneIdListChanged);
        self.emit(DocumentEvent::RigChanged);
    }

    /// Remove a bone along with its node bindings and joint marks.
    pub fn remove_bone(&mut self, bone_id: Uuid) {
        if !self.bones.contains_key(&bone_id) {
            return;
        }
        let mut joint_changes = Vec::new();
        for node in self.nodes.values_mut() {
            node.bone_ids.remove(&bone_id);
            if node.as_bone_joints.remove(&bone_id) {
                node.bone_joint = !node.as_bone_joints.is_empty();
                joint_changes.push(node.id);
            }
        }
        self.bone_id_list.retain(|id| *id != bone_id);
        self.bones.remove(&bone_id);
        for node_id in joint_changes {
            self.emit(DocumentEvent::NodeBoneJointStateChanged(node_id));
        }
        self.emit(DocumentEvent::BoneRemoved(bone_id));
        self.emit(DocumentEvent::BoneIdListChanged);
        self.emit(DocumentEvent::RigChanged);
    }

    /// Bind nodes' geometry to a bone.
    pub fn add_nodes_to_bone(&mut self, bone_id: Uuid, node_ids: &[Uuid]) {
        self.rebind_nodes(bone_id, node_ids, true);
    }

    /// Unbind nodes' geometry from a bone.
    pub fn remove_nodes_from_bone(&mut self, bone_id: Uuid, node_ids: &[Uuid]) {
        self.rebind_nodes(bone_id, node_ids, false);
    }

    fn rebind_nodes(&mut self, bone_id: Uuid, node_ids: &[Uuid], bind: bool) {
        if !self.bones.contains_key(&bone_id) {
            debug!(%bone_id, "bone not found");
            return;
        }
        for node_id in node_ids {
            let Some(node) = self.nodes.get_mut(node_id) else {
                continue;
            };
            if bind {
                node.bone_ids.insert(bone_id);
            } else {
                node.bone_ids.remove(&bone_id);
            }
        }
        self.emit(DocumentEvent::BoneNodesChanged(bone_id));
        self.emit(DocumentEvent::RigChanged);
    }

    /// Replace a bone's joint chain, keeping every node's joint flag in
    /// step with the bones that list it.
    pub fn apply_bone_joints(&mut self, bone_id: Uuid, node_ids: &[Uuid]) {
        let Some(bone) = self.bones.get_mut(&bone_id) else {
            return;
        };
        let old_joints = std::mem::replace(&mut bone.joints, node_ids.to_vec());

        let mut changed = BTreeSet::new();
        for node_id in &old_joints {
            let Some(node) = self.nodes.get_mut(node_id) else {
                continue;
            };
            node.as_bone_joints.remove(&bone_id);
            node.bone_joint = !node.as_bone_joints.is_empty();
            changed.insert(*node_id);
        }
        for node_id in node_ids {
            let Some(node) = self.nodes.get_mut(node_id) else {
                continue;
            };
            node.as_bone_joints.insert(bone_id);
            node.bone_joint = true;
            changed.insert(*node_id);
        }
        for node_id in changed {
            self.emit(DocumentEvent::NodeBoneJointStateChanged(node_id));
        }
        self.emit(DocumentEvent::BoneJointsChanged(bone_id));
        self.emit(DocumentEvent::RigChanged);
    }

    /// Hang a bone from a joint of another bone; `None` detaches it.
    pub fn set_bone_attachment(&mut self, bone_id: Uuid, to_bone_id: Option<Uuid>, to_joint_index: usize) {
        let Some(bone) = self.bones.get_mut(&bone_id) else {
            return;
        };
        if bone.attach_bone_id == to_bone_id && bone.attach_bone_joint_index == to_joint_index {
            return;
        }
        bone.attach_bone_id = to_bone_id;
        bone.attach_bone_joint_index = to_joint_index;
        self.emit(DocumentEvent::BoneAttachmentChanged(bone_id));
        self.emit(DocumentEvent::RigChanged);
    }

    /// Rename a bone.
    pub fn rename_bone(&mut self, bone_id: Uuid, name: &str) {
        let Some(bone) = self.bones.get_mut(&bone_id) else {
            return;
        };
        if bone.name == name {
            return;
        }
        bone.name = name.to_string();
        self.emit(DocumentEvent::BoneNameChanged(bone_id));
        self.emit(DocumentEvent::RigChanged);
    }

    // =====================================================================
    // Joint picking
    // =====================================================================

    /// Enter [`EditMode::Pick`] to choose `joint_count` joints for a bone.
    pub fn start_bone_joints_picking(&mut self, bone_id: Uuid, joint_count: usize) {
        self.stop_bone_joints_picking();
        self.bone_picking = BonePicking {
            bone_id: Some(bone_id),
            joint_count,
            picked: Vec::new(),
        };
        self.edit_mode = EditMode::Pick;
        self.emit(DocumentEvent::EditModeChanged);
    }

    /// Append a node to the joint chain being picked. Picking ends once the
    /// requested number of joints is reached.
    pub fn pick_bone_node(&mut self, node_id: Uuid) {
        let Some(bone_id) = self.bone_picking.bone_id else {
            return;
        };
        if self.bone_picking.picked.contains(&node_id) {
            return;
        }
        self.bone_picking.picked.push(node_id);
        let picked = self.bone_picking.picked.clone();
        self.apply_bone_joints(bone_id, &picked);
        if picked.len() >= self.bone_picking.joint_count {
            self.stop_bone_joints_picking();
        }
    }

    /// Leave [`EditMode::Pick`] for [`EditMode::Select`].
    pub fn stop_bone_joints_picking(&mut self) {
        if self.edit_mode == EditMode::Pick {
            self.set_edit_mode(EditMode::Select);
        }
    }

    /// Bone whose joints are being picked.
    pub fn picking_bone_id(&self) -> Option<Uuid> {
        self.bone_picking.bone_id
    }
}
