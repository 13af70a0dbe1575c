//! Change notifications queued by the document.

use uuid::Uuid;

/// A position-related lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockAxis {
    /// X coordinate.
    X,
    /// Y coordinate.
    Y,
    /// Z coordinate.
    Z,
    /// Node radius.
    Radius,
}

/// Something about the document changed.
///
/// Fine-grained events name the entity touched. The coarse
/// [`SkeletonChanged`](Self::SkeletonChanged), [`RigChanged`](Self::RigChanged),
/// [`TextureChanged`](Self::TextureChanged) and
/// [`OptionsChanged`](Self::OptionsChanged) events close each operation and
/// say which generation pass, if any, is now stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// Node created.
    NodeAdded(Uuid),
    /// Node deleted.
    NodeRemoved(Uuid),
    /// Node moved, or its incident edges changed.
    NodeOriginChanged(Uuid),
    /// Node radius changed.
    NodeRadiusChanged(Uuid),
    /// Node became or stopped being a bone joint.
    NodeBoneJointStateChanged(Uuid),
    /// Node cut rotation changed.
    NodeCutRotationChanged(Uuid),
    /// Node cut face settings changed.
    NodeCutFaceChanged(Uuid),
    /// Edge created.
    EdgeAdded(Uuid),
    /// Edge deleted.
    EdgeRemoved(Uuid),
    /// Edge endpoints swapped.
    EdgeReversed(Uuid),
    /// Part created.
    PartAdded(Uuid),
    /// Part deleted.
    PartRemoved(Uuid),
    /// Part lock state changed.
    PartLockStateChanged(Uuid),
    /// Part visibility changed.
    PartVisibleStateChanged(Uuid),
    /// Part disabled state changed.
    PartDisableStateChanged(Uuid),
    /// Part color image changed.
    PartColorImageChanged(Uuid),
    /// Any other part attribute changed.
    PartChanged(Uuid),
    /// Component created.
    ComponentAdded(Uuid),
    /// Component deleted.
    ComponentRemoved(Uuid),
    /// Child list of a component changed (`None` is the root).
    ComponentChildrenChanged(Option<Uuid>),
    /// Component renamed.
    ComponentNameChanged(Uuid),
    /// Component expanded or collapsed.
    ComponentExpandStateChanged(Uuid),
    /// Component combine mode changed.
    ComponentCombineModeChanged(Uuid),
    /// Component preview mesh or image replaced.
    ComponentPreviewChanged(Uuid),
    /// Bone created.
    BoneAdded(Uuid),
    /// Bone deleted.
    BoneRemoved(Uuid),
    /// Bone order changed.
    BoneIdListChanged,
    /// Nodes bound to a bone changed.
    BoneNodesChanged(Uuid),
    /// Joint sequence of a bone changed.
    BoneJointsChanged(Uuid),
    /// Bone attachment changed.
    BoneAttachmentChanged(Uuid),
    /// Bone renamed.
    BoneNameChanged(Uuid),
    /// Bone preview mesh replaced.
    BonePreviewChanged(Uuid),
    /// Canvas origin moved.
    OriginChanged,
    /// A position lock toggled.
    LockStateChanged(LockAxis),
    /// Edit mode changed.
    EditModeChanged,
    /// The document was emptied.
    Cleanup,
    /// Geometry-relevant state changed; the mesh is stale.
    SkeletonChanged,
    /// Bones or bindings changed; the rig is stale.
    RigChanged,
    /// Material state changed; the texture is stale.
    TextureChanged,
    /// Editor-only state changed.
    OptionsChanged,
    /// A mesh job started.
    MeshGenerating,
    /// A mesh result was applied.
    ResultMeshChanged,
    /// Component previews were replaced by a mesh result.
    ResultComponentPreviewMeshesChanged,
    /// A texture job started.
    TextureGenerating,
    /// A texture result was applied.
    ResultTextureChanged,
    /// A bone job started.
    BoneGenerating,
    /// Bone previews were replaced by a bone result.
    ResultBonePreviewMeshesChanged,
    /// The whole-body bone preview was replaced.
    ResultBodyBonePreviewMeshChanged,
    /// A bone result was applied.
    ResultBoneChanged,
    /// Nothing is generating and nothing is stale.
    ExportReady,
}

impl DocumentEvent {
    /// True for the coarse events that close an operation.
    pub fn is_coarse(&self) -> bool {
        matches!(
            self,
            Self::SkeletonChanged | Self::RigChanged | Self::TextureChanged | Self::OptionsChanged
        )
    }
}
