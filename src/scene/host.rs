use crate::foundation::core::Transform;
use crate::foundation::error::ReplayResult;

/// Generational identity of a scene node.
///
/// A destroyed node's slot may be reused, but never with the same generation, so a stale id never
/// aliases a newer node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Slot index inside the owning graph.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot at the time the node was created.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}v{}", self.index, self.generation)
    }
}

/// One-shot callback invoked by a scene host once a node has been torn down.
///
/// The host calls it after the node's storage is gone, so the id it receives is an identity only.
pub type DestructionHook = Box<dyn FnOnce(NodeId)>;

/// The parts of a scene graph the recorder reads from.
///
/// Implementations own node lifetimes; the recorder only observes them.
pub trait SceneHost {
    /// Whether `node` currently exists.
    fn is_alive(&self, node: NodeId) -> bool;

    /// Absolute (world) translation and rotation of `node`, scale dropped.
    fn absolute_transform(&self, node: NodeId) -> Option<Transform>;

    /// Semantic identifier attached to `node`.
    fn semantic_id(&self, node: NodeId) -> Option<i32>;

    /// Register `hook` to run exactly once when `node` is destroyed.
    fn attach_destruction_hook(&mut self, node: NodeId, hook: DestructionHook) -> ReplayResult<()>;
}
