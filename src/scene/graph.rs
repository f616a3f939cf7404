use crate::foundation::core::{Quat, Transform, Vec3};
use crate::foundation::error::{ReplayError, ReplayResult};
use crate::scene::host::{DestructionHook, NodeId, SceneHost};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Trs {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
}

impl Default for Trs {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Trs {
    // Scale is applied componentwise; shear from non-uniform parent scale is not modeled.
    fn then(self, child: Trs) -> Trs {
        Trs {
            translation: self.translation + self.rotation * (self.scale * child.translation),
            rotation: self.rotation * child.rotation,
            scale: self.scale * child.scale,
        }
    }
}

struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Trs,
    semantic_id: i32,
    hooks: Vec<DestructionHook>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Minimal arena-backed scene graph.
///
/// Nodes carry a local translation/rotation/scale and a semantic id. Destroying a node destroys
/// its subtree and then runs every destruction hook attached to the destroyed nodes, children
/// before parents. Dropping the graph destroys whatever is left.
#[derive(Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl SceneGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the graph has no live nodes.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Create a node under `parent`, or a root when `parent` is `None`.
    pub fn create_node(&mut self, parent: Option<NodeId>) -> ReplayResult<NodeId> {
        if let Some(p) = parent
            && !self.is_alive(p)
        {
            return Err(ReplayError::scene(format!("parent {p} does not exist")));
        }

        let node = Node {
            parent,
            children: Vec::new(),
            local: Trs::default(),
            semantic_id: 0,
            hooks: Vec::new(),
        };

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = u32::try_from(self.slots.len())
                    .map_err(|_| ReplayError::scene("scene graph node limit reached"))?;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };

        if let Some(p) = parent {
            self.node_mut(p)?.children.push(id);
        }
        self.live += 1;
        Ok(id)
    }

    /// Parent of `node`, if it is alive and not a root.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    /// Direct children of `node` in creation order; empty for unknown nodes.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[], |n| n.children.as_slice())
    }

    /// Set the local translation of `node`.
    pub fn set_translation(&mut self, node: NodeId, translation: Vec3) -> ReplayResult<()> {
        self.node_mut(node)?.local.translation = translation;
        Ok(())
    }

    /// Offset the local translation of `node` by `delta`.
    pub fn translate(&mut self, node: NodeId, delta: Vec3) -> ReplayResult<()> {
        self.node_mut(node)?.local.translation += delta;
        Ok(())
    }

    /// Set the local rotation of `node`.
    pub fn set_rotation(&mut self, node: NodeId, rotation: Quat) -> ReplayResult<()> {
        self.node_mut(node)?.local.rotation = rotation;
        Ok(())
    }

    /// Set the local scale of `node`.
    pub fn set_scale(&mut self, node: NodeId, scale: Vec3) -> ReplayResult<()> {
        self.node_mut(node)?.local.scale = scale;
        Ok(())
    }

    /// Set the semantic id of `node`.
    pub fn set_semantic_id(&mut self, node: NodeId, semantic_id: i32) -> ReplayResult<()> {
        self.node_mut(node)?.semantic_id = semantic_id;
        Ok(())
    }

    /// Number of destruction hooks currently attached to `node`.
    pub fn destruction_hook_count(&self, node: NodeId) -> usize {
        self.node(node).map_or(0, |n| n.hooks.len())
    }

    /// Destroy `node` and its whole subtree, then run their destruction hooks.
    pub fn destroy_node(&mut self, node: NodeId) -> ReplayResult<()> {
        let parent = match self.node(node) {
            Some(n) => n.parent,
            None => return Err(ReplayError::scene(format!("{node} does not exist"))),
        };
        if let Some(p) = parent
            && let Ok(pn) = self.node_mut(p)
        {
            pn.children.retain(|c| *c != node);
        }

        let mut released = Vec::new();
        self.release_subtree(node, &mut released);
        tracing::trace!(%node, released = released.len(), "destroyed subtree");

        // Storage is gone at this point; hooks only see identities.
        for (id, hooks) in released {
            for hook in hooks {
                hook(id);
            }
        }
        Ok(())
    }

    /// Destroy every node, running all remaining destruction hooks.
    pub fn clear(&mut self) {
        let roots: Vec<NodeId> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let node = slot.node.as_ref()?;
                node.parent.is_none().then_some(NodeId {
                    index: index as u32,
                    generation: slot.generation,
                })
            })
            .collect();
        for root in roots {
            if let Err(err) = self.destroy_node(root) {
                tracing::warn!(%root, %err, "failed to destroy root node while clearing");
            }
        }
    }

    fn release_subtree(&mut self, id: NodeId, out: &mut Vec<(NodeId, Vec<DestructionHook>)>) {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return;
        };
        if slot.generation != id.generation {
            return;
        }
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;

        for child in node.children {
            self.release_subtree(child, out);
        }
        out.push((id, node.hooks));
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> ReplayResult<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or_else(|| ReplayError::scene(format!("{id} does not exist")))
    }

    fn world_trs(&self, id: NodeId) -> Option<Trs> {
        let node = self.node(id)?;
        match node.parent {
            None => Some(node.local),
            Some(parent) => Some(self.world_trs(parent)?.then(node.local)),
        }
    }
}

impl SceneHost for SceneGraph {
    fn is_alive(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    fn absolute_transform(&self, node: NodeId) -> Option<Transform> {
        let world = self.world_trs(node)?;
        Some(Transform::new(world.translation, world.rotation))
    }

    fn semantic_id(&self, node: NodeId) -> Option<i32> {
        self.node(node).map(|n| n.semantic_id)
    }

    fn attach_destruction_hook(&mut self, node: NodeId, hook: DestructionHook) -> ReplayResult<()> {
        self.node_mut(node)?.hooks.push(hook);
        Ok(())
    }
}

impl Drop for SceneGraph {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/graph.rs"]
mod tests;
