use crate::replay::keyframe::{InstanceState, Keyframe};
use crate::replay::registry::InstanceRegistry;
use crate::scene::host::{NodeId, SceneHost};

/// Read the current state of a live node. `None` when the host no longer knows it.
pub(crate) fn compute_state<H>(host: &H, node: NodeId) -> Option<InstanceState>
where
    H: SceneHost + ?Sized,
{
    Some(InstanceState {
        abs_transform: host.absolute_transform(node)?,
        semantic_id: host.semantic_id(node)?,
    })
}

/// Append a state update to `keyframe` for every instance whose state changed since it was last
/// observed (or was never observed). Returns the number of updates emitted.
///
/// # Panics
///
/// If a registered node is unknown to `host`: its destruction hook should have removed it.
pub(crate) fn update_all_instance_states<H>(
    registry: &mut InstanceRegistry,
    keyframe: &mut Keyframe,
    host: &H,
) -> usize
where
    H: SceneHost + ?Sized,
{
    let mut emitted = 0;
    for record in registry.iter_mut() {
        let Some(state) = compute_state(host, record.node) else {
            panic!(
                "instance {} is registered but its node {} is not alive in the scene host",
                record.key, record.node
            );
        };
        if record.recent_state != Some(state) {
            tracing::trace!(instance_key = %record.key, "instance state changed");
            keyframe.state_updates.push((record.key, state));
            record.recent_state = Some(state);
            emitted += 1;
        }
    }
    emitted
}

#[cfg(test)]
#[path = "../../tests/unit/replay/state.rs"]
mod tests;
