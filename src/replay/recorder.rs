use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::foundation::core::{InstanceKey, Quat, Transform, Vec3};
use crate::foundation::error::{ReplayError, ReplayResult};
#[cfg(feature = "observations")]
use crate::replay::keyframe::Observation;
use crate::replay::keyframe::{AssetInfo, CreationInfo, Keyframe};
use crate::replay::registry::{InstanceRecord, InstanceRegistry, ObserverToken};
use crate::replay::serialize::{KeyframesDocument, render_keyframes};
use crate::replay::state::update_all_instance_states;
use crate::scene::host::{DestructionHook, NodeId, SceneHost};

/// Outcome of a flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Saved keyframes rendered into the document. Zero means there was nothing to flush.
    pub keyframes_written: usize,
    /// Size of the encoded document.
    pub bytes_written: usize,
}

#[derive(Debug, Default)]
struct RecorderCore {
    registry: InstanceRegistry,
    current: Keyframe,
    saved: Vec<Keyframe>,
}

impl RecorderCore {
    fn on_delete_render_asset_instance(&mut self, node: NodeId) {
        let Some(index) = self.registry.find(node) else {
            panic!("deletion notice for {node}, which has no instance record");
        };
        let record = self.registry.remove(index);
        let key = record.key;
        self.current.record_deletion(key);
        tracing::debug!(%node, instance_key = %key, "render asset instance deleted");
    }

    fn render_for_flush(&self) -> KeyframesDocument {
        if self.saved.is_empty() {
            tracing::warn!("no saved keyframes to write");
        }
        render_keyframes(&self.saved)
    }

    fn close_and_advance(&mut self) {
        let closed = std::mem::take(&mut self.current);
        self.saved.push(closed);
    }

    // Flushed history goes first and the unsaved keyframe's lifecycle events after it, so a
    // deletion noticed since the last save can still cancel a flushed creation.
    fn consolidate_saved(&mut self) {
        let saved = std::mem::take(&mut self.saved);
        let pending = std::mem::take(&mut self.current);
        let mut merged = Keyframe::default();
        merged.consolidate_from(saved.iter().chain(std::iter::once(&pending)));
        merged.state_updates = pending.state_updates;
        merged.user_transforms = pending.user_transforms;
        #[cfg(feature = "observations")]
        {
            merged.observation = pending.observation;
        }
        self.current = merged;
        tracing::debug!(
            consolidated = saved.len(),
            creations = self.current.creations.len(),
            deletions = self.current.deletions.len(),
            "folded flushed keyframes into current keyframe"
        );
    }
}

/// Records render-asset instance events from a live scene into diff-based keyframes.
///
/// Creation and load events go into the current keyframe as they happen. Deletions arrive through
/// a destruction hook the recorder attaches to every instance node, so they need no call from the
/// owner of the scene. [`Recorder::save_keyframe`] appends state changes and closes the current
/// keyframe; the `write_saved_keyframes_*` methods serialize everything saved so far and fold its
/// net creations and deletions back into the current keyframe.
///
/// Hooks hold only a weak reference to the recorder. Dropping the recorder disarms all of them
/// before anything else is released.
pub struct Recorder {
    core: Rc<RefCell<RecorderCore>>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("Recorder")
            .field("instances", &core.registry.len())
            .field("saved_keyframes", &core.saved.len())
            .finish()
    }
}

impl Recorder {
    /// Create a recorder with an empty current keyframe.
    pub fn new() -> Self {
        Self {
            core: Rc::new(RefCell::new(RecorderCore::default())),
        }
    }

    /// Record that a render asset was loaded.
    pub fn on_load_render_asset(&mut self, asset_info: AssetInfo) {
        self.core.borrow_mut().current.loads.push(asset_info);
    }

    /// Register `node` as a new render-asset instance and return its key.
    ///
    /// # Panics
    ///
    /// If `node` is not alive in `host`, already has an instance record, or the host refuses the
    /// destruction hook.
    pub fn on_create_render_asset_instance<H>(
        &mut self,
        host: &mut H,
        node: NodeId,
        creation: CreationInfo,
    ) -> InstanceKey
    where
        H: SceneHost + ?Sized,
    {
        assert!(
            host.is_alive(node),
            "cannot record an instance for {node}: node is not alive"
        );
        let mut core = self.core.borrow_mut();
        assert!(
            core.registry.find(node).is_none(),
            "{node} already has an instance record"
        );

        let (observer, armed) = ObserverToken::new();
        let weak = Rc::downgrade(&self.core);
        let hook: DestructionHook = Box::new(move |destroyed| {
            if !armed.get() {
                return;
            }
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let Ok(mut core) = shared.try_borrow_mut() else {
                panic!("destruction of {destroyed} re-entered the recorder");
            };
            core.on_delete_render_asset_instance(destroyed);
        });
        if let Err(err) = host.attach_destruction_hook(node, hook) {
            panic!("scene host refused destruction hook for live {node}: {err}");
        }

        let key = core.registry.allocate_key();
        core.current.creations.push((key, creation));
        core.registry.insert(InstanceRecord {
            node,
            key,
            recent_state: None,
            observer,
        });
        tracing::debug!(%node, instance_key = %key, "render asset instance created");
        key
    }

    /// Append state updates for every changed instance, then close the current keyframe.
    pub fn save_keyframe<H>(&mut self, host: &H)
    where
        H: SceneHost + ?Sized,
    {
        let mut core = self.core.borrow_mut();
        let RecorderCore {
            registry, current, ..
        } = &mut *core;
        let updates = update_all_instance_states(registry, current, host);
        core.close_and_advance();
        tracing::debug!(
            state_updates = updates,
            saved = core.saved.len(),
            "keyframe saved"
        );
    }

    /// Set a named transform on the current keyframe; the last call per name before the next
    /// save wins.
    pub fn add_user_transform_to_keyframe(
        &mut self,
        name: impl Into<String>,
        translation: Vec3,
        rotation: Quat,
    ) {
        self.core
            .borrow_mut()
            .current
            .set_user_transform(name, Transform::new(translation, rotation));
    }

    /// Attach a camera observation to the current keyframe, replacing any earlier one.
    #[cfg(feature = "observations")]
    pub fn set_observation(&mut self, observation: Observation) {
        self.core.borrow_mut().current.observation = Some(observation);
    }

    /// Render the saved keyframes without consuming them.
    pub fn keyframes_document(&self) -> KeyframesDocument {
        render_keyframes(&self.core.borrow().saved)
    }

    /// Serialize the saved keyframes as compact JSON and consolidate them.
    pub fn write_saved_keyframes_to_bytes(&mut self) -> ReplayResult<Vec<u8>> {
        let mut core = self.core.borrow_mut();
        let bytes = core.render_for_flush().to_json_bytes(false)?;
        core.consolidate_saved();
        Ok(bytes)
    }

    /// Serialize the saved keyframes as a compact JSON string and consolidate them.
    pub fn write_saved_keyframes_to_string(&mut self) -> ReplayResult<String> {
        let bytes = self.write_saved_keyframes_to_bytes()?;
        String::from_utf8(bytes).map_err(|e| ReplayError::serde(e.to_string()))
    }

    /// Write the saved keyframes to `path` and consolidate them.
    ///
    /// On failure the saved keyframes are left as they were, so the same flush can be retried.
    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    pub fn write_saved_keyframes_to_file(
        &mut self,
        path: &Path,
        pretty: bool,
    ) -> ReplayResult<FlushStats> {
        let mut core = self.core.borrow_mut();
        let bytes_written = core.render_for_flush().write_to_path(path, pretty)?;
        let keyframes_written = core.saved.len();
        core.consolidate_saved();
        tracing::info!(keyframes_written, bytes_written, "wrote replay keyframes");
        Ok(FlushStats {
            keyframes_written,
            bytes_written,
        })
    }

    /// Copy of the keyframe currently being built.
    pub fn current_keyframe(&self) -> Keyframe {
        self.core.borrow().current.clone()
    }

    /// Copies of the closed keyframes awaiting a flush.
    pub fn saved_keyframes(&self) -> Vec<Keyframe> {
        self.core.borrow().saved.clone()
    }

    /// Number of closed keyframes awaiting a flush.
    pub fn saved_keyframe_count(&self) -> usize {
        self.core.borrow().saved.len()
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        self.core.borrow().registry.len()
    }

    /// Position of `node` in the registry, if it has an instance record.
    pub fn find_instance(&self, node: NodeId) -> Option<usize> {
        self.core.borrow().registry.find(node)
    }

    /// Key assigned to `node`, if it has an instance record.
    pub fn instance_key(&self, node: NodeId) -> Option<InstanceKey> {
        let core = self.core.borrow();
        let index = core.registry.find(node)?;
        core.registry.get(index).map(|record| record.key)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        // Hooks still attached to live nodes must be inert before the registry goes away.
        if let Ok(mut core) = self.core.try_borrow_mut() {
            core.registry.release_all();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/replay/recorder.rs"]
mod tests;
