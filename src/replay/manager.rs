use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{InstanceKey, Quat, Vec3};
use crate::foundation::error::ReplayResult;
use crate::replay::keyframe::{AssetInfo, CreationInfo};
use crate::replay::recorder::{FlushStats, Recorder};
use crate::scene::host::{NodeId, SceneHost};

/// Replay recording settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Create a recorder at all. Every recording call is a logged no-op without it.
    pub enable_save: bool,
    /// Indent documents written to files.
    pub pretty_files: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            enable_save: false,
            pretty_files: true,
        }
    }
}

/// Owner-facing entry point that holds a [`Recorder`] only when saving is enabled.
#[derive(Debug)]
pub struct ReplayManager {
    config: ReplayConfig,
    recorder: Option<Recorder>,
}

impl ReplayManager {
    /// Build a manager; a recorder is created when `config.enable_save` is set.
    pub fn new(config: ReplayConfig) -> Self {
        let recorder = config.enable_save.then(Recorder::new);
        Self { config, recorder }
    }

    /// Active settings.
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// The recorder, when saving is enabled.
    pub fn recorder(&self) -> Option<&Recorder> {
        self.recorder.as_ref()
    }

    /// Mutable access to the recorder, when saving is enabled.
    pub fn recorder_mut(&mut self) -> Option<&mut Recorder> {
        self.recorder.as_mut()
    }

    /// Forward an asset load to the recorder.
    pub fn on_load_render_asset(&mut self, asset_info: AssetInfo) {
        if let Some(rec) = self.recorder.as_mut() {
            rec.on_load_render_asset(asset_info);
        }
    }

    /// Forward an instance creation to the recorder. `None` when saving is disabled.
    pub fn on_create_render_asset_instance<H>(
        &mut self,
        host: &mut H,
        node: NodeId,
        creation: CreationInfo,
    ) -> Option<InstanceKey>
    where
        H: SceneHost + ?Sized,
    {
        self.recorder
            .as_mut()
            .map(|rec| rec.on_create_render_asset_instance(host, node, creation))
    }

    /// Save a keyframe.
    pub fn save_keyframe<H>(&mut self, host: &H)
    where
        H: SceneHost + ?Sized,
    {
        match self.recorder.as_mut() {
            Some(rec) => rec.save_keyframe(host),
            None => disabled("save_keyframe"),
        }
    }

    /// Add a named user transform to the current keyframe.
    pub fn add_user_transform_to_keyframe(
        &mut self,
        name: impl Into<String>,
        translation: Vec3,
        rotation: Quat,
    ) {
        match self.recorder.as_mut() {
            Some(rec) => rec.add_user_transform_to_keyframe(name, translation, rotation),
            None => disabled("add_user_transform_to_keyframe"),
        }
    }

    /// Flush saved keyframes to a compact JSON string; empty when saving is disabled.
    pub fn write_saved_keyframes_to_string(&mut self) -> ReplayResult<String> {
        match self.recorder.as_mut() {
            Some(rec) => rec.write_saved_keyframes_to_string(),
            None => {
                disabled("write_saved_keyframes_to_string");
                Ok(String::new())
            }
        }
    }

    /// Flush saved keyframes to `path`, formatted per [`ReplayConfig::pretty_files`].
    pub fn write_saved_keyframes_to_file(&mut self, path: &Path) -> ReplayResult<FlushStats> {
        let pretty = self.config.pretty_files;
        match self.recorder.as_mut() {
            Some(rec) => rec.write_saved_keyframes_to_file(path, pretty),
            None => {
                disabled("write_saved_keyframes_to_file");
                Ok(FlushStats::default())
            }
        }
    }
}

fn disabled(op: &str) {
    tracing::error!("{op}: replay recording is not enabled; see ReplayConfig::enable_save");
}

#[cfg(test)]
#[path = "../../tests/unit/replay/manager.rs"]
mod tests;
