use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Quat, Vec3, quat_wxyz};
use crate::foundation::error::{ReplayError, ReplayResult};
use crate::replay::manager::ReplayConfig;

/// Rotation written scalar-first, `[w, x, y, z]`, matching the document's transforms.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptRotation(#[serde(with = "quat_wxyz")] pub Quat);

/// One scripted scene or recorder action. Nodes are referenced by script-local names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Report an asset load to the recorder.
    LoadAsset {
        /// Opaque asset descriptor.
        asset_info: serde_json::Value,
    },
    /// Create a scene node.
    CreateNode {
        /// Name later steps use for this node.
        name: String,
        /// Parent node name; a root when absent.
        #[serde(default)]
        parent: Option<String>,
        /// Initial local translation.
        #[serde(default)]
        translation: Option<Vec3>,
        /// Initial local rotation.
        #[serde(default)]
        rotation: Option<ScriptRotation>,
        /// Initial local scale.
        #[serde(default)]
        scale: Option<Vec3>,
        /// Initial semantic id.
        #[serde(default)]
        semantic_id: Option<i32>,
    },
    /// Register a node as a render-asset instance.
    CreateInstance {
        /// Node name.
        node: String,
        /// Opaque creation descriptor.
        creation: serde_json::Value,
    },
    /// Overwrite a node's local translation and/or rotation.
    SetTransform {
        /// Node name.
        node: String,
        /// New local translation.
        #[serde(default)]
        translation: Option<Vec3>,
        /// New local rotation.
        #[serde(default)]
        rotation: Option<ScriptRotation>,
    },
    /// Offset a node's local translation.
    Translate {
        /// Node name.
        node: String,
        /// Offset to add.
        delta: Vec3,
    },
    /// Change a node's semantic id.
    SetSemanticId {
        /// Node name.
        node: String,
        /// New semantic id.
        semantic_id: i32,
    },
    /// Destroy a node and its subtree.
    DestroyNode {
        /// Node name.
        node: String,
    },
    /// Add a named user transform to the current keyframe.
    UserTransform {
        /// Transform name.
        name: String,
        /// Translation.
        translation: Vec3,
        /// Rotation; identity when absent.
        #[serde(default)]
        rotation: Option<ScriptRotation>,
    },
    /// Save a keyframe.
    Save,
    /// Flush saved keyframes, to `path` when given or into the run summary otherwise.
    Flush {
        /// Output file, relative to the runner's base directory.
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

/// Scripted recording session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    /// Recorder settings; defaults apply when absent. Applied by [`ScriptRunner::from_script`].
    ///
    /// [`ScriptRunner::from_script`]: crate::ScriptRunner::from_script
    #[serde(default)]
    pub config: Option<ReplayConfig>,
    /// Steps, run in order.
    pub steps: Vec<ScriptStep>,
}

impl ReplayScript {
    /// Parse a script from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReplayResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| ReplayError::validation(format!("parse replay script JSON: {e}")))
    }

    /// Parse a script from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ReplayResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| ReplayError::io(path, e))?;
        Self::from_reader(BufReader::new(f))
    }
}
