//! render-replay records what a live scene graph renders so the run can be replayed without
//! re-running the simulation.
//!
//! A [`Recorder`] watches render-asset instances attached to scene nodes and produces an ordered
//! list of diff-based keyframes:
//!
//! 1. **Events**: asset loads and instance creations are reported by the owner of the scene;
//!    deletions arrive on their own through a destruction hook installed on each instance node.
//! 2. **Save**: [`Recorder::save_keyframe`] diffs every live instance's absolute transform and
//!    semantic id against what was last seen, then closes the current keyframe.
//! 3. **Flush**: the saved keyframes are written as a `{"keyframes": [...]}` JSON document, and
//!    their net creations/deletions are folded back into the current keyframe.
//!
//! An instance created and destroyed inside the window being considered leaves no trace: its
//! deletion cancels its creation.
//!
//! The scene is reached only through [`SceneHost`]; [`SceneGraph`] is a small in-crate host.
//! [`ScriptRunner`] drives both from a JSON script and backs the `render-replay` binary.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;
mod replay;
mod scene;
mod script;

pub use foundation::core::{InstanceKey, Quat, Transform, Vec3};
pub use foundation::error::{ReplayError, ReplayResult};
#[cfg(feature = "observations")]
pub use replay::keyframe::{Observation, SensorType};
pub use replay::keyframe::{AssetInfo, CreationInfo, InstanceState, Keyframe};
pub use replay::manager::{ReplayConfig, ReplayManager};
pub use replay::recorder::{FlushStats, Recorder};
pub use replay::serialize::{
    CreationRecord, KeyframeRecord, KeyframesDocument, LoadRecord, StateUpdateRecord,
    UserTransformRecord, render_keyframes,
};
pub use scene::graph::SceneGraph;
pub use scene::host::{DestructionHook, NodeId, SceneHost};
pub use script::model::{ReplayScript, ScriptRotation, ScriptStep};
pub use script::runner::{RunSummary, ScriptRunner};
