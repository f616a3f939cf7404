pub(crate) mod keyframe;
pub(crate) mod manager;
pub(crate) mod recorder;
pub(crate) mod registry;
pub(crate) mod serialize;
pub(crate) mod state;
