use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{InstanceKey, Transform};
use crate::foundation::error::ReplayResult;

/// Opaque description of a loaded render asset, passed through to the document untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetInfo(serde_json::Value);

impl AssetInfo {
    /// Wrap an already-built JSON value.
    pub fn from_value(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Capture any serializable descriptor.
    pub fn from_serialize<T: Serialize>(descriptor: &T) -> ReplayResult<Self> {
        Ok(Self(serde_json::to_value(descriptor)?))
    }

    /// Borrow the wrapped value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Opaque description of what instance to create, passed through to the document untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreationInfo(serde_json::Value);

impl CreationInfo {
    /// Wrap an already-built JSON value.
    pub fn from_value(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Capture any serializable creation descriptor.
    pub fn from_serialize<T: Serialize>(descriptor: &T) -> ReplayResult<Self> {
        Ok(Self(serde_json::to_value(descriptor)?))
    }

    /// Borrow the wrapped value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Observed state of one instance, compared structurally to detect changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceState {
    /// Absolute translation and rotation of the instance's node.
    pub abs_transform: Transform,
    /// Semantic id of the instance's node.
    pub semantic_id: i32,
}

/// Sensor kinds an observation can be taken with. Serialized as its integer discriminant.
#[cfg(feature = "observations")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum SensorType {
    /// No sensor.
    None = 0,
    /// RGB camera.
    Color = 1,
    /// Depth camera.
    Depth = 2,
    /// Surface normals.
    Normal = 3,
    /// Semantic id buffer.
    Semantic = 4,
}

#[cfg(feature = "observations")]
impl Serialize for SensorType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(*self as i32)
    }
}

#[cfg(feature = "observations")]
impl<'de> Deserialize<'de> for SensorType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match i32::deserialize(deserializer)? {
            0 => Ok(Self::None),
            1 => Ok(Self::Color),
            2 => Ok(Self::Depth),
            3 => Ok(Self::Normal),
            4 => Ok(Self::Semantic),
            other => Err(serde::de::Error::custom(format!(
                "unknown sensor type {other}"
            ))),
        }
    }
}

/// Camera pose and sensor kind attached to a keyframe.
#[cfg(feature = "observations")]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Absolute camera transform.
    pub camera_transform: Transform,
    /// Sensor the observation was rendered with.
    pub sensor_type: SensorType,
}

/// One recording interval's worth of events.
///
/// `creations` keeps call order because later creations may reference earlier loads. A key in
/// `deletions` never also appears in `creations` of the same keyframe: see
/// [`Keyframe::record_deletion`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keyframe {
    /// Asset loads, in call order.
    pub loads: Vec<AssetInfo>,
    /// Instance creations, in call order.
    pub creations: Vec<(InstanceKey, CreationInfo)>,
    /// Deletions of instances created in an earlier, already closed window.
    pub deletions: Vec<InstanceKey>,
    /// Changed instance states, in registry order.
    pub state_updates: Vec<(InstanceKey, InstanceState)>,
    /// Named user transforms; the last write for a name wins.
    pub user_transforms: BTreeMap<String, Transform>,
    /// Optional camera observation.
    #[cfg(feature = "observations")]
    pub observation: Option<Observation>,
}

impl Keyframe {
    /// Whether the keyframe carries no events at all.
    pub fn is_empty(&self) -> bool {
        let empty = self.loads.is_empty()
            && self.creations.is_empty()
            && self.deletions.is_empty()
            && self.state_updates.is_empty()
            && self.user_transforms.is_empty();
        #[cfg(feature = "observations")]
        let empty = empty && self.observation.is_none();
        empty
    }

    /// Record that `key` was deleted.
    ///
    /// A deletion of an instance whose creation is still in this keyframe cancels that creation
    /// instead of being recorded.
    pub fn record_deletion(&mut self, key: InstanceKey) {
        match self.creations.iter().position(|(k, _)| *k == key) {
            Some(pos) => {
                self.creations.remove(pos);
            }
            None => self.deletions.push(key),
        }
    }

    /// Insert or overwrite a named user transform.
    pub fn set_user_transform(&mut self, name: impl Into<String>, transform: Transform) {
        self.user_transforms.insert(name.into(), transform);
    }

    /// Fold the loads, creations and deletions of `sources` into `self`, in order.
    ///
    /// Deletions go through [`Keyframe::record_deletion`], so a creation from an earlier source is
    /// cancelled by a deletion from a later one. State updates, user transforms and observations
    /// are one-shot and are not carried over.
    pub fn consolidate_from<'a>(&mut self, sources: impl IntoIterator<Item = &'a Keyframe>) {
        for source in sources {
            self.loads.extend(source.loads.iter().cloned());
            self.creations.extend(source.creations.iter().cloned());
            for &key in &source.deletions {
                self.record_deletion(key);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/replay/keyframe.rs"]
mod tests;
