use std::io::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{InstanceKey, Transform};
use crate::foundation::error::{ReplayError, ReplayResult};
#[cfg(feature = "observations")]
use crate::replay::keyframe::Observation;
use crate::replay::keyframe::{AssetInfo, CreationInfo, Keyframe};

/// Serialized replay document: `{"keyframes": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyframesDocument {
    /// One entry per saved keyframe, in save order.
    pub keyframes: Vec<KeyframeRecord>,
}

/// Serialized form of one keyframe. Empty categories are omitted from the output entirely.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyframeRecord {
    /// Asset loads.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loads: Vec<LoadRecord>,
    /// Instance creations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creations: Vec<CreationRecord>,
    /// Deleted instance keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletions: Vec<InstanceKey>,
    /// Instance state changes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_updates: Vec<StateUpdateRecord>,
    /// Named user transforms, sorted by name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_transforms: Vec<UserTransformRecord>,
    /// Camera observation.
    #[cfg(feature = "observations")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<Observation>,
}

/// `{"assetInfo": <opaque>}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRecord {
    /// Opaque asset descriptor.
    pub asset_info: AssetInfo,
}

/// `{"instanceKey": int, "creation": <opaque>}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationRecord {
    /// Key assigned to the new instance.
    pub instance_key: InstanceKey,
    /// Opaque creation descriptor.
    pub creation: CreationInfo,
}

/// `{"instanceKey": int, "absTransform": <transform>, "semanticId": int}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdateRecord {
    /// Instance whose state changed.
    pub instance_key: InstanceKey,
    /// New absolute transform.
    pub abs_transform: Transform,
    /// New semantic id.
    pub semantic_id: i32,
}

/// `{"name": string, "transform": <transform>}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserTransformRecord {
    /// User-chosen name.
    pub name: String,
    /// Transform recorded under `name`.
    pub transform: Transform,
}

impl From<&Keyframe> for KeyframeRecord {
    fn from(kf: &Keyframe) -> Self {
        Self {
            loads: kf
                .loads
                .iter()
                .map(|asset_info| LoadRecord {
                    asset_info: asset_info.clone(),
                })
                .collect(),
            creations: kf
                .creations
                .iter()
                .map(|(key, creation)| CreationRecord {
                    instance_key: *key,
                    creation: creation.clone(),
                })
                .collect(),
            deletions: kf.deletions.clone(),
            state_updates: kf
                .state_updates
                .iter()
                .map(|(key, state)| StateUpdateRecord {
                    instance_key: *key,
                    abs_transform: state.abs_transform,
                    semantic_id: state.semantic_id,
                })
                .collect(),
            user_transforms: kf
                .user_transforms
                .iter()
                .map(|(name, transform)| UserTransformRecord {
                    name: name.clone(),
                    transform: *transform,
                })
                .collect(),
            #[cfg(feature = "observations")]
            observation: kf.observation,
        }
    }
}

impl KeyframesDocument {
    /// Whether the document holds no keyframes.
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Encode the document as JSON.
    pub fn to_json_bytes(&self, pretty: bool) -> ReplayResult<Vec<u8>> {
        let bytes = if pretty {
            serde_json::to_vec_pretty(self)?
        } else {
            serde_json::to_vec(self)?
        };
        Ok(bytes)
    }

    /// Encode the document and write it to `path`, creating the parent directory.
    /// Returns the number of bytes written.
    pub fn write_to_path(&self, path: &Path, pretty: bool) -> ReplayResult<usize> {
        let bytes = self.to_json_bytes(pretty)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ReplayError::io(parent, e))?;
        }
        let mut file = std::fs::File::create(path).map_err(|e| ReplayError::io(path, e))?;
        file.write_all(&bytes)
            .and_then(|()| file.flush())
            .map_err(|e| ReplayError::io(path, e))?;
        Ok(bytes.len())
    }

    /// Parse a document previously written by [`KeyframesDocument::write_to_path`].
    pub fn from_json_slice(bytes: &[u8]) -> ReplayResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Render `saved` keyframes into a document, one entry per keyframe.
///
/// An empty input is not an error and yields an empty document.
pub fn render_keyframes(saved: &[Keyframe]) -> KeyframesDocument {
    KeyframesDocument {
        keyframes: saved.iter().map(KeyframeRecord::from).collect(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/replay/serialize.rs"]
mod tests;
