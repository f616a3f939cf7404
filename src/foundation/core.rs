use serde::{Deserialize, Serialize};

pub use glam::{Quat, Vec3};

/// Recorder-assigned identity of a render-asset instance.
///
/// Keys are handed out in increasing order starting at zero and are never reused by the recorder
/// that assigned them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceKey(pub u32);

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rigid transform: translation plus rotation, no scale.
///
/// On the wire the rotation is written scalar-first: `[w, x, y, z]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation in world units.
    pub translation: Vec3,
    /// Unit rotation quaternion.
    #[serde(with = "quat_wxyz")]
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    /// Build a transform from its parts.
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Pure translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }
}

/// Serde adapter writing a [`Quat`] as `[w, x, y, z]`.
pub(crate) mod quat_wxyz {
    use super::Quat;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(crate) fn serialize<S>(q: &Quat, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [q.w, q.x, q.y, q.z].serialize(serializer)
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Quat, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [w, x, y, z] = <[f32; 4]>::deserialize(deserializer)?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
