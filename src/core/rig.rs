//! Rig lookup trait and an in-memory rig.

use crate::core::bones::{BONE_COUNT, HumanBone};
use nalgebra::{UnitQuaternion, Vector3};
use parking_lot::RwLock;
use std::sync::Arc;

/// Read access to an animated humanoid rig
///
/// Implemented by the embedding application. The publisher only reads: it
/// never writes transforms back. Values are whatever the host's animation
/// system produced for the current frame.
pub trait RigSource {
    /// World-space rotation of the rig root
    fn root_rotation(&self) -> UnitQuaternion<f32>;

    /// World-space position of the rig root
    fn root_position(&self) -> Vector3<f32>;

    /// Local rotation of a bone, or `None` if the rig has no transform for it
    fn local_rotation(&self, bone: HumanBone) -> Option<UnitQuaternion<f32>>;
}

impl<R: RigSource + ?Sized> RigSource for Box<R> {
    fn root_rotation(&self) -> UnitQuaternion<f32> {
        (**self).root_rotation()
    }

    fn root_position(&self) -> Vector3<f32> {
        (**self).root_position()
    }

    fn local_rotation(&self, bone: HumanBone) -> Option<UnitQuaternion<f32>> {
        (**self).local_rotation(bone)
    }
}

/// In-memory rig with shared state
///
/// Clones share the same transforms, so a host can keep one handle to drive
/// the pose while the publisher reads through another.
#[derive(Clone)]
pub struct StaticRig {
    inner: Arc<RwLock<RigState>>,
}

struct RigState {
    root_rotation: UnitQuaternion<f32>,
    root_position: Vector3<f32>,
    bones: [Option<UnitQuaternion<f32>>; BONE_COUNT],
}

impl StaticRig {
    /// Create a rig at the origin with no bones
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(RigState {
                root_rotation: UnitQuaternion::identity(),
                root_position: Vector3::zeros(),
                bones: [None; BONE_COUNT],
            })),
        }
    }

    /// Create a rig exposing every bone at identity rotation
    pub fn full_skeleton() -> Self {
        let rig = Self::new();
        for bone in HumanBone::ALL {
            rig.set_local_rotation(bone, UnitQuaternion::identity());
        }
        rig
    }

    /// Set the root rotation
    pub fn set_root_rotation(&self, rotation: UnitQuaternion<f32>) {
        self.inner.write().root_rotation = rotation;
    }

    /// Set the root position
    pub fn set_root_position(&self, position: Vector3<f32>) {
        self.inner.write().root_position = position;
    }

    /// Set (or add) a bone's local rotation
    pub fn set_local_rotation(&self, bone: HumanBone, rotation: UnitQuaternion<f32>) {
        self.inner.write().bones[bone.index()] = Some(rotation);
    }

    /// Remove a bone from the rig
    pub fn remove_bone(&self, bone: HumanBone) {
        self.inner.write().bones[bone.index()] = None;
    }

    /// Number of bones the rig currently exposes
    pub fn bone_count(&self) -> usize {
        self.inner.read().bones.iter().filter(|b| b.is_some()).count()
    }
}

impl Default for StaticRig {
    fn default() -> Self {
        Self::new()
    }
}

impl RigSource for StaticRig {
    fn root_rotation(&self) -> UnitQuaternion<f32> {
        self.inner.read().root_rotation
    }

    fn root_position(&self) -> Vector3<f32> {
        self.inner.read().root_position
    }

    fn local_rotation(&self, bone: HumanBone) -> Option<UnitQuaternion<f32>> {
        self.inner.read().bones[bone.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rig_is_empty() {
        let rig = StaticRig::new();
        assert_eq!(rig.bone_count(), 0);
        assert_eq!(rig.root_rotation(), UnitQuaternion::identity());
        assert_eq!(rig.root_position(), Vector3::zeros());
        assert!(rig.local_rotation(HumanBone::Hips).is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let rig = StaticRig::full_skeleton();
        let handle = rig.clone();

        let turn = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.5);
        handle.set_root_rotation(turn);
        handle.set_root_position(Vector3::new(1.0, 2.0, 3.0));
        handle.remove_bone(HumanBone::Jaw);

        assert_eq!(rig.root_rotation(), turn);
        assert_eq!(rig.root_position(), Vector3::new(1.0, 2.0, 3.0));
        assert!(rig.local_rotation(HumanBone::Jaw).is_none());
        assert_eq!(rig.bone_count(), BONE_COUNT - 1);
    }

    #[test]
    fn test_boxed_rig_delegates() {
        let rig = StaticRig::new();
        rig.set_local_rotation(HumanBone::Head, UnitQuaternion::identity());
        let boxed: Box<dyn RigSource> = Box::new(rig);
        assert!(boxed.local_rotation(HumanBone::Head).is_some());
        assert!(boxed.local_rotation(HumanBone::Neck).is_none());
    }
}
