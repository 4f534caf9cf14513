//! Per-bone rest-pose offsets
//!
//! The source rig and the target application disagree on each bone's rest
//! orientation. The offset reconciles the two:
//!
//! ```text
//! offset(bone) = reference * inverse(rest_local_rotation(bone))
//! ```
//!
//! Bones the rig does not expose get the identity offset.

use crate::core::bones::{BONE_COUNT, HumanBone};
use crate::core::rig::RigSource;
use nalgebra::UnitQuaternion;

/// Offset between a source rest rotation and a target reference rotation
#[inline]
pub fn offset_between(
    source: &UnitQuaternion<f32>,
    reference: &UnitQuaternion<f32>,
) -> UnitQuaternion<f32> {
    reference * source.inverse()
}

/// Immutable per-bone offset table, indexed by [`HumanBone`]
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetTable {
    offsets: [UnitQuaternion<f32>; BONE_COUNT],
    present: usize,
}

impl OffsetTable {
    /// Compute offsets from the rig's current (rest) local rotations
    pub fn compute<R: RigSource + ?Sized>(rig: &R, reference: &UnitQuaternion<f32>) -> Self {
        let mut offsets = [UnitQuaternion::identity(); BONE_COUNT];
        let mut present = 0;

        for bone in HumanBone::ALL {
            if let Some(local) = rig.local_rotation(bone) {
                offsets[bone.index()] = offset_between(&local, reference);
                present += 1;
            }
        }

        log::debug!(
            "Computed offsets for {}/{} bones ({} defaulted to identity)",
            present,
            BONE_COUNT,
            BONE_COUNT - present
        );

        Self { offsets, present }
    }

    /// Offset for one bone
    #[inline]
    pub fn get(&self, bone: HumanBone) -> &UnitQuaternion<f32> {
        &self.offsets[bone.index()]
    }

    /// Number of bones that had a rest rotation at compute time
    pub fn present(&self) -> usize {
        self.present
    }

    /// Iterate `(bone, offset)` in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = (HumanBone, &UnitQuaternion<f32>)> + '_ {
        HumanBone::ALL.iter().map(move |&bone| (bone, self.get(bone)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rig::StaticRig;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn rest_rig() -> StaticRig {
        let rig = StaticRig::new();
        rig.set_local_rotation(
            HumanBone::Hips,
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.4),
        );
        rig.set_local_rotation(
            HumanBone::LeftUpperLeg,
            UnitQuaternion::from_euler_angles(0.1, 0.2, -0.3),
        );
        rig.set_local_rotation(HumanBone::Head, UnitQuaternion::identity());
        rig
    }

    #[test]
    fn test_present_bones_get_reference_times_inverse() {
        let rig = rest_rig();
        let reference = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7);
        let table = OffsetTable::compute(&rig, &reference);

        for bone in [HumanBone::Hips, HumanBone::LeftUpperLeg, HumanBone::Head] {
            let rest = rig.local_rotation(bone).unwrap();
            assert_eq!(*table.get(bone), reference * rest.inverse());
        }
        assert_eq!(table.present(), 3);
    }

    #[test]
    fn test_absent_bones_are_identity() {
        let rig = rest_rig();
        let reference = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.2);
        let table = OffsetTable::compute(&rig, &reference);

        for (bone, offset) in table.iter() {
            if rig.local_rotation(bone).is_none() {
                assert_eq!(*offset, UnitQuaternion::identity(), "{}", bone);
            }
        }
    }

    #[test]
    fn test_identity_reference_inverts_rest_pose() {
        let rig = rest_rig();
        let table = OffsetTable::compute(&rig, &UnitQuaternion::identity());

        // rest * offset must land on the reference
        let rest = rig.local_rotation(HumanBone::LeftUpperLeg).unwrap();
        let aligned = rest * table.get(HumanBone::LeftUpperLeg);
        assert_relative_eq!(aligned.w.abs(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(aligned.i, 0.0, epsilon = 1e-5);
        assert_relative_eq!(aligned.j, 0.0, epsilon = 1e-5);
        assert_relative_eq!(aligned.k, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_iter_visits_every_bone_in_order() {
        let table = OffsetTable::compute(&StaticRig::new(), &UnitQuaternion::identity());
        let bones: Vec<HumanBone> = table.iter().map(|(b, _)| b).collect();
        assert_eq!(bones, HumanBone::ALL.to_vec());
        assert_eq!(table.present(), 0);
    }
}
