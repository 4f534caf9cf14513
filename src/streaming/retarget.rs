//! Conversion into Blender's conventions for a Mixamo armature.
//!
//! The publishing rig is left-handed Y-up; Blender is right-handed Z-up.
//!
//! ```text
//! position   (x, y, z)       -> (-x, -z, y)
//! bone       (w, x, y, z)    -> (w, x, -y, -z)
//! root       (w, x, y, z)    -> (w, x, -z, -y) * Rx(90°)
//! ```

use crate::core::bones::HumanBone;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use std::f32::consts::FRAC_PI_2;

/// Prefix shared by every Mixamo bone name
pub const MIXAMO_PREFIX: &str = "mixamorig:";

/// Root position in Blender's axes
pub fn blender_position(v: &Vector3<f32>) -> Vector3<f32> {
    Vector3::new(-v.x, -v.z, v.y)
}

/// Bone rotation in Blender's axes
pub fn blender_bone_rotation(q: &UnitQuaternion<f32>) -> UnitQuaternion<f32> {
    UnitQuaternion::new_unchecked(Quaternion::new(q.w, q.i, -q.j, -q.k))
}

/// Root rotation in Blender's axes, stood upright by a quarter turn about
/// the local X axis
pub fn blender_root_rotation(q: &UnitQuaternion<f32>) -> UnitQuaternion<f32> {
    let swapped = UnitQuaternion::new_unchecked(Quaternion::new(q.w, q.i, -q.k, -q.j));
    swapped * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2)
}

/// Mixamo bone name (without the `mixamorig:` prefix) for a humanoid bone
///
/// Eyes, jaw and the right thumb's proximal and intermediate joints have no
/// counterpart on the armature.
pub fn mixamo_bone(bone: HumanBone) -> Option<&'static str> {
    use HumanBone::*;
    let name = match bone {
        Hips => "Hips",
        Spine => "Spine",
        Chest => "Spine1",
        UpperChest => "Spine2",

        LeftShoulder => "LeftShoulder",
        LeftUpperArm => "LeftArm",
        LeftLowerArm => "LeftForeArm",
        LeftHand => "LeftHand",
        RightShoulder => "RightShoulder",
        RightUpperArm => "RightArm",
        RightLowerArm => "RightForeArm",
        RightHand => "RightHand",

        LeftUpperLeg => "LeftUpLeg",
        LeftLowerLeg => "LeftLeg",
        LeftFoot => "LeftFoot",
        LeftToes => "LeftToeBase",
        RightUpperLeg => "RightUpLeg",
        RightLowerLeg => "RightLeg",
        RightFoot => "RightFoot",
        RightToes => "RightToeBase",

        Neck => "Neck",
        Head => "Head",

        LeftThumbProximal => "LeftHandThumb1",
        LeftThumbIntermediate => "LeftHandThumb2",
        LeftThumbDistal => "LeftHandThumb3",
        LeftIndexProximal => "LeftHandIndex1",
        LeftIndexIntermediate => "LeftHandIndex2",
        LeftIndexDistal => "LeftHandIndex3",
        LeftMiddleProximal => "LeftHandMiddle1",
        LeftMiddleIntermediate => "LeftHandMiddle2",
        LeftMiddleDistal => "LeftHandMiddle3",
        LeftRingProximal => "LeftHandRing1",
        LeftRingIntermediate => "LeftHandRing2",
        LeftRingDistal => "LeftHandRing3",
        LeftLittleProximal => "LeftHandPinky1",
        LeftLittleIntermediate => "LeftHandPinky2",
        LeftLittleDistal => "LeftHandPinky3",

        RightThumbDistal => "RightHandThumb3",
        RightIndexProximal => "RightHandIndex1",
        RightIndexIntermediate => "RightHandIndex2",
        RightIndexDistal => "RightHandIndex3",
        RightMiddleProximal => "RightHandMiddle1",
        RightMiddleIntermediate => "RightHandMiddle2",
        RightMiddleDistal => "RightHandMiddle3",
        RightRingProximal => "RightHandRing1",
        RightRingIntermediate => "RightHandRing2",
        RightRingDistal => "RightHandRing3",
        RightLittleProximal => "RightHandPinky1",
        RightLittleIntermediate => "RightHandPinky2",
        RightLittleDistal => "RightHandPinky3",

        LeftEye | RightEye | Jaw | RightThumbProximal | RightThumbIntermediate => {
            return None;
        }
    };
    Some(name)
}

/// Full armature bone name, e.g. `mixamorig:LeftUpLeg`
pub fn mixamo_name(bone: HumanBone) -> Option<String> {
    mixamo_bone(bone).map(|name| format!("{MIXAMO_PREFIX}{name}"))
}

/// Bones with an armature counterpart, in enumeration order
pub fn mapped_bones() -> impl Iterator<Item = HumanBone> {
    HumanBone::ALL
        .into_iter()
        .filter(|&bone| mixamo_bone(bone).is_some())
}
