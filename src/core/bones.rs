//! Humanoid bone identifiers.
//!
//! The set and order follow Unity's `HumanBodyBones` enumeration, which is
//! also the publish order on the wire. Each bone's name doubles as its topic.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of bones in the humanoid set
pub const BONE_COUNT: usize = 55;

/// Humanoid skeletal joint, in enumeration (publish) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HumanBone {
    Hips,
    LeftUpperLeg,
    RightUpperLeg,
    LeftLowerLeg,
    RightLowerLeg,
    LeftFoot,
    RightFoot,
    Spine,
    Chest,
    Neck,
    Head,
    LeftShoulder,
    RightShoulder,
    LeftUpperArm,
    RightUpperArm,
    LeftLowerArm,
    RightLowerArm,
    LeftHand,
    RightHand,
    LeftToes,
    RightToes,
    LeftEye,
    RightEye,
    Jaw,
    LeftThumbProximal,
    LeftThumbIntermediate,
    LeftThumbDistal,
    LeftIndexProximal,
    LeftIndexIntermediate,
    LeftIndexDistal,
    LeftMiddleProximal,
    LeftMiddleIntermediate,
    LeftMiddleDistal,
    LeftRingProximal,
    LeftRingIntermediate,
    LeftRingDistal,
    LeftLittleProximal,
    LeftLittleIntermediate,
    LeftLittleDistal,
    RightThumbProximal,
    RightThumbIntermediate,
    RightThumbDistal,
    RightIndexProximal,
    RightIndexIntermediate,
    RightIndexDistal,
    RightMiddleProximal,
    RightMiddleIntermediate,
    RightMiddleDistal,
    RightRingProximal,
    RightRingIntermediate,
    RightRingDistal,
    RightLittleProximal,
    RightLittleIntermediate,
    RightLittleDistal,
    UpperChest,
}

impl HumanBone {
    /// All bones in enumeration order
    pub const ALL: [HumanBone; BONE_COUNT] = [
        HumanBone::Hips,
        HumanBone::LeftUpperLeg,
        HumanBone::RightUpperLeg,
        HumanBone::LeftLowerLeg,
        HumanBone::RightLowerLeg,
        HumanBone::LeftFoot,
        HumanBone::RightFoot,
        HumanBone::Spine,
        HumanBone::Chest,
        HumanBone::Neck,
        HumanBone::Head,
        HumanBone::LeftShoulder,
        HumanBone::RightShoulder,
        HumanBone::LeftUpperArm,
        HumanBone::RightUpperArm,
        HumanBone::LeftLowerArm,
        HumanBone::RightLowerArm,
        HumanBone::LeftHand,
        HumanBone::RightHand,
        HumanBone::LeftToes,
        HumanBone::RightToes,
        HumanBone::LeftEye,
        HumanBone::RightEye,
        HumanBone::Jaw,
        HumanBone::LeftThumbProximal,
        HumanBone::LeftThumbIntermediate,
        HumanBone::LeftThumbDistal,
        HumanBone::LeftIndexProximal,
        HumanBone::LeftIndexIntermediate,
        HumanBone::LeftIndexDistal,
        HumanBone::LeftMiddleProximal,
        HumanBone::LeftMiddleIntermediate,
        HumanBone::LeftMiddleDistal,
        HumanBone::LeftRingProximal,
        HumanBone::LeftRingIntermediate,
        HumanBone::LeftRingDistal,
        HumanBone::LeftLittleProximal,
        HumanBone::LeftLittleIntermediate,
        HumanBone::LeftLittleDistal,
        HumanBone::RightThumbProximal,
        HumanBone::RightThumbIntermediate,
        HumanBone::RightThumbDistal,
        HumanBone::RightIndexProximal,
        HumanBone::RightIndexIntermediate,
        HumanBone::RightIndexDistal,
        HumanBone::RightMiddleProximal,
        HumanBone::RightMiddleIntermediate,
        HumanBone::RightMiddleDistal,
        HumanBone::RightRingProximal,
        HumanBone::RightRingIntermediate,
        HumanBone::RightRingDistal,
        HumanBone::RightLittleProximal,
        HumanBone::RightLittleIntermediate,
        HumanBone::RightLittleDistal,
        HumanBone::UpperChest,
    ];

    /// Position in the enumeration (0 = Hips)
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Topic name, identical to the identifier
    pub fn name(self) -> &'static str {
        match self {
            HumanBone::Hips => "Hips",
            HumanBone::LeftUpperLeg => "LeftUpperLeg",
            HumanBone::RightUpperLeg => "RightUpperLeg",
            HumanBone::LeftLowerLeg => "LeftLowerLeg",
            HumanBone::RightLowerLeg => "RightLowerLeg",
            HumanBone::LeftFoot => "LeftFoot",
            HumanBone::RightFoot => "RightFoot",
            HumanBone::Spine => "Spine",
            HumanBone::Chest => "Chest",
            HumanBone::Neck => "Neck",
            HumanBone::Head => "Head",
            HumanBone::LeftShoulder => "LeftShoulder",
            HumanBone::RightShoulder => "RightShoulder",
            HumanBone::LeftUpperArm => "LeftUpperArm",
            HumanBone::RightUpperArm => "RightUpperArm",
            HumanBone::LeftLowerArm => "LeftLowerArm",
            HumanBone::RightLowerArm => "RightLowerArm",
            HumanBone::LeftHand => "LeftHand",
            HumanBone::RightHand => "RightHand",
            HumanBone::LeftToes => "LeftToes",
            HumanBone::RightToes => "RightToes",
            HumanBone::LeftEye => "LeftEye",
            HumanBone::RightEye => "RightEye",
            HumanBone::Jaw => "Jaw",
            HumanBone::LeftThumbProximal => "LeftThumbProximal",
            HumanBone::LeftThumbIntermediate => "LeftThumbIntermediate",
            HumanBone::LeftThumbDistal => "LeftThumbDistal",
            HumanBone::LeftIndexProximal => "LeftIndexProximal",
            HumanBone::LeftIndexIntermediate => "LeftIndexIntermediate",
            HumanBone::LeftIndexDistal => "LeftIndexDistal",
            HumanBone::LeftMiddleProximal => "LeftMiddleProximal",
            HumanBone::LeftMiddleIntermediate => "LeftMiddleIntermediate",
            HumanBone::LeftMiddleDistal => "LeftMiddleDistal",
            HumanBone::LeftRingProximal => "LeftRingProximal",
            HumanBone::LeftRingIntermediate => "LeftRingIntermediate",
            HumanBone::LeftRingDistal => "LeftRingDistal",
            HumanBone::LeftLittleProximal => "LeftLittleProximal",
            HumanBone::LeftLittleIntermediate => "LeftLittleIntermediate",
            HumanBone::LeftLittleDistal => "LeftLittleDistal",
            HumanBone::RightThumbProximal => "RightThumbProximal",
            HumanBone::RightThumbIntermediate => "RightThumbIntermediate",
            HumanBone::RightThumbDistal => "RightThumbDistal",
            HumanBone::RightIndexProximal => "RightIndexProximal",
            HumanBone::RightIndexIntermediate => "RightIndexIntermediate",
            HumanBone::RightIndexDistal => "RightIndexDistal",
            HumanBone::RightMiddleProximal => "RightMiddleProximal",
            HumanBone::RightMiddleIntermediate => "RightMiddleIntermediate",
            HumanBone::RightMiddleDistal => "RightMiddleDistal",
            HumanBone::RightRingProximal => "RightRingProximal",
            HumanBone::RightRingIntermediate => "RightRingIntermediate",
            HumanBone::RightRingDistal => "RightRingDistal",
            HumanBone::RightLittleProximal => "RightLittleProximal",
            HumanBone::RightLittleIntermediate => "RightLittleIntermediate",
            HumanBone::RightLittleDistal => "RightLittleDistal",
            HumanBone::UpperChest => "UpperChest",
        }
    }

    /// Look up a bone by its topic name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|bone| bone.name() == name)
    }
}

impl fmt::Display for HumanBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HumanBone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::UnknownBone(s.to_string()))
    }
}
