//! Per-tick frame sampling.

use crate::core::bones::HumanBone;
use crate::core::rig::RigSource;
use crate::core::types::TopicMessage;
use crate::pose::offsets::OffsetTable;
use crate::streaming::text::TextFormat;
use nalgebra::{UnitQuaternion, Vector3};

/// Apply a bone's rest offset to its current local rotation
#[inline]
pub fn apply_offset(
    local: &UnitQuaternion<f32>,
    offset: &UnitQuaternion<f32>,
) -> UnitQuaternion<f32> {
    UnitQuaternion::new_normalize(*(local * offset).quaternion())
}

/// Negate the x (i) component of a rotation
///
/// Used for the upper-leg convention mismatch between the source rig and
/// the receiving armature. The result is still unit length.
#[inline]
pub fn mirror_x(q: &UnitQuaternion<f32>) -> UnitQuaternion<f32> {
    let mut raw = *q.quaternion();
    raw.coords.x = -raw.coords.x;
    UnitQuaternion::new_unchecked(raw)
}

/// Root transform used for change detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootTransform {
    pub rotation: UnitQuaternion<f32>,
    pub position: Vector3<f32>,
}

impl RootTransform {
    pub fn read<R: RigSource + ?Sized>(rig: &R) -> Self {
        Self {
            rotation: rig.root_rotation(),
            position: rig.root_position(),
        }
    }
}

/// Everything published for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSample {
    pub root: RootTransform,
    /// Corrected rotations of present bones, in enumeration order
    pub bones: Vec<(HumanBone, UnitQuaternion<f32>)>,
}

impl FrameSample {
    /// Sample the rig, correcting each present bone by its offset
    ///
    /// Bones listed in `mirrored` additionally get [`mirror_x`]. Bones the
    /// rig does not currently expose are skipped.
    pub fn capture<R: RigSource + ?Sized>(
        rig: &R,
        offsets: &OffsetTable,
        mirrored: &[HumanBone],
    ) -> Self {
        let root = RootTransform::read(rig);
        let bones = HumanBone::ALL
            .iter()
            .filter_map(|&bone| {
                let local = rig.local_rotation(bone)?;
                let corrected = apply_offset(&local, offsets.get(bone));
                let corrected = if mirrored.contains(&bone) {
                    mirror_x(&corrected)
                } else {
                    corrected
                };
                Some((bone, corrected))
            })
            .collect();

        Self { root, bones }
    }

    /// Render the sample into messages in publish order:
    /// root rotation, root position, then one message per bone
    pub fn to_messages(
        &self,
        rotation_topic: &str,
        position_topic: &str,
        format: &TextFormat,
    ) -> Vec<TopicMessage> {
        let mut messages = Vec::with_capacity(2 + self.bones.len());
        messages.push(TopicMessage::new(
            rotation_topic,
            format.quaternion(&self.root.rotation),
        ));
        messages.push(TopicMessage::new(
            position_topic,
            format.vector(&self.root.position),
        ));
        for (bone, rotation) in &self.bones {
            messages.push(TopicMessage::new(bone.name(), format.quaternion(rotation)));
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rig::StaticRig;
    use approx::assert_relative_eq;

    const LEGS: [HumanBone; 2] = [HumanBone::LeftUpperLeg, HumanBone::RightUpperLeg];

    fn posed_rig() -> StaticRig {
        let rig = StaticRig::new();
        for (i, bone) in [
            HumanBone::Hips,
            HumanBone::LeftUpperLeg,
            HumanBone::RightUpperLeg,
            HumanBone::Spine,
        ]
        .into_iter()
        .enumerate()
        {
            rig.set_local_rotation(
                bone,
                UnitQuaternion::from_euler_angles(0.1 * i as f32, 0.3, -0.2),
            );
        }
        rig
    }

    #[test]
    fn test_apply_offset_is_local_times_offset() {
        let local = UnitQuaternion::from_euler_angles(0.5, 0.0, 0.1);
        let offset = UnitQuaternion::from_euler_angles(0.0, -0.4, 0.0);
        let expected = local * offset;
        let result = apply_offset(&local, &offset);
        assert_relative_eq!(result.i, expected.i, epsilon = 1e-6);
        assert_relative_eq!(result.j, expected.j, epsilon = 1e-6);
        assert_relative_eq!(result.k, expected.k, epsilon = 1e-6);
        assert_relative_eq!(result.w, expected.w, epsilon = 1e-6);
    }

    #[test]
    fn test_mirror_x_only_touches_x() {
        let q = UnitQuaternion::from_euler_angles(0.3, 0.6, 0.9);
        let m = mirror_x(&q);
        assert_eq!(m.i, -q.i);
        assert_eq!(m.j, q.j);
        assert_eq!(m.k, q.k);
        assert_eq!(m.w, q.w);
        assert_relative_eq!(m.quaternion().norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_capture_skips_absent_bones_in_order() {
        let rig = posed_rig();
        let offsets = OffsetTable::compute(&rig, &UnitQuaternion::identity());
        let sample = FrameSample::capture(&rig, &offsets, &LEGS);

        let bones: Vec<HumanBone> = sample.bones.iter().map(|(b, _)| *b).collect();
        assert_eq!(
            bones,
            vec![
                HumanBone::Hips,
                HumanBone::LeftUpperLeg,
                HumanBone::RightUpperLeg,
                HumanBone::Spine
            ]
        );
    }

    #[test]
    fn test_capture_mirrors_only_listed_bones() {
        let rig = posed_rig();
        let offsets = OffsetTable::compute(&rig, &UnitQuaternion::identity());

        // Move away from the rest pose so corrected rotations are non-trivial
        let moved = UnitQuaternion::from_euler_angles(0.8, 0.1, 0.0);
        rig.set_local_rotation(HumanBone::LeftUpperLeg, moved);
        rig.set_local_rotation(HumanBone::Spine, moved);

        let plain = FrameSample::capture(&rig, &offsets, &[]);
        let mirrored = FrameSample::capture(&rig, &offsets, &LEGS);

        for ((bone, p), (_, m)) in plain.bones.iter().zip(mirrored.bones.iter()) {
            if LEGS.contains(bone) {
                assert_eq!(m.i, -p.i, "{}", bone);
                assert_eq!((m.j, m.k, m.w), (p.j, p.k, p.w));
            } else {
                assert_eq!(m, p, "{}", bone);
            }
        }
    }

    #[test]
    fn test_messages_in_publish_order() {
        let rig = posed_rig();
        rig.set_root_position(Vector3::new(1.0, 0.0, -1.0));
        let offsets = OffsetTable::compute(&rig, &UnitQuaternion::identity());
        let sample = FrameSample::capture(&rig, &offsets, &LEGS);

        let messages = sample.to_messages("foo", "transform", &TextFormat::new(1));
        let topics: Vec<&str> = messages.iter().map(|m| m.topic.as_str()).collect();
        assert_eq!(
            topics,
            vec!["foo", "transform", "Hips", "LeftUpperLeg", "RightUpperLeg", "Spine"]
        );
        assert_eq!(messages[0].payload, "(0.0, 0.0, 0.0, 1.0)");
        assert_eq!(messages[1].payload, "(1.0, 0.0, -1.0)");
    }
}
