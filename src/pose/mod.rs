//! Pose math: rest-pose offsets and per-tick sampling.

pub mod offsets;
pub mod sample;

pub use offsets::{OffsetTable, offset_between};
pub use sample::{FrameSample, RootTransform, apply_offset, mirror_x};
