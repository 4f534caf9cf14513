//! Pose payloads on the wire and the receiving side.
//!
//! - [`text`]: `(x, y, z, w)` / `(x, y, z)` rendering and parsing
//! - [`receiver`]: Decoding topic/payload pairs into [`PoseUpdate`]s
//! - [`retarget`]: Blender axis conversion and Mixamo bone names

pub mod receiver;
pub mod retarget;
pub mod text;

pub use receiver::{PoseDecoder, PoseReceiver, PoseUpdate};
pub use text::{DEFAULT_PRECISION, TextFormat};
