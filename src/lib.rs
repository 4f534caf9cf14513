//! pose-stream - Humanoid rig pose publisher over ZeroMQ-compatible pub/sub
//!
//! Samples a humanoid rig once per frame, corrects every bone by a fixed
//! rest-pose offset, and publishes root and bone rotations as text on named
//! topics. The receiving side decodes the same messages and can convert them
//! into Blender's conventions for a Mixamo armature.
//!
//! ```no_run
//! use pose_stream::{AppConfig, Publisher, StaticRig};
//!
//! let rig = StaticRig::full_skeleton();
//! let mut publisher = Publisher::new(&AppConfig::default()).with_rig(rig.clone());
//! publisher.initialize()?;
//! loop {
//!     // animation system updates `rig` here
//!     publisher.tick()?;
//! #   break;
//! }
//! publisher.teardown();
//! # Ok::<(), pose_stream::Error>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod pose;
pub mod publisher;
pub mod streaming;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use crate::core::bones::HumanBone;
pub use crate::core::rig::{RigSource, StaticRig};
pub use crate::core::types::Endpoint;
pub use error::{Error, Result};
pub use publisher::{Publisher, TickOutcome, compute_offsets};
pub use streaming::{PoseReceiver, PoseUpdate};
