//! Core abstractions for rig access.
//!
//! - [`bones::HumanBone`]: The fixed humanoid bone set, in publish order
//! - [`rig::RigSource`]: Trait the embedding application implements
//! - [`types`]: Endpoint and message types shared by publisher and receiver

pub mod bones;
pub mod rig;
pub mod types;
