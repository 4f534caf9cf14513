//! Receiving side: decode published pose messages.
//!
//! Every logical message is a `[topic, payload]` pair:
//!
//! ```text
//! ┌────────────────┬──────────────────────────────┐
//! │ "foo"          │ "(x, y, z, w)"  root rotation │
//! │ "transform"    │ "(x, y, z)"     root position │
//! │ "<BoneName>"   │ "(x, y, z, w)"  bone rotation │
//! └────────────────┴──────────────────────────────┘
//! ```
//!
//! Root topic names come from configuration; bone topics are the
//! [`HumanBone`] names.

use crate::config::{AppConfig, TopicConfig};
use crate::core::bones::HumanBone;
use crate::core::types::Endpoint;
use crate::error::{Error, Result};
use crate::streaming::retarget;
use crate::streaming::text::{parse_quaternion, parse_vector};
use crate::transport::zmtp::SubSocket;
use log::{debug, warn};
use nalgebra::{UnitQuaternion, Vector3};
use std::net::SocketAddr;
use std::time::Duration;

/// One decoded pose message
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseUpdate {
    RootRotation(UnitQuaternion<f32>),
    RootPosition(Vector3<f32>),
    Bone(HumanBone, UnitQuaternion<f32>),
}

impl PoseUpdate {
    /// Same update converted into Blender's axis convention
    pub fn retargeted(&self) -> Self {
        match self {
            PoseUpdate::RootRotation(q) => {
                PoseUpdate::RootRotation(retarget::blender_root_rotation(q))
            }
            PoseUpdate::RootPosition(v) => PoseUpdate::RootPosition(retarget::blender_position(v)),
            PoseUpdate::Bone(bone, q) => {
                PoseUpdate::Bone(*bone, retarget::blender_bone_rotation(q))
            }
        }
    }
}

/// Topic/payload decoder
#[derive(Debug, Clone)]
pub struct PoseDecoder {
    rotation_topic: String,
    position_topic: String,
}

impl PoseDecoder {
    pub fn new(rotation_topic: impl Into<String>, position_topic: impl Into<String>) -> Self {
        Self {
            rotation_topic: rotation_topic.into(),
            position_topic: position_topic.into(),
        }
    }

    pub fn from_topics(topics: &TopicConfig) -> Self {
        Self::new(&topics.root_rotation, &topics.root_position)
    }

    /// Decode one message
    ///
    /// Returns `Ok(None)` for topics that are neither a root topic nor a
    /// bone name. A known topic with a malformed payload is an error.
    pub fn decode(&self, topic: &[u8], payload: &[u8]) -> Result<Option<PoseUpdate>> {
        let Ok(topic) = std::str::from_utf8(topic) else {
            return Ok(None);
        };

        let update = if topic == self.rotation_topic {
            PoseUpdate::RootRotation(parse_quaternion(payload_text(payload)?)?)
        } else if topic == self.position_topic {
            PoseUpdate::RootPosition(parse_vector(payload_text(payload)?)?)
        } else if let Some(bone) = HumanBone::from_name(topic) {
            PoseUpdate::Bone(bone, parse_quaternion(payload_text(payload)?)?)
        } else {
            return Ok(None);
        };
        Ok(Some(update))
    }
}

fn payload_text(payload: &[u8]) -> Result<&str> {
    std::str::from_utf8(payload)
        .map_err(|e| Error::InvalidPayload(format!("payload is not UTF-8: {}", e)))
}

/// Bind-mode subscriber decoding pose messages
pub struct PoseReceiver {
    socket: SubSocket,
    decoder: PoseDecoder,
}

impl PoseReceiver {
    /// Bind `endpoint` and subscribe to the root topics plus `bones`
    pub fn bind(
        endpoint: &Endpoint,
        topics: &TopicConfig,
        bones: impl IntoIterator<Item = HumanBone>,
    ) -> Result<Self> {
        let mut socket = SubSocket::bind(endpoint)?;
        socket.subscribe(topics.root_rotation.as_bytes())?;
        socket.subscribe(topics.root_position.as_bytes())?;
        for bone in bones {
            socket.subscribe(bone.name().as_bytes())?;
        }
        debug!(
            "Receiver subscribed to {} topics",
            socket.subscriptions().len()
        );

        Ok(Self {
            socket,
            decoder: PoseDecoder::from_topics(topics),
        })
    }

    /// Bind from configuration
    ///
    /// With retargeting enabled only bones that exist on the Mixamo
    /// armature are subscribed; otherwise every bone is.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let endpoint = config.receiver.endpoint();
        let mut receiver = if config.receiver.retarget {
            Self::bind(&endpoint, &config.topics, retarget::mapped_bones())?
        } else {
            Self::bind(&endpoint, &config.topics, HumanBone::ALL)?
        };
        receiver.set_read_timeout(Some(config.receiver.read_timeout()))?;
        Ok(receiver)
    }

    pub fn decode(&self, topic: &[u8], payload: &[u8]) -> Result<Option<PoseUpdate>> {
        self.decoder.decode(topic, payload)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.socket.set_read_timeout(timeout)
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_connected()
    }

    /// Block until a publisher connects
    pub fn accept(&mut self) -> Result<SocketAddr> {
        self.socket.accept()
    }

    /// Accept a pending publisher, if any
    pub fn try_accept(&mut self) -> Result<Option<SocketAddr>> {
        self.socket.try_accept()
    }

    /// Drop the current publisher and wait for the next one
    pub fn disconnect(&mut self) {
        self.socket.disconnect();
    }

    /// Receive and decode the next message
    ///
    /// Returns `Ok(None)` for messages that do not decode to an update
    /// (unknown topic, wrong frame count, malformed payload); those are
    /// logged and skipped so one bad message does not stop the stream.
    pub fn recv(&mut self) -> Result<Option<PoseUpdate>> {
        let frames = self.socket.recv_multipart()?;
        let [topic, payload] = frames.as_slice() else {
            warn!("Expected 2 frames, got {}", frames.len());
            return Ok(None);
        };

        match self.decoder.decode(topic, payload) {
            Ok(update) => Ok(update),
            Err(e) => {
                warn!(
                    "Bad payload on {:?}: {}",
                    String::from_utf8_lossy(topic),
                    e
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn decoder() -> PoseDecoder {
        PoseDecoder::from_topics(&TopicConfig::default())
    }

    #[test]
    fn test_decode_root_rotation() {
        let update = decoder()
            .decode(b"foo", b"(0.00000, 0.70711, 0.00000, 0.70711)")
            .unwrap()
            .unwrap();
        let PoseUpdate::RootRotation(q) = update else {
            panic!("unexpected update {:?}", update);
        };
        assert_relative_eq!(q.j, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-5);
        assert_relative_eq!(q.w, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-5);
    }

    #[test]
    fn test_decode_root_position() {
        let update = decoder()
            .decode(b"transform", b"(1.50000, 0.00000, -2.25000)")
            .unwrap();
        assert_eq!(
            update,
            Some(PoseUpdate::RootPosition(Vector3::new(1.5, 0.0, -2.25)))
        );
    }

    #[test]
    fn test_decode_bone() {
        let update = decoder()
            .decode(b"LeftUpperLeg", b"(0.00000, 0.00000, 0.00000, 1.00000)")
            .unwrap();
        assert_eq!(
            update,
            Some(PoseUpdate::Bone(
                HumanBone::LeftUpperLeg,
                UnitQuaternion::identity()
            ))
        );
    }

    #[test]
    fn test_decode_custom_root_topics() {
        let decoder = PoseDecoder::new("root_rot", "root_pos");
        assert!(decoder.decode(b"foo", b"(0, 0, 0, 1)").unwrap().is_none());
        assert!(matches!(
            decoder.decode(b"root_pos", b"(0, 0, 0)").unwrap(),
            Some(PoseUpdate::RootPosition(_))
        ));
    }

    #[test]
    fn test_unknown_topic_ignored() {
        assert_eq!(decoder().decode(b"Tail", b"garbage").unwrap(), None);
        assert_eq!(decoder().decode(&[0xff, 0xfe], b"(0, 0, 0)").unwrap(), None);
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let d = decoder();
        assert!(matches!(
            d.decode(b"Hips", b"(1, 2, 3)"),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(
            d.decode(b"transform", b"(a, b, c)"),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(
            d.decode(b"foo", &[0x28, 0xff, 0x29]),
            Err(Error::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_retargeted_update() {
        let update = PoseUpdate::RootPosition(Vector3::new(1.0, 2.0, 3.0)).retargeted();
        assert_eq!(update, PoseUpdate::RootPosition(Vector3::new(-1.0, -3.0, 2.0)));

        let q = UnitQuaternion::from_euler_angles(0.2, 0.4, 0.6);
        let PoseUpdate::Bone(bone, b) = PoseUpdate::Bone(HumanBone::Head, q).retargeted() else {
            panic!("bone update changed kind");
        };
        assert_eq!(bone, HumanBone::Head);
        assert_eq!(b.j, -q.j);
    }

    #[test]
    fn test_bind_subscribes_root_topics_and_bones() {
        let receiver = PoseReceiver::bind(
            &Endpoint::new("127.0.0.1", 0),
            &TopicConfig::default(),
            [HumanBone::Hips, HumanBone::Head],
        )
        .unwrap();
        let subs = receiver.socket.subscriptions();
        assert_eq!(subs.len(), 4);
        assert!(subs.matches(b"foo"));
        assert!(subs.matches(b"transform"));
        assert!(subs.matches(b"Hips"));
        assert!(!subs.matches(b"Spine"));
        assert!(!receiver.is_connected());
        assert_ne!(receiver.local_addr().unwrap().port(), 0);
    }
}
