//! Configuration for pose-stream
//!
//! Loads configuration from a TOML file. Every field has a default, so an
//! empty file (or no file at all) gives the stock setup: publish to
//! `tcp://127.0.0.1:5555` on the `foo` / `transform` root topics.

use crate::core::bones::HumanBone;
use crate::core::types::Endpoint;
use crate::error::{Error, Result};
use nalgebra::{Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub topics: TopicConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Root topic names shared by publisher and receiver
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopicConfig {
    /// Topic carrying the root rotation
    #[serde(default = "default_rotation_topic")]
    pub root_rotation: String,

    /// Topic carrying the root position
    #[serde(default = "default_position_topic")]
    pub root_position: String,
}

/// Publisher settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublisherConfig {
    /// Subscriber host to connect to
    #[serde(default = "default_ip")]
    pub ip: String,

    /// Subscriber port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Target rest orientation as `[x, y, z, w]`
    ///
    /// Offsets are computed as `reference * inverse(rest_local_rotation)`.
    /// Identity means the receiving armature's bones rest unrotated.
    #[serde(default = "default_reference_rotation")]
    pub reference_rotation: [f32; 4],

    /// Bones whose corrected rotation gets its x component negated
    #[serde(default = "default_mirrored_bones")]
    pub mirrored_bones: Vec<HumanBone>,

    /// Decimals per payload component
    #[serde(default = "default_precision")]
    pub precision: usize,

    /// TCP connect and handshake timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Messages held for a subscriber that is not reading; beyond this new
    /// messages are dropped whole
    #[serde(default = "default_send_hwm")]
    pub send_hwm: usize,
}

/// Receiver (subscriber daemon) settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReceiverConfig {
    /// Address to bind
    #[serde(default = "default_ip")]
    pub bind_ip: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Poll interval for shutdown checks in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    /// Convert received poses into Blender's axis convention
    #[serde(default = "default_true")]
    pub retarget: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_rotation_topic() -> String {
    "foo".to_string()
}

fn default_position_topic() -> String {
    "transform".to_string()
}

fn default_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5555
}

fn default_reference_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn default_mirrored_bones() -> Vec<HumanBone> {
    vec![HumanBone::LeftUpperLeg, HumanBone::RightUpperLeg]
}

fn default_precision() -> usize {
    crate::streaming::text::DEFAULT_PRECISION
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_send_hwm() -> usize {
    crate::transport::DEFAULT_SEND_HWM
}

fn default_read_timeout() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            root_rotation: default_rotation_topic(),
            root_position: default_position_topic(),
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            port: default_port(),
            reference_rotation: default_reference_rotation(),
            mirrored_bones: default_mirrored_bones(),
            precision: default_precision(),
            connect_timeout_ms: default_connect_timeout(),
            send_hwm: default_send_hwm(),
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_ip: default_ip(),
            port: default_port(),
            read_timeout_ms: default_read_timeout(),
            retarget: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl PublisherConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.ip.clone(), self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Reference rotation, normalized
    pub fn reference(&self) -> Result<UnitQuaternion<f32>> {
        let [x, y, z, w] = self.reference_rotation;
        let raw = Quaternion::new(w, x, y, z);
        let norm = raw.norm();
        if norm == 0.0 || !norm.is_finite() {
            return Err(Error::Config(format!(
                "reference_rotation {:?} is not a rotation",
                self.reference_rotation
            )));
        }
        Ok(UnitQuaternion::from_quaternion(raw))
    }
}

impl ReceiverConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.bind_ip.clone(), self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use pose_stream::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("pose-stream.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values that parse but cannot work
    pub fn validate(&self) -> Result<()> {
        self.publisher.reference()?;
        if self.topics.root_rotation.is_empty() || self.topics.root_position.is_empty() {
            return Err(Error::Config("root topics must not be empty".to_string()));
        }
        if !self.topics.root_rotation.is_ascii() || !self.topics.root_position.is_ascii() {
            return Err(Error::Config("root topics must be ASCII".to_string()));
        }
        // Zero durations are rejected by std::net with an opaque InvalidInput
        if self.publisher.connect_timeout_ms == 0 {
            return Err(Error::Config(
                "publisher.connect_timeout_ms must be positive".to_string(),
            ));
        }
        if self.publisher.send_hwm == 0 {
            return Err(Error::Config(
                "publisher.send_hwm must be positive".to_string(),
            ));
        }
        if self.receiver.read_timeout_ms == 0 {
            return Err(Error::Config(
                "receiver.read_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
