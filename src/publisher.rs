//! Per-rig pose publisher.
//!
//! Lifecycle:
//!
//! ```text
//!   new ──► Idle ──initialize──► Active ──teardown──► Closed
//!            │                     │ tick                ▲
//!            └──────────teardown───┼─────────────────────┘
//!                                  ▼
//!                 root moved?  no ─► Unchanged
//!                              yes ─► root rotation, root position,
//!                                     one message per present bone
//! ```
//!
//! The host calls [`Publisher::tick`] once per frame after its animation
//! system has updated the rig.

use crate::config::{AppConfig, PublisherConfig, TopicConfig};
use crate::core::bones::HumanBone;
use crate::core::rig::RigSource;
use crate::core::types::Endpoint;
use crate::error::{Error, Result};
use crate::pose::{FrameSample, OffsetTable, RootTransform};
use crate::streaming::text::TextFormat;
use crate::transport::{Transport, ZmtpPublisher};
use log::{debug, error, info, warn};
use nalgebra::UnitQuaternion;

/// Result of one [`Publisher::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Publisher has been torn down; nothing sent
    Inactive,
    /// Root transform unchanged since the last send; nothing sent
    Unchanged,
    /// Root transform changed; `messages` topic/payload pairs sent
    Sent { messages: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Active,
    Closed,
}

struct Session {
    transport: Box<dyn Transport + Send>,
    offsets: OffsetTable,
    previous: RootTransform,
}

/// Compute the rest-pose offset table for `rig`
///
/// For every bone the rig exposes, `offset = reference * inverse(local)`;
/// bones it does not expose get identity.
pub fn compute_offsets<R: RigSource + ?Sized>(
    rig: &R,
    reference: &UnitQuaternion<f32>,
) -> OffsetTable {
    OffsetTable::compute(rig, reference)
}

/// Publishes one rig's pose over a transport
pub struct Publisher<R: RigSource> {
    config: PublisherConfig,
    endpoint: Endpoint,
    topics: TopicConfig,
    format: TextFormat,
    rig: Option<R>,
    session: Option<Session>,
    state: State,
}

impl<R: RigSource> Publisher<R> {
    /// Create an idle publisher from configuration
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.publisher.clone(),
            endpoint: config.publisher.endpoint(),
            topics: config.topics.clone(),
            format: TextFormat::new(config.publisher.precision),
            rig: None,
            session: None,
            state: State::Idle,
        }
    }

    /// Builder-style [`Publisher::attach_rig`]
    pub fn with_rig(mut self, rig: R) -> Self {
        self.attach_rig(rig);
        self
    }

    /// Set the rig to sample
    pub fn attach_rig(&mut self, rig: R) {
        self.rig = Some(rig);
    }

    /// Change the subscriber endpoint; only allowed before initialization
    pub fn set_endpoint(&mut self, host: impl Into<String>, port: u16) -> Result<()> {
        match self.state {
            State::Idle => {
                self.endpoint = Endpoint::new(host, port);
                Ok(())
            }
            State::Active => Err(Error::AlreadyInitialized),
            State::Closed => Err(Error::ShutDown),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// True between a successful initialization and teardown
    pub fn is_active(&self) -> bool {
        self.state == State::Active
    }

    /// Offsets computed at initialization
    pub fn offsets(&self) -> Option<&OffsetTable> {
        self.session.as_ref().map(|s| &s.offsets)
    }

    /// Connect to the endpoint and compute offsets
    ///
    /// Fails with [`Error::MissingRig`] before touching the network if no
    /// rig is attached.
    pub fn initialize(&mut self) -> Result<()> {
        self.check_can_initialize()?;
        let transport = ZmtpPublisher::connect(&self.endpoint, self.config.connect_timeout())?
            .with_send_hwm(self.config.send_hwm);
        self.initialize_with(transport)
    }

    /// Like [`Publisher::initialize`] with an already opened transport
    pub fn initialize_with<T: Transport + Send + 'static>(&mut self, transport: T) -> Result<()> {
        self.check_can_initialize()?;
        let reference = self.config.reference()?;
        let rig = self.rig.as_ref().ok_or(Error::MissingRig)?;

        let offsets = compute_offsets(rig, &reference);
        let previous = RootTransform::read(rig);
        info!(
            "Publisher initialized for {} ({} of {} bones present)",
            self.endpoint,
            offsets.present(),
            HumanBone::ALL.len()
        );

        self.session = Some(Session {
            transport: Box::new(transport),
            offsets,
            previous,
        });
        self.state = State::Active;
        Ok(())
    }

    fn check_can_initialize(&self) -> Result<()> {
        match self.state {
            State::Active => return Err(Error::AlreadyInitialized),
            State::Closed => return Err(Error::ShutDown),
            State::Idle => {}
        }
        if self.rig.is_none() {
            error!("Publisher for {} has no rig attached", self.endpoint);
            return Err(Error::MissingRig);
        }
        Ok(())
    }

    /// Publish the current pose if the root transform moved
    ///
    /// Change detection is exact equality against the last sent root. On
    /// a send error the cached root is kept, so the next tick resends the
    /// whole frame.
    ///
    /// Never waits on the subscriber: messages the transport could not
    /// write yet are pushed out on later ticks, changed or not.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        match self.state {
            State::Idle => return Err(Error::NotInitialized),
            State::Closed => return Ok(TickOutcome::Inactive),
            State::Active => {}
        }
        let rig = self.rig.as_ref().ok_or(Error::MissingRig)?;
        let session = self.session.as_mut().ok_or(Error::NotInitialized)?;

        // Drain whatever the last tick left queued
        if let Err(e) = session.transport.flush() {
            warn!("Failed to flush to {}: {}", self.endpoint, e);
            return Err(e);
        }

        if RootTransform::read(rig) == session.previous {
            return Ok(TickOutcome::Unchanged);
        }

        let sample = FrameSample::capture(rig, &session.offsets, &self.config.mirrored_bones);
        let messages = sample.to_messages(
            &self.topics.root_rotation,
            &self.topics.root_position,
            &self.format,
        );

        for message in &messages {
            if let Err(e) = session.transport.send_multipart(&message.frames()) {
                warn!("Failed to send {}: {}", message.topic, e);
                return Err(e);
            }
        }

        session.previous = sample.root;
        debug!(
            "Sent {} messages ({} bones)",
            messages.len(),
            sample.bones.len()
        );
        Ok(TickOutcome::Sent {
            messages: messages.len(),
        })
    }

    /// Close the transport and stop publishing
    ///
    /// Safe to call more than once; close errors are logged and ignored.
    pub fn teardown(&mut self) {
        if self.state == State::Closed {
            return;
        }
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.transport.close() {
                warn!("Error closing transport for {}: {}", self.endpoint, e);
            }
            info!("Publisher for {} torn down", self.endpoint);
        }
        self.state = State::Closed;
    }
}

impl<R: RigSource> Drop for Publisher<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
