//! Connect-mode PUB socket.
//!
//! The publisher dials a subscriber that has bound the endpoint (the usual
//! arrangement when one viewer collects poses from a single animation
//! process). There is no reconnect: once the peer goes away every send fails.
//!
//! Sends never block. After the handshake the stream is switched to
//! non-blocking mode and encoded messages go through an outbound queue:
//!
//! ```text
//!  send_multipart ─► filter ─► queue full? ── yes ─► drop whole message
//!                                  │ no
//!                                  ▼
//!                      ┌───────────────────────┐
//!                      │ msg │ msg │ ... │ msg │ ── flush ─► socket
//!                      └───────────────────────┘   (as much as it takes)
//! ```
//!
//! A message is dropped only before any of its bytes are written, so the
//! peer never sees a truncated frame.

use crate::core::types::Endpoint;
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::transport::zmtp::codec::{self, SocketType, SubscriptionChange};
use crate::transport::zmtp::connection::Connection;
use crate::transport::zmtp::subscriptions::SubscriptionSet;
use log::{debug, info, trace, warn};
use std::collections::VecDeque;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Default send high-water mark in messages (same as libzmq's SNDHWM)
pub const DEFAULT_SEND_HWM: usize = 1000;

/// Encoded messages waiting for socket space
#[derive(Default)]
struct Outbound {
    queue: VecDeque<Vec<u8>>,
    /// Bytes of the front message already written
    written: usize,
}

/// ZMTP publisher connected to one subscriber
pub struct ZmtpPublisher {
    conn: Connection<TcpStream>,
    endpoint: Endpoint,
    subscriptions: SubscriptionSet,
    outbound: Outbound,
    send_hwm: usize,
    sent: u64,
    filtered: u64,
    dropped: u64,
    closed: bool,
}

impl ZmtpPublisher {
    /// Connect to `endpoint` and complete the handshake
    ///
    /// `timeout` bounds both the TCP connect and the greeting/READY exchange.
    pub fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self> {
        let addr = endpoint
            .socket_address()
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::InvalidEndpoint(format!("{} did not resolve", endpoint)))?;

        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY on {}: {}", endpoint, e);
        }

        // Handshake is blocking, bounded by the timeout
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        let conn = Connection::handshake(stream, SocketType::Pub, false)?;

        // From here on nothing waits on the peer
        conn.get_ref().set_read_timeout(None)?;
        conn.get_ref().set_write_timeout(None)?;
        conn.get_ref().set_nonblocking(true)?;

        info!(
            "Publisher connected to {} (peer {})",
            endpoint,
            conn.peer_type()
        );

        Ok(Self {
            conn,
            endpoint: endpoint.clone(),
            subscriptions: SubscriptionSet::new(),
            outbound: Outbound::default(),
            send_hwm: DEFAULT_SEND_HWM,
            sent: 0,
            filtered: 0,
            dropped: 0,
            closed: false,
        })
    }

    /// Builder-style [`ZmtpPublisher::set_send_hwm`]
    pub fn with_send_hwm(mut self, hwm: usize) -> Self {
        self.set_send_hwm(hwm);
        self
    }

    /// Maximum number of messages held while the subscriber is not reading
    ///
    /// Clamped to at least one.
    pub fn set_send_hwm(&mut self, hwm: usize) {
        self.send_hwm = hwm.max(1);
    }

    /// Apply any subscription changes the peer has sent since the last call
    pub fn poll_subscriptions(&mut self) -> Result<()> {
        for frame in self.conn.read_available()? {
            match SubscriptionChange::from_frame(&frame)? {
                Some(change) => {
                    debug!("Subscription update from {}: {:?}", self.endpoint, change);
                    self.subscriptions.apply(&change);
                }
                None => trace!("Ignoring {} byte frame from subscriber", frame.body.len()),
            }
        }
        Ok(())
    }

    /// Write queued messages until the queue is empty or the socket is full
    fn flush_outbound(&mut self) -> Result<()> {
        while let Some(front) = self.outbound.queue.front() {
            let n = self.conn.write_available(&front[self.outbound.written..])?;
            self.outbound.written += n;
            if self.outbound.written < front.len() {
                // Socket buffer full; retry on the next send or flush
                break;
            }
            self.outbound.queue.pop_front();
            self.outbound.written = 0;
        }
        Ok(())
    }

    pub fn subscriptions(&self) -> &SubscriptionSet {
        &self.subscriptions
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Messages accepted for delivery (written or queued)
    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    /// Messages dropped because no subscription matched
    pub fn filtered_count(&self) -> u64 {
        self.filtered
    }

    /// Messages dropped because the queue was at the high-water mark
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Messages still waiting for socket space
    pub fn queued_count(&self) -> usize {
        self.outbound.queue.len()
    }
}

impl Transport for ZmtpPublisher {
    fn send_multipart(&mut self, frames: &[&[u8]]) -> Result<()> {
        if self.closed {
            return Err(Error::ShutDown);
        }
        self.poll_subscriptions()?;

        // PUB semantics: no matching subscription, no delivery
        let Some(topic) = frames.first() else {
            return Ok(());
        };
        if !self.subscriptions.matches(topic) {
            self.filtered += 1;
            trace!(
                "No subscriber for topic {:?}",
                String::from_utf8_lossy(topic)
            );
            return Ok(());
        }

        // Make room before deciding whether this message fits
        self.flush_outbound()?;
        if self.outbound.queue.len() >= self.send_hwm {
            self.dropped += 1;
            if self.dropped == 1 || self.dropped % 1000 == 0 {
                warn!(
                    "Subscriber at {} is not keeping up; {} messages dropped",
                    self.endpoint, self.dropped
                );
            }
            return Ok(());
        }

        let mut buf = Vec::new();
        codec::encode_message(&mut buf, frames);
        self.outbound.queue.push_back(buf);
        self.sent += 1;
        self.flush_outbound()
    }

    fn flush(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.flush_outbound()
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Best effort: whatever the socket takes now still reaches the peer
        if let Err(e) = self.flush_outbound() {
            debug!("Final flush to {} failed: {}", self.endpoint, e);
        }
        if !self.outbound.queue.is_empty() {
            debug!(
                "Discarding {} queued messages for {}",
                self.outbound.queue.len(),
                self.endpoint
            );
        }

        info!(
            "Publisher disconnecting from {} ({} sent, {} filtered, {} dropped)",
            self.endpoint, self.sent, self.filtered, self.dropped
        );
        self.conn.get_ref().shutdown(Shutdown::Both)?;
        Ok(())
    }
}

impl Drop for ZmtpPublisher {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!("Error closing publisher socket: {}", e);
        }
    }
}
