//! Bind-mode SUB socket.
//!
//! Serves one publisher at a time. Subscriptions are sent to the publisher
//! right after the handshake and also applied locally, so messages that slip
//! through (e.g. sent before the publisher saw a cancel) are still filtered.

use crate::core::types::Endpoint;
use crate::error::{Error, Result};
use crate::transport::zmtp::codec::{SocketType, SubscriptionChange};
use crate::transport::zmtp::connection::Connection;
use crate::transport::zmtp::subscriptions::SubscriptionSet;
use log::{debug, info, trace};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

/// Upper bound on the greeting/READY exchange with a new publisher
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// ZMTP subscriber listening for a publisher
pub struct SubSocket {
    listener: TcpListener,
    subscriptions: SubscriptionSet,
    conn: Option<Connection<TcpStream>>,
    peer: Option<SocketAddr>,
    pending: Vec<Vec<u8>>,
    read_timeout: Option<Duration>,
}

impl SubSocket {
    /// Bind the listening socket
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        let listener = TcpListener::bind(endpoint.socket_address())?;
        info!(
            "Subscriber bound to tcp://{}",
            listener.local_addr().map(|a| a.to_string()).unwrap_or_default()
        );
        Ok(Self {
            listener,
            subscriptions: SubscriptionSet::new(),
            conn: None,
            peer: None,
            pending: Vec::new(),
            read_timeout: None,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Subscribe to a topic prefix (empty = everything)
    pub fn subscribe(&mut self, prefix: &[u8]) -> Result<()> {
        self.change(SubscriptionChange::Subscribe(prefix.to_vec()))
    }

    /// Cancel one subscription to a topic prefix
    pub fn unsubscribe(&mut self, prefix: &[u8]) -> Result<()> {
        self.change(SubscriptionChange::Cancel(prefix.to_vec()))
    }

    fn change(&mut self, change: SubscriptionChange) -> Result<()> {
        self.subscriptions.apply(&change);
        if let Some(conn) = self.conn.as_mut() {
            let mut buf = Vec::new();
            change.encode(&mut buf);
            conn.send_raw(&buf)?;
        }
        Ok(())
    }

    pub fn subscriptions(&self) -> &SubscriptionSet {
        &self.subscriptions
    }

    /// Read timeout applied to the publisher connection
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.read_timeout = timeout;
        if let Some(conn) = self.conn.as_ref() {
            conn.get_ref().set_read_timeout(timeout)?;
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Block until a publisher connects, then handshake and subscribe
    pub fn accept(&mut self) -> Result<SocketAddr> {
        self.listener.set_nonblocking(false)?;
        let (stream, addr) = self.listener.accept()?;
        self.attach(stream, addr)?;
        Ok(addr)
    }

    /// Accept a pending publisher if there is one
    pub fn try_accept(&mut self) -> Result<Option<SocketAddr>> {
        self.listener.set_nonblocking(true)?;
        let accepted = self.listener.accept();
        self.listener.set_nonblocking(false)?;
        match accepted {
            Ok((stream, addr)) => {
                self.attach(stream, addr)?;
                Ok(Some(addr))
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn attach(&mut self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
        let mut conn = Connection::handshake(stream, SocketType::Sub, true)?;

        let mut buf = Vec::new();
        for prefix in self.subscriptions.iter() {
            SubscriptionChange::Subscribe(prefix.to_vec()).encode(&mut buf);
        }
        conn.send_raw(&buf)?;
        conn.get_ref().set_read_timeout(self.read_timeout)?;

        info!(
            "Publisher {} connected ({} subscriptions sent)",
            addr,
            self.subscriptions.len()
        );
        self.conn = Some(conn);
        self.peer = Some(addr);
        self.pending.clear();
        Ok(())
    }

    /// Drop the current publisher connection
    pub fn disconnect(&mut self) {
        if let Some(addr) = self.peer.take() {
            info!("Publisher {} disconnected", addr);
        }
        self.conn = None;
        self.pending.clear();
    }

    /// Receive the next subscribed multipart message
    ///
    /// Commands are skipped. With a read timeout set, a timeout is returned
    /// as an I/O error (see [`crate::transport::zmtp::is_timeout`]) and any
    /// partially received message is kept for the next call. A closed peer
    /// disconnects the socket and returns `UnexpectedEof`.
    pub fn recv_multipart(&mut self) -> Result<Vec<Vec<u8>>> {
        loop {
            let conn = self.conn.as_mut().ok_or(Error::NotInitialized)?;
            let frame = match conn.read_frame() {
                Ok(frame) => frame,
                Err(Error::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    self.disconnect();
                    return Err(Error::Io(e));
                }
                Err(e) => return Err(e),
            };

            if frame.is_command() {
                trace!("Skipping command frame ({} bytes)", frame.body.len());
                continue;
            }

            let more = frame.more();
            self.pending.push(frame.body);
            if more {
                continue;
            }

            let message = std::mem::take(&mut self.pending);
            let topic = message.first().map(Vec::as_slice).unwrap_or_default();
            if self.subscriptions.matches(topic) {
                return Ok(message);
            }
            debug!(
                "Dropping unsubscribed topic {:?}",
                String::from_utf8_lossy(topic)
            );
        }
    }
}
