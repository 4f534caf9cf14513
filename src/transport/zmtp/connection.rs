//! Handshaken ZMTP connection over any byte stream.

use crate::error::{Error, Result};
use crate::transport::zmtp::codec::{self, CMD_ERROR, CMD_READY, Frame, GREETING_LEN, SocketType};
use std::io::{ErrorKind, Read, Write};

/// Read chunk size
const READ_CHUNK: usize = 4096;

/// A stream that has completed the greeting and READY exchange
pub struct Connection<S> {
    stream: S,
    rx: Vec<u8>,
    peer_type: SocketType,
}

impl<S: Read + Write> Connection<S> {
    /// Perform the NULL-mechanism handshake as `local`
    ///
    /// Both sides send their full greeting up front, then READY. The peer's
    /// READY must announce a socket type compatible with `local`.
    pub fn handshake(mut stream: S, local: SocketType, as_server: bool) -> Result<Self> {
        // Greeting goes out before we look at the peer's
        stream.write_all(&codec::encode_greeting(as_server))?;
        stream.flush()?;

        let mut greeting = [0u8; GREETING_LEN];
        stream.read_exact(&mut greeting)?;
        let peer = codec::parse_greeting(&greeting)?;
        log::debug!(
            "ZMTP greeting: peer v{}.{} as_server={}",
            peer.major,
            peer.minor,
            peer.as_server
        );

        // NULL mechanism: READY is the only command before traffic
        let mut ready = Vec::new();
        codec::encode_ready(&mut ready, local);
        stream.write_all(&ready)?;
        stream.flush()?;

        let mut conn = Self {
            stream,
            rx: Vec::with_capacity(READ_CHUNK),
            peer_type: local,
        };

        // Peer may answer with ERROR instead of READY
        let frame = conn.read_frame()?;
        if !frame.is_command() {
            return Err(Error::Protocol(
                "expected READY command, got message frame".to_string(),
            ));
        }
        let (name, data) = codec::parse_command(&frame.body)?;
        match name {
            CMD_READY => {
                let peer_type = codec::ready_socket_type(data)?;
                if !local.accepts(peer_type) {
                    return Err(Error::Protocol(format!(
                        "{} socket cannot talk to {} peer",
                        local, peer_type
                    )));
                }
                conn.peer_type = peer_type;
            }
            CMD_ERROR => {
                let reason = data.get(1..).unwrap_or_default();
                return Err(Error::Protocol(format!(
                    "peer rejected handshake: {}",
                    String::from_utf8_lossy(reason)
                )));
            }
            other => {
                return Err(Error::Protocol(format!(
                    "expected READY command, got {}",
                    other
                )));
            }
        }

        Ok(conn)
    }

    /// Socket type announced by the peer
    pub fn peer_type(&self) -> SocketType {
        self.peer_type
    }

    /// Write a pre-encoded buffer (commands, subscriptions)
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes)?;
        Ok(())
    }

    /// Decode a buffered frame without touching the stream
    pub fn next_buffered_frame(&mut self) -> Result<Option<Frame>> {
        match codec::decode_frame(&self.rx)? {
            Some((frame, used)) => {
                self.rx.drain(..used);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    /// Block until one complete frame is available
    ///
    /// Honors the stream's read timeout: a timeout surfaces as an I/O error
    /// of kind `WouldBlock` or `TimedOut` and leaves buffered bytes intact.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.next_buffered_frame()? {
                return Ok(frame);
            }
            // Need more bytes; a timeout here leaves rx as is
            let mut chunk = [0u8; READ_CHUNK];
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "peer closed connection",
                )));
            }
            self.rx.extend_from_slice(&chunk[..n]);
        }
    }

    /// Read whatever the peer has sent so far
    ///
    /// The stream must be non-blocking. Returns every complete frame now
    /// buffered; a partial frame stays buffered for the next call. A closed
    /// peer is reported as `UnexpectedEof`.
    pub fn read_available(&mut self) -> Result<Vec<Frame>> {
        // Pull everything the kernel has buffered
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(Error::Io(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "peer closed connection",
                    )));
                }
                Ok(n) => self.rx.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        // Then split off complete frames
        let mut frames = Vec::new();
        while let Some(frame) = self.next_buffered_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Write as much of `bytes` as the stream takes right now
    ///
    /// The stream must be non-blocking. Returns the number of bytes written,
    /// which is less than `bytes.len()` once the socket buffer is full.
    pub fn write_available(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut written = 0;
        while written < bytes.len() {
            match self.stream.write(&bytes[written..]) {
                Ok(0) => {
                    return Err(Error::Io(std::io::Error::new(
                        ErrorKind::WriteZero,
                        "peer stopped accepting data",
                    )));
                }
                Ok(n) => written += n,
                // Socket buffer full
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(written)
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

/// Whether an error is a read timeout rather than a failure
pub fn is_timeout(err: &Error) -> bool {
    match err {
        Error::Io(e) => matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut),
        _ => false,
    }
}
