//! ZMTP 3.0 wire encoding
//!
//! # Greeting (64 bytes, both peers, once)
//!
//! ```text
//! ┌──────┬───────────┬──────┬───────┬───────┬──────────────┬────────┬──────────┐
//! │ 0xFF │ 8 × 0x00  │ 0x7F │ major │ minor │ mechanism    │ server │ 31 × 0x00│
//! │      │ (padding) │      │ (3)   │ (0)   │ "NULL" + pad │ 0 / 1  │ (filler) │
//! └──────┴───────────┴──────┴───────┴───────┴──────────────┴────────┴──────────┘
//!   0      1..9        9      10      11      12..32         32       33..64
//! ```
//!
//! # Frames
//!
//! ```text
//! ┌───────┬──────────────────────────┬──────────┐
//! │ flags │ size (1 byte or 8 bytes) │ body     │
//! └───────┴──────────────────────────┴──────────┘
//! ```
//!
//! - `0x01` MORE: another frame of the same message follows
//! - `0x02` LONG: size is an 8-byte big-endian integer
//! - `0x04` COMMAND: body is `name-len | name | data`
//!
//! With the NULL mechanism the only command exchanged during the handshake
//! is `READY`, whose data is a list of `name-len(1) | name | value-len(4 BE) |
//! value` properties. ZMTP 3.0 subscribers send subscriptions as ordinary
//! single-frame messages whose first byte is `0x01` (subscribe) or `0x00`
//! (cancel); 3.1 peers may use `SUBSCRIBE`/`CANCEL` commands instead.

use crate::error::{Error, Result};
use std::fmt;

// ============================================================================
// Greeting
// ============================================================================

/// Greeting length in bytes
pub const GREETING_LEN: usize = 64;
/// Protocol major version we advertise
pub const VERSION_MAJOR: u8 = 3;
/// Protocol minor version we advertise
///
/// Peers speaking 3.1 fall back to 3.0 subscription framing on seeing it.
pub const VERSION_MINOR: u8 = 0;

/// First signature byte
const SIGNATURE_HEAD: u8 = 0xFF;
/// Last signature byte (only bit 0 is checked on input)
const SIGNATURE_TAIL: u8 = 0x7F;
/// Mechanism name, NUL padded to 20 bytes
const MECHANISM_OFFSET: usize = 12;
const MECHANISM_LEN: usize = 20;
/// as-server flag; meaningless for NULL but still sent
const AS_SERVER_OFFSET: usize = 32;
const MECHANISM_NULL: &[u8] = b"NULL";

// ============================================================================
// Frame flags
// ============================================================================

/// More frames of the same message follow
pub const FLAG_MORE: u8 = 0x01;
/// Size field is 8 bytes instead of 1
pub const FLAG_LONG: u8 = 0x02;
/// Frame is a command, not message data
pub const FLAG_COMMAND: u8 = 0x04;

/// Largest frame accepted from a peer (1MB)
///
/// Pose payloads are tens of bytes; anything near this is a corrupt size
/// field.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

// ============================================================================
// Commands and properties
// ============================================================================

/// Handshake completion, carries metadata properties
pub const CMD_READY: &str = "READY";
/// Peer rejected the handshake; data is a reason string
pub const CMD_ERROR: &str = "ERROR";
/// ZMTP 3.1 subscription command
pub const CMD_SUBSCRIBE: &str = "SUBSCRIBE";
/// ZMTP 3.1 unsubscription command
pub const CMD_CANCEL: &str = "CANCEL";
/// READY property naming the sender's socket type
pub const PROP_SOCKET_TYPE: &str = "Socket-Type";

/// ZeroMQ socket roles relevant to pub/sub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    Pub,
    Sub,
    XPub,
    XSub,
}

impl SocketType {
    /// Name as sent in the `Socket-Type` property
    pub fn name(self) -> &'static str {
        match self {
            SocketType::Pub => "PUB",
            SocketType::Sub => "SUB",
            SocketType::XPub => "XPUB",
            SocketType::XSub => "XSUB",
        }
    }

    /// Parse a `Socket-Type` value (case-sensitive, as libzmq sends it)
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"PUB" => Some(SocketType::Pub),
            b"SUB" => Some(SocketType::Sub),
            b"XPUB" => Some(SocketType::XPub),
            b"XSUB" => Some(SocketType::XSub),
            _ => None,
        }
    }

    /// Whether a peer of type `other` may talk to this socket
    pub fn accepts(self, other: SocketType) -> bool {
        match self {
            SocketType::Pub | SocketType::XPub => {
                matches!(other, SocketType::Sub | SocketType::XSub)
            }
            SocketType::Sub | SocketType::XSub => {
                matches!(other, SocketType::Pub | SocketType::XPub)
            }
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded peer greeting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// Peer's major version (at least 3)
    pub major: u8,
    /// Peer's minor version
    pub minor: u8,
    pub as_server: bool,
}

/// Build our greeting (NULL mechanism)
///
/// The whole 64 bytes are sent at once; we never use the partial-greeting
/// version negotiation older peers rely on.
pub fn encode_greeting(as_server: bool) -> [u8; GREETING_LEN] {
    let mut data = [0u8; GREETING_LEN];

    // Signature: 0xFF, 8 bytes padding, 0x7F
    data[0] = SIGNATURE_HEAD;
    data[9] = SIGNATURE_TAIL;

    // Version
    data[10] = VERSION_MAJOR;
    data[11] = VERSION_MINOR;

    // Mechanism, NUL padded
    data[MECHANISM_OFFSET..MECHANISM_OFFSET + MECHANISM_NULL.len()]
        .copy_from_slice(MECHANISM_NULL);

    data[AS_SERVER_OFFSET] = as_server as u8;
    data
}

/// Validate a peer greeting
///
/// Accepts any version from 3.0 upwards with the NULL mechanism. Everything
/// else is an [`Error::Protocol`].
pub fn parse_greeting(data: &[u8; GREETING_LEN]) -> Result<Greeting> {
    // Signature
    if data[0] != SIGNATURE_HEAD || data[9] & 0x01 != 0x01 {
        return Err(Error::Protocol(format!(
            "bad greeting signature {:#04x}..{:#04x}",
            data[0], data[9]
        )));
    }

    // Version; ZMTP 2.x peers use a different framing
    let major = data[10];
    let minor = data[11];
    if major < VERSION_MAJOR {
        return Err(Error::Protocol(format!(
            "unsupported ZMTP version {}.{}",
            major, minor
        )));
    }

    // Mechanism: name up to the first NUL
    let mechanism = &data[MECHANISM_OFFSET..MECHANISM_OFFSET + MECHANISM_LEN];
    let name_len = mechanism
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(MECHANISM_LEN);
    if &mechanism[..name_len] != MECHANISM_NULL {
        return Err(Error::Protocol(format!(
            "unsupported security mechanism {:?}",
            String::from_utf8_lossy(&mechanism[..name_len])
        )));
    }

    Ok(Greeting {
        major,
        minor,
        as_server: data[AS_SERVER_OFFSET] != 0,
    })
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Flags byte as received
    pub flags: u8,
    pub body: Vec<u8>,
}

impl Frame {
    /// Another frame of the same message follows
    #[inline]
    pub fn more(&self) -> bool {
        self.flags & FLAG_MORE != 0
    }

    /// Body is `name-len | name | data` rather than message data
    #[inline]
    pub fn is_command(&self) -> bool {
        self.flags & FLAG_COMMAND != 0
    }
}

/// Append one frame to `buf`
///
/// Bodies up to 255 bytes use the 1-byte size form; longer ones set LONG
/// and use an 8-byte big-endian size.
pub fn encode_frame(buf: &mut Vec<u8>, body: &[u8], more: bool, command: bool) {
    let mut flags = 0u8;
    if more {
        flags |= FLAG_MORE;
    }
    if command {
        flags |= FLAG_COMMAND;
    }

    // Header: flags then size
    if body.len() > u8::MAX as usize {
        buf.push(flags | FLAG_LONG);
        buf.extend_from_slice(&(body.len() as u64).to_be_bytes());
    } else {
        buf.push(flags);
        buf.push(body.len() as u8);
    }
    buf.extend_from_slice(body);
}

/// Append a multipart message; every frame but the last carries MORE
///
/// An empty `frames` slice appends nothing.
pub fn encode_message(buf: &mut Vec<u8>, frames: &[&[u8]]) {
    let last = frames.len().saturating_sub(1);
    for (i, frame) in frames.iter().enumerate() {
        encode_frame(buf, frame, i < last, false);
    }
}

/// Append a command frame
///
/// `name` must be at most 255 bytes; every command this crate sends is a
/// short ASCII constant.
pub fn encode_command(buf: &mut Vec<u8>, name: &str, data: &[u8]) {
    let mut body = Vec::with_capacity(1 + name.len() + data.len());
    body.push(name.len() as u8);
    body.extend_from_slice(name.as_bytes());
    body.extend_from_slice(data);
    encode_frame(buf, &body, false, true);
}

/// Append a READY command announcing `socket_type`
pub fn encode_ready(buf: &mut Vec<u8>, socket_type: SocketType) {
    let mut data = Vec::new();
    encode_property(&mut data, PROP_SOCKET_TYPE, socket_type.name().as_bytes());
    encode_command(buf, CMD_READY, &data);
}

/// Append one `name-len(1) | name | value-len(4 BE) | value` property
fn encode_property(buf: &mut Vec<u8>, name: &str, value: &[u8]) {
    buf.push(name.len() as u8);
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
    buf.extend_from_slice(value);
}

/// Try to decode one frame from the front of `buf`
///
/// Returns the frame and the number of bytes it occupied, or `None` if
/// `buf` does not yet hold a complete frame. Reserved flag bits and sizes
/// over [`MAX_FRAME_SIZE`] are protocol errors; the caller should drop the
/// connection since the stream can no longer be resynchronized.
pub fn decode_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>> {
    // Flags
    let Some(&flags) = buf.first() else {
        return Ok(None);
    };
    if flags & !(FLAG_MORE | FLAG_LONG | FLAG_COMMAND) != 0 {
        return Err(Error::Protocol(format!(
            "reserved frame flags set: {:#04x}",
            flags
        )));
    }

    // Size: 8 bytes big-endian with LONG, otherwise 1 byte
    let (size, header) = if flags & FLAG_LONG != 0 {
        if buf.len() < 9 {
            return Ok(None);
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&buf[1..9]);
        (u64::from_be_bytes(raw), 9)
    } else {
        if buf.len() < 2 {
            return Ok(None);
        }
        (buf[1] as u64, 2)
    };

    if size > MAX_FRAME_SIZE as u64 {
        return Err(Error::Protocol(format!(
            "frame of {} bytes exceeds limit of {}",
            size, MAX_FRAME_SIZE
        )));
    }
    // Body
    let size = size as usize;
    if buf.len() < header + size {
        return Ok(None);
    }

    let frame = Frame {
        flags,
        body: buf[header..header + size].to_vec(),
    };
    Ok(Some((frame, header + size)))
}

/// Split a command body into name and data
///
/// Fails on an empty body, a name running past the end, or a non-UTF-8
/// name.
pub fn parse_command(body: &[u8]) -> Result<(&str, &[u8])> {
    let Some(&name_len) = body.first() else {
        return Err(Error::Protocol("empty command frame".to_string()));
    };
    let name_end = 1 + name_len as usize;
    if body.len() < name_end {
        return Err(Error::Protocol("truncated command name".to_string()));
    }
    let name = std::str::from_utf8(&body[1..name_end])
        .map_err(|_| Error::Protocol("command name is not ASCII".to_string()))?;
    Ok((name, &body[name_end..]))
}

/// Parse READY metadata properties
///
/// Returns `(name, value)` pairs in the order sent. Names are kept as sent;
/// ZMTP compares them case-insensitively.
pub fn parse_properties(mut data: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut props = Vec::new();
    while !data.is_empty() {
        // name-len | name | value-len
        let name_len = data[0] as usize;
        if data.len() < 1 + name_len + 4 {
            return Err(Error::Protocol("truncated property header".to_string()));
        }
        let name = String::from_utf8_lossy(&data[1..1 + name_len]).into_owned();
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&data[1 + name_len..1 + name_len + 4]);
        let value_len = u32::from_be_bytes(raw) as usize;
        // value
        let value_start = 1 + name_len + 4;
        if data.len() < value_start + value_len {
            return Err(Error::Protocol(format!("truncated property {}", name)));
        }
        props.push((name, data[value_start..value_start + value_len].to_vec()));
        data = &data[value_start + value_len..];
    }
    Ok(props)
}

/// Extract the peer's socket type from READY data
///
/// Other properties (`Identity`, application metadata) are ignored.
pub fn ready_socket_type(data: &[u8]) -> Result<SocketType> {
    let props = parse_properties(data)?;
    let (_, value) = props
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(PROP_SOCKET_TYPE))
        .ok_or_else(|| Error::Protocol("READY without Socket-Type".to_string()))?;
    SocketType::from_name(value).ok_or_else(|| {
        Error::Protocol(format!(
            "unknown socket type {:?}",
            String::from_utf8_lossy(value)
        ))
    })
}

/// Subscription change sent from a subscriber to a publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionChange {
    /// Start receiving topics with this prefix
    Subscribe(Vec<u8>),
    /// Drop one earlier subscription to this prefix
    Cancel(Vec<u8>),
}

impl SubscriptionChange {
    /// Interpret a peer frame as a subscription change, if it is one
    ///
    /// Both the 3.0 message form and the 3.1 command form are understood.
    /// Other frames yield `None`.
    pub fn from_frame(frame: &Frame) -> Result<Option<Self>> {
        // 3.1: SUBSCRIBE / CANCEL command, data is the prefix
        if frame.is_command() {
            let (name, data) = parse_command(&frame.body)?;
            return Ok(match name {
                CMD_SUBSCRIBE => Some(SubscriptionChange::Subscribe(data.to_vec())),
                CMD_CANCEL => Some(SubscriptionChange::Cancel(data.to_vec())),
                _ => None,
            });
        }
        // 3.0: 0x01 / 0x00 marker byte, rest is the prefix
        Ok(match frame.body.split_first() {
            Some((&1, topic)) => Some(SubscriptionChange::Subscribe(topic.to_vec())),
            Some((&0, topic)) => Some(SubscriptionChange::Cancel(topic.to_vec())),
            _ => None,
        })
    }

    /// Encode as a ZMTP 3.0 subscription message
    ///
    /// 3.1 publishers still accept this form, so it is the one we send.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let (marker, topic) = match self {
            SubscriptionChange::Subscribe(topic) => (1u8, topic),
            SubscriptionChange::Cancel(topic) => (0u8, topic),
        };
        let mut body = Vec::with_capacity(1 + topic.len());
        body.push(marker);
        body.extend_from_slice(topic);
        encode_frame(buf, &body, false, false);
    }
}
