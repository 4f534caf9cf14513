//! Endpoint and message types.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// TCP endpoint in ZeroMQ notation (`tcp://<host>:<port>`)
///
/// IPv6 hosts are stored bare (`::1`) and bracketed when rendered
/// (`tcp://[::1]:5555`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port` form accepted by `std::net`
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.url_host(), self.port)
    }

    fn url_host(&self) -> Cow<'_, str> {
        if self.host.contains(':') && !self.host.starts_with('[') {
            Cow::Owned(format!("[{}]", self.host))
        } else {
            Cow::Borrowed(&self.host)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp://{}:{}", self.url_host(), self.port)
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix("tcp://")
            .ok_or_else(|| Error::InvalidEndpoint(format!("{} (expected tcp:// scheme)", s)))?;
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidEndpoint(format!("{} (missing port)", s)))?;
        // [v6addr] -> v6addr
        let host = match host.strip_prefix('[') {
            Some(inner) => inner.strip_suffix(']').ok_or_else(|| {
                Error::InvalidEndpoint(format!("{} (unclosed bracket)", s))
            })?,
            None => host,
        };
        if host.is_empty() {
            return Err(Error::InvalidEndpoint(format!("{} (missing host)", s)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| Error::InvalidEndpoint(format!("{} ({})", s, e)))?;
        Ok(Self::new(host, port))
    }
}

/// One logical message: ASCII topic frame followed by a UTF-8 payload frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    pub topic: String,
    pub payload: String,
}

impl TopicMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Frames in wire order
    pub fn frames(&self) -> [&[u8]; 2] {
        [self.topic.as_bytes(), self.payload.as_bytes()]
    }
}
