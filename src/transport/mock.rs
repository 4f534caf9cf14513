//! Mock transport for testing

use super::Transport;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Mock transport recording every multipart message
///
/// Clones share state, so a test keeps one handle while the publisher owns
/// another.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    sent: Vec<Vec<Vec<u8>>>,
    fail_sends: bool,
    flushes: usize,
    closed: bool,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far, each as its list of frames
    pub fn sent(&self) -> Vec<Vec<Vec<u8>>> {
        self.inner.lock().sent.clone()
    }

    /// Topic frame of every message sent so far, as text
    pub fn sent_topics(&self) -> Vec<String> {
        self.inner
            .lock()
            .sent
            .iter()
            .filter_map(|frames| frames.first())
            .map(|topic| String::from_utf8_lossy(topic).into_owned())
            .collect()
    }

    /// Number of messages sent so far
    pub fn message_count(&self) -> usize {
        self.inner.lock().sent.len()
    }

    /// Number of flush calls so far
    pub fn flush_count(&self) -> usize {
        self.inner.lock().flushes
    }

    /// Make subsequent sends and flushes fail with a broken-pipe error
    pub fn set_fail_sends(&self, fail: bool) {
        self.inner.lock().fail_sends = fail;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl Transport for MockTransport {
    fn send_multipart(&mut self, frames: &[&[u8]]) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(Error::ShutDown);
        }
        if inner.fail_sends {
            return Err(broken_pipe());
        }
        inner.sent.push(frames.iter().map(|f| f.to_vec()).collect());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_sends {
            return Err(broken_pipe());
        }
        inner.flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.inner.lock().closed = true;
        Ok(())
    }
}

fn broken_pipe() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "mock send failure",
    ))
}
