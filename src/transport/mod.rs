//! Transport layer for outbound pose messages

use crate::error::Result;

mod mock;
pub mod zmtp;

pub use mock::MockTransport;
pub use zmtp::{DEFAULT_SEND_HWM, SubSocket, ZmtpPublisher};

/// Transport trait for publishing multipart messages
pub trait Transport {
    /// Send one logical message made of `frames`, in order
    fn send_multipart(&mut self, frames: &[&[u8]]) -> Result<()>;

    /// Push out anything queued by earlier sends without blocking
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the underlying socket
    ///
    /// Sends after close are a caller error; implementations may reject them.
    fn close(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_multipart(&mut self, frames: &[&[u8]]) -> Result<()> {
        (**self).send_multipart(frames)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
