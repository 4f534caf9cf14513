//! Minimal ZMTP 3.0 (NULL mechanism) pub/sub
//!
//! Enough of the ZeroMQ wire protocol to interoperate with libzmq and pyzmq
//! SUB sockets: a connect-mode publisher and a bind-mode subscriber, each
//! talking to a single peer. The publisher never blocks on a slow
//! subscriber; past its high-water mark it drops whole messages.

pub mod codec;
pub mod connection;
pub mod publisher;
pub mod subscriber;
pub mod subscriptions;

pub use codec::SocketType;
pub use connection::{Connection, is_timeout};
pub use publisher::{DEFAULT_SEND_HWM, ZmtpPublisher};
pub use subscriber::SubSocket;
pub use subscriptions::SubscriptionSet;
