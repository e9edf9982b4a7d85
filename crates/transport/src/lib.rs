//! Tagged point-to-point messaging for the tessera scheduler.
//!
//! Every component talks through the [`Transport`] trait: tagged `send`,
//! blocking `recv`/`probe`, and non-blocking `try_recv`/`try_probe`.
//! Two backends are provided:
//! - [`LocalMesh`]: in-process mailboxes, one per rank
//! - [`ZmqHub`] / [`ZmqSpoke`]: ZeroMQ ROUTER/DEALER sockets for multi-process runs

pub mod address;
pub mod endpoint;
pub mod error;
pub mod local;
pub mod mailbox;
pub mod message;
pub mod traits;
pub mod zmq;

pub use address::{Address, Source};
pub use endpoint::Endpoint;
pub use error::TransportError;
pub use local::{LocalMesh, LocalTransport};
pub use mailbox::Mailbox;
pub use message::{Envelope, Message, Tag};
pub use traits::Transport;
pub use zmq::{ZmqHub, ZmqSpoke};
