use thiserror::Error;

use crate::address::Address;

/// Errors that can occur in the tessera messaging layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("zeromq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("no route to {0}")]
    UnknownAddress(Address),

    #[error("transport closed: {0}")]
    Closed(String),

    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}
