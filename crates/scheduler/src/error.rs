use thiserror::Error;

use tessera_core::CoreError;
use tessera_transport::TransportError;

use crate::buffer::BufferError;

/// Errors that abort a scheduler run.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("result buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("worker failed: {0}")]
    Worker(String),

    #[error("input error: {0}")]
    Core(#[from] CoreError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors loading or validating `tessera.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
