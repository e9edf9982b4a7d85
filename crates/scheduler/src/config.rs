//! `tessera.toml`: run parameters with environment overrides.

mod loading;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use types::{
    DatasetConfig, OutputConfig, PoolConfig, ProcessingConfig, TesseraConfig, TransportConfig,
    WindowConfig,
};
