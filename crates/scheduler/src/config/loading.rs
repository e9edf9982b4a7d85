use std::path::{Path, PathBuf};

use tracing::info;

use tessera_core::config::{env_opt, env_parse};

use super::types::TesseraConfig;
use crate::error::ConfigError;

impl TesseraConfig {
    /// Parse config from a TOML string, apply env overrides, validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Load `path` if given, else `tessera.toml` in the working directory if
    /// present, else defaults. Env overrides apply in every case.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                info!(path = %p.display(), "loading config");
                Self::from_file(p)
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                info!(path = DEFAULT_CONFIG_FILE, "loading config");
                Self::from_file(DEFAULT_CONFIG_FILE)
            }
            None => Self::from_toml(""),
        }
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// Convention: `TESSERA_SECTION_KEY` overrides `section.key`.
    /// Examples:
    /// - `TESSERA_POOL_WORKERS` -> `pool.workers`
    /// - `TESSERA_TRANSPORT_KIND` -> `transport.kind`
    /// - `TESSERA_PROCESSING_LATENCY_MS` -> `processing.latency_ms`
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse("TESSERA_DATASET_ROWS") {
            self.dataset.rows = v;
        }
        if let Some(v) = env_parse("TESSERA_DATASET_COLS") {
            self.dataset.cols = v;
        }
        if let Some(v) = env_opt("TESSERA_DATASET_PATH") {
            self.dataset.path = Some(PathBuf::from(v));
        }
        if let Some(v) = env_parse("TESSERA_WINDOW_ROWS") {
            self.window.rows = v;
        }
        if let Some(v) = env_parse("TESSERA_WINDOW_COLS") {
            self.window.cols = v;
        }
        if let Some(v) = env_parse("TESSERA_POOL_WORKERS") {
            self.pool.workers = v;
        }
        if let Some(v) = env_opt("TESSERA_TRANSPORT_KIND") {
            self.transport.kind = v;
        }
        if let Some(v) = env_opt("TESSERA_TRANSPORT_ENDPOINT") {
            self.transport.endpoint = v;
        }
        if let Some(v) = env_parse("TESSERA_PROCESSING_LATENCY_MS") {
            self.processing.latency_ms = v;
        }
        if let Some(v) = env_parse("TESSERA_PROCESSING_JITTER_MS") {
            self.processing.jitter_ms = v;
        }
        if let Some(v) = env_opt("TESSERA_OUTPUT_PATH") {
            self.output.path = PathBuf::from(v);
        }
    }
}

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "tessera.toml";
