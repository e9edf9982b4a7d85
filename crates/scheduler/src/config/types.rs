use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tessera_core::Latency;

// ── Top-level config ────────────────────────────────────────────────

/// Full configuration for a tessera run.
///
/// Parsed from `tessera.toml`. Every section is optional and every field has
/// a default, so an empty file describes the reference run: a 20×20 ramp
/// cut into 4×5 frames and processed by four in-process workers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TesseraConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

// ── Section configs ─────────────────────────────────────────────────

/// Input dataset. With no `path`, a ramp of `rows × cols` is generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_dim")]
    pub rows: usize,

    #[serde(default = "default_dataset_dim")]
    pub cols: usize,

    /// Whitespace-separated integer table; overrides `rows`/`cols`.
    pub path: Option<PathBuf>,
}

fn default_dataset_dim() -> usize {
    20
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            rows: default_dataset_dim(),
            cols: default_dataset_dim(),
            path: None,
        }
    }
}

/// Frame window dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_rows")]
    pub rows: usize,

    #[serde(default = "default_window_cols")]
    pub cols: usize,
}

fn default_window_rows() -> usize {
    4
}

fn default_window_cols() -> usize {
    5
}

impl WindowConfig {
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            rows: default_window_rows(),
            cols: default_window_cols(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of workers, fixed for the whole run.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    4
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// How coordinator and workers talk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// "local" (in-process), "tcp" or "ipc".
    #[serde(default = "default_transport_kind")]
    pub kind: String,

    /// Hub endpoint for the ZeroMQ kinds; ignored for "local".
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_transport_kind() -> String {
    "local".into()
}

fn default_endpoint() -> String {
    "tcp://127.0.0.1:5570".into()
}

impl TransportConfig {
    pub fn is_local(&self) -> bool {
        self.kind == "local"
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: default_transport_kind(),
            endpoint: default_endpoint(),
        }
    }
}

/// Simulated transform latency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default)]
    pub latency_ms: u64,

    #[serde(default)]
    pub jitter_ms: u64,
}

impl ProcessingConfig {
    pub fn latency(&self) -> Latency {
        Latency {
            base: Duration::from_millis(self.latency_ms),
            jitter: Duration::from_millis(self.jitter_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("tessera-results.txt")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}
