//! The per-frame transform applied by workers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// A pure, CPU-bound transform from one frame to another of the same shape and index.
///
/// Implementations may block (e.g. to simulate latency) but must not touch
/// scheduler state.
pub trait FrameProcessor: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn process(&self, frame: &Frame) -> Frame;
}

impl<T: FrameProcessor + ?Sized> FrameProcessor for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn process(&self, frame: &Frame) -> Frame {
        (**self).process(frame)
    }
}

/// Simulated per-task processing latency.
///
/// The jitter component is derived from the frame index, so runs are
/// reproducible while workers still finish out of order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Latency {
    pub base: Duration,
    pub jitter: Duration,
}

impl Latency {
    pub const NONE: Latency = Latency {
        base: Duration::ZERO,
        jitter: Duration::ZERO,
    };

    pub fn fixed(base: Duration) -> Self {
        Self {
            base,
            jitter: Duration::ZERO,
        }
    }

    /// Delay for the frame with the given index.
    pub fn for_index(&self, index: usize) -> Duration {
        if self.jitter.is_zero() {
            return self.base;
        }
        // Spread indices over 8 buckets of the jitter range.
        let bucket = (index.wrapping_mul(2_654_435_761) >> 7) % 8;
        self.base + self.jitter.mul_f64(bucket as f64 / 7.0)
    }
}

/// Halve each sample, add 10, clamp to `[0, 255]`.
#[derive(Debug, Clone, Default)]
pub struct HalveOffsetClamp {
    latency: Latency,
}

impl HalveOffsetClamp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Latency) -> Self {
        Self { latency }
    }

    /// The per-sample rule.
    pub fn apply(sample: i32) -> i32 {
        (sample / 2 + 10).clamp(0, 255)
    }
}

impl FrameProcessor for HalveOffsetClamp {
    fn name(&self) -> &str {
        "halve-offset-clamp"
    }

    fn process(&self, frame: &Frame) -> Frame {
        let delay = self.latency.for_index(frame.index);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Frame::new(frame.index, frame.grid.map(Self::apply))
    }
}
