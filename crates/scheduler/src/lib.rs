//! Pull-based master/worker frame scheduler.
//!
//! A single [`Coordinator`] owns the [`TaskQueue`] and [`ResultBuffer`] and
//! hands tasks to [`FrameWorker`]s on request. Workers return processed
//! frames in any order; the coordinator files them by index and finishes
//! once every worker has been retired and every result collected.

pub mod buffer;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod runner;
pub mod sink;
pub mod stats;
pub mod worker;

pub use buffer::{BufferError, ResultBuffer};
pub use config::TesseraConfig;
pub use coordinator::{Coordinator, RunOutcome};
pub use error::{ConfigError, SchedulerError};
pub use protocol::{Assignment, ProcessedFrame, TaskRequest};
pub use queue::TaskQueue;
pub use runner::RunReport;
pub use sink::{SinkError, TextSink};
pub use stats::RunStats;
pub use worker::{FrameWorker, WorkerReport, WorkerState};
