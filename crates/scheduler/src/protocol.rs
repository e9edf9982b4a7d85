//! Message tags and payloads exchanged between coordinator and workers.
//!
//! Each kind of message travels on its own tag so the coordinator can wait
//! for requests while results queue up behind them untouched.

use serde::{Deserialize, Serialize};

use tessera_core::{Frame, TaskIndex};
use tessera_transport::Tag;

// ── Tags ──────────────────────────────────────────────────────────────────

/// Worker → coordinator: "give me work".
pub const TASK_REQUEST: Tag = Tag(1);

/// Coordinator → worker: an [`Assignment`].
pub const TASK_RESPONSE: Tag = Tag(2);

/// Worker → coordinator: a [`ProcessedFrame`].
pub const PROCESSED_FRAME: Tag = Tag(3);

// ── Payloads ──────────────────────────────────────────────────────────────

/// A request for the next task.
///
/// `last_submitted` is the index of the most recent frame this worker has
/// already sent back, or `None` before its first task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub last_submitted: Option<TaskIndex>,
}

impl TaskRequest {
    pub fn first() -> Self {
        Self {
            last_submitted: None,
        }
    }

    pub fn after(index: TaskIndex) -> Self {
        Self {
            last_submitted: Some(index),
        }
    }
}

/// Reply to a [`TaskRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    /// Process this frame and send the result back under the same index.
    Task(Frame),
    /// No work remains. The worker must stop.
    Done,
}

impl Assignment {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// A transformed frame on its way back to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedFrame {
    pub frame: Frame,
}
