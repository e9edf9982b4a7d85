use std::collections::VecDeque;

use tessera_core::TaskIndex;

/// Tasks not yet handed to any worker, in dispatch order.
///
/// Dispatch is FIFO so tasks leave in index order. Nothing in the protocol
/// depends on that order; it only keeps runs reproducible.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    pending: VecDeque<TaskIndex>,
}

impl TaskQueue {
    /// Queue holding every index in `0..total`.
    pub fn new(total: usize) -> Self {
        Self {
            pending: (0..total).collect(),
        }
    }

    /// Remove and return the next task, if any.
    pub fn pop(&mut self) -> Option<TaskIndex> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
