use thiserror::Error;

use tessera_core::{Frame, TaskIndex};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("result index {index} out of range (buffer holds {len})")]
    OutOfRange { index: TaskIndex, len: usize },

    #[error("result slot {0} already filled")]
    AlreadyFilled(TaskIndex),

    #[error("{} result slot(s) never filled, first missing is {}", .missing.len(), .missing.first().copied().unwrap_or_default())]
    Incomplete { missing: Vec<TaskIndex> },
}

/// One slot per task, filled by index as results arrive.
#[derive(Debug, Clone)]
pub struct ResultBuffer {
    slots: Vec<Option<Frame>>,
    filled: usize,
}

impl ResultBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
            filled: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots holding a result.
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    pub fn get(&self, index: TaskIndex) -> Option<&Frame> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Store `frame` in the slot named by its index. Each slot is written at most once.
    pub fn fill(&mut self, frame: Frame) -> Result<(), BufferError> {
        let len = self.slots.len();
        let index = frame.index;
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(BufferError::OutOfRange { index, len })?;
        if slot.is_some() {
            return Err(BufferError::AlreadyFilled(index));
        }
        *slot = Some(frame);
        self.filled += 1;
        Ok(())
    }

    /// Indices whose slot is still empty, ascending.
    pub fn missing(&self) -> Vec<TaskIndex> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_none().then_some(i))
            .collect()
    }

    /// The processed frames in index order, or the list of empty slots.
    pub fn into_frames(self) -> Result<Vec<Frame>, BufferError> {
        if !self.is_complete() {
            return Err(BufferError::Incomplete {
                missing: self.missing(),
            });
        }
        Ok(self.slots.into_iter().flatten().collect())
    }
}
