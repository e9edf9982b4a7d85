//! The worker side of the protocol: request, process, submit, repeat.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use tessera_core::{Frame, FrameProcessor, TaskIndex};
use tessera_transport::{Address, Message, Source, Transport};

use crate::error::SchedulerError;
use crate::protocol::{
    Assignment, ProcessedFrame, TaskRequest, PROCESSED_FRAME, TASK_REQUEST, TASK_RESPONSE,
};

/// Where a worker is in its request/process/submit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Requesting,
    Assigned,
    Processing,
    Submitting,
    Terminated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requesting => "requesting",
            Self::Assigned => "assigned",
            Self::Processing => "processing",
            Self::Submitting => "submitting",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Summary of one worker's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub address: Address,
    pub tasks_processed: usize,
    /// Time spent inside the transform.
    pub busy: Duration,
}

/// Pulls frames from the coordinator until told to stop.
pub struct FrameWorker<T> {
    transport: T,
    processor: Arc<dyn FrameProcessor>,
    coordinator: Address,
    state: WorkerState,
}

impl<T: Transport> FrameWorker<T> {
    pub fn new(transport: T, processor: Arc<dyn FrameProcessor>) -> Self {
        Self {
            transport,
            processor,
            coordinator: Address::COORDINATOR,
            state: WorkerState::Requesting,
        }
    }

    pub fn address(&self) -> Address {
        self.transport.local_address()
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Run the loop to completion.
    ///
    /// Each submission is sent before the next request, and nothing is sent
    /// after [`Assignment::Done`].
    pub async fn run(mut self) -> Result<WorkerReport, SchedulerError> {
        let address = self.address();
        let mut report = WorkerReport {
            address,
            tasks_processed: 0,
            busy: Duration::ZERO,
        };
        let mut last_submitted: Option<TaskIndex> = None;
        info!(worker = %address, processor = self.processor.name(), "worker started");

        loop {
            self.transition(WorkerState::Requesting);
            let assignment = self.request(last_submitted).await?;

            let frame = match assignment {
                Assignment::Done => {
                    self.transition(WorkerState::Terminated);
                    break;
                }
                Assignment::Task(frame) => {
                    self.transition(WorkerState::Assigned);
                    frame
                }
            };

            self.transition(WorkerState::Processing);
            let started = Instant::now();
            let processed = self.process(frame).await?;
            report.busy += started.elapsed();

            self.transition(WorkerState::Submitting);
            let index = processed.index;
            let msg = Message::new(PROCESSED_FRAME, &ProcessedFrame { frame: processed })?;
            self.transport.send(self.coordinator, msg).await?;
            debug!(worker = %address, index, "submitted result");

            last_submitted = Some(index);
            report.tasks_processed += 1;
        }

        info!(
            worker = %address,
            tasks = report.tasks_processed,
            busy_ms = report.busy.as_millis() as u64,
            "worker finished"
        );
        Ok(report)
    }

    async fn request(&self, last_submitted: Option<TaskIndex>) -> Result<Assignment, SchedulerError> {
        let msg = Message::new(TASK_REQUEST, &TaskRequest { last_submitted })?;
        self.transport.send(self.coordinator, msg).await?;
        let reply = self
            .transport
            .recv(Source::Exact(self.coordinator), TASK_RESPONSE)
            .await?;
        Ok(reply.message.decode()?)
    }

    /// Apply the transform on the blocking pool and check it kept the frame's identity.
    async fn process(&self, frame: Frame) -> Result<Frame, SchedulerError> {
        let processor = Arc::clone(&self.processor);
        let index = frame.index;
        let shape = frame.grid.shape();

        let processed = tokio::task::spawn_blocking(move || processor.process(&frame))
            .await
            .map_err(|e| SchedulerError::Worker(format!("transform for task {index} panicked: {e}")))?;

        if processed.index != index || processed.grid.shape() != shape {
            return Err(SchedulerError::Worker(format!(
                "transform changed task {index} into index {} with shape {:?}, expected {shape:?}",
                processed.index,
                processed.grid.shape()
            )));
        }
        Ok(processed)
    }

    fn transition(&mut self, next: WorkerState) {
        trace!(worker = %self.address(), from = %self.state, to = %next, "worker state");
        self.state = next;
    }
}
