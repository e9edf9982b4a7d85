//! The coordinator loop.
//!
//! Each pass blocks for one task request, answers it, then drains whatever
//! results are already waiting without blocking. A worker is only told
//! [`Assignment::Done`] once every task it was given has been collected, so
//! a submission that is still in transit when the worker asks for more work
//! cannot be lost at termination.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use tessera_core::{Frame, TaskIndex};
use tessera_transport::{Address, Envelope, Message, Source, Transport};

use crate::buffer::{BufferError, ResultBuffer};
use crate::error::SchedulerError;
use crate::protocol::{
    Assignment, ProcessedFrame, TaskRequest, PROCESSED_FRAME, TASK_REQUEST, TASK_RESPONSE,
};
use crate::queue::TaskQueue;
use crate::stats::RunStats;

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Processed frames in index order.
    pub frames: Vec<Frame>,
    pub stats: RunStats,
}

pub struct Coordinator<T> {
    transport: T,
    workers: usize,
    queue: TaskQueue,
    /// Unprocessed frames, taken out as they are dispatched.
    backlog: Vec<Option<Frame>>,
    /// Shape of each task's grid; a result must come back in the same shape.
    shapes: Vec<(usize, usize)>,
    buffer: ResultBuffer,
    /// Dispatched but not yet collected.
    in_flight: BTreeMap<TaskIndex, Address>,
    /// Most recent task given to each worker; its next request must acknowledge it.
    last_assigned: HashMap<Address, TaskIndex>,
    retired: HashSet<Address>,
    stats: RunStats,
}

impl<T: Transport> Coordinator<T> {
    /// Build a coordinator for a pool of `workers` over `frames`.
    ///
    /// Frames must arrive with dense indices in enumeration order.
    pub fn new<I>(transport: T, workers: usize, frames: I) -> Result<Self, SchedulerError>
    where
        I: IntoIterator<Item = Frame>,
    {
        if workers == 0 {
            return Err(SchedulerError::Protocol(
                "a run needs at least one worker".to_string(),
            ));
        }

        let mut backlog = Vec::new();
        let mut shapes = Vec::new();
        for (position, frame) in frames.into_iter().enumerate() {
            if frame.index != position {
                return Err(SchedulerError::Protocol(format!(
                    "frame at position {position} carries index {}",
                    frame.index
                )));
            }
            shapes.push(frame.grid.shape());
            backlog.push(Some(frame));
        }

        let total = backlog.len();
        if total == 0 {
            warn!(workers, "no frames to schedule, every worker will be retired on first request");
        }

        Ok(Self {
            transport,
            workers,
            queue: TaskQueue::new(total),
            backlog,
            shapes,
            buffer: ResultBuffer::new(total),
            in_flight: BTreeMap::new(),
            last_assigned: HashMap::new(),
            retired: HashSet::new(),
            stats: RunStats::new(total, workers),
        })
    }

    pub fn tasks_total(&self) -> usize {
        self.backlog.len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Run until every worker has been retired, then return the ordered results.
    #[instrument(skip_all, fields(tasks = self.backlog.len(), workers = self.workers))]
    pub async fn run(mut self) -> Result<RunOutcome, SchedulerError> {
        let started = Instant::now();
        info!("coordinator started");

        while self.retired.len() < self.workers {
            self.dispatch().await?;
            self.drain()?;
        }

        self.stats.finish(started.elapsed());
        let stats = self.stats;
        let frames = self.buffer.into_frames()?;

        info!(
            collected = stats.collected,
            final_drain = stats.collected_in_final_drain,
            elapsed_ms = stats.elapsed_ms,
            "coordinator finished"
        );
        Ok(RunOutcome { frames, stats })
    }

    /// Wait for one task request and answer it.
    async fn dispatch(&mut self) -> Result<(), SchedulerError> {
        let envelope = self.transport.recv(Source::Any, TASK_REQUEST).await?;
        let worker = envelope.source;
        let request: TaskRequest = envelope.message.decode()?;
        self.check_request(worker, &request)?;

        let correlation = envelope.message.correlation_id;
        match self.queue.pop() {
            Some(index) => self.assign(worker, index, correlation).await,
            None => self.retire(worker, correlation).await,
        }
    }

    fn check_request(&self, worker: Address, request: &TaskRequest) -> Result<(), SchedulerError> {
        if worker.is_coordinator() || worker.rank() as usize > self.workers {
            return Err(SchedulerError::Protocol(format!(
                "task request from unexpected {worker}"
            )));
        }
        if self.retired.contains(&worker) {
            return Err(SchedulerError::Protocol(format!(
                "{worker} requested work after being retired"
            )));
        }
        let expected = self.last_assigned.get(&worker).copied();
        if request.last_submitted != expected {
            return Err(SchedulerError::Protocol(format!(
                "{worker} acknowledged {:?} but was last assigned {:?}",
                request.last_submitted, expected
            )));
        }
        Ok(())
    }

    async fn assign(
        &mut self,
        worker: Address,
        index: TaskIndex,
        correlation: Uuid,
    ) -> Result<(), SchedulerError> {
        let frame = self
            .backlog
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| SchedulerError::Protocol(format!("task {index} dispatched twice")))?;

        let reply = Message::with_correlation(TASK_RESPONSE, &Assignment::Task(frame), correlation)?;
        self.transport.send(worker, reply).await?;

        self.in_flight.insert(index, worker);
        self.last_assigned.insert(worker, index);
        self.stats.record_dispatch(worker);
        debug!(worker = %worker, index, remaining = self.queue.len(), "dispatched task");
        Ok(())
    }

    /// Collect everything `worker` still owes, then tell it to stop.
    async fn retire(&mut self, worker: Address, correlation: Uuid) -> Result<(), SchedulerError> {
        while self.has_in_flight(worker) {
            debug!(worker = %worker, "waiting for final submission");
            let envelope = self
                .transport
                .recv(Source::Exact(worker), PROCESSED_FRAME)
                .await?;
            self.collect(envelope, true)?;
        }

        let reply = Message::with_correlation(TASK_RESPONSE, &Assignment::Done, correlation)?;
        self.transport.send(worker, reply).await?;
        self.retired.insert(worker);

        info!(
            worker = %worker,
            retired = self.retired.len(),
            workers = self.workers,
            "worker retired"
        );
        Ok(())
    }

    /// Take every result that is already waiting. Never blocks.
    fn drain(&mut self) -> Result<usize, SchedulerError> {
        let mut drained = 0;
        while let Some(envelope) = self.transport.try_recv(Source::Any, PROCESSED_FRAME)? {
            self.collect(envelope, false)?;
            drained += 1;
        }
        if drained > 0 {
            debug!(drained, filled = self.buffer.filled(), "drained results");
        }
        Ok(drained)
    }

    fn collect(&mut self, envelope: Envelope, final_drain: bool) -> Result<(), SchedulerError> {
        let worker = envelope.source;
        let ProcessedFrame { frame } = envelope.message.decode()?;
        let index = frame.index;

        match self.in_flight.get(&index) {
            Some(owner) if *owner == worker => {}
            Some(owner) => {
                return Err(SchedulerError::Protocol(format!(
                    "{worker} submitted task {index} which was assigned to {owner}"
                )));
            }
            None if index >= self.buffer.len() => {
                return Err(BufferError::OutOfRange {
                    index,
                    len: self.buffer.len(),
                }
                .into());
            }
            None if self.buffer.get(index).is_some() => {
                return Err(BufferError::AlreadyFilled(index).into());
            }
            None => {
                return Err(SchedulerError::Protocol(format!(
                    "{worker} submitted task {index} which was never dispatched"
                )));
            }
        }

        let expected = self.shapes.get(index).copied();
        if expected != Some(frame.grid.shape()) {
            return Err(SchedulerError::Protocol(format!(
                "{worker} returned task {index} as {:?}, expected {expected:?}",
                frame.grid.shape()
            )));
        }

        self.buffer.fill(frame)?;
        self.in_flight.remove(&index);
        self.stats.record_collect(final_drain);
        debug!(worker = %worker, index, final_drain, "collected result");
        Ok(())
    }

    fn has_in_flight(&self, worker: Address) -> bool {
        self.in_flight.values().any(|owner| *owner == worker)
    }
}
