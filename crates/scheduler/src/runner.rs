//! Wiring a run together: dataset, transform, transport, coordinator and workers.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use tessera_core::dataset::{load_table, ramp};
use tessera_core::{CoreError, FrameLayout, FrameProcessor, FrameSource, Grid, HalveOffsetClamp};
use tessera_transport::{Address, Endpoint, LocalMesh, ZmqHub, ZmqSpoke};

use crate::config::{DatasetConfig, ProcessingConfig};
use crate::coordinator::{Coordinator, RunOutcome};
use crate::error::SchedulerError;
use crate::worker::{FrameWorker, WorkerReport};

/// Result of a completed run plus what is needed to present it.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub layout: FrameLayout,
    /// Per-worker summaries, by address. Empty when workers ran elsewhere.
    pub workers: Vec<WorkerReport>,
}

/// Read the configured table, or generate the ramp dataset.
pub fn load_dataset(config: &DatasetConfig) -> Result<Grid, CoreError> {
    match &config.path {
        Some(path) => {
            info!(path = %path.display(), "loading dataset");
            load_table(path)
        }
        None => Ok(ramp(config.rows, config.cols)),
    }
}

pub fn build_processor(config: &ProcessingConfig) -> Arc<dyn FrameProcessor> {
    Arc::new(HalveOffsetClamp::with_latency(config.latency()))
}

/// Coordinator and `workers` workers as tasks in this process, over a [`LocalMesh`].
///
/// If any worker fails the mesh is closed so the coordinator stops too, and
/// the worker's error is returned.
pub async fn run_local(
    dataset: &Grid,
    window: (usize, usize),
    workers: usize,
    processor: Arc<dyn FrameProcessor>,
) -> Result<RunReport, SchedulerError> {
    let source = FrameSource::new(dataset, window);
    let layout = source.layout();
    let mesh = LocalMesh::with_workers(workers);
    let coordinator = Coordinator::new(mesh.endpoint(Address::COORDINATOR)?, workers, source)?;

    let mut pool = JoinSet::new();
    for n in 0..workers {
        let endpoint = mesh.endpoint(Address::worker(worker_number(n)?))?;
        pool.spawn(FrameWorker::new(endpoint, Arc::clone(&processor)).run());
    }
    info!(workers, tasks = coordinator.tasks_total(), "in-process run starting");

    let run = coordinator.run();
    tokio::pin!(run);

    let mut reports = Vec::with_capacity(workers);
    let mut failure: Option<SchedulerError> = None;

    let outcome = loop {
        tokio::select! {
            result = &mut run => break result,
            Some(joined) = pool.join_next() => {
                if let Some(e) = collect_worker(joined, &mut reports) {
                    error!(error = %e, "worker failed, stopping run");
                    mesh.close("worker failed");
                    failure.get_or_insert(e);
                }
            }
        }
    };

    if outcome.is_err() {
        mesh.close("coordinator stopped");
    }
    while let Some(joined) = pool.join_next().await {
        if let Some(e) = collect_worker(joined, &mut reports) {
            failure.get_or_insert(e);
        }
    }

    // A worker failure is the root cause of any coordinator error that follows it.
    if let Some(e) = failure {
        return Err(e);
    }
    let outcome = outcome?;
    reports.sort_by_key(|r| r.address);

    Ok(RunReport {
        outcome,
        layout,
        workers: reports,
    })
}

fn collect_worker(
    joined: Result<Result<WorkerReport, SchedulerError>, tokio::task::JoinError>,
    reports: &mut Vec<WorkerReport>,
) -> Option<SchedulerError> {
    match joined {
        Ok(Ok(report)) => {
            reports.push(report);
            None
        }
        Ok(Err(e)) => Some(e),
        Err(e) => Some(SchedulerError::Worker(format!("worker task aborted: {e}"))),
    }
}

fn worker_number(n: usize) -> Result<u32, SchedulerError> {
    u32::try_from(n).map_err(|_| SchedulerError::Protocol(format!("worker {n} has no address")))
}

/// Coordinator side of a multi-process run: bind the hub and serve `workers` spokes.
pub async fn run_hub(
    endpoint: &Endpoint,
    dataset: &Grid,
    window: (usize, usize),
    workers: usize,
) -> Result<RunReport, SchedulerError> {
    let source = FrameSource::new(dataset, window);
    let layout = source.layout();
    let hub = Arc::new(ZmqHub::bind(endpoint).await?);
    let coordinator = Coordinator::new(Arc::clone(&hub), workers, source)?;
    info!(%endpoint, workers, tasks = coordinator.tasks_total(), "hub run starting");

    let outcome = coordinator.run().await;

    // Flush the final Done replies before the socket goes away.
    match Arc::try_unwrap(hub) {
        Ok(hub) => hub.shutdown().await,
        Err(_) => warn!("hub still referenced, skipping flush"),
    }

    Ok(RunReport {
        outcome: outcome?,
        layout,
        workers: Vec::new(),
    })
}

/// Worker side of a multi-process run. `rank` starts at 1.
pub async fn run_spoke(
    endpoint: &Endpoint,
    rank: u32,
    processor: Arc<dyn FrameProcessor>,
) -> Result<WorkerReport, SchedulerError> {
    let address = Address(rank);
    if address.is_coordinator() {
        return Err(SchedulerError::Protocol(
            "rank 0 is the coordinator, worker ranks start at 1".into(),
        ));
    }
    let spoke = Arc::new(ZmqSpoke::connect(endpoint, address).await?);
    let report = FrameWorker::new(Arc::clone(&spoke), processor).run().await;

    match Arc::try_unwrap(spoke) {
        Ok(spoke) => spoke.shutdown().await,
        Err(_) => warn!(worker = %address, "spoke still referenced, skipping flush"),
    }
    report
}
