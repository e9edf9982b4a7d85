//! Full in-process runs over the local mesh.

use std::sync::Arc;
use std::time::Duration;

use tessera_core::dataset::ramp;
use tessera_core::{Frame, FrameProcessor, FrameSource, Grid, HalveOffsetClamp, Latency};
use tessera_scheduler::runner::run_local;
use tessera_scheduler::TextSink;

fn reference_processor() -> Arc<dyn FrameProcessor> {
    Arc::new(HalveOffsetClamp::new())
}

#[tokio::test]
async fn reference_run_fills_every_slot() {
    let dataset = ramp(20, 20);
    let expected: Vec<Frame> = FrameSource::new(&dataset, (4, 5))
        .map(|f| HalveOffsetClamp::new().process(&f))
        .collect();
    assert_eq!(expected.len(), 272);

    let report = run_local(&dataset, (4, 5), 4, reference_processor())
        .await
        .unwrap();

    assert_eq!(report.outcome.frames, expected);
    let stats = &report.outcome.stats;
    assert_eq!(stats.tasks_total, 272);
    assert_eq!(stats.dispatched, 272);
    assert_eq!(stats.collected, 272);
    assert_eq!(stats.per_worker.values().sum::<usize>(), 272);
    assert_eq!(report.workers.len(), 4);
}

#[tokio::test]
async fn every_pool_size_and_frame_count_completes() {
    for (rows, cols, window) in [(1, 1, (1, 1)), (3, 3, (2, 2)), (5, 7, (2, 3)), (6, 6, (1, 1))] {
        let dataset = ramp(rows, cols);
        let total = FrameSource::new(&dataset, window).len();
        for workers in 1..=5 {
            let report = run_local(&dataset, window, workers, reference_processor())
                .await
                .unwrap();
            let indices: Vec<_> = report.outcome.frames.iter().map(|f| f.index).collect();
            assert_eq!(indices, (0..total).collect::<Vec<_>>(), "W={workers} N={total}");
            assert_eq!(report.outcome.stats.dispatched, total);
        }
    }
}

#[tokio::test]
async fn window_larger_than_dataset_retires_workers_immediately() {
    let dataset = ramp(3, 3);
    let report = run_local(&dataset, (4, 4), 3, reference_processor())
        .await
        .unwrap();
    assert!(report.outcome.frames.is_empty());
    assert_eq!(report.outcome.stats.dispatched, 0);
    assert!(report.workers.iter().all(|w| w.tasks_processed == 0));
}

#[tokio::test]
async fn empty_dataset_yields_no_tasks() {
    let dataset = Grid::new(0, 0, Vec::new()).unwrap();
    let report = run_local(&dataset, (1, 1), 2, reference_processor())
        .await
        .unwrap();
    assert!(report.outcome.frames.is_empty());
    assert_eq!(report.workers.len(), 2);
}

#[tokio::test]
async fn single_worker_processes_sequentially() {
    let dataset = ramp(3, 4);
    let latency = Duration::from_millis(10);
    let processor = Arc::new(HalveOffsetClamp::with_latency(Latency::fixed(latency)));
    let total = FrameSource::new(&dataset, (2, 2)).len();

    let report = run_local(&dataset, (2, 2), 1, processor).await.unwrap();

    assert_eq!(report.outcome.frames.len(), total);
    assert_eq!(report.workers[0].tasks_processed, total);
    assert!(report.outcome.stats.elapsed() >= latency * total as u32);
    assert!(report.workers[0].busy >= latency * total as u32);
}

/// Sleeps on the first frame so later frames overtake it.
struct SlowFirst;

impl FrameProcessor for SlowFirst {
    fn name(&self) -> &str {
        "slow-first"
    }

    fn process(&self, frame: &Frame) -> Frame {
        if frame.index == 0 {
            std::thread::sleep(Duration::from_millis(80));
        }
        HalveOffsetClamp::new().process(frame)
    }
}

#[tokio::test]
async fn out_of_order_completion_lands_in_order() {
    let dataset = ramp(4, 4);
    let expected: Vec<Frame> = FrameSource::new(&dataset, (2, 2))
        .map(|f| HalveOffsetClamp::new().process(&f))
        .collect();

    let report = run_local(&dataset, (2, 2), 3, Arc::new(SlowFirst)).await.unwrap();
    assert_eq!(report.outcome.frames, expected);

    // The worker stuck on frame 0 did little else while the others drained the queue.
    let busiest = report.workers.iter().map(|w| w.tasks_processed).max().unwrap();
    assert!(busiest > 1);
}

/// Panics inside the transform.
struct Exploding;

impl FrameProcessor for Exploding {
    fn name(&self) -> &str {
        "exploding"
    }

    fn process(&self, _frame: &Frame) -> Frame {
        panic!("transform blew up");
    }
}

#[tokio::test]
async fn failing_worker_aborts_the_run() {
    let dataset = ramp(3, 3);
    let result = run_local(&dataset, (2, 2), 2, Arc::new(Exploding)).await;
    assert!(matches!(
        result,
        Err(tessera_scheduler::SchedulerError::Worker(_))
    ));
}

#[tokio::test]
async fn results_reach_the_text_sink() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.txt");
    let dataset = ramp(20, 20);

    let report = run_local(&dataset, (4, 5), 4, reference_processor())
        .await
        .unwrap();
    TextSink::new(&path)
        .write(&report.layout, &report.outcome.frames)
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("# tessera results\n# dataset 20x20, window 4x5, 272 frames\n"));
    assert!(text.contains("== reconstructed 20x20\n"));
    assert!(text.contains("== frame 271 at (16, 15)\n"));
    // The first reconstructed row is the processed first ramp row.
    assert!(text.contains("\n  10  10  11  11  12"));
}
