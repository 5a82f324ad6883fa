//! Coordinator tests: debouncing, stale suppression, cancellation and error
//! surfacing.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fixtures, wait_for_snapshot, CountingPipeline, PanicOn, SlowPipeline};
use pretty_assertions::assert_eq;
use ps1tex::error::ErrorKind;
use ps1tex::models::ProcessingParameters;
use ps1tex::services::{ImageProcessor, Pipeline, ProcessingCoordinator, SessionPhase};
use retro_raster::RasterImage;

const DEBOUNCE: Duration = Duration::from_millis(50);

fn coordinator(pipeline: impl Pipeline + 'static) -> ProcessingCoordinator {
    ProcessingCoordinator::with_debounce(Arc::new(ImageProcessor::with_pipeline(pipeline)), DEBOUNCE)
}

fn source() -> Arc<RasterImage> {
    Arc::new(fixtures::quadrants(128))
}

#[tokio::test]
async fn test_debounce_collapses_burst() {
    let (pipeline, runs) = CountingPipeline::new();
    let coordinator = coordinator(pipeline);
    let mut rx = coordinator.subscribe();
    let image = source();

    let last = ProcessingParameters::new(32, 8, true);
    assert!(coordinator.request(Arc::clone(&image), ProcessingParameters::new(64, 16, false)));
    assert!(coordinator.request(Arc::clone(&image), ProcessingParameters::new(48, 16, false)));
    assert!(coordinator.request(Arc::clone(&image), last));
    assert_eq!(coordinator.snapshot().phase, SessionPhase::Pending);

    let snapshot = wait_for_snapshot(&mut rx, |s| s.applied.is_some()).await;
    assert_eq!(snapshot.applied, Some(last));
    assert_eq!(snapshot.processed.as_ref().unwrap().width(), 32);

    // Give any superseded timer a chance to misfire.
    tokio::time::sleep(DEBOUNCE * 3).await;
    assert_eq!(*runs.lock().unwrap(), vec![last]);
}

#[tokio::test]
async fn test_success_publishes_result() {
    let coordinator = coordinator(CountingPipeline::default());
    let mut rx = coordinator.subscribe();

    coordinator.request(source(), ProcessingParameters::new(32, 4, false));
    let snapshot = wait_for_snapshot(&mut rx, |s| s.processed.is_some()).await;

    assert_eq!(snapshot.phase, SessionPhase::Idle);
    assert_eq!(snapshot.progress, 100);
    assert_eq!(snapshot.active_requests, 0);
    assert!(snapshot.error.is_none());

    let processed = snapshot.processed.unwrap();
    assert_eq!((processed.width(), processed.height()), (32, 32));
    common::assert_color_close(processed.pixel(4, 4).unwrap(), fixtures::RED, 0);
    common::assert_color_close(processed.pixel(28, 4).unwrap(), fixtures::GREEN, 0);
    common::assert_color_close(processed.pixel(4, 28).unwrap(), fixtures::BLUE, 0);
    common::assert_color_close(processed.pixel(28, 28).unwrap(), fixtures::WHITE, 0);
}

#[tokio::test]
async fn test_identical_parameters_not_rerun() {
    let (pipeline, runs) = CountingPipeline::new();
    let coordinator = coordinator(pipeline);
    let mut rx = coordinator.subscribe();
    let image = source();
    let params = ProcessingParameters::new(64, 16, false);

    coordinator.request(Arc::clone(&image), params);
    let first = wait_for_snapshot(&mut rx, |s| s.processed.is_some())
        .await
        .processed
        .unwrap();

    assert!(!coordinator.request(Arc::clone(&image), params));
    tokio::time::sleep(DEBOUNCE * 3).await;
    assert_eq!(runs.lock().unwrap().len(), 1);

    // A freshly loaded image re-runs even with the same parameters.
    assert!(coordinator.request(source(), params));
    wait_for_snapshot(&mut rx, |s| {
        s.processed
            .as_ref()
            .is_some_and(|processed| !Arc::ptr_eq(processed, &first))
    })
    .await;
    assert_eq!(runs.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_stale_result_is_discarded() {
    let coordinator = coordinator(SlowPipeline::only_for(64, Duration::from_millis(300)));
    let mut rx = coordinator.subscribe();
    let image = source();

    let slow = ProcessingParameters::new(64, 16, false);
    let fast = ProcessingParameters::new(32, 16, false);

    coordinator.request_with_delay(Arc::clone(&image), slow, Duration::ZERO);
    wait_for_snapshot(&mut rx, |s| matches!(s.phase, SessionPhase::InFlight(_))).await;

    coordinator.request_with_delay(Arc::clone(&image), fast, Duration::ZERO);
    let snapshot = wait_for_snapshot(&mut rx, |s| s.applied.is_some()).await;

    assert_eq!(snapshot.applied, Some(fast));
    assert_eq!(snapshot.processed.as_ref().unwrap().width(), 32);
    assert_eq!(snapshot.active_requests, 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(coordinator.snapshot().applied, Some(fast));
}

#[tokio::test]
async fn test_cancel_all_is_final() {
    let coordinator = coordinator(SlowPipeline::new(Duration::from_millis(200)));
    let mut rx = coordinator.subscribe();
    let image = source();

    coordinator.request_with_delay(
        Arc::clone(&image),
        ProcessingParameters::new(64, 16, false),
        Duration::ZERO,
    );
    wait_for_snapshot(&mut rx, |s| matches!(s.phase, SessionPhase::InFlight(_))).await;
    coordinator.request(Arc::clone(&image), ProcessingParameters::new(32, 16, false));

    assert_eq!(coordinator.cancel_all(), 2);
    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.active_requests, 0);
    assert_eq!(snapshot.phase, SessionPhase::Idle);

    // Outlive the worker and the debounce window; nothing may land.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let snapshot = coordinator.snapshot();
    assert!(snapshot.processed.is_none());
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.applied, None);
}

#[tokio::test]
async fn test_failure_keeps_last_image() {
    let coordinator = coordinator(CountingPipeline::default());
    let mut rx = coordinator.subscribe();
    let image = source();

    let good = ProcessingParameters::new(32, 16, false);
    coordinator.request(Arc::clone(&image), good);
    wait_for_snapshot(&mut rx, |s| s.processed.is_some()).await;

    let bad = ProcessingParameters::new(1000, 16, false);
    coordinator.request(Arc::clone(&image), bad);
    let snapshot = wait_for_snapshot(&mut rx, |s| s.error.is_some()).await;

    let notice = snapshot.error.unwrap();
    assert_eq!(notice.kind, ErrorKind::InvalidTarget);
    assert!(notice.recoverable);
    assert_eq!(snapshot.applied, Some(good));
    assert_eq!(snapshot.processed.unwrap().width(), 32);

    // Failed parameters may be retried.
    assert!(coordinator.request(Arc::clone(&image), bad));

    coordinator.clear_error();
    assert!(coordinator.snapshot().error.is_none());
}

#[tokio::test]
async fn test_stage_panic_surfaces_unknown_failure() {
    let coordinator = coordinator(PanicOn::resolution(48));
    let mut rx = coordinator.subscribe();
    let image = source();

    coordinator.request(Arc::clone(&image), ProcessingParameters::new(48, 16, false));
    let snapshot = wait_for_snapshot(&mut rx, |s| s.error.is_some()).await;
    let notice = snapshot.error.unwrap();
    assert_eq!(notice.kind, ErrorKind::UnknownProcessingFailure);
    assert!(!notice.recoverable);

    coordinator.request(Arc::clone(&image), ProcessingParameters::new(32, 16, false));
    let snapshot = wait_for_snapshot(&mut rx, |s| s.processed.is_some()).await;
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_worker_fault_surfaces_and_recovers() {
    let processor = Arc::new(ImageProcessor::with_pipeline(SlowPipeline::only_for(
        64,
        Duration::from_millis(200),
    )));
    let coordinator = ProcessingCoordinator::with_debounce(Arc::clone(&processor), DEBOUNCE);
    let mut rx = coordinator.subscribe();
    let image = source();

    // Occupy the worker, then queue the session's request behind a stop.
    let blocker = processor.submit(
        fixtures::quadrants(128),
        ProcessingParameters::new(64, 16, false),
        |_| {},
    );
    processor.terminate_worker();
    coordinator.request_with_delay(
        Arc::clone(&image),
        ProcessingParameters::new(32, 16, false),
        Duration::ZERO,
    );

    let snapshot = wait_for_snapshot(&mut rx, |s| s.error.is_some()).await;
    let notice = snapshot.error.unwrap();
    assert_eq!(notice.kind, ErrorKind::WorkerFault);
    assert!(notice.recoverable);
    assert!(blocker.outcome().await.is_success());

    // Retrying the same request runs on the fresh worker.
    assert!(coordinator.request(Arc::clone(&image), ProcessingParameters::new(32, 16, false)));
    let snapshot = wait_for_snapshot(&mut rx, |s| s.processed.is_some()).await;
    assert!(snapshot.error.is_none());
    assert_eq!(processor.worker_generation(), 2);
}

#[tokio::test]
async fn test_return_to_applied_within_debounce_is_skipped() {
    let (pipeline, runs) = CountingPipeline::new();
    let coordinator = coordinator(pipeline);
    let mut rx = coordinator.subscribe();
    let image = source();

    let applied = ProcessingParameters::new(64, 16, false);
    let detour = ProcessingParameters::new(32, 16, false);

    coordinator.request(Arc::clone(&image), applied);
    wait_for_snapshot(&mut rx, |s| s.applied.is_some()).await;

    assert!(coordinator.request(Arc::clone(&image), detour));
    assert!(!coordinator.request(Arc::clone(&image), applied));
    assert_eq!(coordinator.snapshot().phase, SessionPhase::Idle);

    tokio::time::sleep(DEBOUNCE * 3).await;
    assert_eq!(*runs.lock().unwrap(), vec![applied]);
    assert_eq!(coordinator.snapshot().applied, Some(applied));
}

#[tokio::test]
async fn test_applied_parameters_not_rerun_after_failure() {
    let (pipeline, runs) = CountingPipeline::new();
    let coordinator = coordinator(pipeline);
    let mut rx = coordinator.subscribe();
    let image = source();

    let applied = ProcessingParameters::new(64, 16, false);
    coordinator.request(Arc::clone(&image), applied);
    wait_for_snapshot(&mut rx, |s| s.applied.is_some()).await;

    coordinator.request(Arc::clone(&image), ProcessingParameters::new(1000, 16, false));
    wait_for_snapshot(&mut rx, |s| s.error.is_some()).await;

    assert!(!coordinator.request(Arc::clone(&image), applied));
    tokio::time::sleep(DEBOUNCE * 3).await;
    assert_eq!(runs.lock().unwrap().len(), 2);
    assert_eq!(coordinator.snapshot().applied, Some(applied));
}

#[tokio::test]
async fn test_reset_clears_session() {
    let coordinator = coordinator(CountingPipeline::default());
    let mut rx = coordinator.subscribe();
    let image = source();
    let params = ProcessingParameters::new(32, 16, false);

    coordinator.request(Arc::clone(&image), params);
    wait_for_snapshot(&mut rx, |s| s.processed.is_some()).await;

    coordinator.reset();
    let snapshot = coordinator.snapshot();
    assert!(snapshot.processed.is_none());
    assert_eq!(snapshot.applied, None);

    // After a reset the same request runs again.
    assert!(coordinator.request(image, params));
}
