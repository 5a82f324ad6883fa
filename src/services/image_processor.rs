//! Host side of the pipeline worker.
//!
//! [`ImageProcessor`] owns one long-lived worker thread and a map of
//! pending requests keyed by id. A dispatcher task routes worker responses
//! to the matching request; every request resolves exactly once, either
//! from the worker or locally through cancellation or a worker fault.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use retro_raster::RasterImage;
use tokio::sync::{mpsc, oneshot};

use crate::error::ErrorKind;
use crate::models::{
    ProcessingOutcome, ProcessingParameters, ProgressUpdate, RequestId, WorkerRequest,
    WorkerResponse,
};

use super::worker::WorkerHandle;
use super::{DegradePipeline, Pipeline};

/// Detail attached to requests lost in a worker crash.
pub const WORKER_FAULT_DETAIL: &str = "Worker error occurred";

type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Handle to a submitted request.
#[derive(Debug)]
pub struct ProcessingTicket {
    id: RequestId,
    outcome: oneshot::Receiver<ProcessingOutcome>,
}

impl ProcessingTicket {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Wait for the terminal outcome.
    pub async fn outcome(self) -> ProcessingOutcome {
        // The sender only disappears without a value if the processor itself
        // was torn down, which cancels everything.
        self.outcome.await.unwrap_or(ProcessingOutcome::Cancelled)
    }
}

struct PendingRequest {
    outcome: oneshot::Sender<ProcessingOutcome>,
    on_progress: ProgressCallback,
    last_progress: u8,
}

#[derive(Default)]
struct ProcessorState {
    pending: HashMap<RequestId, PendingRequest>,
    worker: Option<WorkerHandle>,
    generation: u64,
    shut_down: bool,
}

struct Shared {
    state: Mutex<ProcessorState>,
    pipeline: Arc<dyn Pipeline>,
}

/// Runs [`Pipeline`] requests on a dedicated worker thread.
///
/// Must be created inside a Tokio runtime. Any number of requests may be in
/// flight at once; the worker handles them in submission order.
pub struct ImageProcessor {
    shared: Arc<Shared>,
}

impl ImageProcessor {
    /// Processor running the production [`DegradePipeline`].
    pub fn new() -> Self {
        Self::with_pipeline(DegradePipeline::new())
    }

    pub fn with_pipeline(pipeline: impl Pipeline + 'static) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(ProcessorState::default()),
            pipeline: Arc::new(pipeline),
        });

        {
            let mut state = shared.lock();
            if let Err(e) = shared.spawn_worker(&mut state) {
                // Retried on the next submit.
                tracing::error!(error = %e, "Failed to start pipeline worker");
            }
        }

        Self { shared }
    }

    /// Queue `image` for processing.
    ///
    /// `on_progress` is called from the dispatcher task with non-decreasing
    /// milestones, always before the outcome resolves.
    pub fn submit<F>(
        &self,
        image: RasterImage,
        params: ProcessingParameters,
        on_progress: F,
    ) -> ProcessingTicket
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        let id = RequestId::generate();
        let (tx, rx) = oneshot::channel();
        let ticket = ProcessingTicket {
            id: id.clone(),
            outcome: rx,
        };

        let mut state = self.shared.lock();

        if state.shut_down {
            let _ = tx.send(ProcessingOutcome::Failure {
                reason: ErrorKind::WorkerFault,
                detail: "Image processor has been shut down".to_string(),
            });
            return ticket;
        }

        if state.worker.is_none() {
            if let Err(e) = self.shared.spawn_worker(&mut state) {
                tracing::error!(error = %e, "Failed to start pipeline worker");
                let _ = tx.send(ProcessingOutcome::Failure {
                    reason: ErrorKind::WorkerFault,
                    detail: e.to_string(),
                });
                return ticket;
            }
        }

        state.pending.insert(
            id.clone(),
            PendingRequest {
                outcome: tx,
                on_progress: Arc::new(on_progress),
                last_progress: 0,
            },
        );

        let request = WorkerRequest::Process {
            id: id.clone(),
            image,
            params,
        };
        let sent = state
            .worker
            .as_ref()
            .map(|worker| worker.send(request).is_ok())
            .unwrap_or(false);

        if sent {
            tracing::debug!(id = %id, ?params, "Dispatched request to worker");
        } else if let Some(pending) = state.pending.remove(&id) {
            // The worker died between spawn and send; the dispatcher will
            // notice the closed channel and respawn.
            let _ = pending.outcome.send(ProcessingOutcome::Failure {
                reason: ErrorKind::WorkerFault,
                detail: WORKER_FAULT_DETAIL.to_string(),
            });
        }

        ticket
    }

    /// Submit and wait, without progress reporting.
    pub async fn process(
        &self,
        image: RasterImage,
        params: ProcessingParameters,
    ) -> ProcessingOutcome {
        self.submit(image, params, |_| {}).outcome().await
    }

    /// Resolve a pending request as cancelled.
    ///
    /// The worker is not interrupted; its eventual response is dropped.
    /// Returns false if the request already resolved.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let Some(pending) = self.shared.lock().pending.remove(id) else {
            return false;
        };
        tracing::debug!(id = %id, "Cancelled request");
        let _ = pending.outcome.send(ProcessingOutcome::Cancelled);
        true
    }

    /// Cancel every pending request. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.shared.lock().pending.drain().collect();
        let count = drained.len();
        for (_, pending) in drained {
            let _ = pending.outcome.send(ProcessingOutcome::Cancelled);
        }
        if count > 0 {
            tracing::info!(count, "Cancelled all pending requests");
        }
        count
    }

    /// Number of requests awaiting an outcome.
    pub fn processing_count(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Generation of the current worker thread; bumps on every respawn.
    pub fn worker_generation(&self) -> u64 {
        self.shared.lock().generation
    }

    /// Stop the worker thread abruptly, as a crash would.
    ///
    /// Requests queued behind the stop fail with
    /// [`ErrorKind::WorkerFault`] and a new worker generation starts.
    pub fn terminate_worker(&self) {
        let state = self.shared.lock();
        if let Some(worker) = &state.worker {
            tracing::warn!(generation = worker.generation, "Terminating pipeline worker");
            let _ = worker.send(WorkerRequest::Terminate);
        }
    }

    /// Cancel everything and stop the worker. Later submits fail.
    pub fn shutdown(&self) {
        let drained: Vec<_> = {
            let mut state = self.shared.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.worker = None;
            state.pending.drain().collect()
        };
        for (_, pending) in drained {
            let _ = pending.outcome.send(ProcessingOutcome::Cancelled);
        }
        tracing::info!("Image processor shut down");
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ImageProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ProcessorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new worker generation with its own dispatcher task.
    fn spawn_worker(self: &Arc<Self>, state: &mut ProcessorState) -> std::io::Result<()> {
        let generation = state.generation + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = WorkerHandle::spawn(generation, Arc::clone(&self.pipeline), tx)?;

        state.generation = generation;
        state.worker = Some(worker);
        tokio::spawn(dispatch(Arc::downgrade(self), generation, rx));
        Ok(())
    }

    fn handle_response(&self, response: WorkerResponse) {
        let mut state = self.lock();
        match response {
            WorkerResponse::Progress { id, progress } => {
                let Some(pending) = state.pending.get_mut(&id) else {
                    tracing::debug!(id = %id, progress, "Dropping progress for unknown request");
                    return;
                };
                if progress < pending.last_progress {
                    return;
                }
                pending.last_progress = progress;
                let on_progress = Arc::clone(&pending.on_progress);
                drop(state);
                on_progress(ProgressUpdate::new(id, progress));
            }
            WorkerResponse::Result { id, image } => {
                Self::resolve(&mut state, id, ProcessingOutcome::Success { image });
            }
            WorkerResponse::Error { id, kind, message } => {
                Self::resolve(
                    &mut state,
                    id,
                    ProcessingOutcome::Failure {
                        reason: kind,
                        detail: message,
                    },
                );
            }
        }
    }

    fn resolve(state: &mut ProcessorState, id: RequestId, outcome: ProcessingOutcome) {
        match state.pending.remove(&id) {
            Some(pending) => {
                tracing::debug!(id = %id, success = outcome.is_success(), "Request completed");
                let _ = pending.outcome.send(outcome);
            }
            None => {
                tracing::debug!(id = %id, "Dropping late response for unknown request");
            }
        }
    }

    /// The response channel of `generation` closed.
    fn handle_worker_exit(self: &Arc<Self>, generation: u64) {
        let mut state = self.lock();
        let current = state.worker.as_ref().map(|w| w.generation);
        if state.shut_down || current != Some(generation) {
            return;
        }

        let failed: Vec<_> = state.pending.drain().collect();
        tracing::error!(
            generation,
            failed_requests = failed.len(),
            "Pipeline worker died, restarting"
        );
        for (_, pending) in failed {
            let _ = pending.outcome.send(ProcessingOutcome::Failure {
                reason: ErrorKind::WorkerFault,
                detail: WORKER_FAULT_DETAIL.to_string(),
            });
        }

        state.worker = None;
        if let Err(e) = self.spawn_worker(&mut state) {
            tracing::error!(error = %e, "Failed to restart pipeline worker");
        }
    }
}

async fn dispatch(
    shared: Weak<Shared>,
    generation: u64,
    mut responses: mpsc::UnboundedReceiver<WorkerResponse>,
) {
    while let Some(response) = responses.recv().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        shared.handle_response(response);
    }

    if let Some(shared) = shared.upgrade() {
        shared.handle_worker_exit(generation);
    }
}
