//! Debounced, stale-safe front end to the [`ImageProcessor`].
//!
//! Parameter changes arrive at UI speed. The coordinator collapses bursts
//! behind a debounce timer, remembers which request is the latest, and only
//! lets that request's outcome touch the session. Everything a preview needs
//! is published as a [`SessionSnapshot`] on a watch channel.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use retro_raster::RasterImage;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ErrorNotice;
use crate::models::{ProcessingOutcome, ProcessingParameters, ProgressUpdate, RequestId};

use super::ImageProcessor;

/// Delay used by [`ProcessingCoordinator::request`] unless configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Where the session's work stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// A debounce timer is running.
    Pending,
    /// The latest request is on the worker.
    InFlight(RequestId),
}

/// Published state of a processing session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Most recent successful output. Kept across failures.
    pub processed: Option<Arc<RasterImage>>,
    pub error: Option<ErrorNotice>,
    /// Progress of the latest request, 0-100.
    pub progress: u8,
    /// Requests submitted by this session and not yet resolved.
    pub active_requests: usize,
    /// Parameters that produced `processed`.
    pub applied: Option<ProcessingParameters>,
}

#[derive(Default)]
struct CoordinatorState {
    /// Image and parameters of the last scheduled run.
    target: Option<(Arc<RasterImage>, ProcessingParameters)>,
    timer: Option<JoinHandle<()>>,
    epoch: u64,
    in_flight: HashSet<RequestId>,
    latest: Option<RequestId>,
    processed: Option<Arc<RasterImage>>,
    error: Option<ErrorNotice>,
    progress: u8,
    /// Source image and parameters that produced `processed`.
    applied_source: Option<Arc<RasterImage>>,
    applied: Option<ProcessingParameters>,
}

impl CoordinatorState {
    fn phase(&self) -> SessionPhase {
        if self.timer.is_some() {
            return SessionPhase::Pending;
        }
        match &self.latest {
            Some(id) if self.in_flight.contains(id) => SessionPhase::InFlight(id.clone()),
            _ => SessionPhase::Idle,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            processed: self.processed.clone(),
            error: self.error.clone(),
            progress: self.progress,
            active_requests: self.in_flight.len(),
            applied: self.applied,
        }
    }

    /// Abort the debounce timer and forget the target.
    fn clear_pending(&mut self) -> bool {
        self.epoch += 1;
        self.target = None;
        match self.timer.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }
}

struct Inner {
    processor: Arc<ImageProcessor>,
    debounce: Duration,
    state: Mutex<CoordinatorState>,
    snapshots: watch::Sender<SessionSnapshot>,
}

/// One processing session on top of a shared [`ImageProcessor`].
///
/// Must be used inside a Tokio runtime.
pub struct ProcessingCoordinator {
    inner: Arc<Inner>,
}

impl ProcessingCoordinator {
    pub fn new(processor: Arc<ImageProcessor>) -> Self {
        Self::with_debounce(processor, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(processor: Arc<ImageProcessor>, debounce: Duration) -> Self {
        let (snapshots, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                processor,
                debounce,
                state: Mutex::new(CoordinatorState::default()),
                snapshots,
            }),
        }
    }

    /// Schedule `image` with `params` after the default debounce delay.
    ///
    /// Returns false when the same image and parameters are already
    /// scheduled, in flight or applied. Returning to the applied parameters
    /// also drops any pending or in-flight request for other parameters.
    pub fn request(&self, image: Arc<RasterImage>, params: ProcessingParameters) -> bool {
        self.request_with_delay(image, params, self.inner.debounce)
    }

    /// Like [`request`](Self::request) with an explicit delay.
    ///
    /// Restarts the timer; any earlier pending request is dropped unrun.
    /// A different image `Arc` always counts as a change.
    pub fn request_with_delay(
        &self,
        image: Arc<RasterImage>,
        params: ProcessingParameters,
        delay: Duration,
    ) -> bool {
        let mut state = self.inner.lock();

        let unchanged = state
            .target
            .as_ref()
            .is_some_and(|(current, p)| Arc::ptr_eq(current, &image) && *p == params);
        if unchanged {
            tracing::debug!(?params, "Parameters unchanged, skipping");
            return false;
        }

        let already_applied = state.applied == Some(params)
            && state
                .applied_source
                .as_ref()
                .is_some_and(|source| Arc::ptr_eq(source, &image));
        if already_applied {
            // Back to what is on screen: drop whatever was heading elsewhere.
            state.clear_pending();
            self.inner.cancel_in_flight(&mut state);
            state.target = Some((image, params));
            state.progress = 100;
            tracing::debug!(?params, "Parameters already applied, skipping");
            self.inner.publish(&state);
            return false;
        }

        state.clear_pending();
        state.target = Some((Arc::clone(&image), params));
        let epoch = state.epoch;

        let inner = Arc::downgrade(&self.inner);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            Inner::fire(inner, epoch, image, params).await;
        }));

        self.inner.publish(&state);
        true
    }

    /// Cancel the pending timer and every in-flight request of this session.
    ///
    /// In-flight requests resolve as cancelled; their late results are
    /// ignored. Returns how many requests were cancelled, counting a pending
    /// timer as one.
    pub fn cancel_all(&self) -> usize {
        let mut state = self.inner.lock();
        let cancelled =
            usize::from(state.clear_pending()) + self.inner.cancel_in_flight(&mut state);
        state.progress = 0;

        if cancelled > 0 {
            tracing::info!(cancelled, "Cancelled session processing");
        }
        self.inner.publish(&state);
        cancelled
    }

    /// Dismiss the current error notice.
    pub fn clear_error(&self) {
        let mut state = self.inner.lock();
        state.error = None;
        self.inner.publish(&state);
    }

    /// Cancel everything and drop the processed image.
    pub fn reset(&self) {
        self.cancel_all();
        let mut state = self.inner.lock();
        state.processed = None;
        state.error = None;
        state.applied_source = None;
        state.applied = None;
        self.inner.publish(&state);
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshots.borrow().clone()
    }
}

impl Drop for ProcessingCoordinator {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &CoordinatorState) {
        self.snapshots.send_replace(state.snapshot());
    }

    /// Resolve this session's in-flight requests as cancelled.
    fn cancel_in_flight(&self, state: &mut CoordinatorState) -> usize {
        let ids: Vec<_> = state.in_flight.drain().collect();
        for id in &ids {
            self.processor.cancel(id);
        }
        state.latest = None;
        ids.len()
    }

    /// Debounce timer elapsed: submit and wait for the outcome.
    async fn fire(
        inner: Weak<Inner>,
        epoch: u64,
        image: Arc<RasterImage>,
        params: ProcessingParameters,
    ) {
        let ticket = {
            let Some(this) = inner.upgrade() else {
                return;
            };
            let mut state = this.lock();
            if state.epoch != epoch {
                return;
            }
            // From here on the task must not be aborted by a later request.
            state.timer = None;

            let progress_target = inner.clone();
            let ticket = this
                .processor
                .submit((*image).clone(), params, move |update| {
                    if let Some(this) = progress_target.upgrade() {
                        this.on_progress(update);
                    }
                });

            tracing::debug!(id = %ticket.id(), ?params, "Submitted request");
            state.in_flight.insert(ticket.id().clone());
            state.latest = Some(ticket.id().clone());
            state.progress = 0;
            this.publish(&state);
            ticket
        };

        let id = ticket.id().clone();
        let outcome = ticket.outcome().await;

        if let Some(this) = inner.upgrade() {
            this.complete(id, image, params, outcome);
        }
    }

    fn on_progress(&self, update: ProgressUpdate) {
        let mut state = self.lock();
        if state.latest.as_ref() != Some(&update.id) || !state.in_flight.contains(&update.id) {
            return;
        }
        state.progress = update.progress;
        self.publish(&state);
    }

    fn complete(
        &self,
        id: RequestId,
        source: Arc<RasterImage>,
        params: ProcessingParameters,
        outcome: ProcessingOutcome,
    ) {
        let mut state = self.lock();

        if !state.in_flight.remove(&id) {
            tracing::debug!(id = %id, "Ignoring outcome of cancelled request");
            return;
        }

        if state.latest.as_ref() != Some(&id) {
            tracing::debug!(id = %id, "Discarding stale outcome");
            self.publish(&state);
            return;
        }

        match outcome {
            ProcessingOutcome::Success { image } => {
                state.processed = Some(Arc::new(image));
                state.error = None;
                state.applied_source = Some(source);
                state.applied = Some(params);
                state.progress = 100;
            }
            ProcessingOutcome::Failure { reason, detail } => {
                tracing::warn!(id = %id, ?reason, %detail, "Processing failed");
                state.error = Some(ErrorNotice::new(reason, detail));
                state.progress = 0;
                // Allow the same request to be retried.
                if state.timer.is_none() {
                    state.target = None;
                }
            }
            ProcessingOutcome::Cancelled => {
                state.progress = 0;
                if state.timer.is_none() {
                    state.target = None;
                }
            }
        }

        self.publish(&state);
    }
}
