//! The isolated worker thread.
//!
//! The worker owns nothing but its channels and a pipeline. It runs
//! requests one at a time in arrival order and answers on the response
//! channel. Pipeline panics are caught per request. When the thread itself
//! goes away without the host asking, the response channel closes and the
//! host treats that as the fault signal.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::PipelineError;
use crate::models::{WorkerRequest, WorkerResponse};

use super::Pipeline;

/// Host-side handle to one worker generation.
pub(crate) struct WorkerHandle {
    pub generation: u64,
    requests: Sender<WorkerRequest>,
    _thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn a worker thread for `generation`.
    pub fn spawn(
        generation: u64,
        pipeline: Arc<dyn Pipeline>,
        responses: UnboundedSender<WorkerResponse>,
    ) -> std::io::Result<Self> {
        let (requests, inbox) = std::sync::mpsc::channel();
        let thread = std::thread::Builder::new()
            .name(format!("pipeline-worker-{generation}"))
            .spawn(move || run(pipeline.as_ref(), inbox, responses))?;

        tracing::info!(generation, "Pipeline worker started");

        Ok(Self {
            generation,
            requests,
            _thread: thread,
        })
    }

    /// Queue a request. Fails if the worker thread is gone.
    pub fn send(&self, request: WorkerRequest) -> Result<(), WorkerRequest> {
        self.requests.send(request).map_err(|e| e.0)
    }
}

/// Worker loop. Returns when the host drops its request sender or asks it
/// to terminate.
///
/// A panic inside the pipeline fails only the request that caused it.
pub(crate) fn run(
    pipeline: &dyn Pipeline,
    inbox: Receiver<WorkerRequest>,
    responses: UnboundedSender<WorkerResponse>,
) {
    while let Ok(request) = inbox.recv() {
        let (id, image, params) = match request {
            WorkerRequest::Process { id, image, params } => (id, image, params),
            WorkerRequest::Terminate => {
                tracing::debug!("Worker terminating");
                break;
            }
        };

        tracing::debug!(id = %id, ?params, "Worker processing request");

        let mut report = |progress| {
            // A closed channel here means the host is gone; the terminal
            // send below notices and ends the loop.
            let _ = responses.send(WorkerResponse::Progress {
                id: id.clone(),
                progress,
            });
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pipeline.run(&image, &params, &mut report)
        }))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!(id = %id, %message, "Pipeline panicked");
            Err(PipelineError::Unknown(message))
        });

        let response = match result {
            Ok(image) => WorkerResponse::Result { id, image },
            Err(e) => {
                tracing::debug!(id = %id, error = %e, "Pipeline rejected request");
                WorkerResponse::Error {
                    id,
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        };

        if responses.send(response).is_err() {
            break;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "pipeline panicked".to_string())
}
