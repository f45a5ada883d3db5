//! Submission lifecycle controller.
//!
//! Owns the single `RunState` cell and publishes every transition to presentation layers
//! through a `watch` channel. Nothing else holds the sender.

use crate::engine::{run_request, ExecutionBackend};
use crate::model::{ExecutionRequest, RunState};
use anyhow::Result;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Submit(ExecutionRequest),
    Quit,
}

pub struct SubmissionController<B> {
    backend: Arc<B>,
    state_tx: Arc<watch::Sender<RunState>>,
    next_id: Arc<AtomicU64>,
}

impl<B> Clone for SubmissionController<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            state_tx: self.state_tx.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<B> SubmissionController<B>
where
    B: ExecutionBackend + 'static,
{
    pub fn new(backend: B) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);
        Self {
            backend: Arc::new(backend),
            state_tx: Arc::new(state_tx),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Read-only view of the state cell.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    pub fn current(&self) -> RunState {
        self.state_tx.borrow().clone()
    }

    /// Run one submission to completion and return the state it settled into.
    pub async fn submit(&self, request: ExecutionRequest) -> RunState {
        self.start(request).await
    }

    /// Publish `Pending` before returning, then hand back the future that performs the
    /// request and settles the cell. The future owns everything it needs and can be spawned.
    pub fn start(
        &self,
        request: ExecutionRequest,
    ) -> impl Future<Output = RunState> + Send + 'static {
        let id = self.begin(&request);
        let this = self.clone();
        async move { this.settle(id, request).await }
    }

    fn begin(&self, request: &ExecutionRequest) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let previous = self.state_tx.send_replace(RunState::Pending);
        tracing::info!(
            submission = id,
            language = request.language.as_str(),
            code_len = request.code.len(),
            previous = previous.label(),
            superseded = previous.is_pending(),
            "submission started"
        );
        id
    }

    async fn settle(&self, id: u64, request: ExecutionRequest) -> RunState {
        let next = match run_request(self.backend.as_ref(), &request).await {
            Ok(artifact) => {
                tracing::info!(
                    submission = id,
                    kind = artifact.kind(),
                    bytes = artifact.size_bytes(),
                    "submission succeeded"
                );
                RunState::Succeeded(artifact)
            }
            Err(e) => {
                tracing::warn!(submission = id, error = %e, "submission failed");
                RunState::Failed(e.to_error_info())
            }
        };
        // Whichever submission settles last wins; there is no ordering between in-flight calls.
        self.state_tx.send_replace(next.clone());
        next
    }
}

/// Drive submissions from UI commands until the UI quits or hangs up.
pub(crate) async fn run_controller<B>(
    controller: SubmissionController<B>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()>
where
    B: ExecutionBackend + 'static,
{
    let mut in_flight: JoinSet<RunState> = JoinSet::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Submit(request)) => {
                        in_flight.spawn(controller.start(request));
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some(joined) = in_flight.join_next() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "submission task failed to join");
                }
            }
        }
    }

    if !in_flight.is_empty() {
        tracing::debug!(
            count = in_flight.len(),
            state = controller.current().label(),
            "dropping in-flight submissions on shutdown"
        );
    }
    Ok(())
}
