use super::detector::{CompletionDetector, PollOutcome};
use crate::config::ConductorConfig;
use crate::error::{BusError, WorkerError};
use crate::messaging::{InMemoryMessageBus, WorkerRequest, WorkerResponse};
use crate::platforms::{PageSurface, PlatformAdapter};
use crate::registry::{SessionRef, TargetId};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Serves submit and await requests for one live session.
#[derive(Clone)]
pub struct WorkerService {
    session: SessionRef,
    adapter: Arc<dyn PlatformAdapter>,
    page: Arc<dyn PageSurface>,
    detector: CompletionDetector,
    submit_timeout: Duration,
    await_timeout: Duration,
}

impl WorkerService {
    pub fn new(
        session: SessionRef,
        adapter: Arc<dyn PlatformAdapter>,
        page: Arc<dyn PageSurface>,
        config: &ConductorConfig,
    ) -> Self {
        Self {
            session,
            adapter,
            page,
            detector: CompletionDetector::from_config(config),
            submit_timeout: config.submit_timeout(),
            await_timeout: config.await_timeout(),
        }
    }

    pub fn session(&self) -> &SessionRef {
        &self.session
    }

    pub fn target(&self) -> &TargetId {
        self.adapter.target()
    }

    /// Inject the prompt and press send. Delivery is confirmed by the
    /// following `await_result`, not here.
    pub async fn submit(&self, prompt: &str) -> Result<(), WorkerError> {
        info!(platform = %self.target(), session = %self.session, "submitting prompt");
        let submitted = tokio::time::timeout(
            self.submit_timeout,
            self.adapter.submit(self.page.as_ref(), prompt),
        )
        .await;

        submitted.unwrap_or_else(|_| {
            warn!(platform = %self.target(), session = %self.session, "page stalled during submit");
            Err(WorkerError::SubmissionFailed {
                target: self.target().clone(),
                reason: format!(
                    "page did not respond within {}ms",
                    self.submit_timeout.as_millis()
                ),
            })
        })
    }

    pub async fn await_result(&self) -> Result<String, WorkerError> {
        self.await_result_within(self.await_timeout).await
    }

    pub async fn await_result_within(&self, timeout: Duration) -> Result<String, WorkerError> {
        let adapter = self.adapter.as_ref();
        let page = self.page.as_ref();

        match self.detector.run(timeout, move || adapter.poll_signals(page)).await {
            PollOutcome::Complete(content) => {
                info!(
                    platform = %self.target(),
                    session = %self.session,
                    len = content.len(),
                    "response harvested"
                );
                Ok(content)
            }
            PollOutcome::TimedOut { elapsed, samples } => {
                warn!(
                    platform = %self.target(),
                    session = %self.session,
                    samples,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "timed out waiting for response"
                );
                Err(WorkerError::Timeout {
                    target: self.target().clone(),
                    elapsed,
                })
            }
        }
    }

    pub async fn handle(&self, request: WorkerRequest) -> WorkerResponse {
        match request {
            WorkerRequest::ExecuteSubmit { prompt } => match self.submit(&prompt).await {
                Ok(()) => WorkerResponse::ok(None),
                Err(e) => WorkerResponse::failed(e.to_string()),
            },
            WorkerRequest::ExecuteAwait {} => match self.await_result().await {
                Ok(content) => WorkerResponse::ok(Some(serde_json::Value::String(content))),
                Err(e) => WorkerResponse::failed(e.to_string()),
            },
        }
    }

    /// Attach to the bus and serve requests until the session is detached.
    pub async fn start(&self, bus: Arc<InMemoryMessageBus>) -> JoinHandle<()> {
        let mut inbox = bus.attach(self.session.clone()).await;
        let worker = self.clone();

        tokio::spawn(async move {
            debug!(session = %worker.session, "worker started");
            while let Some(envelope) = inbox.recv().await {
                let handler = worker.clone();
                let request = envelope.request;

                // A panicking handler abandons its request, not the worker.
                let handled = tokio::spawn(async move { handler.handle(request).await }).await;
                let outcome = match handled {
                    Ok(response) => bus.reply(&envelope.id, response).await,
                    Err(e) => {
                        warn!(
                            session = %worker.session,
                            request = %envelope.id,
                            error = %e,
                            "handler aborted"
                        );
                        bus.abandon(&envelope.id).await
                    }
                };

                if let Err(e) = outcome {
                    warn!(
                        session = %worker.session,
                        request = %envelope.id,
                        error = %e,
                        "failed to settle request"
                    );
                }
            }
            debug!(session = %worker.session, "worker stopped");
        })
    }

    pub async fn stop(&self, bus: &InMemoryMessageBus) -> Result<(), BusError> {
        bus.detach(&self.session).await
    }
}
