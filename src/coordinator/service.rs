use super::types::*;
use crate::config::ConductorConfig;
use crate::error::{BusError, ErrorKind, StoreError};
use crate::messaging::{CoordinatorCommand, MessageBus, Notification, WorkerRequest, WorkerResponse};
use crate::platforms::PlatformRegistry;
use crate::registry::{SessionRegistry, TargetId};
use crate::store::ResultStore;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info, warn};

const NOTIFICATION_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
enum Phase {
    Submit,
    Await,
}

impl Phase {
    /// Failure kind for a worker-reported error in this phase.
    fn failure_kind(self) -> ErrorKind {
        match self {
            Phase::Submit => ErrorKind::SubmissionFailed,
            Phase::Await => ErrorKind::TimeoutError,
        }
    }
}

/// Broadcasts one prompt to every requested target and gathers one outcome
/// per target into a single workflow result.
#[derive(Clone)]
pub struct Coordinator {
    registry: Arc<SessionRegistry>,
    platforms: Arc<PlatformRegistry>,
    bus: Arc<dyn MessageBus>,
    store: Arc<dyn ResultStore>,
    config: Arc<ConductorConfig>,
    notifications: broadcast::Sender<Notification>,
    current: Arc<RwLock<Option<WorkflowResult>>>,
}

impl Coordinator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        platforms: Arc<PlatformRegistry>,
        bus: Arc<dyn MessageBus>,
        store: Arc<dyn ResultStore>,
        config: ConductorConfig,
    ) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            registry,
            platforms,
            bus,
            store,
            config: Arc::new(config),
            notifications,
            current: Arc::new(RwLock::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn platforms(&self) -> &Arc<PlatformRegistry> {
        &self.platforms
    }

    /// Begin a workflow in the background and return its id. The final
    /// result arrives as a `WorkflowUpdate` notification.
    pub async fn start_workflow(&self, request: WorkflowRequest) -> WorkflowId {
        let result = self.begin().await;
        let id = result.id.clone();

        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.execute(result, request).await;
        });

        id
    }

    /// Run a workflow to completion and return its result.
    pub async fn run_workflow(&self, request: WorkflowRequest) -> WorkflowResult {
        let result = self.begin().await;
        self.execute(result, request).await
    }

    /// Snapshot of the most recent workflow, running or complete.
    pub async fn current_workflow(&self) -> Option<WorkflowResult> {
        self.current.read().await.clone()
    }

    /// Last completed result as persisted by the store.
    pub fn last_result(&self) -> Result<Option<WorkflowResult>, StoreError> {
        self.store.load_last()
    }

    /// Serve commands until the sender side closes.
    pub async fn serve(&self, mut commands: mpsc::Receiver<CoordinatorCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                CoordinatorCommand::StartWorkflow { prompt, targets } => {
                    let id = self.start_workflow(WorkflowRequest::new(prompt, targets)).await;
                    debug!(workflow = %id, "workflow accepted");
                }
            }
        }
        debug!("command channel closed");
    }

    async fn begin(&self) -> WorkflowResult {
        let result = WorkflowResult::new(WorkflowId::generate());
        *self.current.write().await = Some(result.clone());
        result
    }

    async fn execute(
        &self,
        mut result: WorkflowResult,
        request: WorkflowRequest,
    ) -> WorkflowResult {
        let workflow_id = result.id.clone();
        info!(workflow = %workflow_id, targets = request.targets.len(), "starting workflow");
        self.notify_status(format!("Broadcasting to {} platform(s)...", request.targets.len()));

        let mut targets = Vec::with_capacity(request.targets.len());
        let mut tasks = Vec::with_capacity(request.targets.len());
        for target in &request.targets {
            let coordinator = self.clone();
            let workflow_id = workflow_id.clone();
            let target_for_task = target.clone();
            let prompt = request.prompt.clone();

            targets.push(target.clone());
            tasks.push(tokio::spawn(async move {
                let outcome = coordinator.dispatch_target(&target_for_task, &prompt).await;
                coordinator.record_live(&workflow_id, &target_for_task, &outcome).await;
                outcome
            }));
        }

        // Every task settles, success or not, before the result is emitted.
        let settled = join_all(tasks).await;
        for (target, joined) in targets.into_iter().zip(settled) {
            let outcome = joined.unwrap_or_else(|e| {
                warn!(
                    workflow = %workflow_id,
                    platform = %target,
                    error = %e,
                    "target task aborted"
                );
                Outcome::failure(
                    ErrorKind::DeliveryFailed,
                    format!("Task for {} aborted: {}", target, e),
                )
            });
            result.record(target, outcome);
        }
        result.complete(&request.targets);

        {
            let mut current = self.current.write().await;
            if current.as_ref().map(|r| &r.id) == Some(&result.id) {
                *current = Some(result.clone());
            }
        }

        if let Err(e) = self.store.save_last(&result) {
            warn!(workflow = %workflow_id, error = %e, "failed to persist workflow result");
        }

        info!(
            workflow = %workflow_id,
            succeeded = result.success_count(),
            failed = result.failure_count(),
            "workflow complete"
        );
        let _ = self.notifications.send(Notification::WorkflowUpdate(result.clone()));
        result
    }

    async fn dispatch_target(&self, target: &TargetId, prompt: &str) -> Outcome {
        if !self.platforms.contains(target) {
            return Outcome::failure(
                ErrorKind::UnknownTarget,
                format!("Unknown platform key '{}'.", target),
            );
        }

        let handle = match self.registry.resolve(target).await {
            Some(handle) => handle,
            None => {
                debug!(platform = %target, "no live session");
                return Outcome::failure(
                    ErrorKind::TargetUnavailable,
                    format!("No open session found for {}.", target),
                );
            }
        };
        let session = &handle.session_ref;

        let submitted = self
            .bus
            .request(
                session,
                WorkerRequest::ExecuteSubmit {
                    prompt: prompt.to_string(),
                },
                self.config.submit_guard(),
            )
            .await;
        if let Err(outcome) = Self::settle(Phase::Submit, target, submitted) {
            return outcome;
        }
        self.notify_status(format!("Submitted to {}.", target));

        self.notify_status(format!("Harvesting from {}...", target));
        let harvested = self
            .bus
            .request(session, WorkerRequest::ExecuteAwait {}, self.config.await_guard())
            .await;
        match Self::settle(Phase::Await, target, harvested) {
            Ok(Some(Value::String(content))) => Outcome::success(content),
            Ok(other) => Outcome::failure(
                ErrorKind::DeliveryFailed,
                format!("Unexpected response payload from {}: {:?}", target, other),
            ),
            Err(outcome) => outcome,
        }
    }

    fn settle(
        phase: Phase,
        target: &TargetId,
        response: Result<WorkerResponse, BusError>,
    ) -> Result<Option<Value>, Outcome> {
        match response {
            Ok(response) => response.into_result().map_err(|error| {
                debug!(platform = %target, ?phase, %error, "worker reported failure");
                Outcome::failure(phase.failure_kind(), error)
            }),
            Err(BusError::SessionNotAttached(_)) => Err(Outcome::failure(
                ErrorKind::TargetUnavailable,
                format!("Session for {} is no longer available.", target),
            )),
            Err(e @ BusError::Timeout { .. }) => {
                Err(Outcome::failure(phase.failure_kind(), e.to_string()))
            }
            Err(e) => Err(Outcome::failure(ErrorKind::DeliveryFailed, e.to_string())),
        }
    }

    async fn record_live(&self, workflow_id: &WorkflowId, target: &TargetId, outcome: &Outcome) {
        let mut current = self.current.write().await;
        if let Some(result) = current.as_mut().filter(|r| &r.id == workflow_id) {
            result.record(target.clone(), outcome.clone());
        }
    }

    fn notify_status(&self, message: String) {
        // No subscribers is fine; status text is advisory.
        let _ = self.notifications.send(Notification::StatusUpdate { message });
    }
}
