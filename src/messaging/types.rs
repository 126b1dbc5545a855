use crate::coordinator::WorkflowResult;
use crate::registry::{SessionRef, TargetId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller -> Coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinatorCommand {
    StartWorkflow { prompt: String, targets: Vec<TargetId> },
}

/// Coordinator -> Caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    /// Advisory progress text; never needed for correctness.
    StatusUpdate { message: String },
    WorkflowUpdate(WorkflowResult),
}

/// Coordinator -> Worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRequest {
    ExecuteSubmit { prompt: String },
    ExecuteAwait {},
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Ok,
    Failed,
}

/// Worker -> Coordinator. `Failed` with an `error` is the uniform failure signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerResponse {
    pub fn ok(data: Option<serde_json::Value>) -> Self {
        Self {
            status: ResponseStatus::Ok,
            data,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failed,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn into_result(self) -> Result<Option<serde_json::Value>, String> {
        match self.status {
            ResponseStatus::Ok => Ok(self.data),
            ResponseStatus::Failed => Err(self
                .error
                .unwrap_or_else(|| "Worker reported a failure.".to_string())),
        }
    }
}

/// A request in flight to one session, correlated by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    pub session: SessionRef,
    pub request: WorkerRequest,
    pub sent_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(session: SessionRef, request: WorkerRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session,
            request,
            sent_at: Utc::now(),
        }
    }
}
