use crate::error::ErrorKind;
use crate::registry::TargetId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_ISSUED_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Time-derived workflow token, unique within the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(String);

impl WorkflowId {
    pub fn generate() -> Self {
        let now = Utc::now().timestamp_millis();
        let mut last = LAST_ISSUED_MILLIS.load(Ordering::SeqCst);
        loop {
            // Two workflows in the same millisecond get consecutive stamps.
            let next = now.max(last + 1);
            match LAST_ISSUED_MILLIS.compare_exchange(
                last,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Self(format!("wf_{}", next)),
                Err(actual) => last = actual,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub prompt: String,
    pub targets: BTreeSet<TargetId>,
}

impl WorkflowRequest {
    pub fn new(prompt: impl Into<String>, targets: impl IntoIterator<Item = TargetId>) -> Self {
        Self {
            prompt: prompt.into(),
            targets: targets.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { content: String },
    Failure { reason: ErrorKind, message: String },
}

impl Outcome {
    pub fn success(content: impl Into<String>) -> Self {
        Outcome::Success {
            content: content.into(),
        }
    }

    pub fn failure(reason: ErrorKind, message: impl Into<String>) -> Self {
        Outcome::Failure {
            reason,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn failure_reason(&self) -> Option<ErrorKind> {
        match self {
            Outcome::Failure { reason, .. } => Some(*reason),
            Outcome::Success { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowResult {
    pub id: WorkflowId,
    pub status: WorkflowStatus,
    pub outcomes: BTreeMap<TargetId, Outcome>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowResult {
    pub fn new(id: WorkflowId) -> Self {
        Self {
            id,
            status: WorkflowStatus::Running,
            outcomes: BTreeMap::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Set the outcome for `target` once. Returns false if one was already set.
    pub fn record(&mut self, target: TargetId, outcome: Outcome) -> bool {
        if self.outcomes.contains_key(&target) {
            return false;
        }
        self.outcomes.insert(target, outcome);
        true
    }

    /// Mark complete. Any requested target still lacking an outcome gets a
    /// delivery failure so the key set always equals the request's targets.
    pub fn complete(&mut self, targets: &BTreeSet<TargetId>) {
        for target in targets {
            self.record(
                target.clone(),
                Outcome::failure(ErrorKind::DeliveryFailed, "No outcome was reported."),
            );
        }
        self.status = WorkflowStatus::Complete;
        self.completed_at = Some(Utc::now());
    }

    pub fn is_complete(&self) -> bool {
        self.status == WorkflowStatus::Complete
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_ids_are_unique_and_time_derived() {
        let a = WorkflowId::generate();
        let b = WorkflowId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("wf_"));
        let stamp: i64 = b.as_str().trim_start_matches("wf_").parse().unwrap();
        assert!(stamp > 1_600_000_000_000);
    }

    #[test]
    fn test_outcome_set_only_once() {
        let mut result = WorkflowResult::new(WorkflowId::generate());
        let target = TargetId::from("chatgpt");

        assert!(result.record(target.clone(), Outcome::success("42")));
        assert!(!result.record(target.clone(), Outcome::failure(ErrorKind::TimeoutError, "late")));
        assert_eq!(result.outcomes[&target], Outcome::success("42"));
    }

    #[test]
    fn test_complete_accounts_for_every_target() {
        let targets: BTreeSet<TargetId> = ["chatgpt", "claude"]
            .into_iter()
            .map(TargetId::from)
            .collect();
        let mut result = WorkflowResult::new(WorkflowId::generate());
        result.record(TargetId::from("chatgpt"), Outcome::success("hello world"));

        result.complete(&targets);

        assert!(result.is_complete());
        assert_eq!(result.outcomes.keys().cloned().collect::<BTreeSet<_>>(), targets);
        assert_eq!(result.success_count(), 1);
        assert_eq!(
            result.outcomes[&TargetId::from("claude")].failure_reason(),
            Some(ErrorKind::DeliveryFailed)
        );
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = Outcome::failure(ErrorKind::TargetUnavailable, "Tab not found.");
        let json = serde_json::to_value(outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "failure",
                "reason": "TargetUnavailable",
                "message": "Tab not found."
            })
        );
    }
}
