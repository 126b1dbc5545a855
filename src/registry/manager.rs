use super::types::*;
use crate::platforms::PlatformRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Live mapping from target to the session that currently serves it.
///
/// Every target keeps its live candidates in discovery order; the most
/// recently observed one is the handle that `resolve` hands out. A closed
/// session drops out and the previous candidate becomes visible again.
pub struct SessionRegistry {
    candidates: Arc<RwLock<HashMap<TargetId, Vec<SessionRef>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            candidates: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace the handle for `target`. Registering the same
    /// session twice leaves the registry unchanged.
    pub async fn register(&self, target: TargetId, session_ref: SessionRef) {
        let mut candidates = self.candidates.write().await;

        // A session serves one target at a time; renavigation moves it.
        for (other, sessions) in candidates.iter_mut() {
            if *other != target {
                sessions.retain(|s| s != &session_ref);
            }
        }
        candidates.retain(|_, sessions| !sessions.is_empty());

        let sessions = candidates.entry(target.clone()).or_default();
        sessions.retain(|s| s != &session_ref);
        sessions.push(session_ref.clone());

        debug!(
            platform = %target,
            session = %session_ref,
            candidates = sessions.len(),
            "session registered"
        );
    }

    /// Remove `session_ref` wherever it is registered. Returns the target it
    /// served, if any.
    pub async fn unregister(&self, session_ref: &SessionRef) -> Option<TargetId> {
        let mut candidates = self.candidates.write().await;
        let mut served = None;

        for (target, sessions) in candidates.iter_mut() {
            let before = sessions.len();
            sessions.retain(|s| s != session_ref);
            if sessions.len() != before {
                served = Some(target.clone());
            }
        }
        candidates.retain(|_, sessions| !sessions.is_empty());

        if let Some(target) = &served {
            debug!(platform = %target, session = %session_ref, "session unregistered");
        }
        served
    }

    pub async fn resolve(&self, target: &TargetId) -> Option<SessionHandle> {
        let candidates = self.candidates.read().await;
        candidates
            .get(target)
            .and_then(|sessions| sessions.last())
            .map(|session_ref| SessionHandle {
                target: target.clone(),
                session_ref: session_ref.clone(),
                state: SessionState::Ready,
            })
    }

    pub async fn list_sessions(&self) -> Vec<SessionHandle> {
        let candidates = self.candidates.read().await;
        let mut handles: Vec<SessionHandle> = candidates
            .iter()
            .filter_map(|(target, sessions)| {
                sessions.last().map(|session_ref| SessionHandle {
                    target: target.clone(),
                    session_ref: session_ref.clone(),
                    state: SessionState::Ready,
                })
            })
            .collect();
        handles.sort_by(|a, b| a.target.cmp(&b.target));
        handles
    }

    /// Apply a lifecycle event observed on an external session.
    pub async fn apply_event(&self, event: SessionEvent, platforms: &PlatformRegistry) {
        match event {
            SessionEvent::Closed { session } => {
                if let Some(target) = self.unregister(&session).await {
                    info!(platform = %target, %session, "session closed");
                }
            }
            SessionEvent::Opened { session, snapshot }
            | SessionEvent::Updated { session, snapshot }
            | SessionEvent::Navigated { session, snapshot } => {
                if !snapshot.loaded {
                    // Still loading: not Ready, keep it out until it completes.
                    self.unregister(&session).await;
                    return;
                }

                match platforms.identify(&snapshot.host) {
                    Some(target) => {
                        info!(platform = %target, %session, host = %snapshot.host, "session ready");
                        self.register(target, session).await;
                    }
                    None => {
                        if let Some(target) = self.unregister(&session).await {
                            info!(
                                platform = %target,
                                %session,
                                host = %snapshot.host,
                                "session left platform"
                            );
                        }
                    }
                }
            }
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
