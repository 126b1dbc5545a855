use super::types::*;
use crate::error::BusError;
use crate::registry::SessionRef;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, warn};

pub type WorkerInbox = mpsc::UnboundedReceiver<Envelope>;

/// Request/response channel between the coordinator and session workers.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Deliver `request` to the worker of `session` and wait for its response.
    async fn request(
        &self,
        session: &SessionRef,
        request: WorkerRequest,
        timeout: Duration,
    ) -> Result<WorkerResponse, BusError>;
}

struct PendingRequest {
    session: SessionRef,
    respond_to: oneshot::Sender<WorkerResponse>,
}

/// In-process bus. Each attached session owns an inbox; responses are matched
/// to their request through a pending table keyed by envelope id.
pub struct InMemoryMessageBus {
    inboxes: Arc<RwLock<HashMap<SessionRef, mpsc::UnboundedSender<Envelope>>>>,
    pending: Arc<RwLock<HashMap<String, PendingRequest>>>,
}

impl InMemoryMessageBus {
    pub fn new() -> Self {
        Self {
            inboxes: Arc::new(RwLock::new(HashMap::new())),
            pending: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Open the inbox for `session`, replacing any previous one.
    pub async fn attach(&self, session: SessionRef) -> WorkerInbox {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.inboxes.write().await.insert(session.clone(), tx).is_some() {
            debug!(%session, "replaced existing inbox");
            self.fail_pending_for(&session).await;
        }
        rx
    }

    /// Close the inbox for `session`. Requests still waiting on it fail with
    /// `ChannelClosed`.
    pub async fn detach(&self, session: &SessionRef) -> Result<(), BusError> {
        let removed = self.inboxes.write().await.remove(session);
        self.fail_pending_for(session).await;
        removed
            .map(|_| ())
            .ok_or_else(|| BusError::SessionNotAttached(session.to_string()))
    }

    pub async fn is_attached(&self, session: &SessionRef) -> bool {
        self.inboxes.read().await.contains_key(session)
    }

    /// Complete the pending request `id` with `response`.
    pub async fn reply(&self, id: &str, response: WorkerResponse) -> Result<(), BusError> {
        let pending = self
            .pending
            .write()
            .await
            .remove(id)
            .ok_or_else(|| BusError::UnknownRequest(id.to_string()))?;

        // The requester may have given up already.
        if pending.respond_to.send(response).is_err() {
            debug!(
                request = %id,
                session = %pending.session,
                "requester went away before response"
            );
        }
        Ok(())
    }

    /// Drop the pending request `id` without a response. The requester sees
    /// `ChannelClosed`.
    pub async fn abandon(&self, id: &str) -> Result<(), BusError> {
        self.pending
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BusError::UnknownRequest(id.to_string()))
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }

    async fn fail_pending_for(&self, session: &SessionRef) {
        // Dropping the senders wakes the requesters with a closed channel.
        self.pending
            .write()
            .await
            .retain(|_, pending| &pending.session != session);
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn request(
        &self,
        session: &SessionRef,
        request: WorkerRequest,
        timeout: Duration,
    ) -> Result<WorkerResponse, BusError> {
        let envelope = Envelope::new(session.clone(), request);
        let id = envelope.id.clone();
        let (tx, rx) = oneshot::channel();

        self.pending.write().await.insert(
            id.clone(),
            PendingRequest {
                session: session.clone(),
                respond_to: tx,
            },
        );

        let delivered = match self.inboxes.read().await.get(session) {
            Some(inbox) => inbox.send(envelope).is_ok(),
            None => false,
        };
        if !delivered {
            self.pending.write().await.remove(&id);
            return Err(BusError::SessionNotAttached(session.to_string()));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(BusError::ChannelClosed(session.to_string())),
            Err(_) => {
                self.pending.write().await.remove(&id);
                warn!(%session, request = %id, "no response before bus timeout");
                Err(BusError::Timeout {
                    session: session.to_string(),
                    elapsed: timeout,
                })
            }
        }
    }
}
