use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical identifier of one external chat platform ("chatgpt", "claude").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TargetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque reference to one live external session (a browser tab).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionRef(String);

impl SessionRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionRef {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SessionState {
    Ready,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionHandle {
    pub target: TargetId,
    pub session_ref: SessionRef,
    pub state: SessionState,
}

/// What the session's page looked like when the lifecycle event fired.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub host: String,
    /// Page finished loading. Only loaded pages are eligible for dispatch.
    pub loaded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Opened { session: SessionRef, snapshot: SessionSnapshot },
    Updated { session: SessionRef, snapshot: SessionSnapshot },
    Navigated { session: SessionRef, snapshot: SessionSnapshot },
    Closed { session: SessionRef },
}
