use crate::coordinator::WorkflowResult;
use crate::error::StoreError;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

pub mod results;
pub mod schema;

/// Completed workflows retained on disk.
const RETAINED_RESULTS: usize = 20;

/// Persistence for the last completed workflow result.
pub trait ResultStore: Send + Sync {
    fn save_last(&self, result: &WorkflowResult) -> Result<(), StoreError>;
    fn load_last(&self) -> Result<Option<WorkflowResult>, StoreError>;
}

pub struct SqliteResultStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteResultStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        debug!(path = %path.display(), "result store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }
}

impl ResultStore for SqliteResultStore {
    fn save_last(&self, result: &WorkflowResult) -> Result<(), StoreError> {
        self.with_connection(|conn| {
            results::save_result(conn, result)?;
            results::trim_results(conn, RETAINED_RESULTS)
        })
    }

    fn load_last(&self) -> Result<Option<WorkflowResult>, StoreError> {
        self.with_connection(results::load_latest)
    }
}

#[derive(Default)]
pub struct InMemoryResultStore {
    last: RwLock<Option<WorkflowResult>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for InMemoryResultStore {
    fn save_last(&self, result: &WorkflowResult) -> Result<(), StoreError> {
        *self.last.write().map_err(|_| StoreError::Poisoned)? = Some(result.clone());
        Ok(())
    }

    fn load_last(&self) -> Result<Option<WorkflowResult>, StoreError> {
        Ok(self.last.read().map_err(|_| StoreError::Poisoned)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{Outcome, WorkflowId};
    use crate::error::ErrorKind;
    use crate::registry::TargetId;
    use std::collections::BTreeSet;

    fn finished(content: &str) -> WorkflowResult {
        let mut result = WorkflowResult::new(WorkflowId::generate());
        result.record(TargetId::from("chatgpt"), Outcome::success(content));
        result.record(
            TargetId::from("claude"),
            Outcome::failure(ErrorKind::TargetUnavailable, "No open session found for claude."),
        );
        let targets: BTreeSet<TargetId> = result.outcomes.keys().cloned().collect();
        result.complete(&targets);
        result
    }

    #[test]
    fn test_empty_store_has_no_last_result() {
        let store = SqliteResultStore::in_memory().unwrap();
        assert!(store.load_last().unwrap().is_none());
    }

    #[test]
    fn test_last_result_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("conductor.db");

        let first = finished("first answer");
        let second = finished("second answer");
        {
            let store = SqliteResultStore::open(&path).unwrap();
            store.save_last(&first).unwrap();
            store.save_last(&second).unwrap();
        }

        let reopened = SqliteResultStore::open(&path).unwrap();
        assert_eq!(reopened.load_last().unwrap(), Some(second));
    }

    #[test]
    fn test_history_is_trimmed() {
        let store = SqliteResultStore::in_memory().unwrap();
        for i in 0..(RETAINED_RESULTS + 5) {
            store.save_last(&finished(&format!("answer {}", i))).unwrap();
        }

        let count = store.with_connection(results::count_results).unwrap();
        assert_eq!(count, RETAINED_RESULTS);
    }

    #[test]
    fn test_in_memory_store_keeps_latest() {
        let store = InMemoryResultStore::new();
        let result = finished("hello there");
        store.save_last(&result).unwrap();
        assert_eq!(store.load_last().unwrap(), Some(result));
    }
}
