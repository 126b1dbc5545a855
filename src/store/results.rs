use crate::coordinator::WorkflowResult;
use crate::error::StoreError;
use rusqlite::{params, Connection, OptionalExtension};

/// Insert or overwrite the row for `result.id`.
pub fn save_result(conn: &Connection, result: &WorkflowResult) -> Result<(), StoreError> {
    let payload = serde_json::to_string(result)?;
    let status = serde_json::to_value(&result.status)?
        .as_str()
        .unwrap_or_default()
        .to_string();

    conn.execute(
        "INSERT OR REPLACE INTO workflow_results (id, status, payload, started_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            result.id.as_str(),
            status,
            payload,
            result.started_at.to_rfc3339(),
            result.completed_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

/// Most recently saved result, if any.
pub fn load_latest(conn: &Connection) -> Result<Option<WorkflowResult>, StoreError> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM workflow_results ORDER BY rowid DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    payload
        .map(|raw| serde_json::from_str(&raw).map_err(StoreError::from))
        .transpose()
}

pub fn count_results(conn: &Connection) -> Result<usize, StoreError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM workflow_results", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Delete old results (keep only most recent N)
pub fn trim_results(conn: &Connection, keep_count: usize) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM workflow_results
         WHERE rowid NOT IN (
             SELECT rowid FROM workflow_results
             ORDER BY rowid DESC
             LIMIT ?1
         )",
        params![keep_count as i64],
    )?;
    Ok(())
}
