//! Append-only audit log.

use rusqlite::{params, Connection, Row};
use serde_json::Value;
use tracing::trace;
use uuid::Uuid;

use super::{now, opt_json_at, opt_uuid_at, time_at, time_text, to_json, uuid_at, Storage};
use crate::error::Result;
use crate::model::AuditEntry;

impl Storage {
    /// Append an entry. Entries are never updated or deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn append_audit(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        details: Option<Value>,
    ) -> Result<AuditEntry> {
        append_audit(&*self.conn()?, user_id, action, details)
    }

    /// Run `op` and append its audit entry in one transaction. Nothing is
    /// kept when either the change or the entry fails.
    ///
    /// # Errors
    ///
    /// Returns the error of `op` or of the audit insert.
    pub(crate) fn audited<T>(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        op: impl FnOnce(&Connection) -> Result<T>,
        details: impl FnOnce(&T) -> Value,
    ) -> Result<T> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let value = op(&tx)?;
        append_audit(&tx, user_id, action, Some(details(&value)))?;
        tx.commit()?;
        Ok(value)
    }

    /// The most recent `limit` entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent_audit(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, user_id, action, details, timestamp
            FROM audit_logs
            ORDER BY timestamp DESC, rowid DESC
            LIMIT ?1
            ",
        )?;
        let entries = stmt
            .query_map([limit], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn append_audit(
    conn: &Connection,
    user_id: Option<Uuid>,
    action: &str,
    details: Option<Value>,
) -> Result<AuditEntry> {
    let entry = AuditEntry {
        id: Uuid::new_v4(),
        user_id,
        action: action.to_string(),
        details,
        timestamp: now(),
    };
    let details_text = entry.details.as_ref().map(to_json).transpose()?;
    conn.execute(
        r"
        INSERT INTO audit_logs (id, user_id, action, details, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
        params![
            entry.id.to_string(),
            user_id.map(|id| id.to_string()),
            entry.action,
            details_text,
            time_text(entry.timestamp),
        ],
    )?;
    trace!("Audit {} by {:?}", entry.action, user_id);
    Ok(entry)
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: uuid_at(row, 0)?,
        user_id: opt_uuid_at(row, 1)?,
        action: row.get(2)?,
        details: opt_json_at(row, 3)?,
        timestamp: time_at(row, 4)?,
    })
}
