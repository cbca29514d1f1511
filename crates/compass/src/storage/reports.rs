use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{now, opt_json_at, time_at, time_text, to_json, uuid_at, Storage};
use crate::error::{Error, Result};
use crate::model::{Report, ReportStatus};

const REPORT_COLUMNS: &str = "id, division_id, period, content, status, submitted_at, submitted_by";

impl Storage {
    /// Insert a pending report.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced row is missing or the query fails.
    pub fn insert_report(
        &self,
        division_id: Uuid,
        period: &str,
        content: Option<Value>,
        submitted_by: Uuid,
    ) -> Result<Report> {
        insert_report(&*self.conn()?, division_id, period, content, submitted_by)
    }

    /// Get a report by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
        fetch_report(&*self.conn()?, id)
    }

    /// A division's reports, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_reports_for_division(&self, division_id: Uuid) -> Result<Vec<Report>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE division_id = ?1 ORDER BY submitted_at DESC"
        ))?;
        let reports = stmt
            .query_map([division_id.to_string()], row_to_report)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    /// Record a decision on a report.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the report does not exist.
    pub fn set_report_status(&self, id: Uuid, status: ReportStatus) -> Result<Report> {
        set_report_status(&*self.conn()?, id, status)
    }
}

pub(crate) fn insert_report(
    conn: &Connection,
    division_id: Uuid,
    period: &str,
    content: Option<Value>,
    submitted_by: Uuid,
) -> Result<Report> {
    let report = Report {
        id: Uuid::new_v4(),
        division_id,
        period: period.to_string(),
        content,
        status: ReportStatus::Pending,
        submitted_at: now(),
        submitted_by,
    };
    let content_text = report.content.as_ref().map(to_json).transpose()?;
    conn.execute(
        &format!("INSERT INTO reports ({REPORT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            report.id.to_string(),
            division_id.to_string(),
            report.period,
            content_text,
            report.status,
            time_text(report.submitted_at),
            submitted_by.to_string(),
        ],
    )?;
    debug!("Inserted report {} for division {}", report.id, division_id);
    Ok(report)
}

pub(crate) fn set_report_status(
    conn: &Connection,
    id: Uuid,
    status: ReportStatus,
) -> Result<Report> {
    let affected = conn.execute(
        "UPDATE reports SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status],
    )?;
    if affected == 0 {
        return Err(Error::not_found("reports", id));
    }
    fetch_report(conn, id)?.ok_or_else(|| Error::not_found("reports", id))
}

fn fetch_report(conn: &Connection, id: Uuid) -> Result<Option<Report>> {
    let report = conn
        .query_row(
            &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"),
            [id.to_string()],
            row_to_report,
        )
        .optional()?;
    Ok(report)
}

fn row_to_report(row: &Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: uuid_at(row, 0)?,
        division_id: uuid_at(row, 1)?,
        period: row.get(2)?,
        content: opt_json_at(row, 3)?,
        status: row.get(4)?,
        submitted_at: time_at(row, 5)?,
        submitted_by: uuid_at(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::UserRole;
    use crate::storage::test_support;

    #[test]
    fn test_report_lifecycle() {
        let storage = test_support::storage();
        let h = test_support::hierarchy(&storage);
        let ada = test_support::profile(&storage, "Ada", UserRole::Manager);

        let report = storage
            .insert_report(
                h.division.id,
                "2026-Q3",
                Some(json!({"revenue": 1200, "notes": "steady"})),
                ada.uid,
            )
            .unwrap();
        assert_eq!(report.status, ReportStatus::Pending);

        let row = storage.get_report(report.id).unwrap().unwrap();
        assert_eq!(row.content, Some(json!({"revenue": 1200, "notes": "steady"})));

        let approved = storage
            .set_report_status(report.id, ReportStatus::Approved)
            .unwrap();
        assert_eq!(approved.status, ReportStatus::Approved);
    }

    #[test]
    fn test_report_without_content() {
        let storage = test_support::storage();
        let h = test_support::hierarchy(&storage);
        let ada = test_support::profile(&storage, "Ada", UserRole::Manager);

        storage
            .insert_report(h.division.id, "2026-09", None, ada.uid)
            .unwrap();
        let reports = storage.list_reports_for_division(h.division.id).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].content.is_none());
    }

    #[test]
    fn test_report_requires_division() {
        let storage = test_support::storage();
        let ada = test_support::profile(&storage, "Ada", UserRole::Manager);
        assert!(storage
            .insert_report(Uuid::new_v4(), "2026-Q3", None, ada.uid)
            .is_err());
    }
}
