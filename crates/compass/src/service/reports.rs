use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::{deny, ensure_active, non_empty, Services};
use crate::access;
use crate::error::{Error, Result};
use crate::model::{Report, ReportStatus, UserProfile};
use crate::storage::reports;

impl Services {
    /// Submit a report for a division the actor can see.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for a blank period, `Error::NotFound`
    /// for an unknown division and `Error::AccessDenied` for an invisible
    /// one.
    pub fn submit_report(
        &self,
        actor: &UserProfile,
        division_id: Uuid,
        period: &str,
        content: Option<Value>,
    ) -> Result<Report> {
        const ACTION: &str = "report.submit";
        ensure_active(actor, ACTION)?;
        let period = non_empty("period", period)?;
        if !access::can_access_division(actor, &self.scope(division_id)?) {
            return Err(deny(actor, ACTION));
        }

        let report = self.record(
            actor,
            ACTION,
            |conn| reports::insert_report(conn, division_id, &period, content, actor.uid),
            |report| json!({ "report_id": report.id, "division_id": division_id, "period": period }),
        )?;
        info!("Report {} submitted for {}", report.id, period);
        Ok(report)
    }

    /// Approve or reject a pending report. Directors and above with access
    /// to the report's division.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `decision` is `Pending` or the report
    /// was already decided, and `Error::AccessDenied` for anyone without
    /// standing.
    pub fn decide_report(
        &self,
        actor: &UserProfile,
        report_id: Uuid,
        decision: ReportStatus,
    ) -> Result<Report> {
        let action = match decision {
            ReportStatus::Approved => "report.approve",
            ReportStatus::Rejected => "report.reject",
            ReportStatus::Pending => {
                return Err(Error::invalid_input("a decision is approved or rejected"))
            }
        };
        ensure_active(actor, action)?;

        let report = self
            .storage
            .get_report(report_id)?
            .ok_or_else(|| Error::not_found("reports", report_id))?;
        let scope = self.scope(report.division_id)?;
        if !(access::is_director_or_above(actor) && access::can_access_division(actor, &scope)) {
            return Err(deny(actor, action));
        }
        if report.status != ReportStatus::Pending {
            return Err(Error::invalid_input(format!(
                "report already {}",
                report.status
            )));
        }

        self.record(
            actor,
            action,
            |conn| reports::set_report_status(conn, report_id, decision),
            |_| json!({ "report_id": report_id }),
        )
    }

    /// A division's reports, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` if the actor cannot see the division.
    pub fn list_reports(&self, actor: &UserProfile, division_id: Uuid) -> Result<Vec<Report>> {
        if !access::can_access_division(actor, &self.scope(division_id)?) {
            return Err(deny(actor, "report.list"));
        }
        self.storage.list_reports_for_division(division_id)
    }
}
