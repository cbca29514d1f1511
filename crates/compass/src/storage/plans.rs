use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::{json_at, now, time_at, time_text, to_json, uuid_at, Storage};
use crate::error::{Error, Result};
use crate::model::{PlanUpdate, UserRole};

const PLAN_COLUMNS: &str = "id, posted_by, content, target_roles, acknowledged_by, posted_at";

impl Storage {
    /// Insert a plan update with nobody acknowledging it yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the author is unknown or the query fails.
    pub fn insert_plan_update(
        &self,
        posted_by: Uuid,
        content: &str,
        target_roles: &[UserRole],
    ) -> Result<PlanUpdate> {
        insert_plan_update(&*self.conn()?, posted_by, content, target_roles)
    }

    /// Get a plan update by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_plan_update(&self, id: Uuid) -> Result<Option<PlanUpdate>> {
        let update = self
            .conn()?
            .query_row(
                &format!("SELECT {PLAN_COLUMNS} FROM plan_updates WHERE id = ?1"),
                [id.to_string()],
                row_to_plan_update,
            )
            .optional()?;
        Ok(update)
    }

    /// Every plan update, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_plan_updates(&self) -> Result<Vec<PlanUpdate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PLAN_COLUMNS} FROM plan_updates ORDER BY posted_at DESC"
        ))?;
        let updates = stmt
            .query_map([], row_to_plan_update)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(updates)
    }

    /// Add `user_id` to the update's acknowledgements. Acknowledging twice
    /// leaves one entry.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the update does not exist.
    pub fn add_acknowledgement(&self, id: Uuid, user_id: Uuid) -> Result<PlanUpdate> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let update = add_acknowledgement(&tx, id, user_id)?;
        tx.commit()?;
        Ok(update)
    }
}

pub(crate) fn add_acknowledgement(
    conn: &Connection,
    id: Uuid,
    user_id: Uuid,
) -> Result<PlanUpdate> {
    let mut update = conn
        .query_row(
            &format!("SELECT {PLAN_COLUMNS} FROM plan_updates WHERE id = ?1"),
            [id.to_string()],
            row_to_plan_update,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("plan_updates", id))?;

    if !update.is_acknowledged_by(user_id) {
        update.acknowledged_by.push(user_id);
        conn.execute(
            "UPDATE plan_updates SET acknowledged_by = ?2 WHERE id = ?1",
            params![id.to_string(), to_json(&update.acknowledged_by)?],
        )?;
    }
    Ok(update)
}

pub(crate) fn insert_plan_update(
    conn: &Connection,
    posted_by: Uuid,
    content: &str,
    target_roles: &[UserRole],
) -> Result<PlanUpdate> {
    let update = PlanUpdate {
        id: Uuid::new_v4(),
        posted_by,
        content: content.to_string(),
        target_roles: target_roles.to_vec(),
        acknowledged_by: Vec::new(),
        posted_at: now(),
    };
    conn.execute(
        &format!("INSERT INTO plan_updates ({PLAN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            update.id.to_string(),
            posted_by.to_string(),
            update.content,
            to_json(&update.target_roles)?,
            to_json(&update.acknowledged_by)?,
            time_text(update.posted_at),
        ],
    )?;
    debug!("Inserted plan update {}", update.id);
    Ok(update)
}

fn row_to_plan_update(row: &Row<'_>) -> rusqlite::Result<PlanUpdate> {
    Ok(PlanUpdate {
        id: uuid_at(row, 0)?,
        posted_by: uuid_at(row, 1)?,
        content: row.get(2)?,
        target_roles: json_at(row, 3)?,
        acknowledged_by: json_at(row, 4)?,
        posted_at: time_at(row, 5)?,
    })
}
