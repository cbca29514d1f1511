use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::{date_text, now, opt_date_at, opt_uuid_at, time_at, time_text, uuid_at, Storage};
use crate::error::{Error, Result};
use crate::model::{Goal, GoalStatus, NewGoal};

const GOAL_COLUMNS: &str = "id, user_id, title, description, status, target_completion_date, \
     related_division_id, related_subsidiary_id, created_at, updated_at";

impl Storage {
    /// Insert a goal owned by `user_id`, starting as `Not Started`.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced row is missing or the query fails.
    pub fn insert_goal(&self, user_id: Uuid, new: &NewGoal) -> Result<Goal> {
        insert_goal(&*self.conn()?, user_id, new)
    }

    /// Get a goal by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_goal(&self, id: Uuid) -> Result<Option<Goal>> {
        fetch_goal(&*self.conn()?, id)
    }

    /// A user's goals, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_goals_for_user(&self, user_id: Uuid) -> Result<Vec<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;
        let goals = stmt
            .query_map([user_id.to_string()], row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    /// Move a goal to `status`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the goal does not exist.
    pub fn set_goal_status(&self, id: Uuid, status: GoalStatus) -> Result<Goal> {
        set_goal_status(&*self.conn()?, id, status)
    }
}

pub(crate) fn insert_goal(conn: &Connection, user_id: Uuid, new: &NewGoal) -> Result<Goal> {
    let stamp = now();
    let goal = Goal {
        id: Uuid::new_v4(),
        user_id,
        title: new.title.clone(),
        description: new.description.clone(),
        status: GoalStatus::NotStarted,
        target_completion_date: new.target_completion_date,
        related_division_id: new.related_division_id,
        related_subsidiary_id: new.related_subsidiary_id,
        created_at: stamp,
        updated_at: stamp,
    };
    conn.execute(
        &format!("INSERT INTO goals ({GOAL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)"),
        params![
            goal.id.to_string(),
            user_id.to_string(),
            goal.title,
            goal.description,
            goal.status,
            goal.target_completion_date.map(date_text),
            goal.related_division_id.map(|id| id.to_string()),
            goal.related_subsidiary_id.map(|id| id.to_string()),
            time_text(stamp),
        ],
    )?;
    debug!("Inserted goal {} for {}", goal.id, user_id);
    Ok(goal)
}

pub(crate) fn set_goal_status(conn: &Connection, id: Uuid, status: GoalStatus) -> Result<Goal> {
    let affected = conn.execute(
        "UPDATE goals SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), status, time_text(now())],
    )?;
    if affected == 0 {
        return Err(Error::not_found("goals", id));
    }
    fetch_goal(conn, id)?.ok_or_else(|| Error::not_found("goals", id))
}

fn fetch_goal(conn: &Connection, id: Uuid) -> Result<Option<Goal>> {
    let goal = conn
        .query_row(
            &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1"),
            [id.to_string()],
            row_to_goal,
        )
        .optional()?;
    Ok(goal)
}

fn row_to_goal(row: &Row<'_>) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        target_completion_date: opt_date_at(row, 5)?,
        related_division_id: opt_uuid_at(row, 6)?,
        related_subsidiary_id: opt_uuid_at(row, 7)?,
        created_at: time_at(row, 8)?,
        updated_at: time_at(row, 9)?,
    })
}
