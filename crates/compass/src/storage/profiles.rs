//! The `users` table and the profile data seam.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::{json_at, now, opt_uuid_at, time_at, time_text, to_json, uuid_at, Storage};
use crate::error::{Error, Result};
use crate::model::{NewProfile, UserProfile};

const PROFILE_COLUMNS: &str = "uid, email, first_name, last_name, display_name, position, role, \
     holding_company_id, subsidiary_ids, division_ids, manager_setup_complete, status, \
     created_at, updated_at";

/// The two profile operations the sign-up form and the session provider
/// need from the data service.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert one row into `users`.
    ///
    /// # Errors
    ///
    /// Returns the data service's error, e.g. a duplicate email.
    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile>;

    /// Point lookup by primary key. A missing row is `Error::NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` or the data service's error.
    async fn fetch_profile(&self, uid: Uuid) -> Result<UserProfile>;
}

#[async_trait]
impl ProfileStore for Storage {
    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile> {
        Storage::insert_profile(self, profile)
    }

    async fn fetch_profile(&self, uid: Uuid) -> Result<UserProfile> {
        self.get_profile(uid)?
            .ok_or_else(|| Error::not_found("users", uid))
    }
}

impl Storage {
    /// Insert a profile row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row violates a constraint or the query fails.
    pub fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile> {
        let stamp = now();
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO users ({PROFILE_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?9, ?10, ?11, ?12, ?12)"
            ),
            params![
                profile.uid.to_string(),
                profile.email,
                profile.first_name,
                profile.last_name,
                profile.display_name,
                profile.position,
                profile.role,
                to_json(&profile.subsidiary_ids)?,
                to_json(&profile.division_ids)?,
                profile.manager_setup_complete,
                profile.status,
                time_text(stamp),
            ],
        )?;
        debug!("Inserted profile {}", profile.uid);

        Ok(UserProfile {
            uid: profile.uid,
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            display_name: profile.display_name.clone(),
            position: profile.position.clone(),
            role: profile.role,
            holding_company_id: None,
            subsidiary_ids: profile.subsidiary_ids.clone(),
            division_ids: profile.division_ids.clone(),
            manager_setup_complete: profile.manager_setup_complete,
            status: profile.status,
            created_at: stamp,
            updated_at: stamp,
        })
    }

    /// Get a profile by uid.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_profile(&self, uid: Uuid) -> Result<Option<UserProfile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM users WHERE uid = ?1"),
                [uid.to_string()],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// All profiles ordered by display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM users ORDER BY display_name"
        ))?;
        let profiles = stmt
            .query_map([], row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    /// Write every mutable field of `profile` and bump `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no row has this uid.
    pub fn save_profile(&self, profile: &UserProfile) -> Result<UserProfile> {
        save_profile(&*self.conn()?, profile)
    }
}

pub(crate) fn save_profile(conn: &Connection, profile: &UserProfile) -> Result<UserProfile> {
    let stamp = now();
    let affected = conn.execute(
        r"
        UPDATE users SET
            first_name = ?2, last_name = ?3, display_name = ?4, position = ?5,
            role = ?6, holding_company_id = ?7, subsidiary_ids = ?8, division_ids = ?9,
            manager_setup_complete = ?10, status = ?11, updated_at = ?12
        WHERE uid = ?1
        ",
        params![
            profile.uid.to_string(),
            profile.first_name,
            profile.last_name,
            profile.display_name,
            profile.position,
            profile.role,
            profile.holding_company_id.map(|id| id.to_string()),
            to_json(&profile.subsidiary_ids)?,
            to_json(&profile.division_ids)?,
            profile.manager_setup_complete,
            profile.status,
            time_text(stamp),
        ],
    )?;
    if affected == 0 {
        return Err(Error::not_found("users", profile.uid));
    }

    let mut saved = profile.clone();
    saved.updated_at = stamp;
    Ok(saved)
}

fn row_to_profile(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        uid: uuid_at(row, 0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        display_name: row.get(4)?,
        position: row.get(5)?,
        role: row.get(6)?,
        holding_company_id: opt_uuid_at(row, 7)?,
        subsidiary_ids: json_at(row, 8)?,
        division_ids: json_at(row, 9)?,
        manager_setup_complete: row.get(10)?,
        status: row.get(11)?,
        created_at: time_at(row, 12)?,
        updated_at: time_at(row, 13)?,
    })
}
