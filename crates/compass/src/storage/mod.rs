//! Storage layer for compass.
//!
//! This module provides the `SQLite` store behind both the local identity
//! service and the application tables. Each table's queries live in their
//! own submodule as an `impl Storage` block; this file holds the connection
//! handle and the column conversions they share.
//!
//! Writes that the services audit are also exposed as functions over a
//! borrowed `Connection`, so `Storage::audited` can run them together with
//! their audit entry in one transaction.

mod access;
mod audit;
pub(crate) mod goals;
mod identities;
pub mod migrations;
pub(crate) mod orgs;
pub(crate) mod plans;
pub(crate) mod profiles;
pub(crate) mod reports;
pub(crate) mod reviews;
pub mod schema;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{GoalStatus, ReportStatus, ReviewStatus, UserRole, UserStatus};

pub use identities::{IdentityRecord, SessionRecord};
pub use profiles::ProfileStore;

/// `SQLite`-backed store for identities, sessions and every application table.
///
/// The connection sits behind a mutex so one `Storage` can be shared through
/// an `Arc` by the identity service, the session provider and the services.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist
    /// and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&mut conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&mut conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock the connection for one unit of work.
    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Row counts and file size.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.conn()?;

        let schema_version = migrations::schema_version(&conn)?;
        let mut table_counts = Vec::with_capacity(schema::APPLICATION_TABLES.len());
        for table in schema::APPLICATION_TABLES {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
            table_counts.push(((*table).to_string(), count));
        }
        let identities: i64 =
            conn.query_row("SELECT COUNT(*) FROM auth_identities", [], |row| row.get(0))?;
        drop(conn);

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            schema_version,
            identities,
            table_counts,
            db_size_bytes,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Schema version recorded in the database.
    pub schema_version: i32,
    /// Number of identities known to the local identity service.
    pub identities: i64,
    /// `(table, rows)` for every application table.
    pub table_counts: Vec<(String, i64)>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

impl StorageStats {
    /// Row count for one table, if it is an application table.
    #[must_use]
    pub fn count(&self, table: &str) -> Option<i64> {
        self.table_counts
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, count)| *count)
    }
}

/// A column held text that does not convert to the expected type.
#[derive(Debug, Error)]
#[error("{0}")]
struct BadValue(String);

fn bad_column(idx: usize, message: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(BadValue(message.into())))
}

/// Timestamp for new and updated rows.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fixed-width RFC 3339 so text order matches time order.
pub(crate) fn time_text(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| bad_column(idx, format!("bad uuid {text}: {e}")))
}

pub(crate) fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| Uuid::parse_str(&t).map_err(|e| bad_column(idx, format!("bad uuid {t}: {e}"))))
        .transpose()
}

pub(crate) fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_time(idx, &text)
}

pub(crate) fn opt_time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| parse_time(idx, &t)).transpose()
}

fn parse_time(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| bad_column(idx, format!("bad timestamp {text}: {e}")))
}

pub(crate) fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    parse_date(idx, &text)
}

pub(crate) fn opt_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| parse_date(idx, &t)).transpose()
}

fn parse_date(idx: usize, text: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| bad_column(idx, format!("bad date {text}: {e}")))
}

pub(crate) fn json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| bad_column(idx, format!("bad JSON column: {e}")))
}

pub(crate) fn opt_json_at<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        serde_json::from_str(&t).map_err(|e| bad_column(idx, format!("bad JSON column: {e}")))
    })
    .transpose()
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

macro_rules! text_column {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let text = value.as_str()?;
                    <$ty>::from_str(text)
                        .map_err(|e| FromSqlError::Other(Box::new(BadValue(e.to_string()))))
                }
            }
        )*
    };
}

text_column!(UserRole, UserStatus, GoalStatus, ReviewStatus, ReportStatus);

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the storage, service and session tests.

    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::Storage;
    use crate::model::{
        AccessGrant, Division, HoldingCompany, NewDivision, NewProfile, Subsidiary, UserProfile,
        UserRole,
    };

    pub(crate) fn storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    pub(crate) fn profile(storage: &Storage, first: &str, role: UserRole) -> UserProfile {
        let uid = Uuid::new_v4();
        let new = NewProfile::for_sign_up(
            uid,
            &format!("{}-{uid}@example.com", first.to_lowercase()),
            first,
            "Tester",
            "Staff",
        );
        let mut profile = storage.insert_profile(&new).unwrap();
        if role != UserRole::Manager {
            profile.role = role;
            profile = storage.save_profile(&profile).unwrap();
        }
        profile
    }

    pub(crate) fn grant(storage: &Storage, profile: &UserProfile, access: AccessGrant) -> UserProfile {
        let mut updated = profile.clone();
        updated.role = access.role;
        updated.holding_company_id = access.holding_company_id;
        updated.subsidiary_ids = access.subsidiary_ids;
        updated.division_ids = access.division_ids;
        storage.save_profile(&updated).unwrap()
    }

    pub(crate) struct Hierarchy {
        pub holding: HoldingCompany,
        pub subsidiary: Subsidiary,
        pub division: Division,
    }

    pub(crate) fn hierarchy(storage: &Storage) -> Hierarchy {
        let holding = storage.insert_holding_company("Acme Holdings").unwrap();
        let subsidiary = storage.insert_subsidiary("Acme Retail", holding.id).unwrap();
        let division = storage
            .insert_division(&NewDivision {
                name: "Northwest".to_string(),
                subsidiary_id: subsidiary.id,
                strategic_plan: None,
                start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                end_date: None,
            })
            .unwrap();
        Hierarchy {
            holding,
            subsidiary,
            division,
        }
    }
}
