//! Schema versioning for the compass database.
//!
//! The base schema is created idempotently on every open; numbered
//! migrations then bring older files forward. The version lives in the
//! `metadata` table.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The schema version this build writes.
pub const CURRENT_VERSION: i32 = 1;

/// Metadata key holding the schema version.
const VERSION_KEY: &str = "schema_version";

/// Create the schema and run pending migrations inside one transaction.
///
/// # Errors
///
/// Returns an error if a statement fails or the stored version is newer
/// than this build understands.
pub fn initialize_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    for statement in SCHEMA_STATEMENTS {
        tx.execute(statement, [])?;
    }

    let version = schema_version(&tx)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    for next in (version + 1)..=CURRENT_VERSION {
        debug!("Applying schema migration {}", next);
        apply(&tx, next)?;
        set_schema_version(&tx, next)?;
    }

    tx.commit()?;
    if version < CURRENT_VERSION {
        info!(
            "Database schema migrated from version {} to {}",
            version, CURRENT_VERSION
        );
    }
    Ok(())
}

/// Read the stored schema version; 0 for a fresh database.
///
/// # Errors
///
/// Returns an error if the stored value is not an integer.
pub fn schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

fn apply(_conn: &Connection, version: i32) -> Result<()> {
    match version {
        // Version 1 is the base schema from SCHEMA_STATEMENTS.
        1 => Ok(()),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_initialize_schema_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize_schema(&mut conn).unwrap();

        for table in super::super::schema::APPLICATION_TABLES {
            assert!(table_exists(&conn, table), "{table} missing");
        }
        assert!(table_exists(&conn, "auth_identities"));
        assert!(table_exists(&conn, "auth_sessions"));
    }

    #[test]
    fn test_initialize_schema_sets_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize_schema(&mut conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_schema_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize_schema(&mut conn).unwrap();
        initialize_schema(&mut conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_fresh_database_is_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize_schema(&mut conn).unwrap();
        set_schema_version(&conn, CURRENT_VERSION + 1).unwrap();

        let err = initialize_schema(&mut conn).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_garbage_version_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize_schema(&mut conn).unwrap();
        conn.execute(
            "UPDATE metadata SET value = 'abc' WHERE key = ?1",
            [VERSION_KEY],
        )
        .unwrap();

        let err = schema_version(&conn).unwrap_err();
        assert!(err.to_string().contains("invalid schema version"));
    }

    #[test]
    fn test_unknown_migration_version() {
        let conn = Connection::open_in_memory().unwrap();
        let err = apply(&conn, 999).unwrap_err();
        assert!(err.to_string().contains("unknown migration version"));
    }
}
