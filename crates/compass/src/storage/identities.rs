//! Tables owned by the local identity service.
//!
//! Passwords are stored as argon2 PHC strings and sessions by the blake3
//! hash of their token; neither secret is ever written in clear.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::{now, opt_time_at, time_at, time_text, uuid_at, Storage};
use crate::error::Result;

/// A row of `auth_identities`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    /// Identity id; doubles as the profile uid.
    pub id: Uuid,
    /// Login email, unique ignoring case.
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last successful sign-in.
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// A row of `auth_sessions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// blake3 hex digest of the bearer token.
    pub token_hash: String,
    /// Owning identity.
    pub identity_id: Uuid,
    /// Issue time.
    pub created_at: DateTime<Utc>,
    /// The session is invalid from this instant on.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the session has expired at `at`.
    #[must_use]
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.expires_at
    }
}

const IDENTITY_COLUMNS: &str = "id, email, password_hash, created_at, last_sign_in_at";

impl Storage {
    /// Insert a new identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is taken or the query fails.
    pub fn insert_identity(&self, email: &str, password_hash: &str) -> Result<IdentityRecord> {
        let record = IdentityRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now(),
            last_sign_in_at: None,
        };
        self.conn()?.execute(
            &format!("INSERT INTO auth_identities ({IDENTITY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, NULL)"),
            params![
                record.id.to_string(),
                record.email,
                record.password_hash,
                time_text(record.created_at),
            ],
        )?;
        debug!("Inserted identity {}", record.id);
        Ok(record)
    }

    /// Look up an identity by email, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_identity_by_email(&self, email: &str) -> Result<Option<IdentityRecord>> {
        let record = self
            .conn()?
            .query_row(
                &format!("SELECT {IDENTITY_COLUMNS} FROM auth_identities WHERE email = ?1"),
                [email],
                row_to_identity,
            )
            .optional()?;
        Ok(record)
    }

    /// Look up an identity by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_identity(&self, id: Uuid) -> Result<Option<IdentityRecord>> {
        let record = self
            .conn()?
            .query_row(
                &format!("SELECT {IDENTITY_COLUMNS} FROM auth_identities WHERE id = ?1"),
                [id.to_string()],
                row_to_identity,
            )
            .optional()?;
        Ok(record)
    }

    /// Stamp a successful sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn touch_last_sign_in(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.conn()?.execute(
            "UPDATE auth_identities SET last_sign_in_at = ?2 WHERE id = ?1",
            params![id.to_string(), time_text(at)],
        )?;
        Ok(())
    }

    /// Store a session by token hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is unknown or the query fails.
    pub fn insert_session(&self, record: &SessionRecord) -> Result<()> {
        self.conn()?.execute(
            r"
            INSERT INTO auth_sessions (token_hash, identity_id, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                record.token_hash,
                record.identity_id.to_string(),
                time_text(record.created_at),
                time_text(record.expires_at),
            ],
        )?;
        Ok(())
    }

    /// Look up a session by token hash, expired or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>> {
        let record = self
            .conn()?
            .query_row(
                r"
                SELECT token_hash, identity_id, created_at, expires_at
                FROM auth_sessions WHERE token_hash = ?1
                ",
                [token_hash],
                |row| {
                    Ok(SessionRecord {
                        token_hash: row.get(0)?,
                        identity_id: uuid_at(row, 1)?,
                        created_at: time_at(row, 2)?,
                        expires_at: time_at(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Delete one session. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let affected = self
            .conn()?
            .execute("DELETE FROM auth_sessions WHERE token_hash = ?1", [token_hash])?;
        Ok(affected > 0)
    }

    /// Delete every session that expired before `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_expired_sessions(&self, at: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn()?.execute(
            "DELETE FROM auth_sessions WHERE expires_at <= ?1",
            [time_text(at)],
        )?;
        if affected > 0 {
            debug!("Removed {} expired sessions", affected);
        }
        Ok(affected)
    }
}

fn row_to_identity(row: &Row<'_>) -> rusqlite::Result<IdentityRecord> {
    Ok(IdentityRecord {
        id: uuid_at(row, 0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: time_at(row, 3)?,
        last_sign_in_at: opt_time_at(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::storage::test_support;

    fn session(identity_id: Uuid, token_hash: &str, ttl: Duration) -> SessionRecord {
        let created_at = now();
        SessionRecord {
            token_hash: token_hash.to_string(),
            identity_id,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    #[test]
    fn test_identity_email_lookup_ignores_case() {
        let storage = test_support::storage();
        let record = storage.insert_identity("Ada@Example.com", "$argon2id$x").unwrap();

        let found = storage
            .find_identity_by_email("ada@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, record.id);
        assert!(storage.find_identity_by_email("bob@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let storage = test_support::storage();
        storage.insert_identity("ada@example.com", "h").unwrap();
        assert!(storage.insert_identity("ADA@example.com", "h").is_err());
    }

    #[test]
    fn test_touch_last_sign_in() {
        let storage = test_support::storage();
        let record = storage.insert_identity("ada@example.com", "h").unwrap();
        assert!(record.last_sign_in_at.is_none());

        let at = now();
        storage.touch_last_sign_in(record.id, at).unwrap();
        let row = storage.get_identity(record.id).unwrap().unwrap();
        assert_eq!(row.last_sign_in_at, Some(at));
    }

    #[test]
    fn test_session_round_trip_and_delete() {
        let storage = test_support::storage();
        let identity = storage.insert_identity("ada@example.com", "h").unwrap();
        let record = session(identity.id, "abc", Duration::hours(1));

        storage.insert_session(&record).unwrap();
        assert_eq!(storage.find_session("abc").unwrap(), Some(record));

        assert!(storage.delete_session("abc").unwrap());
        assert!(!storage.delete_session("abc").unwrap());
        assert!(storage.find_session("abc").unwrap().is_none());
    }

    #[test]
    fn test_delete_expired_sessions() {
        let storage = test_support::storage();
        let identity = storage.insert_identity("ada@example.com", "h").unwrap();
        storage
            .insert_session(&session(identity.id, "old", Duration::hours(-1)))
            .unwrap();
        storage
            .insert_session(&session(identity.id, "new", Duration::hours(1)))
            .unwrap();

        assert_eq!(storage.delete_expired_sessions(now()).unwrap(), 1);
        assert!(storage.find_session("old").unwrap().is_none());
        assert!(storage.find_session("new").unwrap().is_some());
    }

    #[test]
    fn test_session_expiry_check() {
        let record = session(Uuid::new_v4(), "t", Duration::minutes(5));
        assert!(!record.is_expired_at(record.created_at));
        assert!(record.is_expired_at(record.expires_at));
    }
}
