//! Role-checked operations on the application tables.
//!
//! Every operation takes the acting profile, checks it against the rules in
//! [`crate::access`], and appends an audit entry for each change it makes.
//! A change and its entry commit together or not at all.
//! Refusals are logged at `warn` and returned as `Error::AccessDenied`.

mod audit;
mod goals;
mod orgs;
mod plans;
mod profiles;
mod reports;
mod reviews;

use std::sync::Arc;

use rusqlite::Connection;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{DivisionScope, UserProfile};
use crate::storage::Storage;

/// Entry point for the role-checked operations.
#[derive(Debug, Clone)]
pub struct Services {
    storage: Arc<Storage>,
}

impl Services {
    /// Operations over `storage`.
    #[must_use]
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// The underlying store.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Apply `op` and append its audit entry for `actor` in one
    /// transaction.
    fn record<T>(
        &self,
        actor: &UserProfile,
        action: &str,
        op: impl FnOnce(&Connection) -> Result<T>,
        details: impl FnOnce(&T) -> Value,
    ) -> Result<T> {
        self.storage.audited(Some(actor.uid), action, op, details)
    }

    fn scope(&self, division_id: Uuid) -> Result<DivisionScope> {
        self.storage
            .division_scope(division_id)?
            .ok_or_else(|| Error::not_found("divisions", division_id))
    }
}

/// Log and build a refusal for `action`.
fn deny(actor: &UserProfile, action: &str) -> Error {
    warn!("Denied {} to {} ({})", action, actor.uid, actor.role);
    Error::access_denied(action)
}

/// Refuse every operation to inactive accounts.
fn ensure_active(actor: &UserProfile, action: &str) -> Result<()> {
    if actor.is_active() {
        Ok(())
    } else {
        Err(deny(actor, action))
    }
}

/// Trimmed `value`, or an error naming `field` when it is blank.
fn non_empty(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::invalid_input(format!("{field} must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}
