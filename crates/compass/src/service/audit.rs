use super::{deny, Services};
use crate::access;
use crate::error::{Error, Result};
use crate::model::{AuditEntry, UserProfile};

impl Services {
    /// The newest `limit` audit entries. Owners and administrators only.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` for other roles and
    /// `Error::InvalidInput` for a zero limit.
    pub fn recent_audit(&self, actor: &UserProfile, limit: u32) -> Result<Vec<AuditEntry>> {
        if !access::is_owner_or_admin(actor) {
            return Err(deny(actor, "audit.list"));
        }
        if limit == 0 {
            return Err(Error::invalid_input("limit must be greater than 0"));
        }
        self.storage.recent_audit(i64::from(limit))
    }
}
