//! Access checks keyed by ids, resolved against stored rows.

use uuid::Uuid;

use super::Storage;
use crate::access;
use crate::error::Result;

impl Storage {
    /// Whether the user `uid` may see `division_id`. Unknown users and
    /// unknown divisions are never accessible.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn can_access_division(&self, uid: Uuid, division_id: Uuid) -> Result<bool> {
        let Some(profile) = self.get_profile(uid)? else {
            return Ok(false);
        };
        let Some(scope) = self.division_scope(division_id)? else {
            return Ok(false);
        };
        Ok(access::can_access_division(&profile, &scope))
    }

    /// Whether the user `uid` is an active owner or administrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn is_owner_or_admin(&self, uid: Uuid) -> Result<bool> {
        Ok(self
            .get_profile(uid)?
            .is_some_and(|profile| access::is_owner_or_admin(&profile)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccessGrant, UserRole};
    use crate::storage::test_support;

    #[test]
    fn test_manager_division_access() {
        let storage = test_support::storage();
        let h = test_support::hierarchy(&storage);
        let manager = test_support::profile(&storage, "Ada", UserRole::Manager);
        assert!(!storage.can_access_division(manager.uid, h.division.id).unwrap());

        test_support::grant(
            &storage,
            &manager,
            AccessGrant {
                role: UserRole::Manager,
                holding_company_id: None,
                subsidiary_ids: Vec::new(),
                division_ids: vec![h.division.id],
            },
        );
        assert!(storage.can_access_division(manager.uid, h.division.id).unwrap());
    }

    #[test]
    fn test_unknown_ids_denied() {
        let storage = test_support::storage();
        let h = test_support::hierarchy(&storage);
        let owner = test_support::profile(&storage, "Boss", UserRole::Owner);

        assert!(!storage.can_access_division(Uuid::new_v4(), h.division.id).unwrap());
        assert!(!storage.can_access_division(owner.uid, Uuid::new_v4()).unwrap());
        assert!(storage.can_access_division(owner.uid, h.division.id).unwrap());
    }

    #[test]
    fn test_is_owner_or_admin_by_uid() {
        let storage = test_support::storage();
        let owner = test_support::profile(&storage, "Boss", UserRole::Owner);
        let manager = test_support::profile(&storage, "Ada", UserRole::Manager);

        assert!(storage.is_owner_or_admin(owner.uid).unwrap());
        assert!(!storage.is_owner_or_admin(manager.uid).unwrap());
        assert!(!storage.is_owner_or_admin(Uuid::new_v4()).unwrap());
    }
}
