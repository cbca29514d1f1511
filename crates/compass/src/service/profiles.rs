use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{deny, ensure_active, non_empty, Services};
use crate::access;
use crate::error::{Error, Result};
use crate::model::{display_name, AccessGrant, ProfileEdit, UserProfile, UserRole, UserStatus};
use crate::storage::profiles;

impl Services {
    /// Change the actor's own name or position. The display name follows the
    /// new name.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty edit or a blank field.
    pub fn update_own_profile(&self, actor: &UserProfile, edit: &ProfileEdit) -> Result<UserProfile> {
        const ACTION: &str = "profile.update";
        ensure_active(actor, ACTION)?;
        if edit.is_empty() {
            return Err(Error::invalid_input("nothing to update"));
        }

        let mut profile = self.fetch(actor.uid)?;
        if let Some(first) = &edit.first_name {
            profile.first_name = non_empty("first name", first)?;
        }
        if let Some(last) = &edit.last_name {
            profile.last_name = non_empty("last name", last)?;
        }
        if let Some(position) = &edit.position {
            profile.position = non_empty("position", position)?;
        }
        profile.display_name = display_name(&profile.first_name, &profile.last_name);

        self.record(
            actor,
            ACTION,
            |conn| profiles::save_profile(conn, &profile),
            |_| json!({ "uid": actor.uid }),
        )
    }

    /// Mark the actor's manager onboarding as done.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor's profile cannot be read or written.
    pub fn complete_manager_setup(&self, actor: &UserProfile) -> Result<UserProfile> {
        const ACTION: &str = "profile.setup_complete";
        ensure_active(actor, ACTION)?;
        let mut profile = self.fetch(actor.uid)?;
        if profile.manager_setup_complete {
            return Ok(profile);
        }
        profile.manager_setup_complete = true;
        self.record(
            actor,
            ACTION,
            |conn| profiles::save_profile(conn, &profile),
            |_| json!({ "uid": actor.uid }),
        )
    }

    /// Set another user's role and scope. Owners and administrators only; an
    /// administrator cannot make anyone an owner.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` when the actor may not make this grant
    /// and `Error::NotFound` for an unknown user or unit.
    pub fn assign_access(
        &self,
        actor: &UserProfile,
        target: Uuid,
        grant: &AccessGrant,
    ) -> Result<UserProfile> {
        const ACTION: &str = "profile.assign_access";
        if !access::is_owner_or_admin(actor) {
            return Err(deny(actor, ACTION));
        }
        if grant.role == UserRole::Owner && actor.role != UserRole::Owner {
            return Err(deny(actor, ACTION));
        }
        self.check_units(grant)?;

        let mut profile = self.fetch(target)?;
        profile.role = grant.role;
        profile.holding_company_id = grant.holding_company_id;
        profile.subsidiary_ids = dedup(&grant.subsidiary_ids);
        profile.division_ids = dedup(&grant.division_ids);

        let saved = self.record(
            actor,
            ACTION,
            |conn| profiles::save_profile(conn, &profile),
            |saved| {
                json!({
                    "uid": target,
                    "role": grant.role,
                    "holding_company_id": grant.holding_company_id,
                    "subsidiary_ids": saved.subsidiary_ids,
                    "division_ids": saved.division_ids,
                })
            },
        )?;
        info!("{} is now {}", saved.display_name, saved.role);
        Ok(saved)
    }

    /// Activate or deactivate a user. Owners and administrators only.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` for other roles and `Error::NotFound`
    /// for an unknown user.
    pub fn set_user_status(
        &self,
        actor: &UserProfile,
        target: Uuid,
        status: UserStatus,
    ) -> Result<UserProfile> {
        const ACTION: &str = "profile.set_status";
        if !access::is_owner_or_admin(actor) {
            return Err(deny(actor, ACTION));
        }
        let mut profile = self.fetch(target)?;
        profile.status = status;
        self.record(
            actor,
            ACTION,
            |conn| profiles::save_profile(conn, &profile),
            |_| json!({ "uid": target, "status": status }),
        )
    }

    /// Every profile. Owners and administrators only.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` for other roles.
    pub fn list_profiles(&self, actor: &UserProfile) -> Result<Vec<UserProfile>> {
        if !access::is_owner_or_admin(actor) {
            return Err(deny(actor, "profile.list"));
        }
        self.storage.list_profiles()
    }

    fn fetch(&self, uid: Uuid) -> Result<UserProfile> {
        self.storage
            .get_profile(uid)?
            .ok_or_else(|| Error::not_found("users", uid))
    }

    fn check_units(&self, grant: &AccessGrant) -> Result<()> {
        if let Some(id) = grant.holding_company_id {
            self.storage
                .get_holding_company(id)?
                .ok_or_else(|| Error::not_found("holding_companies", id))?;
        }
        for &id in &grant.subsidiary_ids {
            self.storage
                .get_subsidiary(id)?
                .ok_or_else(|| Error::not_found("subsidiaries", id))?;
        }
        for &id in &grant.division_ids {
            self.storage
                .get_division(id)?
                .ok_or_else(|| Error::not_found("divisions", id))?;
        }
        Ok(())
    }
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures::world;

    #[test]
    fn test_update_own_profile_recomputes_display_name() {
        let w = world();
        let updated = w
            .services
            .update_own_profile(
                &w.manager,
                &ProfileEdit {
                    last_name: Some("Lisa".to_string()),
                    position: Some("Regional Lead".to_string()),
                    ..ProfileEdit::default()
                },
            )
            .unwrap();

        assert_eq!(updated.display_name, "Mona Lisa");
        assert_eq!(updated.position, "Regional Lead");
        assert_eq!(
            w.storage.get_profile(w.manager.uid).unwrap().unwrap().display_name,
            "Mona Lisa"
        );
    }

    #[test]
    fn test_update_rejects_empty_edit() {
        let w = world();
        let err = w
            .services
            .update_own_profile(&w.manager, &ProfileEdit::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_complete_manager_setup() {
        let w = world();
        let done = w.services.complete_manager_setup(&w.manager).unwrap();
        assert!(done.manager_setup_complete);

        w.services.complete_manager_setup(&w.manager).unwrap();
        let entries = w.storage.recent_audit(10).unwrap();
        assert_eq!(
            entries
                .iter()
                .filter(|e| e.action == "profile.setup_complete")
                .count(),
            1
        );
    }

    #[test]
    fn test_assign_access() {
        let w = world();
        let h = &w.hierarchy;
        let grant = AccessGrant {
            role: UserRole::Director,
            holding_company_id: Some(h.holding.id),
            subsidiary_ids: vec![h.subsidiary.id, h.subsidiary.id],
            division_ids: Vec::new(),
        };

        let promoted = w
            .services
            .assign_access(&w.admin, w.outsider.uid, &grant)
            .unwrap();
        assert_eq!(promoted.role, UserRole::Director);
        assert_eq!(promoted.subsidiary_ids, vec![h.subsidiary.id]);
    }

    #[test]
    fn test_only_owner_grants_owner() {
        let w = world();
        let grant = AccessGrant {
            role: UserRole::Owner,
            holding_company_id: None,
            subsidiary_ids: Vec::new(),
            division_ids: Vec::new(),
        };

        assert!(w
            .services
            .assign_access(&w.admin, w.outsider.uid, &grant)
            .unwrap_err()
            .is_access_denied());
        assert!(w
            .services
            .assign_access(&w.owner, w.outsider.uid, &grant)
            .is_ok());
        assert!(w
            .services
            .assign_access(&w.director, w.outsider.uid, &grant)
            .unwrap_err()
            .is_access_denied());
    }

    #[test]
    fn test_assign_access_checks_units() {
        let w = world();
        let grant = AccessGrant {
            role: UserRole::Manager,
            holding_company_id: None,
            subsidiary_ids: Vec::new(),
            division_ids: vec![Uuid::new_v4()],
        };
        assert!(w
            .services
            .assign_access(&w.owner, w.outsider.uid, &grant)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_deactivated_user_loses_access() {
        let w = world();
        let inactive = w
            .services
            .set_user_status(&w.owner, w.manager.uid, UserStatus::Inactive)
            .unwrap();
        assert_eq!(inactive.status, UserStatus::Inactive);
        assert!(w
            .services
            .list_visible_divisions(&inactive)
            .unwrap()
            .is_empty());

        assert!(w
            .services
            .set_user_status(&w.manager, w.owner.uid, UserStatus::Inactive)
            .unwrap_err()
            .is_access_denied());
    }

    #[test]
    fn test_list_profiles_requires_owner_or_admin() {
        let w = world();
        assert_eq!(w.services.list_profiles(&w.admin).unwrap().len(), 5);
        assert!(w
            .services
            .list_profiles(&w.manager)
            .unwrap_err()
            .is_access_denied());
    }
}
