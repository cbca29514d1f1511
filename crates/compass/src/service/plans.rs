use serde_json::json;
use uuid::Uuid;

use super::{deny, ensure_active, non_empty, Services};
use crate::access;
use crate::error::{Error, Result};
use crate::model::{PlanUpdate, UserProfile, UserRole};
use crate::storage::plans;

impl Services {
    /// Post an update to one or more roles. Directors and above.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` for managers and `Error::InvalidInput`
    /// for blank content or no target roles.
    pub fn post_plan_update(
        &self,
        actor: &UserProfile,
        content: &str,
        target_roles: &[UserRole],
    ) -> Result<PlanUpdate> {
        const ACTION: &str = "plan.post";
        if !access::is_director_or_above(actor) {
            return Err(deny(actor, ACTION));
        }
        let content = non_empty("content", content)?;
        let mut roles: Vec<UserRole> = Vec::with_capacity(target_roles.len());
        for role in target_roles {
            if !roles.contains(role) {
                roles.push(*role);
            }
        }
        if roles.is_empty() {
            return Err(Error::invalid_input("at least one target role is required"));
        }

        self.record(
            actor,
            ACTION,
            |conn| plans::insert_plan_update(conn, actor.uid, &content, &roles),
            |update| json!({ "plan_update_id": update.id, "target_roles": roles }),
        )
    }

    /// Updates addressed to the actor's role, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_plan_updates(&self, actor: &UserProfile) -> Result<Vec<PlanUpdate>> {
        Ok(self
            .storage
            .list_plan_updates()?
            .into_iter()
            .filter(|update| update.targets(actor.role))
            .collect())
    }

    /// Acknowledge an update addressed to the actor's role. Repeating it
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown update and
    /// `Error::AccessDenied` for one not addressed to the actor.
    pub fn acknowledge_plan_update(
        &self,
        actor: &UserProfile,
        update_id: Uuid,
    ) -> Result<PlanUpdate> {
        const ACTION: &str = "plan.acknowledge";
        ensure_active(actor, ACTION)?;
        let update = self
            .storage
            .get_plan_update(update_id)?
            .ok_or_else(|| Error::not_found("plan_updates", update_id))?;
        if !update.targets(actor.role) {
            return Err(deny(actor, ACTION));
        }
        if update.is_acknowledged_by(actor.uid) {
            return Ok(update);
        }

        self.record(
            actor,
            ACTION,
            |conn| plans::add_acknowledgement(conn, update_id, actor.uid),
            |_| json!({ "plan_update_id": update_id }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures::world;

    #[test]
    fn test_post_plan_update_permissions() {
        let w = world();
        assert!(w
            .services
            .post_plan_update(&w.manager, "Hello", &[UserRole::Manager])
            .unwrap_err()
            .is_access_denied());

        let update = w
            .services
            .post_plan_update(
                &w.director,
                "Focus on retention",
                &[UserRole::Manager, UserRole::Manager],
            )
            .unwrap();
        assert_eq!(update.target_roles, vec![UserRole::Manager]);
    }

    #[test]
    fn test_post_plan_update_validation() {
        let w = world();
        let no_roles = w.services.post_plan_update(&w.owner, "Hello", &[]).unwrap_err();
        assert!(matches!(no_roles, Error::InvalidInput { .. }));

        let blank = w
            .services
            .post_plan_update(&w.owner, "  ", &[UserRole::Director])
            .unwrap_err();
        assert!(matches!(blank, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_list_filters_by_role() {
        let w = world();
        w.services
            .post_plan_update(&w.owner, "For managers", &[UserRole::Manager])
            .unwrap();
        w.services
            .post_plan_update(&w.owner, "For directors", &[UserRole::Director])
            .unwrap();

        let seen: Vec<_> = w
            .services
            .list_plan_updates(&w.manager)
            .unwrap()
            .into_iter()
            .map(|u| u.content)
            .collect();
        assert_eq!(seen, vec!["For managers"]);
        assert!(w.services.list_plan_updates(&w.admin).unwrap().is_empty());
    }

    #[test]
    fn test_acknowledge_is_idempotent() {
        let w = world();
        let update = w
            .services
            .post_plan_update(&w.owner, "For managers", &[UserRole::Manager])
            .unwrap();

        w.services.acknowledge_plan_update(&w.manager, update.id).unwrap();
        let again = w
            .services
            .acknowledge_plan_update(&w.manager, update.id)
            .unwrap();
        assert_eq!(again.acknowledged_by, vec![w.manager.uid]);

        let acknowledgements = w
            .storage
            .recent_audit(10)
            .unwrap()
            .into_iter()
            .filter(|e| e.action == "plan.acknowledge")
            .count();
        assert_eq!(acknowledgements, 1);

        assert!(w
            .services
            .acknowledge_plan_update(&w.director, update.id)
            .unwrap_err()
            .is_access_denied());
    }
}
