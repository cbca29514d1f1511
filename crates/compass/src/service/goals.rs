use serde_json::json;
use uuid::Uuid;

use super::{deny, ensure_active, non_empty, Services};
use crate::access;
use crate::error::{Error, Result};
use crate::model::{Goal, GoalStatus, NewGoal, UserProfile};
use crate::storage::goals;

impl Services {
    /// Create a goal owned by the actor. Linked units must be visible to
    /// the actor.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for a blank title, `Error::NotFound` for
    /// an unknown unit and `Error::AccessDenied` for a unit the actor cannot
    /// see.
    pub fn create_goal(&self, actor: &UserProfile, new: &NewGoal) -> Result<Goal> {
        const ACTION: &str = "goal.create";
        ensure_active(actor, ACTION)?;
        let title = non_empty("title", &new.title)?;

        if let Some(division_id) = new.related_division_id {
            let scope = self.scope(division_id)?;
            if !access::can_access_division(actor, &scope) {
                return Err(deny(actor, ACTION));
            }
        }
        if let Some(subsidiary_id) = new.related_subsidiary_id {
            let subsidiary = self
                .storage
                .get_subsidiary(subsidiary_id)?
                .ok_or_else(|| Error::not_found("subsidiaries", subsidiary_id))?;
            if !access::can_access_subsidiary(actor, subsidiary.id, subsidiary.holding_company_id) {
                return Err(deny(actor, ACTION));
            }
        }

        let new = NewGoal {
            title,
            ..new.clone()
        };
        self.record(
            actor,
            ACTION,
            |conn| goals::insert_goal(conn, actor.uid, &new),
            |goal| json!({ "goal_id": goal.id }),
        )
    }

    /// The actor's goals, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_own_goals(&self, actor: &UserProfile) -> Result<Vec<Goal>> {
        self.storage.list_goals_for_user(actor.uid)
    }

    /// Move a goal to `status`. Allowed for the goal's owner and for owners
    /// and administrators.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown goal and
    /// `Error::AccessDenied` for anyone else.
    pub fn set_goal_status(
        &self,
        actor: &UserProfile,
        goal_id: Uuid,
        status: GoalStatus,
    ) -> Result<Goal> {
        const ACTION: &str = "goal.status";
        ensure_active(actor, ACTION)?;
        let goal = self.goal(goal_id)?;
        if goal.user_id != actor.uid && !access::is_owner_or_admin(actor) {
            return Err(deny(actor, ACTION));
        }

        self.record(
            actor,
            ACTION,
            |conn| goals::set_goal_status(conn, goal_id, status),
            |_| json!({ "goal_id": goal_id, "from": goal.status, "to": status }),
        )
    }

    pub(super) fn goal(&self, goal_id: Uuid) -> Result<Goal> {
        self.storage
            .get_goal(goal_id)?
            .ok_or_else(|| Error::not_found("goals", goal_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures::world;

    fn titled(title: &str) -> NewGoal {
        NewGoal {
            title: title.to_string(),
            ..NewGoal::default()
        }
    }

    #[test]
    fn test_create_goal_owned_by_actor() {
        let w = world();
        let goal = w
            .services
            .create_goal(
                &w.manager,
                &NewGoal {
                    related_division_id: Some(w.hierarchy.division.id),
                    ..titled("Raise NPS")
                },
            )
            .unwrap();

        assert_eq!(goal.user_id, w.manager.uid);
        assert_eq!(goal.status, GoalStatus::NotStarted);
        assert_eq!(w.services.list_own_goals(&w.manager).unwrap(), vec![goal]);

        let audit = w.storage.recent_audit(1).unwrap();
        assert_eq!(audit[0].action, "goal.create");
    }

    #[test]
    fn test_create_goal_requires_visible_units() {
        let w = world();
        let linked = NewGoal {
            related_division_id: Some(w.hierarchy.division.id),
            ..titled("Raise NPS")
        };
        assert!(w
            .services
            .create_goal(&w.outsider, &linked)
            .unwrap_err()
            .is_access_denied());

        let subsidiary_link = NewGoal {
            related_subsidiary_id: Some(w.hierarchy.subsidiary.id),
            ..titled("Consolidate")
        };
        assert!(w
            .services
            .create_goal(&w.manager, &subsidiary_link)
            .unwrap_err()
            .is_access_denied());
        assert!(w.services.create_goal(&w.director, &subsidiary_link).is_ok());

        let unknown = NewGoal {
            related_division_id: Some(Uuid::new_v4()),
            ..titled("Ghost")
        };
        assert!(w
            .services
            .create_goal(&w.owner, &unknown)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_create_goal_rejects_blank_title() {
        let w = world();
        let err = w.services.create_goal(&w.manager, &titled("  ")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_set_goal_status_permissions() {
        let w = world();
        let goal = w.services.create_goal(&w.manager, &titled("Ship")).unwrap();

        let progressed = w
            .services
            .set_goal_status(&w.manager, goal.id, GoalStatus::InProgress)
            .unwrap();
        assert_eq!(progressed.status, GoalStatus::InProgress);

        assert!(w
            .services
            .set_goal_status(&w.director, goal.id, GoalStatus::Archived)
            .unwrap_err()
            .is_access_denied());

        let archived = w
            .services
            .set_goal_status(&w.admin, goal.id, GoalStatus::Archived)
            .unwrap();
        assert_eq!(archived.status, GoalStatus::Archived);
    }

    #[test]
    fn test_goal_not_kept_when_audit_fails() {
        let w = world();
        w.storage
            .conn()
            .unwrap()
            .execute_batch("DROP TABLE audit_logs")
            .unwrap();

        assert!(w.services.create_goal(&w.manager, &titled("Ship")).is_err());
        assert!(w.services.list_own_goals(&w.manager).unwrap().is_empty());
    }

    #[test]
    fn test_goal_status_unchanged_when_audit_fails() {
        let w = world();
        let goal = w.services.create_goal(&w.manager, &titled("Ship")).unwrap();
        w.storage
            .conn()
            .unwrap()
            .execute_batch("DROP TABLE audit_logs")
            .unwrap();

        assert!(w
            .services
            .set_goal_status(&w.manager, goal.id, GoalStatus::Completed)
            .is_err());
        assert_eq!(w.services.goal(goal.id).unwrap().status, GoalStatus::NotStarted);
    }
}
