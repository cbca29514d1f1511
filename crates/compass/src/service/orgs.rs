use std::collections::HashMap;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{deny, ensure_active, non_empty, Services};
use crate::access;
use crate::error::{Error, Result};
use crate::model::{Division, DivisionScope, HoldingCompany, NewDivision, Subsidiary, UserProfile};
use crate::storage::orgs;

impl Services {
    /// Create a holding company. Owners and administrators only.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` for other roles and `Error::InvalidInput`
    /// for a blank name.
    pub fn create_holding_company(
        &self,
        actor: &UserProfile,
        name: &str,
    ) -> Result<HoldingCompany> {
        const ACTION: &str = "holding_company.create";
        if !access::is_owner_or_admin(actor) {
            return Err(deny(actor, ACTION));
        }
        let name = non_empty("name", name)?;
        let company = self.record(
            actor,
            ACTION,
            |conn| orgs::insert_holding_company(conn, &name),
            |company| json!({ "holding_company_id": company.id }),
        )?;
        info!("Created holding company {}", company.name);
        Ok(company)
    }

    /// Create a subsidiary under a holding company the actor belongs to.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown parent and
    /// `Error::AccessDenied` unless the actor is an owner or administrator of
    /// that holding company.
    pub fn create_subsidiary(
        &self,
        actor: &UserProfile,
        name: &str,
        holding_company_id: Uuid,
    ) -> Result<Subsidiary> {
        const ACTION: &str = "subsidiary.create";
        if !access::is_owner_or_admin(actor) {
            return Err(deny(actor, ACTION));
        }
        let name = non_empty("name", name)?;
        self.storage
            .get_holding_company(holding_company_id)?
            .ok_or_else(|| Error::not_found("holding_companies", holding_company_id))?;
        if actor
            .holding_company_id
            .is_some_and(|own| own != holding_company_id)
        {
            return Err(deny(actor, ACTION));
        }

        let subsidiary = self.record(
            actor,
            ACTION,
            |conn| orgs::insert_subsidiary(conn, &name, holding_company_id),
            |subsidiary| {
                json!({ "subsidiary_id": subsidiary.id, "holding_company_id": holding_company_id })
            },
        )?;
        info!("Created subsidiary {}", subsidiary.name);
        Ok(subsidiary)
    }

    /// Create a division under a subsidiary the actor can see.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown subsidiary,
    /// `Error::InvalidInput` for a blank name or an end date before the start
    /// date, and `Error::AccessDenied` unless the actor is an owner or
    /// administrator with access to the subsidiary.
    pub fn create_division(&self, actor: &UserProfile, new: &NewDivision) -> Result<Division> {
        const ACTION: &str = "division.create";
        if !access::is_owner_or_admin(actor) {
            return Err(deny(actor, ACTION));
        }
        let name = non_empty("name", &new.name)?;
        if new.end_date.is_some_and(|end| end < new.start_date) {
            return Err(Error::invalid_input("end date is before start date"));
        }
        let subsidiary = self
            .storage
            .get_subsidiary(new.subsidiary_id)?
            .ok_or_else(|| Error::not_found("subsidiaries", new.subsidiary_id))?;
        if !access::can_access_subsidiary(actor, subsidiary.id, subsidiary.holding_company_id) {
            return Err(deny(actor, ACTION));
        }

        let new = NewDivision {
            name,
            ..new.clone()
        };
        let division = self.record(
            actor,
            ACTION,
            |conn| orgs::insert_division(conn, &new),
            |division| json!({ "division_id": division.id, "subsidiary_id": subsidiary.id }),
        )?;
        info!("Created division {}", division.name);
        Ok(division)
    }

    /// Divisions the actor can see, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_visible_divisions(&self, actor: &UserProfile) -> Result<Vec<Division>> {
        let parents: HashMap<Uuid, Uuid> = self
            .storage
            .list_subsidiaries(None)?
            .into_iter()
            .map(|s| (s.id, s.holding_company_id))
            .collect();

        Ok(self
            .storage
            .list_divisions()?
            .into_iter()
            .filter(|division| {
                parents.get(&division.subsidiary_id).is_some_and(|&holding| {
                    access::can_access_division(
                        actor,
                        &DivisionScope {
                            division_id: division.id,
                            subsidiary_id: division.subsidiary_id,
                            holding_company_id: holding,
                        },
                    )
                })
            })
            .collect())
    }

    /// Replace a division's strategic plan. `None` or a blank plan clears it.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` unless the actor is a director or above
    /// with access to the division.
    pub fn set_strategic_plan(
        &self,
        actor: &UserProfile,
        division_id: Uuid,
        plan: Option<&str>,
    ) -> Result<Division> {
        const ACTION: &str = "division.set_plan";
        ensure_active(actor, ACTION)?;
        let scope = self.scope(division_id)?;
        if !(access::is_director_or_above(actor) && access::can_access_division(actor, &scope)) {
            return Err(deny(actor, ACTION));
        }

        let plan = plan.map(str::trim).filter(|p| !p.is_empty());
        self.record(
            actor,
            ACTION,
            |conn| orgs::set_strategic_plan(conn, division_id, plan),
            |_| json!({ "division_id": division_id }),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::service::fixtures::world;

    fn new_division(subsidiary_id: Uuid, name: &str) -> NewDivision {
        NewDivision {
            name: name.to_string(),
            subsidiary_id,
            strategic_plan: None,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: None,
        }
    }

    #[test]
    fn test_create_holding_company_roles() {
        let w = world();
        let company = w
            .services
            .create_holding_company(&w.owner, "  Globex  ")
            .unwrap();
        assert_eq!(company.name, "Globex");

        let err = w
            .services
            .create_holding_company(&w.director, "Initech")
            .unwrap_err();
        assert!(err.is_access_denied());

        let audit = w.storage.recent_audit(10).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "holding_company.create");
        assert_eq!(audit[0].user_id, Some(w.owner.uid));
    }

    #[test]
    fn test_create_subsidiary_respects_holding_company() {
        let w = world();
        let mut admin = w.admin.clone();
        admin.holding_company_id = Some(w.hierarchy.holding.id);

        assert!(w
            .services
            .create_subsidiary(&admin, "Acme Logistics", w.hierarchy.holding.id)
            .is_ok());

        let other = w.storage.insert_holding_company("Other").unwrap();
        let err = w
            .services
            .create_subsidiary(&admin, "Elsewhere", other.id)
            .unwrap_err();
        assert!(err.is_access_denied());

        let err = w
            .services
            .create_subsidiary(&admin, "Nowhere", Uuid::new_v4())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_division_validates_dates() {
        let w = world();
        let mut new = new_division(w.hierarchy.subsidiary.id, "Southeast");
        new.end_date = NaiveDate::from_ymd_opt(2025, 12, 31);

        let err = w.services.create_division(&w.owner, &new).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));

        new.end_date = NaiveDate::from_ymd_opt(2026, 12, 31);
        let division = w.services.create_division(&w.owner, &new).unwrap();
        assert_eq!(division.end_date, new.end_date);
    }

    #[test]
    fn test_managers_cannot_create_divisions() {
        let w = world();
        let new = new_division(w.hierarchy.subsidiary.id, "Southeast");
        assert!(w
            .services
            .create_division(&w.manager, &new)
            .unwrap_err()
            .is_access_denied());
    }

    #[test]
    fn test_list_visible_divisions_by_role() {
        let w = world();
        let second = w
            .services
            .create_division(&w.owner, &new_division(w.hierarchy.subsidiary.id, "Alpha"))
            .unwrap();

        assert_eq!(w.services.list_visible_divisions(&w.owner).unwrap().len(), 2);
        assert_eq!(
            w.services.list_visible_divisions(&w.director).unwrap().len(),
            2
        );

        let manager_view = w.services.list_visible_divisions(&w.manager).unwrap();
        assert_eq!(manager_view.len(), 1);
        assert_eq!(manager_view[0].id, w.hierarchy.division.id);
        assert_ne!(manager_view[0].id, second.id);

        assert!(w
            .services
            .list_visible_divisions(&w.outsider)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_set_strategic_plan_permissions() {
        let w = world();
        let division_id = w.hierarchy.division.id;

        let updated = w
            .services
            .set_strategic_plan(&w.director, division_id, Some("Grow 10%"))
            .unwrap();
        assert_eq!(updated.strategic_plan.as_deref(), Some("Grow 10%"));

        let err = w
            .services
            .set_strategic_plan(&w.manager, division_id, Some("Mine now"))
            .unwrap_err();
        assert!(err.is_access_denied());

        let cleared = w
            .services
            .set_strategic_plan(&w.owner, division_id, Some("   "))
            .unwrap();
        assert!(cleared.strategic_plan.is_none());
    }
}
