//! Role-based visibility rules.
//!
//! Owners and administrators see every division of their holding company (or
//! every division at all while no holding company is assigned). Directors see
//! the subsidiaries they are given plus any individually listed division.
//! Managers see only their listed divisions. Inactive accounts see nothing.

use uuid::Uuid;

use crate::model::{DivisionScope, UserProfile, UserRole};

/// Owner or administrator, and active.
#[must_use]
pub fn is_owner_or_admin(profile: &UserProfile) -> bool {
    profile.is_active() && matches!(profile.role, UserRole::Owner | UserRole::Administrator)
}

/// Whether `profile` may see the division at `scope`.
#[must_use]
pub fn can_access_division(profile: &UserProfile, scope: &DivisionScope) -> bool {
    if !profile.is_active() {
        return false;
    }
    match profile.role {
        UserRole::Owner | UserRole::Administrator => {
            within_holding_company(profile, scope.holding_company_id)
        }
        UserRole::Director => {
            profile.subsidiary_ids.contains(&scope.subsidiary_id)
                || profile.division_ids.contains(&scope.division_id)
        }
        UserRole::Manager => profile.division_ids.contains(&scope.division_id),
    }
}

/// Whether `profile` may see a subsidiary of `holding_company_id`.
#[must_use]
pub fn can_access_subsidiary(
    profile: &UserProfile,
    subsidiary_id: Uuid,
    holding_company_id: Uuid,
) -> bool {
    if !profile.is_active() {
        return false;
    }
    match profile.role {
        UserRole::Owner | UserRole::Administrator => {
            within_holding_company(profile, holding_company_id)
        }
        UserRole::Director => profile.subsidiary_ids.contains(&subsidiary_id),
        UserRole::Manager => false,
    }
}

/// Directors and above.
#[must_use]
pub fn is_director_or_above(profile: &UserProfile) -> bool {
    profile.is_active() && profile.role != UserRole::Manager
}

fn within_holding_company(profile: &UserProfile, holding_company_id: Uuid) -> bool {
    profile
        .holding_company_id
        .map_or(true, |own| own == holding_company_id)
}
