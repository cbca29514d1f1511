//! The application-level user record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::{UserRole, UserStatus};

/// A row of the `users` table.
///
/// Distinct from the identity service's record: `uid` is the identity id,
/// everything else belongs to the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity id; primary key.
    pub uid: Uuid,
    /// Email copied from the identity at sign-up.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// `"<first> <last>"`, recomputed on name edits.
    pub display_name: String,
    /// Free-text job title.
    pub position: String,
    /// Access tier.
    pub role: UserRole,
    /// Holding company the user belongs to, if assigned.
    pub holding_company_id: Option<Uuid>,
    /// Subsidiaries this user may see.
    pub subsidiary_ids: Vec<Uuid>,
    /// Divisions this user may see.
    pub division_ids: Vec<Uuid>,
    /// Set once the manager has finished onboarding.
    pub manager_setup_complete: bool,
    /// Account status.
    pub status: UserStatus,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Whether the account may act at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Values for a profile insert.
///
/// The only constructor, [`NewProfile::for_sign_up`], fixes the role and
/// access fields so a fresh account is always an unconfigured manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub(crate) uid: Uuid,
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) display_name: String,
    pub(crate) position: String,
    pub(crate) role: UserRole,
    pub(crate) subsidiary_ids: Vec<Uuid>,
    pub(crate) division_ids: Vec<Uuid>,
    pub(crate) manager_setup_complete: bool,
    pub(crate) status: UserStatus,
}

impl NewProfile {
    /// Profile for a freshly signed-up identity.
    #[must_use]
    pub fn for_sign_up(
        uid: Uuid,
        email: &str,
        first_name: &str,
        last_name: &str,
        position: &str,
    ) -> Self {
        Self {
            uid,
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            display_name: display_name(first_name, last_name),
            position: position.to_string(),
            role: UserRole::Manager,
            subsidiary_ids: Vec::new(),
            division_ids: Vec::new(),
            manager_setup_complete: false,
            status: UserStatus::Active,
        }
    }

    /// Identity id the profile belongs to.
    #[must_use]
    pub fn uid(&self) -> Uuid {
        self.uid
    }

    /// Role the row will be inserted with.
    #[must_use]
    pub fn role(&self) -> UserRole {
        self.role
    }

    /// Display name the row will be inserted with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Self-service profile changes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
    /// New job title.
    pub position: Option<String>,
}

impl ProfileEdit {
    /// Whether the edit changes anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.position.is_none()
    }
}

/// Role and scope assignment made by an owner or administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    /// New role.
    pub role: UserRole,
    /// Holding company membership.
    pub holding_company_id: Option<Uuid>,
    /// Subsidiaries made visible.
    pub subsidiary_ids: Vec<Uuid>,
    /// Divisions made visible.
    pub division_ids: Vec<Uuid>,
}

/// `"<first> <last>"`.
#[must_use]
pub fn display_name(first_name: &str, last_name: &str) -> String {
    format!("{first_name} {last_name}")
}
