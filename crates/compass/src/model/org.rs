//! The three-level organizational hierarchy.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingCompany {
    /// Primary key.
    pub id: Uuid,
    /// Company name.
    pub name: String,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A company owned by a holding company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsidiary {
    /// Primary key.
    pub id: Uuid,
    /// Company name.
    pub name: String,
    /// Parent holding company.
    pub holding_company_id: Uuid,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A unit inside a subsidiary, with its own strategic plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    /// Primary key.
    pub id: Uuid,
    /// Division name.
    pub name: String,
    /// Parent subsidiary.
    pub subsidiary_id: Uuid,
    /// Free-text plan for the period.
    pub strategic_plan: Option<String>,
    /// First day the division is active.
    pub start_date: NaiveDate,
    /// Last day, if the division is time-boxed.
    pub end_date: Option<NaiveDate>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Values for a division insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDivision {
    /// Division name.
    pub name: String,
    /// Parent subsidiary.
    pub subsidiary_id: Uuid,
    /// Initial plan.
    pub strategic_plan: Option<String>,
    /// First active day.
    pub start_date: NaiveDate,
    /// Last active day.
    pub end_date: Option<NaiveDate>,
}

/// Where a division sits in the hierarchy; the input to access checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisionScope {
    /// The division.
    pub division_id: Uuid,
    /// Its subsidiary.
    pub subsidiary_id: Uuid,
    /// Its holding company.
    pub holding_company_id: Uuid,
}
