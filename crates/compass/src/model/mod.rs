//! Row types for every table and the closed enums their columns use.

mod org;
mod profile;
mod role;
mod work;

pub use org::{Division, DivisionScope, HoldingCompany, NewDivision, Subsidiary};
pub use profile::{display_name, AccessGrant, NewProfile, ProfileEdit, UserProfile};
pub use role::{GoalStatus, ReportStatus, ReviewStatus, UserRole, UserStatus};
pub use work::{AuditEntry, Goal, NewGoal, PlanUpdate, Report, Review};
