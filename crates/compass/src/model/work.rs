//! Goals, reviews, reports, plan updates and audit entries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::role::{GoalStatus, ReportStatus, ReviewStatus, UserRole};

/// A user-owned objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Primary key.
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: Option<String>,
    /// Lifecycle state.
    pub status: GoalStatus,
    /// Target completion date.
    pub target_completion_date: Option<NaiveDate>,
    /// Division the goal contributes to.
    pub related_division_id: Option<Uuid>,
    /// Subsidiary the goal contributes to.
    pub related_subsidiary_id: Option<Uuid>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Values for a goal insert. The owner is always the acting user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewGoal {
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: Option<String>,
    /// Target completion date.
    pub target_completion_date: Option<NaiveDate>,
    /// Division link.
    pub related_division_id: Option<Uuid>,
    /// Subsidiary link.
    pub related_subsidiary_id: Option<Uuid>,
}

/// An evaluation of a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Primary key.
    pub id: Uuid,
    /// Goal under review.
    pub goal_id: Uuid,
    /// Goal owner.
    pub reviewee_id: Uuid,
    /// Author.
    pub reviewer_id: Uuid,
    /// Score from 1 to 5.
    pub performance_rating: Option<f64>,
    /// Free-text feedback.
    pub comments: Option<String>,
    /// Review state.
    pub status: ReviewStatus,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
}

/// A periodic division report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Primary key.
    pub id: Uuid,
    /// Division reported on.
    pub division_id: Uuid,
    /// Period label, e.g. `2026-Q3`.
    pub period: String,
    /// Opaque payload.
    pub content: Option<Value>,
    /// Decision state.
    pub status: ReportStatus,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
    /// Author.
    pub submitted_by: Uuid,
}

/// A broadcast announcement to one or more roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanUpdate {
    /// Primary key.
    pub id: Uuid,
    /// Author.
    pub posted_by: Uuid,
    /// Message body.
    pub content: String,
    /// Roles the update is addressed to.
    pub target_roles: Vec<UserRole>,
    /// Users who have acknowledged it.
    pub acknowledged_by: Vec<Uuid>,
    /// Posting time.
    pub posted_at: DateTime<Utc>,
}

impl PlanUpdate {
    /// Whether the update is addressed to `role`.
    #[must_use]
    pub fn targets(&self, role: UserRole) -> bool {
        self.target_roles.contains(&role)
    }

    /// Whether `user_id` has acknowledged it.
    #[must_use]
    pub fn is_acknowledged_by(&self, user_id: Uuid) -> bool {
        self.acknowledged_by.contains(&user_id)
    }
}

/// An append-only action record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Primary key.
    pub id: Uuid,
    /// Acting user, if any.
    pub user_id: Option<Uuid>,
    /// Dotted action name, e.g. `goal.create`.
    pub action: String,
    /// Opaque details.
    pub details: Option<Value>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}
