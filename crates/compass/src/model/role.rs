//! Closed enums for every enum-valued column.
//!
//! Each enum stores as its `as_str()` text, which is also its serde form and
//! the value accepted by `FromStr`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A user's position in the access hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Sees everything within the holding company.
    Owner,
    /// Same visibility as an owner, cannot create owners.
    Administrator,
    /// Scoped to subsidiaries and divisions.
    Director,
    /// Scoped to divisions. Default for new sign-ups.
    Manager,
}

impl UserRole {
    /// Every role, most privileged first.
    pub const ALL: [Self; 4] = [
        Self::Owner,
        Self::Administrator,
        Self::Director,
        Self::Manager,
    ];

    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Administrator => "administrator",
            Self::Director => "director",
            Self::Manager => "manager",
        }
    }
}

/// Whether a user account may act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Normal account.
    #[default]
    Active,
    /// Disabled account; fails every access check.
    Inactive,
}

impl UserStatus {
    /// Every status.
    pub const ALL: [Self; 2] = [Self::Active, Self::Inactive];

    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Lifecycle of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GoalStatus {
    /// Created, no progress yet.
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    /// Being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Done.
    #[serde(rename = "Completed")]
    Completed,
    /// Waiting for a reviewer.
    #[serde(rename = "Needs Review")]
    NeedsReview,
    /// Retired.
    #[serde(rename = "Archived")]
    Archived,
}

impl GoalStatus {
    /// Every status in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::NotStarted,
        Self::InProgress,
        Self::Completed,
        Self::NeedsReview,
        Self::Archived,
    ];

    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::NeedsReview => "Needs Review",
            Self::Archived => "Archived",
        }
    }
}

/// State of a performance review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReviewStatus {
    /// Written by the reviewer.
    #[default]
    Submitted,
    /// Seen by the reviewee.
    Acknowledged,
}

impl ReviewStatus {
    /// Every status.
    pub const ALL: [Self; 2] = [Self::Submitted, Self::Acknowledged];

    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Acknowledged => "Acknowledged",
        }
    }
}

/// State of a division report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Awaiting a decision.
    #[default]
    Pending,
    /// Accepted.
    Approved,
    /// Sent back.
    Rejected,
}

impl ReportStatus {
    /// Every status.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

macro_rules! text_enum {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| Error::invalid_input(format!("unknown {}: {s}", $what)))
            }
        }
    };
}

text_enum!(UserRole, "role");
text_enum!(UserStatus, "user status");
text_enum!(GoalStatus, "goal status");
text_enum!(ReviewStatus, "review status");
text_enum!(ReportStatus, "report status");
