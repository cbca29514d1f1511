//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::model::{GoalStatus, UserRole, UserStatus};

/// Sign-up arguments.
#[derive(Debug, Args)]
pub struct SignUpCommand {
    /// Email address
    #[arg(long)]
    pub email: String,

    /// Password; read from stdin when neither this nor `COMPASS_PASSWORD`
    /// is set
    #[arg(long, env = "COMPASS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Given name
    #[arg(long)]
    pub first_name: String,

    /// Family name
    #[arg(long)]
    pub last_name: String,

    /// Job title
    #[arg(long)]
    pub position: String,
}

/// Sign-in arguments.
#[derive(Debug, Args)]
pub struct SignInCommand {
    /// Email address
    #[arg(long)]
    pub email: String,

    /// Password; read from stdin when neither this nor `COMPASS_PASSWORD`
    /// is set
    #[arg(long, env = "COMPASS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Commands that only take an output format.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Organization commands.
#[derive(Debug, Subcommand)]
pub enum OrgCommand {
    /// Create a holding company
    CreateHolding {
        /// Company name
        name: String,
    },

    /// Create a subsidiary under a holding company
    CreateSubsidiary {
        /// Company name
        name: String,

        /// Parent holding company
        #[arg(long)]
        holding: Uuid,
    },

    /// Create a division under a subsidiary
    CreateDivision {
        /// Division name
        name: String,

        /// Parent subsidiary
        #[arg(long)]
        subsidiary: Uuid,

        /// First active day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last active day (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Initial strategic plan
        #[arg(long)]
        plan: Option<String>,
    },

    /// List divisions visible to you
    Divisions {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Set or clear a division's strategic plan
    SetPlan {
        /// The division
        division: Uuid,

        /// New plan; omit to clear
        #[arg(long)]
        text: Option<String>,
    },
}

/// Profile commands.
#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Change your own name or position
    Edit {
        /// New given name
        #[arg(long)]
        first_name: Option<String>,

        /// New family name
        #[arg(long)]
        last_name: Option<String>,

        /// New job title
        #[arg(long)]
        position: Option<String>,
    },

    /// Mark manager setup as complete
    CompleteSetup,

    /// List every profile
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Activate or deactivate a user
    SetStatus {
        /// The user
        user: Uuid,

        /// New status
        #[arg(value_enum)]
        status: StatusArg,
    },
}

/// Access scope commands.
#[derive(Debug, Subcommand)]
pub enum AccessCommand {
    /// Assign a role and scope to a user
    Grant {
        /// The user
        user: Uuid,

        /// New role
        #[arg(long, value_enum)]
        role: RoleArg,

        /// Holding company membership
        #[arg(long)]
        holding: Option<Uuid>,

        /// Visible subsidiary (repeatable)
        #[arg(long = "subsidiary")]
        subsidiaries: Vec<Uuid>,

        /// Visible division (repeatable)
        #[arg(long = "division")]
        divisions: Vec<Uuid>,
    },

    /// Check whether you can see a division
    Check {
        /// The division
        division: Uuid,
    },
}

/// Goal commands.
#[derive(Debug, Subcommand)]
pub enum GoalCommand {
    /// Create a goal
    Create {
        /// Short title
        title: String,

        /// Longer description
        #[arg(long)]
        description: Option<String>,

        /// Target completion date (YYYY-MM-DD)
        #[arg(long)]
        target: Option<NaiveDate>,

        /// Link to a division
        #[arg(long)]
        division: Option<Uuid>,

        /// Link to a subsidiary
        #[arg(long)]
        subsidiary: Option<Uuid>,
    },

    /// List your goals
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Change a goal's status
    SetStatus {
        /// The goal
        goal: Uuid,

        /// New status
        #[arg(value_enum)]
        status: GoalStatusArg,
    },
}

/// Review commands.
#[derive(Debug, Subcommand)]
pub enum ReviewCommand {
    /// Review someone else's goal
    Submit {
        /// The goal
        goal: Uuid,

        /// Rating from 1 to 5
        #[arg(long)]
        rating: Option<f64>,

        /// Feedback
        #[arg(long)]
        comments: Option<String>,
    },

    /// Acknowledge a review you received
    Acknowledge {
        /// The review
        review: Uuid,
    },

    /// List reviews you received
    Received {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// List reviews of one goal
    Goal {
        /// The goal
        goal: Uuid,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Report commands.
#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Submit a division report
    Submit {
        /// The division
        division: Uuid,

        /// Reporting period, e.g. 2026-Q3
        period: String,

        /// Report body as JSON
        #[arg(long)]
        content: Option<String>,
    },

    /// Approve a pending report
    Approve {
        /// The report
        report: Uuid,
    },

    /// Reject a pending report
    Reject {
        /// The report
        report: Uuid,
    },

    /// List a division's reports
    List {
        /// The division
        division: Uuid,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Plan update commands.
#[derive(Debug, Subcommand)]
pub enum PlanCommand {
    /// Post an update to one or more roles
    Post {
        /// Update text
        content: String,

        /// Target role (repeatable)
        #[arg(long = "role", value_enum, required = true)]
        roles: Vec<RoleArg>,
    },

    /// List updates addressed to your role
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Acknowledge an update
    Acknowledge {
        /// The update
        update: Uuid,
    },
}

/// Audit log arguments.
#[derive(Debug, Args)]
pub struct AuditCommand {
    /// Number of entries
    #[arg(short, long, default_value = "20")]
    pub limit: u32,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Role argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Owner
    Owner,
    /// Administrator
    Administrator,
    /// Director
    Director,
    /// Manager
    Manager,
}

impl From<RoleArg> for UserRole {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Owner => Self::Owner,
            RoleArg::Administrator => Self::Administrator,
            RoleArg::Director => Self::Director,
            RoleArg::Manager => Self::Manager,
        }
    }
}

/// Account status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Active account
    Active,
    /// Disabled account
    Inactive,
}

impl From<StatusArg> for UserStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => Self::Active,
            StatusArg::Inactive => Self::Inactive,
        }
    }
}

/// Goal status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GoalStatusArg {
    /// Not started
    NotStarted,
    /// In progress
    InProgress,
    /// Completed
    Completed,
    /// Needs review
    NeedsReview,
    /// Archived
    Archived,
}

impl From<GoalStatusArg> for GoalStatus {
    fn from(arg: GoalStatusArg) -> Self {
        match arg {
            GoalStatusArg::NotStarted => Self::NotStarted,
            GoalStatusArg::InProgress => Self::InProgress,
            GoalStatusArg::Completed => Self::Completed,
            GoalStatusArg::NeedsReview => Self::NeedsReview,
            GoalStatusArg::Archived => Self::Archived,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}
