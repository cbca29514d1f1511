//! Command-line interface for compass.
//!
//! This module provides the CLI structure for the `compass` binary.

mod commands;

use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AccessCommand, AuditCommand, ConfigCommand, GoalCommand, GoalStatusArg, OrgCommand,
    OutputFormat, PlanCommand, ProfileCommand, ReportCommand, ReviewCommand, RoleArg,
    ShowCommand, SignInCommand, SignUpCommand, StatusArg,
};

use crate::logging::Verbosity;

/// compass - Corporate hierarchy, goals and reviews
///
/// Manage holding companies, subsidiaries and divisions, and the goals,
/// reviews, reports and plan updates of the people who work in them.
#[derive(Debug, Parser)]
#[command(name = "compass")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and its profile
    Signup(SignUpCommand),

    /// Sign in with email and password
    Signin(SignInCommand),

    /// Sign out of the current session
    Signout,

    /// Show the signed-in user and profile
    Whoami(ShowCommand),

    /// Holding companies, subsidiaries and divisions
    #[command(subcommand)]
    Org(OrgCommand),

    /// Your profile and user administration
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Goals
    #[command(subcommand)]
    Goal(GoalCommand),

    /// Performance reviews
    #[command(subcommand)]
    Review(ReviewCommand),

    /// Division reports
    #[command(subcommand)]
    Report(ReportCommand),

    /// Strategic plan updates
    #[command(subcommand)]
    Plan(PlanCommand),

    /// Recent audit log entries
    Audit(AuditCommand),

    /// Roles and access scope
    #[command(subcommand)]
    Access(AccessCommand),

    /// Show database status
    Status(ShowCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

/// The password given on the command line or in the environment, otherwise
/// the first line of `input` without its line ending.
///
/// # Errors
///
/// Returns an error if `input` cannot be read.
pub fn read_password(given: Option<String>, mut input: impl BufRead) -> io::Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
