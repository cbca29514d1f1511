//! `compass` - CLI for the corporate hierarchy
//!
//! This binary drives the sign-in and sign-up forms, the session provider and
//! the role-checked operations against a local database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{IsTerminal, Write};

use clap::Parser;
use serde::Serialize;

use compass::cli::{
    read_password, AccessCommand, AuditCommand, Cli, Command, ConfigCommand, GoalCommand,
    OrgCommand, OutputFormat, PlanCommand, ProfileCommand, ReportCommand, ReviewCommand,
    SignInCommand, SignUpCommand,
};
use compass::model::{AccessGrant, NewDivision, NewGoal, ProfileEdit, ReportStatus, UserProfile};
use compass::{init_logging, AppState, Config, Error};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        command => {
            let app = AppState::init(config)?;
            let result = run(&app, command).await;
            app.shutdown().await;
            result
        }
    }
}

async fn run(app: &AppState, command: Command) -> CliResult {
    match command {
        Command::Signup(cmd) => handle_sign_up(app, cmd).await,
        Command::Signin(cmd) => handle_sign_in(app, cmd).await,
        Command::Signout => handle_sign_out(app).await,
        Command::Whoami(cmd) => handle_whoami(app, cmd.format).await,
        Command::Status(cmd) => handle_status(app, cmd.format),
        Command::Config(_) => Ok(()),
        Command::Org(cmd) => handle_org(app, &app.current_profile().await?, cmd),
        Command::Profile(cmd) => handle_profile(app, &app.current_profile().await?, cmd),
        Command::Goal(cmd) => handle_goal(app, &app.current_profile().await?, cmd),
        Command::Review(cmd) => handle_review(app, &app.current_profile().await?, cmd),
        Command::Report(cmd) => handle_report(app, &app.current_profile().await?, cmd),
        Command::Plan(cmd) => handle_plan(app, &app.current_profile().await?, cmd),
        Command::Audit(cmd) => handle_audit(app, &app.current_profile().await?, &cmd),
        Command::Access(cmd) => handle_access(app, &app.current_profile().await?, cmd),
    }
}

/// Print `value` as pretty JSON, or each plain line.
fn emit<T: Serialize>(format: OutputFormat, value: &T, lines: Vec<String>) -> CliResult {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Plain => {
            if lines.is_empty() {
                println!("(none)");
            }
            for line in lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

async fn handle_sign_up(app: &AppState, cmd: SignUpCommand) -> CliResult {
    let mut form = app.sign_up_form();
    form.email = cmd.email;
    form.password = password(cmd.password)?;
    form.first_name = cmd.first_name;
    form.last_name = cmd.last_name;
    form.position = cmd.position;

    match form.submit().await {
        Some(profile) => {
            println!("Created {} <{}>", profile.display_name, profile.email);
            println!("Role:   {}", profile.role);
            println!("Id:     {}", profile.uid);
            Ok(())
        }
        None => Err(form.status().error.unwrap_or_default().into()),
    }
}

async fn handle_sign_in(app: &AppState, cmd: SignInCommand) -> CliResult {
    let mut form = app.sign_in_form();
    form.email = cmd.email;
    form.password = password(cmd.password)?;

    match form.submit().await {
        Some(session) => {
            println!("Signed in as {}", session.user.email);
            println!("Session expires {}", session.expires_at.to_rfc3339());
            Ok(())
        }
        None => Err(form.status().error.unwrap_or_default().into()),
    }
}

fn password(given: Option<String>) -> Result<String, std::io::Error> {
    let stdin = std::io::stdin();
    if given.is_none() && stdin.is_terminal() {
        eprint!("Password: ");
        std::io::stderr().flush()?;
    }
    read_password(given, stdin.lock())
}

async fn handle_sign_out(app: &AppState) -> CliResult {
    let provider = app.start_session();
    provider.wait_until_loaded().await;
    provider.sign_out().await?;
    println!("Signed out.");
    Ok(())
}

async fn handle_whoami(app: &AppState, format: OutputFormat) -> CliResult {
    let provider = app.use_user().unwrap_or_else(|_| app.start_session());
    let state = provider.wait_until_loaded().await;

    if format == OutputFormat::Json {
        let value = serde_json::json!({
            "user": state.user,
            "profile": state.profile,
            "error": state.error,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let Some(user) = state.user else {
        println!("Not signed in.");
        return Ok(());
    };
    println!("Email:    {}", user.email);
    println!("Id:       {}", user.id);
    match state.profile {
        Some(profile) => {
            println!("Name:     {}", profile.display_name);
            println!("Position: {}", profile.position);
            println!("Role:     {}", profile.role);
            println!("Status:   {}", profile.status);
            println!("Setup:    {}", profile.manager_setup_complete);
        }
        None => println!(
            "Profile:  {}",
            state.error.as_deref().unwrap_or("not found")
        ),
    }
    Ok(())
}

fn handle_status(app: &AppState, format: OutputFormat) -> CliResult {
    let stats = app.storage().stats()?;
    if format == OutputFormat::Json {
        let value = serde_json::json!({
            "database_path": app.storage().path(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("compass status");
    println!("--------------");
    println!("Database:       {}", app.storage().path().display());
    println!("Schema version: {}", stats.schema_version);
    println!("Size:           {} bytes", stats.db_size_bytes);
    println!("Identities:     {}", stats.identities);
    for (table, count) in &stats.table_counts {
        println!("  {table:<22}{count}");
    }
    Ok(())
}

fn handle_org(app: &AppState, actor: &UserProfile, cmd: OrgCommand) -> CliResult {
    let services = app.services();
    match cmd {
        OrgCommand::CreateHolding { name } => {
            let company = services.create_holding_company(actor, &name)?;
            println!("Created holding company {} ({})", company.name, company.id);
        }
        OrgCommand::CreateSubsidiary { name, holding } => {
            let subsidiary = services.create_subsidiary(actor, &name, holding)?;
            println!("Created subsidiary {} ({})", subsidiary.name, subsidiary.id);
        }
        OrgCommand::CreateDivision {
            name,
            subsidiary,
            start,
            end,
            plan,
        } => {
            let division = services.create_division(
                actor,
                &NewDivision {
                    name,
                    subsidiary_id: subsidiary,
                    strategic_plan: plan,
                    start_date: start,
                    end_date: end,
                },
            )?;
            println!("Created division {} ({})", division.name, division.id);
        }
        OrgCommand::Divisions { format } => {
            let divisions = services.list_visible_divisions(actor)?;
            let lines = divisions
                .iter()
                .map(|d| format!("{}  {}  from {}", d.id, d.name, d.start_date))
                .collect();
            emit(format, &divisions, lines)?;
        }
        OrgCommand::SetPlan { division, text } => {
            let division = services.set_strategic_plan(actor, division, text.as_deref())?;
            match division.strategic_plan {
                Some(_) => println!("Updated plan for {}", division.name),
                None => println!("Cleared plan for {}", division.name),
            }
        }
    }
    Ok(())
}

fn handle_profile(app: &AppState, actor: &UserProfile, cmd: ProfileCommand) -> CliResult {
    let services = app.services();
    match cmd {
        ProfileCommand::Edit {
            first_name,
            last_name,
            position,
        } => {
            let profile = services.update_own_profile(
                actor,
                &ProfileEdit {
                    first_name,
                    last_name,
                    position,
                },
            )?;
            println!("Updated {} ({})", profile.display_name, profile.position);
        }
        ProfileCommand::CompleteSetup => {
            services.complete_manager_setup(actor)?;
            println!("Manager setup complete.");
        }
        ProfileCommand::List { format } => {
            let profiles = services.list_profiles(actor)?;
            let lines = profiles
                .iter()
                .map(|p| format!("{}  {:<24} {:<14} {}", p.uid, p.display_name, p.role, p.status))
                .collect();
            emit(format, &profiles, lines)?;
        }
        ProfileCommand::SetStatus { user, status } => {
            let profile = services.set_user_status(actor, user, status.into())?;
            println!("{} is now {}", profile.display_name, profile.status);
        }
    }
    Ok(())
}

fn handle_access(app: &AppState, actor: &UserProfile, cmd: AccessCommand) -> CliResult {
    match cmd {
        AccessCommand::Grant {
            user,
            role,
            holding,
            subsidiaries,
            divisions,
        } => {
            let profile = app.services().assign_access(
                actor,
                user,
                &AccessGrant {
                    role: role.into(),
                    holding_company_id: holding,
                    subsidiary_ids: subsidiaries,
                    division_ids: divisions,
                },
            )?;
            println!(
                "{} is now {} with {} subsidiaries and {} divisions",
                profile.display_name,
                profile.role,
                profile.subsidiary_ids.len(),
                profile.division_ids.len()
            );
        }
        AccessCommand::Check { division } => {
            let allowed = app.storage().can_access_division(actor.uid, division)?;
            println!("{}", if allowed { "allowed" } else { "denied" });
        }
    }
    Ok(())
}

fn handle_goal(app: &AppState, actor: &UserProfile, cmd: GoalCommand) -> CliResult {
    let services = app.services();
    match cmd {
        GoalCommand::Create {
            title,
            description,
            target,
            division,
            subsidiary,
        } => {
            let goal = services.create_goal(
                actor,
                &NewGoal {
                    title,
                    description,
                    target_completion_date: target,
                    related_division_id: division,
                    related_subsidiary_id: subsidiary,
                },
            )?;
            println!("Created goal {} ({})", goal.title, goal.id);
        }
        GoalCommand::List { format } => {
            let goals = services.list_own_goals(actor)?;
            let lines = goals
                .iter()
                .map(|g| format!("{}  {:<13} {}", g.id, g.status, g.title))
                .collect();
            emit(format, &goals, lines)?;
        }
        GoalCommand::SetStatus { goal, status } => {
            let goal = services.set_goal_status(actor, goal, status.into())?;
            println!("{} is now {}", goal.title, goal.status);
        }
    }
    Ok(())
}

fn handle_review(app: &AppState, actor: &UserProfile, cmd: ReviewCommand) -> CliResult {
    let services = app.services();
    let (format, reviews) = match cmd {
        ReviewCommand::Submit {
            goal,
            rating,
            comments,
        } => {
            let review = services.submit_review(actor, goal, rating, comments.as_deref())?;
            println!("Submitted review {}", review.id);
            return Ok(());
        }
        ReviewCommand::Acknowledge { review } => {
            services.acknowledge_review(actor, review)?;
            println!("Acknowledged.");
            return Ok(());
        }
        ReviewCommand::Received { format } => (format, services.list_received_reviews(actor)?),
        ReviewCommand::Goal { goal, format } => (format, services.list_goal_reviews(actor, goal)?),
    };

    let lines = reviews
        .iter()
        .map(|r| {
            let rating = r
                .performance_rating
                .map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
            format!(
                "{}  goal {}  rating {}  {}",
                r.id, r.goal_id, rating, r.status
            )
        })
        .collect();
    emit(format, &reviews, lines)
}

fn handle_report(app: &AppState, actor: &UserProfile, cmd: ReportCommand) -> CliResult {
    let services = app.services();
    match cmd {
        ReportCommand::Submit {
            division,
            period,
            content,
        } => {
            let content: Option<serde_json::Value> = content
                .map(|text| serde_json::from_str(&text))
                .transpose()
                .map_err(|e| Error::invalid_input(format!("report content is not JSON: {e}")))?;
            let report = services.submit_report(actor, division, &period, content)?;
            println!("Submitted report {} for {}", report.id, report.period);
        }
        ReportCommand::Approve { report } => {
            services.decide_report(actor, report, ReportStatus::Approved)?;
            println!("Approved.");
        }
        ReportCommand::Reject { report } => {
            services.decide_report(actor, report, ReportStatus::Rejected)?;
            println!("Rejected.");
        }
        ReportCommand::List { division, format } => {
            let reports = services.list_reports(actor, division)?;
            let lines = reports
                .iter()
                .map(|r| format!("{}  {:<10} {}", r.id, r.period, r.status))
                .collect();
            emit(format, &reports, lines)?;
        }
    }
    Ok(())
}

fn handle_plan(app: &AppState, actor: &UserProfile, cmd: PlanCommand) -> CliResult {
    let services = app.services();
    match cmd {
        PlanCommand::Post { content, roles } => {
            let roles: Vec<_> = roles.into_iter().map(Into::into).collect();
            let update = services.post_plan_update(actor, &content, &roles)?;
            println!("Posted update {}", update.id);
        }
        PlanCommand::List { format } => {
            let updates = services.list_plan_updates(actor)?;
            let lines = updates
                .iter()
                .map(|u| {
                    let seen = if u.is_acknowledged_by(actor.uid) { "seen" } else { "new " };
                    format!("{}  {}  {}", u.id, seen, u.content)
                })
                .collect();
            emit(format, &updates, lines)?;
        }
        PlanCommand::Acknowledge { update } => {
            services.acknowledge_plan_update(actor, update)?;
            println!("Acknowledged.");
        }
    }
    Ok(())
}

fn handle_audit(app: &AppState, actor: &UserProfile, cmd: &AuditCommand) -> CliResult {
    let entries = app.services().recent_audit(actor, cmd.limit)?;
    let lines = entries
        .iter()
        .map(|e| {
            let who = e.user_id.map_or_else(|| "-".to_string(), |id| id.to_string());
            format!("{}  {:<24} {}", e.timestamp.to_rfc3339(), e.action, who)
        })
        .collect();
    emit(cmd.format, &entries, lines)
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Auth]");
                println!("  Session TTL (h):    {}", config.auth.session_ttl_hours);
                println!("  Min password len:   {}", config.auth.min_password_length);
                println!("  Auto confirm:       {}", config.auth.auto_confirm);
                println!("  Session file:       {}", config.session_file().display());
                println!();
                println!("[Session]");
                println!("  Event buffer:       {}", config.session.event_buffer);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
