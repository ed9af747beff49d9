//! Admin and one-off report commands.

use std::fmt::Display;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveTime, TimeZone};
use clap::{Args, Subcommand};
use serde_json::json;

use ereport_core::{IntervalKind, PanelQuery, Schedule, VariableDefinition};
use ereport_scheduler::{ReportEngine, ReportStore, SqliteStore};

/// Query window used when none is given: one day.
pub const DEFAULT_LOOKBACK_SECS: i64 = 86_400;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, inspect and remove report schedules
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },
    /// Manage report group members
    Group {
        #[command(subcommand)]
        command: GroupCommand,
    },
    /// Manage dashboard variable definitions
    Variable {
        #[command(subcommand)]
        command: VariableCommand,
    },
    /// Render one panel query to a workbook without emailing it
    Export(ExportArgs),
    /// Render a schedule's report and email it now
    TestEmail {
        schedule_id: String,
        /// Send only to this address instead of the report group
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommand {
    /// Create a schedule, or update one with --id
    Add(ScheduleArgs),
    /// List all schedules
    List,
    /// Show a schedule and its panels
    Show { id: String },
    /// Delete a schedule and its panels
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Update this schedule instead of creating one
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub name: String,
    /// daily, weekly, fortnightly, monthly, quarterly, yearly (or 0-5)
    #[arg(long, default_value = "daily")]
    pub interval: IntervalKind,
    /// Weekday (0 = Sunday) for weekly schedules, day of month otherwise
    #[arg(long, default_value_t = 1)]
    pub day: i64,
    /// Time of day, HH:MM
    #[arg(long, default_value = "09:00")]
    pub time: String,
    /// Query window in seconds before each run
    #[arg(long, default_value_t = DEFAULT_LOOKBACK_SECS)]
    pub lookback: i64,
    /// Report group whose members receive the report
    #[arg(long)]
    pub group: String,
    /// Email body
    #[arg(long, default_value = "")]
    pub description: String,
    /// strftime pattern added to the file name
    #[arg(long, default_value = "")]
    pub date_format: String,
    /// prefix or suffix
    #[arg(long, default_value = "suffix")]
    pub date_position: String,
    /// JSON file with the panel list. An update without it keeps the
    /// current panels.
    #[arg(long)]
    pub panels: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Add an email address to a report group
    AddMember { group: String, email: String },
    /// List the members of a report group
    Members { group: String },
}

#[derive(Subcommand, Debug)]
pub enum VariableCommand {
    /// Set the text a dashboard variable expands to when nothing is selected
    Set {
        dashboard: String,
        name: String,
        definition: String,
    },
    /// List a dashboard's variable definitions
    List { dashboard: String },
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long)]
    pub dashboard: String,
    #[arg(long)]
    pub panel: i64,
    /// Sheet title and file name
    #[arg(long)]
    pub title: String,
    /// Panel SQL; macros and ${var} placeholders are expanded
    #[arg(long)]
    pub sql: String,
    /// JSON object of variable selections
    #[arg(long, default_value = "{}")]
    pub variables: String,
    /// Query window in seconds before now
    #[arg(long, default_value_t = DEFAULT_LOOKBACK_SECS)]
    pub lookback: i64,
}

impl ExportArgs {
    fn panel_query(&self) -> PanelQuery {
        PanelQuery {
            schedule_id: String::new(),
            panel_id: self.panel,
            dashboard_id: self.dashboard.clone(),
            title: self.title.clone(),
            raw_sql: self.sql.clone(),
            variables: self.variables.clone(),
        }
    }
}

pub fn schedule<Tz: TimeZone>(
    command: ScheduleCommand,
    store: &SqliteStore,
    now: &DateTime<Tz>,
) -> Result<String> {
    match command {
        ScheduleCommand::Add(args) => {
            if NaiveTime::parse_from_str(&args.time, "%H:%M").is_err() {
                bail!("invalid time {:?}, expected HH:MM", args.time);
            }
            let panels = match (&args.panels, &args.id) {
                (Some(path), _) => read_panels(path)?,
                (None, Some(id)) => store.panel_queries(id)?,
                (None, None) => Vec::new(),
            };
            let schedule = Schedule {
                id: args.id.unwrap_or_default(),
                interval: args.interval,
                day: args.day,
                time: args.time,
                next_report_time: 0,
                lookback: args.lookback,
                name: args.name,
                description: args.description,
                report_group_id: args.group,
                date_format: args.date_format,
                date_position: args.date_position,
            };
            let saved = store.save_schedule(schedule, &panels, now)?;
            Ok(serde_json::to_string_pretty(&saved)?)
        }
        ScheduleCommand::List => Ok(serde_json::to_string_pretty(&store.list_schedules()?)?),
        ScheduleCommand::Show { id } => {
            let schedule = store.schedule(&id)?;
            let panels = store.panel_queries(&id)?;
            Ok(serde_json::to_string_pretty(
                &json!({ "schedule": schedule, "panels": panels }),
            )?)
        }
        ScheduleCommand::Delete { id } => {
            store.delete_schedule(&id)?;
            Ok(format!("deleted schedule {id}"))
        }
    }
}

fn read_panels(path: &std::path::Path) -> Result<Vec<PanelQuery>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading panels from {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing panels in {}", path.display()))
}

pub fn group(command: GroupCommand, store: &SqliteStore) -> Result<String> {
    match command {
        GroupCommand::AddMember { group, email } => {
            store.add_group_member(&group, &email)?;
            Ok(format!("added {email} to {group}"))
        }
        GroupCommand::Members { group } => Ok(store.recipients(&group)?.join("\n")),
    }
}

pub fn variable(command: VariableCommand, store: &SqliteStore) -> Result<String> {
    match command {
        VariableCommand::Set {
            dashboard,
            name,
            definition,
        } => {
            store.set_variable_definition(&dashboard, &VariableDefinition::new(&name, definition))?;
            Ok(format!("set {name} on dashboard {dashboard}"))
        }
        VariableCommand::List { dashboard } => Ok(serde_json::to_string_pretty(
            &store.variable_definitions(&dashboard)?,
        )?),
    }
}

/// Path of the exported workbook.
pub async fn export(args: &ExportArgs, engine: &ReportEngine) -> Result<String> {
    let output = engine
        .export_panel(&args.panel_query(), args.lookback, Local::now())
        .await?;
    Ok(output.display().to_string())
}

pub async fn test_email(schedule_id: &str, to: Option<&str>, engine: &ReportEngine) -> Result<String> {
    let sent_to = engine.send_now(schedule_id, to, Local::now()).await?;
    Ok(sent_summary(schedule_id, sent_to))
}

fn sent_summary(schedule_id: impl Display, sent_to: usize) -> String {
    match sent_to {
        0 => format!("schedule {schedule_id} produced no report"),
        1 => format!("sent schedule {schedule_id} to 1 recipient"),
        n => format!("sent schedule {schedule_id} to {n} recipients"),
    }
}
