use clap::{Parser, Subcommand};
use serde_json::json;
use thiserror::Error;

use crate::config::Config;
use crate::database::Database;
use crate::problem::Problem;
use crate::service::{HabitService, ServiceError, SystemClock, TrackOutcome};
use crate::validate::{HabitInput, HabitPatch, TrackingInput};

#[derive(Parser)]
#[command(name = "habitrack")]
#[command(about = "Track habits, completions and streaks")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    /// Owner id to act as (defaults to the configured owner)
    #[arg(long)]
    pub owner: Option<i64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new habit
    Add {
        /// Habit name (1-100 characters)
        name: String,
        /// Habit description
        #[arg(long)]
        description: Option<String>,
        /// Frequency: daily, weekly or monthly
        #[arg(long)]
        frequency: Option<String>,
        /// Target completions (1-100)
        #[arg(long)]
        target: Option<i64>,
    },
    /// List habits
    List {
        /// Include deactivated habits
        #[arg(long)]
        all: bool,
    },
    /// Record a completion for a habit
    Track {
        /// Habit id
        habit_id: i64,
        /// Completion date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Number of completions (1-100)
        #[arg(long)]
        count: Option<i64>,
        /// Notes for this completion
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show completion rate and streaks for a habit
    Stats {
        /// Habit id
        habit_id: i64,
        /// Lookback period: week, month or year
        #[arg(long, default_value = "month")]
        period: String,
    },
    /// Update a habit's fields or active flag
    Update {
        /// Habit id
        habit_id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New frequency: daily, weekly or monthly
        #[arg(long)]
        frequency: Option<String>,
        /// New target completions (1-100)
        #[arg(long)]
        target: Option<i64>,
        /// Reactivate the habit
        #[arg(long, conflicts_with = "deactivate")]
        activate: bool,
        /// Deactivate the habit
        #[arg(long)]
        deactivate: bool,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("operation failed (status {0})")]
    OperationFailed(u16),
}

/// Render a service failure as a problem document on stderr and surface a
/// non-zero exit to the caller.
fn report(err: ServiceError, instance: &str) -> CliError {
    let problem = Problem::from_service_error(&err, instance);
    eprintln!("{}", problem.to_json());
    CliError::OperationFailed(problem.status)
}

fn service<'a>(db: &'a Database, config: &Config) -> HabitService<'a, SystemClock> {
    HabitService::new(db, SystemClock, config.max_active_habits)
}

/// Handle the add command
pub fn handle_add(
    owner_id: i64,
    name: String,
    description: Option<String>,
    frequency: Option<String>,
    target: Option<i64>,
    db: &Database,
    config: &Config,
) -> Result<(), CliError> {
    let input = HabitInput {
        name,
        description,
        frequency,
        target_count: target,
    };

    let habit = service(db, config)
        .create_habit(owner_id, &input)
        .map_err(|e| report(e, "/habits"))?;

    println!("{}", serde_json::to_string_pretty(&habit)?);
    Ok(())
}

/// Handle the list command
pub fn handle_list(
    owner_id: i64,
    all: bool,
    db: &Database,
    config: &Config,
) -> Result<(), CliError> {
    let habits = service(db, config)
        .list_habits(owner_id, !all)
        .map_err(|e| report(e, "/habits"))?;

    let total = habits.len();
    let output = json!({ "habits": habits, "total": total });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Handle the track command
pub fn handle_track(
    owner_id: i64,
    habit_id: i64,
    date: Option<String>,
    count: Option<i64>,
    notes: Option<String>,
    db: &Database,
    config: &Config,
) -> Result<(), CliError> {
    let instance = format!("/habits/{}/track", habit_id);
    let input = TrackingInput {
        completed_date: date,
        count,
        notes,
    };

    let outcome = service(db, config)
        .track_habit(owner_id, habit_id, &input)
        .map_err(|e| report(e, &instance))?;

    let message = match &outcome {
        TrackOutcome::Created(_) => "Habit tracked successfully",
        TrackOutcome::AlreadyTracked(_) => "Habit already tracked for this date",
    };
    let output = json!({ "message": message, "record": outcome.record() });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Handle the stats command
pub fn handle_stats(
    owner_id: i64,
    habit_id: i64,
    period: String,
    db: &Database,
    config: &Config,
) -> Result<(), CliError> {
    let instance = format!("/habits/{}/stats", habit_id);

    let report_out = service(db, config)
        .habit_stats(owner_id, habit_id, &period)
        .map_err(|e| report(e, &instance))?;

    println!("{}", serde_json::to_string_pretty(&report_out)?);
    Ok(())
}

/// Handle the update command
#[allow(clippy::too_many_arguments)]
pub fn handle_update(
    owner_id: i64,
    habit_id: i64,
    name: Option<String>,
    description: Option<String>,
    frequency: Option<String>,
    target: Option<i64>,
    activate: bool,
    deactivate: bool,
    db: &Database,
    config: &Config,
) -> Result<(), CliError> {
    let instance = format!("/habits/{}", habit_id);
    let is_active = match (activate, deactivate) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    let patch = HabitPatch {
        name,
        description,
        frequency,
        is_active,
        target_count: target,
    };

    let outcome = service(db, config)
        .update_habit(owner_id, habit_id, &patch)
        .map_err(|e| report(e, &instance))?;

    let message = if outcome.changed_fields.is_empty() {
        "No fields to update".to_string()
    } else {
        format!(
            "Habit updated successfully. Updated fields: {}",
            outcome.changed_fields.join(", ")
        )
    };
    let output = json!({ "message": message, "habit": outcome.habit });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
