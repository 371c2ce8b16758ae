use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::database::{Database, DatabaseError, TrackingInsert};
use crate::models::{Habit, TrackingRecord};
use crate::stats::{self, HabitStats, Period};
use crate::utils::parse_date;
use crate::validate::{HabitInput, HabitPatch, TrackingInput, ValidationErrors};

/// Source of "today". The service never reads the system clock directly,
/// so tests can pin the date.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("Habit not found")]
    HabitNotFound,
    #[error("Cannot track inactive habit")]
    InactiveHabit,
    #[error("Active habit limit reached ({0})")]
    QuotaExceeded(i64),
    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// Result of a track operation. A repeat submission for the same
/// (habit, date) hands back the existing record instead of failing.
#[derive(Debug)]
pub enum TrackOutcome {
    Created(TrackingRecord),
    AlreadyTracked(TrackingRecord),
}

impl TrackOutcome {
    pub fn record(&self) -> &TrackingRecord {
        match self {
            TrackOutcome::Created(r) | TrackOutcome::AlreadyTracked(r) => r,
        }
    }

    pub fn already_tracked(&self) -> bool {
        matches!(self, TrackOutcome::AlreadyTracked(_))
    }
}

/// Statistics payload for one habit over one period.
#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub habit_id: i64,
    pub habit_name: String,
    pub period: Period,
    pub stats: HabitStats,
    pub period_start: String,
    pub period_end: String,
}

/// Result of an update: the habit as stored, plus exactly which fields
/// changed. An empty patch succeeds with an empty list.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub habit: Habit,
    pub changed_fields: Vec<&'static str>,
}

/// Orchestrates validator, store and streak calculator for each operation.
pub struct HabitService<'a, C: Clock> {
    db: &'a Database,
    clock: C,
    max_active_habits: i64,
}

impl<'a, C: Clock> HabitService<'a, C> {
    pub fn new(db: &'a Database, clock: C, max_active_habits: i64) -> Self {
        Self {
            db,
            clock,
            max_active_habits,
        }
    }

    /// Create a habit for an owner, subject to the active-habit quota.
    pub fn create_habit(&self, owner_id: i64, input: &HabitInput) -> Result<Habit, ServiceError> {
        let valid = input.validate()?;

        let active = self.db.count_active_habits(owner_id)?;
        if active >= self.max_active_habits {
            return Err(ServiceError::QuotaExceeded(self.max_active_habits));
        }

        let mut habit = Habit::new(owner_id, valid.name, valid.frequency);
        habit.description = valid.description;
        habit.target_count = valid.target_count;

        let id = self.db.insert_habit(&habit)?;
        habit.id = Some(id);
        Ok(habit)
    }

    /// List an owner's habits, optionally active only.
    pub fn list_habits(&self, owner_id: i64, active_only: bool) -> Result<Vec<Habit>, ServiceError> {
        Ok(self.db.get_all_habits(owner_id, active_only)?)
    }

    /// Record a completion for a habit on a date.
    ///
    /// Lookup is owner-scoped; inactive habits are rejected before
    /// validation of the tracking input. A record already existing for the
    /// date (including one that wins a concurrent insert race) is returned
    /// as `AlreadyTracked`.
    pub fn track_habit(
        &self,
        owner_id: i64,
        habit_id: i64,
        input: &TrackingInput,
    ) -> Result<TrackOutcome, ServiceError> {
        let habit = self
            .db
            .get_habit(habit_id, owner_id)?
            .ok_or(ServiceError::HabitNotFound)?;

        if !habit.is_active {
            return Err(ServiceError::InactiveHabit);
        }

        let valid = input.validate(self.clock.today())?;
        let date_str = valid.completed_date.format("%Y-%m-%d").to_string();

        if let Some(existing) = self.db.find_tracking(habit_id, &date_str)? {
            return Ok(TrackOutcome::AlreadyTracked(existing));
        }

        let mut record = TrackingRecord::new(habit_id, date_str.clone());
        record.count = valid.count;
        record.notes = valid.notes;

        match self.db.insert_tracking(&record)? {
            TrackingInsert::Inserted(id) => {
                record.id = Some(id);
                Ok(TrackOutcome::Created(record))
            }
            // Lost an insert race: the winning record is the result.
            TrackingInsert::Duplicate => {
                let existing = self
                    .db
                    .find_tracking(habit_id, &date_str)?
                    .ok_or(ServiceError::Store(DatabaseError::SqliteError(
                        rusqlite::Error::QueryReturnedNoRows,
                    )))?;
                Ok(TrackOutcome::AlreadyTracked(existing))
            }
        }
    }

    /// Compute completion rate and streaks for a habit over a period.
    pub fn habit_stats(
        &self,
        owner_id: i64,
        habit_id: i64,
        period_token: &str,
    ) -> Result<StatsReport, ServiceError> {
        let habit = self
            .db
            .get_habit(habit_id, owner_id)?
            .ok_or(ServiceError::HabitNotFound)?;

        let period: Period = period_token.parse().map_err(|message: String| {
            ServiceError::Validation(ValidationErrors::single("period", message, "invalid_choice"))
        })?;

        let records = self.db.get_tracking_records(habit_id)?;
        let dates: Vec<NaiveDate> = records
            .iter()
            .filter_map(|r| parse_date(&r.completed_date).ok())
            .collect();

        let today = self.clock.today();
        let (start, expected_days) = stats::period_window(period, today);

        let report = HabitStats {
            completed_days: stats::completed_days(&dates, start),
            expected_days,
            completion_rate: stats::completion_rate(&dates, start, expected_days),
            current_streak: stats::current_streak(&dates, today),
            longest_streak: stats::longest_streak(&dates),
            total_completions: records.len(),
        };

        Ok(StatsReport {
            habit_id,
            habit_name: habit.name,
            period,
            stats: report,
            period_start: start.format("%Y-%m-%d").to_string(),
            period_end: today.format("%Y-%m-%d").to_string(),
        })
    }

    /// Apply a partial update. Only fields explicitly present in the patch
    /// are validated and applied; the outcome names each changed field.
    pub fn update_habit(
        &self,
        owner_id: i64,
        habit_id: i64,
        patch: &HabitPatch,
    ) -> Result<UpdateOutcome, ServiceError> {
        let mut habit = self
            .db
            .get_habit(habit_id, owner_id)?
            .ok_or(ServiceError::HabitNotFound)?;

        let valid = patch.validate()?;
        let mut changed_fields = Vec::new();

        if let Some(name) = valid.name {
            habit.name = name;
            changed_fields.push("name");
        }
        if let Some(description) = valid.description {
            habit.description = description;
            changed_fields.push("description");
        }
        if let Some(frequency) = valid.frequency {
            habit.frequency = frequency;
            changed_fields.push("frequency");
        }
        if let Some(is_active) = valid.is_active {
            habit.is_active = is_active;
            changed_fields.push("is_active");
        }
        if let Some(target_count) = valid.target_count {
            habit.target_count = Some(target_count);
            changed_fields.push("target_count");
        }

        if changed_fields.is_empty() {
            return Ok(UpdateOutcome {
                habit,
                changed_fields,
            });
        }

        habit.updated_at = Some(chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string());
        self.db.update_habit(&habit)?;

        Ok(UpdateOutcome {
            habit,
            changed_fields,
        })
    }
}
