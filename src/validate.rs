use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Frequency;
use crate::utils::parse_date;

/// Characters rejected in all free-text fields. The stored values are served
/// back without an output-encoding boundary, so markup characters never get in.
pub const FORBIDDEN_CHARS: [char; 6] = ['<', '>', '&', '"', '\'', '`'];

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_NOTES_LEN: usize = 200;
pub const MAX_TARGET_COUNT: i64 = 100;
pub const MAX_TRACK_COUNT: i64 = 100;

/// One rule violation on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub kind: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>, kind: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            kind: kind.to_string(),
        }
    }
}

/// All rule violations found in one input, aggregated so simultaneously
/// failing fields are reported together.
#[derive(Debug, Clone, Default, Error, Serialize, Deserialize)]
#[error("{}", summarize(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>, kind: &str) {
        self.errors.push(FieldError::new(field, message, kind));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn single(field: &str, message: impl Into<String>, kind: &str) -> Self {
        Self {
            errors: vec![FieldError::new(field, message, kind)],
        }
    }
}

fn check_forbidden_chars(errors: &mut ValidationErrors, field: &str, value: &str) {
    for ch in FORBIDDEN_CHARS {
        if value.contains(ch) {
            errors.push(
                field,
                format!("{} contains forbidden character: {}", field, ch),
                "forbidden_char",
            );
            return;
        }
    }
}

/// Input for creating a habit. Raw strings as received from the caller;
/// validation produces the normalized form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HabitInput {
    pub name: String,
    pub description: Option<String>,
    pub frequency: Option<String>,
    pub target_count: Option<i64>,
}

/// A `HabitInput` that passed every rule, with free text trimmed.
#[derive(Debug, Clone)]
pub struct ValidHabit {
    pub name: String,
    pub description: String,
    pub frequency: Frequency,
    pub target_count: Option<i64>,
}

impl HabitInput {
    /// Check every rule, then trim. Trimming is deliberately a
    /// post-validation step so an all-whitespace name fails the
    /// required check instead of sneaking through as empty.
    pub fn validate(&self) -> Result<ValidHabit, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let trimmed_name = self.name.trim();
        if trimmed_name.is_empty() {
            errors.push("name", "Habit name cannot be empty", "required");
        } else if trimmed_name.chars().count() > MAX_NAME_LEN {
            errors.push(
                "name",
                format!("Habit name must be at most {} characters", MAX_NAME_LEN),
                "max_length",
            );
        }
        check_forbidden_chars(&mut errors, "name", &self.name);

        let description = self.description.as_deref().unwrap_or("");
        if description.trim().chars().count() > MAX_DESCRIPTION_LEN {
            errors.push(
                "description",
                format!(
                    "Description must be at most {} characters",
                    MAX_DESCRIPTION_LEN
                ),
                "max_length",
            );
        }
        check_forbidden_chars(&mut errors, "description", description);

        let frequency = match self.frequency.as_deref() {
            None => Frequency::Daily,
            Some(token) => match token.parse::<Frequency>() {
                Ok(f) => f,
                Err(message) => {
                    errors.push("frequency", message, "invalid_choice");
                    Frequency::Daily
                }
            },
        };

        if let Some(count) = self.target_count {
            if !(1..=MAX_TARGET_COUNT).contains(&count) {
                errors.push(
                    "target_count",
                    format!("Target count must be between 1 and {}", MAX_TARGET_COUNT),
                    "out_of_range",
                );
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidHabit {
            name: trimmed_name.to_string(),
            description: description.trim().to_string(),
            frequency,
            target_count: self.target_count,
        })
    }
}

/// Partial update for a habit. `Some` means the field was explicitly
/// supplied; `None` means it was omitted and stays untouched. Optional
/// habit fields therefore cannot be cleared through an update, only
/// replaced.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HabitPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<String>,
    pub is_active: Option<bool>,
    pub target_count: Option<i64>,
}

/// A `HabitPatch` with every supplied field validated and trimmed.
#[derive(Debug, Clone, Default)]
pub struct ValidPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
    pub is_active: Option<bool>,
    pub target_count: Option<i64>,
}

impl HabitPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.frequency.is_none()
            && self.is_active.is_none()
            && self.target_count.is_none()
    }

    /// Validate only the fields that are present, with the same rules
    /// as creation. An empty patch validates to an empty `ValidPatch`.
    pub fn validate(&self) -> Result<ValidPatch, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut patch = ValidPatch::default();

        if let Some(ref name) = self.name {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                errors.push("name", "Habit name cannot be empty", "required");
            } else if trimmed.chars().count() > MAX_NAME_LEN {
                errors.push(
                    "name",
                    format!("Habit name must be at most {} characters", MAX_NAME_LEN),
                    "max_length",
                );
            }
            check_forbidden_chars(&mut errors, "name", name);
            patch.name = Some(trimmed.to_string());
        }

        if let Some(ref description) = self.description {
            if description.trim().chars().count() > MAX_DESCRIPTION_LEN {
                errors.push(
                    "description",
                    format!(
                        "Description must be at most {} characters",
                        MAX_DESCRIPTION_LEN
                    ),
                    "max_length",
                );
            }
            check_forbidden_chars(&mut errors, "description", description);
            patch.description = Some(description.trim().to_string());
        }

        if let Some(ref token) = self.frequency {
            match token.parse::<Frequency>() {
                Ok(f) => patch.frequency = Some(f),
                Err(message) => errors.push("frequency", message, "invalid_choice"),
            }
        }

        patch.is_active = self.is_active;

        if let Some(count) = self.target_count {
            if !(1..=MAX_TARGET_COUNT).contains(&count) {
                errors.push(
                    "target_count",
                    format!("Target count must be between 1 and {}", MAX_TARGET_COUNT),
                    "out_of_range",
                );
            }
            patch.target_count = Some(count);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(patch)
    }
}

/// Input for recording a completion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingInput {
    pub completed_date: Option<String>,
    pub count: Option<i64>,
    pub notes: Option<String>,
}

/// A `TrackingInput` that passed every rule.
#[derive(Debug, Clone)]
pub struct ValidTracking {
    pub completed_date: NaiveDate,
    pub count: i64,
    pub notes: String,
}

impl TrackingInput {
    /// Validate against `today` so the future-date rule stays deterministic
    /// under test. An omitted date defaults to `today`; same-day is allowed.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidTracking, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let completed_date = match self.completed_date.as_deref() {
            None => today,
            Some(raw) => match parse_date(raw.trim()) {
                Ok(date) => {
                    if date > today {
                        errors.push(
                            "completed_date",
                            "Completion date cannot be in the future",
                            "future_date",
                        );
                    }
                    date
                }
                Err(_) => {
                    errors.push(
                        "completed_date",
                        "Invalid date format. Use YYYY-MM-DD",
                        "invalid_date",
                    );
                    today
                }
            },
        };

        let count = self.count.unwrap_or(1);
        if !(1..=MAX_TRACK_COUNT).contains(&count) {
            errors.push(
                "count",
                format!("Count must be between 1 and {}", MAX_TRACK_COUNT),
                "out_of_range",
            );
        }

        let notes = self.notes.as_deref().unwrap_or("");
        if notes.trim().chars().count() > MAX_NOTES_LEN {
            errors.push(
                "notes",
                format!("Notes must be at most {} characters", MAX_NOTES_LEN),
                "max_length",
            );
        }
        check_forbidden_chars(&mut errors, "notes", notes);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidTracking {
            completed_date,
            count,
            notes: notes.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn input(name: &str) -> HabitInput {
        HabitInput {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_habit_is_trimmed() {
        let valid = input("  Read  ").validate().unwrap();
        assert_eq!(valid.name, "Read");
        assert_eq!(valid.description, "");
        assert_eq!(valid.frequency, Frequency::Daily);
    }

    #[test]
    fn empty_and_whitespace_names_are_rejected() {
        for name in ["", "   ", "\t\n"] {
            let errors = input(name).validate().unwrap_err();
            assert_eq!(errors.errors.len(), 1);
            assert_eq!(errors.errors[0].field, "name");
            assert_eq!(errors.errors[0].kind, "required");
        }
    }

    #[test]
    fn name_boundaries() {
        assert!(input("A").validate().is_ok());
        assert!(input(&"A".repeat(100)).validate().is_ok());
        let errors = input(&"A".repeat(101)).validate().unwrap_err();
        assert_eq!(errors.errors[0].kind, "max_length");
    }

    #[test]
    fn markup_characters_are_rejected_with_offender_named() {
        let errors = input("<script>alert(1)</script>").validate().unwrap_err();
        assert!(errors.errors.iter().any(|e| e.kind == "forbidden_char"));
        assert!(errors.errors[0].message.contains('<'));

        for bad in ["a&b", "say \"hi\"", "it's", "tick`"] {
            assert!(input(bad).validate().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn description_rules() {
        let mut habit = input("Read");
        habit.description = Some("A".repeat(500));
        assert!(habit.validate().is_ok());

        habit.description = Some("A".repeat(501));
        let errors = habit.validate().unwrap_err();
        assert_eq!(errors.errors[0].field, "description");

        habit.description = Some("x <img src=x>".to_string());
        assert!(habit.validate().is_err());
    }

    #[test]
    fn frequency_tokens_are_not_coerced() {
        let mut habit = input("Read");
        habit.frequency = Some("weekly".to_string());
        assert_eq!(habit.validate().unwrap().frequency, Frequency::Weekly);

        habit.frequency = Some("hourly".to_string());
        let errors = habit.validate().unwrap_err();
        assert_eq!(errors.errors[0].field, "frequency");
        assert_eq!(errors.errors[0].kind, "invalid_choice");
    }

    #[test]
    fn target_count_range() {
        let mut habit = input("Read");
        for ok in [1, 50, 100] {
            habit.target_count = Some(ok);
            assert!(habit.validate().is_ok());
        }
        for bad in [-5, 0, 101] {
            habit.target_count = Some(bad);
            let errors = habit.validate().unwrap_err();
            assert_eq!(errors.errors[0].field, "target_count");
        }
    }

    #[test]
    fn multiple_violations_are_all_reported() {
        let habit = HabitInput {
            name: String::new(),
            description: Some("A".repeat(501)),
            frequency: Some("hourly".to_string()),
            target_count: Some(0),
        };
        let errors = habit.validate().unwrap_err();
        let fields: Vec<&str> = errors.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["name", "description", "frequency", "target_count"]
        );
    }

    #[test]
    fn empty_patch_is_valid_and_empty() {
        let patch = HabitPatch::default();
        assert!(patch.is_empty());
        let valid = patch.validate().unwrap();
        assert!(valid.name.is_none() && valid.is_active.is_none());
    }

    #[test]
    fn patch_validates_only_present_fields() {
        let patch = HabitPatch {
            name: Some("  Gym  ".to_string()),
            is_active: Some(false),
            ..Default::default()
        };
        let valid = patch.validate().unwrap();
        assert_eq!(valid.name.as_deref(), Some("Gym"));
        assert_eq!(valid.is_active, Some(false));
        assert!(valid.frequency.is_none());

        let patch = HabitPatch {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn tracking_defaults() {
        let valid = TrackingInput::default().validate(today()).unwrap();
        assert_eq!(valid.completed_date, today());
        assert_eq!(valid.count, 1);
        assert_eq!(valid.notes, "");
    }

    #[test]
    fn tracking_same_day_allowed_future_rejected() {
        let mut tracking = TrackingInput {
            completed_date: Some("2025-06-15".to_string()),
            ..Default::default()
        };
        assert!(tracking.validate(today()).is_ok());

        tracking.completed_date = Some("2025-06-16".to_string());
        let errors = tracking.validate(today()).unwrap_err();
        assert_eq!(errors.errors[0].kind, "future_date");
        assert!(errors.errors[0].message.contains("future"));
    }

    #[test]
    fn tracking_rejects_garbage_dates() {
        let tracking = TrackingInput {
            completed_date: Some("15/06/2025".to_string()),
            ..Default::default()
        };
        let errors = tracking.validate(today()).unwrap_err();
        assert_eq!(errors.errors[0].kind, "invalid_date");
    }

    #[test]
    fn tracking_count_range() {
        let mut tracking = TrackingInput::default();
        for ok in [1, 100] {
            tracking.count = Some(ok);
            assert!(tracking.validate(today()).is_ok());
        }
        for bad in [0, 101] {
            tracking.count = Some(bad);
            assert!(tracking.validate(today()).is_err());
        }
    }

    #[test]
    fn tracking_notes_rules() {
        let mut tracking = TrackingInput {
            notes: Some("A".repeat(200)),
            ..Default::default()
        };
        assert!(tracking.validate(today()).is_ok());

        tracking.notes = Some("A".repeat(201));
        assert!(tracking.validate(today()).is_err());

        tracking.notes = Some("<script>alert('x')</script>".to_string());
        let errors = tracking.validate(today()).unwrap_err();
        assert_eq!(errors.errors[0].field, "notes");
        assert_eq!(errors.errors[0].kind, "forbidden_char");
    }
}
