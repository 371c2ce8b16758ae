use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How often a habit is meant to be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!(
                "Frequency must be one of: daily, weekly, monthly (got '{}')",
                other
            )),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: Option<i64>,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub frequency: Frequency,
    pub is_active: bool,
    pub target_count: Option<i64>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// One dated completion event for a habit.
///
/// `completed_date` is the calendar day the habit was performed
/// (ISO 8601: YYYY-MM-DD); `tracked_at` is when the record was submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub id: Option<i64>,
    pub habit_id: i64,
    pub completed_date: String, // ISO 8601: YYYY-MM-DD
    pub count: i64,
    pub notes: String,
    pub tracked_at: String,
}

impl Habit {
    pub fn new(owner_id: i64, name: String, frequency: Frequency) -> Self {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            id: None,
            owner_id,
            name,
            description: String::new(),
            frequency,
            is_active: true,
            target_count: None,
            created_at: now,
            updated_at: None,
        }
    }
}

impl TrackingRecord {
    pub fn new(habit_id: i64, completed_date: String) -> Self {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            id: None,
            habit_id,
            completed_date,
            count: 1,
            notes: String::new(),
            tracked_at: now,
        }
    }
}
