use rusqlite::Connection;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::models::{Frequency, Habit, TrackingRecord};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
}

/// Outcome of inserting a tracking record. The unique index on
/// (habit_id, completed_date) makes a second insert for the same day
/// come back as `Duplicate` instead of a second row.
#[derive(Debug)]
pub enum TrackingInsert {
    Inserted(i64),
    Duplicate,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;

        let db = Database { conn };
        db.initialize_schema()?;
        info!(path, "database ready");

        Ok(db)
    }

    /// In-memory database for tests
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema (tables and indexes)
    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS habits (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id        INTEGER NOT NULL,
                name            TEXT NOT NULL,
                description     TEXT NOT NULL DEFAULT '',
                frequency       TEXT NOT NULL DEFAULT 'daily',
                is_active       INTEGER NOT NULL DEFAULT 1,
                target_count    INTEGER,
                created_at      TEXT NOT NULL,
                updated_at      TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tracking_records (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                habit_id        INTEGER NOT NULL REFERENCES habits(id),
                completed_date  TEXT NOT NULL,
                count           INTEGER NOT NULL DEFAULT 1,
                notes           TEXT NOT NULL DEFAULT '',
                tracked_at      TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_habits_owner_id ON habits(owner_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_habits_name ON habits(name)",
            [],
        )?;

        // One completion per habit per calendar day, enforced at the store
        // boundary so concurrent submissions cannot both create a row.
        self.conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_tracking_habit_date
             ON tracking_records(habit_id, completed_date)",
            [],
        )?;

        Ok(())
    }

    /// Insert a habit and return its ID
    pub fn insert_habit(&self, habit: &Habit) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO habits (owner_id, name, description, frequency, is_active, target_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                habit.owner_id,
                habit.name,
                habit.description,
                habit.frequency.as_str(),
                if habit.is_active { 1 } else { 0 },
                habit.target_count,
                habit.created_at,
                habit.updated_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Helper function to map a row to a Habit
    fn row_to_habit(row: &rusqlite::Row) -> Result<Habit, rusqlite::Error> {
        let frequency: String = row.get(4)?;
        Ok(Habit {
            id: Some(row.get(0)?),
            owner_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            frequency: frequency.parse().unwrap_or(Frequency::Daily),
            is_active: row.get::<_, i64>(5)? != 0,
            target_count: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    /// Get a single habit by ID, scoped to its owner
    pub fn get_habit(&self, id: i64, owner_id: i64) -> Result<Option<Habit>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, name, description, frequency, is_active, target_count, created_at, updated_at
             FROM habits WHERE id = ?1 AND owner_id = ?2"
        )?;

        let result = stmt.query_row(rusqlite::params![id, owner_id], Self::row_to_habit);

        match result {
            Ok(habit) => Ok(Some(habit)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// Get all habits for an owner, newest first, optionally active only
    pub fn get_all_habits(
        &self,
        owner_id: i64,
        active_only: bool,
    ) -> Result<Vec<Habit>, DatabaseError> {
        if active_only {
            let mut stmt = self.conn.prepare(
                "SELECT id, owner_id, name, description, frequency, is_active, target_count, created_at, updated_at
                 FROM habits WHERE owner_id = ?1 AND is_active = 1 ORDER BY created_at DESC, id DESC"
            )?;
            let habits = stmt
                .query_map(rusqlite::params![owner_id], Self::row_to_habit)?
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(habits);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, name, description, frequency, is_active, target_count, created_at, updated_at
             FROM habits WHERE owner_id = ?1 ORDER BY created_at DESC, id DESC"
        )?;
        let habits = stmt
            .query_map(rusqlite::params![owner_id], Self::row_to_habit)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(habits)
    }

    /// Count an owner's active habits (for the creation quota)
    pub fn count_active_habits(&self, owner_id: i64) -> Result<i64, DatabaseError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM habits WHERE owner_id = ?1 AND is_active = 1",
            rusqlite::params![owner_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Update an existing habit
    pub fn update_habit(&self, habit: &Habit) -> Result<(), DatabaseError> {
        let id = habit.id.ok_or_else(|| {
            DatabaseError::SqliteError(rusqlite::Error::InvalidColumnType(
                0,
                "id".to_string(),
                rusqlite::types::Type::Null,
            ))
        })?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE habits SET name = ?1, description = ?2, frequency = ?3,
             is_active = ?4, target_count = ?5, updated_at = ?6 WHERE id = ?7 AND owner_id = ?8",
            rusqlite::params![
                habit.name,
                habit.description,
                habit.frequency.as_str(),
                if habit.is_active { 1 } else { 0 },
                habit.target_count,
                habit.updated_at,
                id,
                habit.owner_id
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Insert a tracking record. A uniqueness violation on
    /// (habit_id, completed_date) is reported as `Duplicate`, not an error.
    pub fn insert_tracking(
        &self,
        record: &TrackingRecord,
    ) -> Result<TrackingInsert, DatabaseError> {
        let result = self.conn.execute(
            "INSERT INTO tracking_records (habit_id, completed_date, count, notes, tracked_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                record.habit_id,
                record.completed_date,
                record.count,
                record.notes,
                record.tracked_at
            ],
        );

        match result {
            Ok(_) => Ok(TrackingInsert::Inserted(self.conn.last_insert_rowid())),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(TrackingInsert::Duplicate)
            }
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// Helper function to map a row to a TrackingRecord
    fn row_to_tracking(row: &rusqlite::Row) -> Result<TrackingRecord, rusqlite::Error> {
        Ok(TrackingRecord {
            id: Some(row.get(0)?),
            habit_id: row.get(1)?,
            completed_date: row.get(2)?,
            count: row.get(3)?,
            notes: row.get(4)?,
            tracked_at: row.get(5)?,
        })
    }

    /// Find the tracking record for one habit on one date
    pub fn find_tracking(
        &self,
        habit_id: i64,
        completed_date: &str,
    ) -> Result<Option<TrackingRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, habit_id, completed_date, count, notes, tracked_at
             FROM tracking_records WHERE habit_id = ?1 AND completed_date = ?2",
        )?;

        let result = stmt.query_row(
            rusqlite::params![habit_id, completed_date],
            Self::row_to_tracking,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// Get all tracking records for a habit ordered by date DESC (newest first)
    pub fn get_tracking_records(
        &self,
        habit_id: i64,
    ) -> Result<Vec<TrackingRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, habit_id, completed_date, count, notes, tracked_at
             FROM tracking_records WHERE habit_id = ?1 ORDER BY completed_date DESC",
        )?;
        let records = stmt
            .query_map(rusqlite::params![habit_id], Self::row_to_tracking)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, Habit, TrackingRecord};

    fn habit(owner: i64, name: &str) -> Habit {
        Habit::new(owner, name.to_string(), Frequency::Daily)
    }

    #[test]
    fn insert_and_fetch_habit() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_habit(&habit(1, "Read")).unwrap();

        let fetched = db.get_habit(id, 1).unwrap().unwrap();
        assert_eq!(fetched.name, "Read");
        assert_eq!(fetched.frequency, Frequency::Daily);
        assert!(fetched.is_active);
    }

    #[test]
    fn habit_lookups_are_owner_scoped() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_habit(&habit(1, "Read")).unwrap();

        assert!(db.get_habit(id, 2).unwrap().is_none());
        assert!(db.get_all_habits(2, false).unwrap().is_empty());
    }

    #[test]
    fn active_only_filter() {
        let db = Database::open_in_memory().unwrap();
        db.insert_habit(&habit(1, "Read")).unwrap();
        let mut inactive = habit(1, "Gym");
        inactive.is_active = false;
        db.insert_habit(&inactive).unwrap();

        assert_eq!(db.get_all_habits(1, true).unwrap().len(), 1);
        assert_eq!(db.get_all_habits(1, false).unwrap().len(), 2);
        assert_eq!(db.count_active_habits(1).unwrap(), 1);
    }

    #[test]
    fn duplicate_tracking_insert_reports_duplicate() {
        let db = Database::open_in_memory().unwrap();
        let habit_id = db.insert_habit(&habit(1, "Read")).unwrap();

        let record = TrackingRecord::new(habit_id, "2025-06-15".to_string());
        let first = db.insert_tracking(&record).unwrap();
        assert!(matches!(first, TrackingInsert::Inserted(_)));

        let second = db.insert_tracking(&record).unwrap();
        assert!(matches!(second, TrackingInsert::Duplicate));

        assert_eq!(db.get_tracking_records(habit_id).unwrap().len(), 1);
    }

    #[test]
    fn same_date_allowed_across_habits() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_habit(&habit(1, "Read")).unwrap();
        let b = db.insert_habit(&habit(1, "Gym")).unwrap();

        let date = "2025-06-15".to_string();
        assert!(matches!(
            db.insert_tracking(&TrackingRecord::new(a, date.clone()))
                .unwrap(),
            TrackingInsert::Inserted(_)
        ));
        assert!(matches!(
            db.insert_tracking(&TrackingRecord::new(b, date)).unwrap(),
            TrackingInsert::Inserted(_)
        ));
    }

    #[test]
    fn update_habit_persists_changes() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_habit(&habit(1, "Read")).unwrap();

        let mut stored = db.get_habit(id, 1).unwrap().unwrap();
        stored.name = "Read books".to_string();
        stored.is_active = false;
        stored.updated_at = Some("2025-06-15 12:00:00".to_string());
        db.update_habit(&stored).unwrap();

        let fetched = db.get_habit(id, 1).unwrap().unwrap();
        assert_eq!(fetched.name, "Read books");
        assert!(!fetched.is_active);
        assert!(fetched.updated_at.is_some());
    }

    #[test]
    fn find_tracking_by_date() {
        let db = Database::open_in_memory().unwrap();
        let habit_id = db.insert_habit(&habit(1, "Read")).unwrap();
        db.insert_tracking(&TrackingRecord::new(habit_id, "2025-06-15".to_string()))
            .unwrap();

        assert!(
            db.find_tracking(habit_id, "2025-06-15")
                .unwrap()
                .is_some()
        );
        assert!(db.find_tracking(habit_id, "2025-06-14").unwrap().is_none());
    }
}
