pub mod cli;
pub mod config;
pub mod database;
pub mod models;
pub mod problem;
pub mod service;
pub mod stats;
pub mod utils;
pub mod validate;

pub use config::Config;
pub use database::Database;
pub use models::{Frequency, Habit, TrackingRecord};
pub use problem::Problem;
pub use service::{HabitService, ServiceError, SystemClock};
pub use stats::{HabitStats, Period};
pub use utils::Profile;
