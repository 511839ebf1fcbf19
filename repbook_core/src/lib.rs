#![forbid(unsafe_code)]

//! Core domain model and business logic for Repbook.
//!
//! This crate provides:
//! - Domain types (workouts, exercises, set records, performances)
//! - Workout catalog
//! - Active session engine with elapsed and rest timers
//! - Weekly schedule and date-override reconciliation
//! - Persistence (JSONL performance log, schedule documents, CSV export)
//! - Progress history queries

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod clock;
pub mod notify;
pub mod session;
pub mod schedule;
pub mod store;
pub mod history;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, load_catalog, Catalog, WorkoutCatalog};
pub use config::Config;
pub use clock::{Clock, ManualClock, SystemClock};
pub use notify::{LogNotifier, Notifier, SessionEvent};
pub use session::{format_clock, Advance, RestState, Session, SessionPhase, SetField};
pub use schedule::{DateOverrides, DayName, DaySlot, Schedule};
pub use store::{read_performances, DataPaths, JsonlPerformanceLog, PerformanceSink};
