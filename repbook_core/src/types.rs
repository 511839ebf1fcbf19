//! Core domain types for Repbook.
//!
//! This module defines the fundamental types used throughout the system:
//! - Workout templates and their exercises
//! - Workout references (denormalized snapshots used by schedules)
//! - Per-set progress captured during a session
//! - Performance records, both as emitted by a session and as stored

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Workout Templates
// ============================================================================

/// Kind of workout
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutType {
    #[default]
    Strength,
    Cardio,
    Hiit,
    Flexibility,
    Mixed,
}

impl WorkoutType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutType::Strength => "strength",
            WorkoutType::Cardio => "cardio",
            WorkoutType::Hiit => "hiit",
            WorkoutType::Flexibility => "flexibility",
            WorkoutType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkoutType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "strength" => Ok(WorkoutType::Strength),
            "cardio" => Ok(WorkoutType::Cardio),
            "hiit" => Ok(WorkoutType::Hiit),
            "flexibility" => Ok(WorkoutType::Flexibility),
            "mixed" => Ok(WorkoutType::Mixed),
            other => Err(Error::validation(format!("Unknown workout type: {}", other))),
        }
    }
}

/// An exercise template owned by a workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub name: String,
    #[serde(default = "default_sets")]
    pub sets: u32,
    #[serde(default = "default_reps")]
    pub reps: u32,
    #[serde(default)]
    pub weight: f64,
    /// Rest between sets of this exercise; falls back to the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u32>,
}

/// Upper bound on reps in a single set
pub const MAX_REPS: u32 = 10_000;

fn default_sets() -> u32 {
    3
}

fn default_reps() -> u32 {
    10
}

fn default_duration() -> u32 {
    45
}

impl Exercise {
    pub fn new(name: impl Into<String>, sets: u32, reps: u32, weight: f64) -> Self {
        Self {
            name: name.into(),
            sets,
            reps,
            weight,
            rest_seconds: None,
        }
    }
}

/// A reusable workout template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub workout_type: WorkoutType,
    /// Planned duration in minutes
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub notes: String,
}

impl Workout {
    /// Check that a session can be run from this template
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation(format!(
                "Workout {} has an empty name",
                self.id
            )));
        }

        if self.exercises.is_empty() {
            return Err(Error::validation(format!(
                "Workout '{}' has no exercises",
                self.name
            )));
        }

        for (idx, exercise) in self.exercises.iter().enumerate() {
            if exercise.name.trim().is_empty() {
                return Err(Error::validation(format!(
                    "Exercise #{} of '{}' has an empty name",
                    idx + 1,
                    self.name
                )));
            }
            if exercise.sets == 0 {
                return Err(Error::validation(format!(
                    "Exercise '{}' must have at least one set",
                    exercise.name
                )));
            }
            if exercise.reps == 0 || exercise.reps > MAX_REPS {
                return Err(Error::validation(format!(
                    "Exercise '{}' must have between 1 and {} reps",
                    exercise.name, MAX_REPS
                )));
            }
            if !exercise.weight.is_finite() || exercise.weight < 0.0 {
                return Err(Error::validation(format!(
                    "Exercise '{}' has invalid weight {}",
                    exercise.name, exercise.weight
                )));
            }
        }

        Ok(())
    }

    /// Total number of sets across all exercises
    pub fn total_sets(&self) -> u32 {
        self.exercises.iter().map(|e| e.sets).sum()
    }
}

/// Denormalized snapshot of a workout, as stored in schedules and overrides
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRef {
    pub workout_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub workout_type: WorkoutType,
    pub duration: u32,
}

impl From<&Workout> for WorkoutRef {
    fn from(workout: &Workout) -> Self {
        WorkoutRef {
            workout_id: workout.id.clone(),
            name: workout.name.clone(),
            workout_type: workout.workout_type,
            duration: workout.duration,
        }
    }
}

// ============================================================================
// Session Progress
// ============================================================================

/// One set as tracked during a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetRecord {
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// Live progress for one exercise of a session
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseProgress {
    pub exercise_name: String,
    pub sets: Vec<SetRecord>,
    pub completed: bool,
}

impl ExerciseProgress {
    pub fn completed_sets(&self) -> u32 {
        self.sets.iter().filter(|s| s.completed).count() as u32
    }
}

// ============================================================================
// Performance Records
// ============================================================================

/// An exercise as reported when a session finishes
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExercisePerformance {
    pub exercise_name: String,
    pub sets: Vec<SetRecord>,
    pub total_sets: u32,
    pub completed_sets: u32,
    pub completed: bool,
}

impl From<&ExerciseProgress> for ExercisePerformance {
    fn from(progress: &ExerciseProgress) -> Self {
        ExercisePerformance {
            exercise_name: progress.exercise_name.clone(),
            sets: progress.sets.clone(),
            total_sets: progress.sets.len() as u32,
            completed_sets: progress.completed_sets(),
            completed: progress.completed,
        }
    }
}

/// Exercise-level completion summary
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStats {
    pub total_exercises: u32,
    pub completed_exercises: u32,
    pub all_exercises_completed: bool,
}

impl CompletionStats {
    pub fn from_exercises(exercises: &[ExercisePerformance]) -> Self {
        let completed = exercises.iter().filter(|e| e.completed).count() as u32;
        CompletionStats {
            total_exercises: exercises.len() as u32,
            completed_exercises: completed,
            all_exercises_completed: exercises.iter().all(|e| e.completed),
        }
    }
}

/// The record a finished session hands to persistence
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub workout_id: String,
    pub workout_name: String,
    pub exercises: Vec<ExercisePerformance>,
    /// Elapsed seconds
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub completion_stats: CompletionStats,
}

/// An exercise as persisted, with its own aggregates
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredExercise {
    #[serde(flatten)]
    pub performance: ExercisePerformance,
    pub total_weight: f64,
    pub total_reps: u64,
}

/// A persisted performance
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredPerformance {
    pub id: Uuid,
    pub workout_id: String,
    pub workout_name: String,
    pub exercises: Vec<StoredExercise>,
    pub total_weight: f64,
    pub total_reps: u64,
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub completion_stats: CompletionStats,
    pub created_at: DateTime<Utc>,
}

/// Volume (weight x reps) and rep count over a set list
pub fn set_totals(sets: &[SetRecord]) -> (f64, u64) {
    sets.iter().fold((0.0, 0u64), |(weight, reps), set| {
        (
            weight + set.weight * f64::from(set.reps),
            reps.saturating_add(u64::from(set.reps)),
        )
    })
}

impl StoredPerformance {
    /// Compute aggregates and stamp a finished session record for storage
    pub fn from_record(record: PerformanceRecord, created_at: DateTime<Utc>) -> Self {
        let exercises: Vec<StoredExercise> = record
            .exercises
            .into_iter()
            .map(|performance| {
                let (total_weight, total_reps) = set_totals(&performance.sets);
                StoredExercise {
                    performance,
                    total_weight,
                    total_reps,
                }
            })
            .collect();

        let total_weight = exercises.iter().map(|e| e.total_weight).sum();
        let total_reps = exercises
            .iter()
            .fold(0u64, |acc, e| acc.saturating_add(e.total_reps));

        StoredPerformance {
            id: Uuid::new_v4(),
            workout_id: record.workout_id,
            workout_name: record.workout_name,
            exercises,
            total_weight,
            total_reps,
            duration: record.duration,
            notes: record.notes,
            completion_stats: record.completion_stats,
            created_at,
        }
    }

    /// Totals recomputed from the stored sets, ignoring cached aggregates
    pub fn recomputed_totals(&self) -> (f64, u64) {
        self.exercises
            .iter()
            .map(|e| set_totals(&e.performance.sets))
            .fold((0.0, 0u64), |(w, r), (ew, er)| (w + ew, r.saturating_add(er)))
    }
}
