//! Active workout session engine.
//!
//! A [`Session`] tracks one in-progress run of a workout: the exercise/set
//! cursor, an elapsed timer, a rest countdown and per-set weight/reps
//! entries. It performs no I/O. Timers advance one second per
//! [`Session::tick`], or by a whole clock poll at once through
//! [`Session::sync_clock`].
//!
//! Lifecycle: `start` → (user input and ticks) → `finish` or `exit`. Once a
//! session has finished or exited, ticks are ignored and every other
//! mutation is rejected with [`Error::State`].

use crate::clock::Clock;
use crate::config::RestConfig;
use crate::notify::{Notifier, SessionEvent};
use crate::types::{
    CompletionStats, ExercisePerformance, ExerciseProgress, PerformanceRecord, SetRecord, Workout,
    MAX_REPS,
};
use crate::{Error, Result};

/// Lifecycle phase of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Finished,
    Exited,
}

/// Rest countdown sub-state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestState {
    Idle,
    Counting { remaining: u32 },
}

/// A single field edit on a set
#[derive(Clone, Debug, PartialEq)]
pub enum SetField {
    /// Clamped to zero or more
    Weight(f64),
    /// Clamped to one or more; above `MAX_REPS` is rejected
    Reps(i64),
    Notes(String),
}

/// Outcome of moving the cursor forward
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    NextSet,
    NextExercise,
    /// Already on the last set of the last exercise; the cursor did not move
    WorkoutComplete,
}

#[derive(Debug, Clone)]
pub struct Session {
    workout: Workout,
    rest_config: RestConfig,
    elapsed_seconds: u32,
    running: bool,
    exercise_index: usize,
    set_index: usize,
    progress: Vec<ExerciseProgress>,
    rest: RestState,
    phase: SessionPhase,
    notes: String,
}

impl Session {
    /// Begin a session from a workout template
    ///
    /// Target weight and reps are copied into every set; later edits to the
    /// template do not affect the session.
    pub fn start(workout: &Workout, rest_config: &RestConfig) -> Result<Self> {
        workout.validate()?;

        let progress = workout
            .exercises
            .iter()
            .map(|exercise| ExerciseProgress {
                exercise_name: exercise.name.clone(),
                sets: (0..exercise.sets)
                    .map(|i| SetRecord {
                        set_number: i + 1,
                        weight: exercise.weight,
                        reps: exercise.reps,
                        completed: false,
                        notes: String::new(),
                    })
                    .collect(),
                completed: false,
            })
            .collect();

        tracing::info!(
            "Started session for '{}' ({} exercises, {} sets)",
            workout.name,
            workout.exercises.len(),
            workout.total_sets()
        );

        Ok(Self {
            workout: workout.clone(),
            rest_config: rest_config.clone(),
            elapsed_seconds: 0,
            running: false,
            exercise_index: 0,
            set_index: 0,
            progress,
            rest: RestState::Idle,
            phase: SessionPhase::Active,
            notes: String::new(),
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn workout(&self) -> &Workout {
        &self.workout
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    /// `(exercise_index, set_index)`
    pub fn cursor(&self) -> (usize, usize) {
        (self.exercise_index, self.set_index)
    }

    pub fn progress(&self) -> &[ExerciseProgress] {
        &self.progress
    }

    pub fn current_exercise(&self) -> &ExerciseProgress {
        &self.progress[self.exercise_index]
    }

    pub fn current_set(&self) -> &SetRecord {
        &self.current_exercise().sets[self.set_index]
    }

    pub fn rest_state(&self) -> RestState {
        self.rest
    }

    pub fn rest_remaining(&self) -> u32 {
        match self.rest {
            RestState::Idle => 0,
            RestState::Counting { remaining } => remaining,
        }
    }

    pub fn rest_visible(&self) -> bool {
        matches!(self.rest, RestState::Counting { .. })
    }

    pub fn is_last_set(&self) -> bool {
        self.set_index + 1 == self.current_exercise().sets.len()
    }

    pub fn is_last_exercise(&self) -> bool {
        self.exercise_index + 1 == self.progress.len()
    }

    /// Fraction of the workout behind the cursor, for progress bars
    pub fn completion_fraction(&self) -> f64 {
        let exercises = self.progress.len() as f64;
        let sets = self.current_exercise().sets.len() as f64;
        self.exercise_index as f64 / exercises + self.set_index as f64 / (exercises * sets)
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<()> {
        self.ensure_active("annotate")?;
        self.notes = notes.into();
        Ok(())
    }

    fn ensure_active(&self, action: &str) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::State(format!(
                "cannot {} a session that is {:?}",
                action, self.phase
            )))
        }
    }

    // ------------------------------------------------------------------
    // Elapsed timer
    // ------------------------------------------------------------------

    pub fn play(&mut self) -> Result<()> {
        self.ensure_active("play")?;
        self.running = true;
        tracing::debug!("Session timer running");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_active("pause")?;
        self.running = false;
        tracing::debug!("Session timer paused at {}s", self.elapsed_seconds);
        Ok(())
    }

    pub fn toggle_running(&mut self) -> Result<()> {
        if self.running {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Apply one second to both timers
    ///
    /// Returns `RestComplete` when this tick ends a rest countdown. Ignored
    /// once the session is no longer active.
    pub fn tick(&mut self) -> Option<SessionEvent> {
        if !self.is_active() {
            return None;
        }

        if self.running {
            self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        }

        match self.rest {
            RestState::Counting { remaining } if remaining <= 1 => {
                self.rest = RestState::Idle;
                tracing::debug!("Rest complete");
                Some(SessionEvent::RestComplete)
            }
            RestState::Counting { remaining } => {
                self.rest = RestState::Counting {
                    remaining: remaining - 1,
                };
                None
            }
            RestState::Idle => None,
        }
    }

    /// Poll the clock and apply every tick it reports
    pub fn sync_clock<C, N>(&mut self, clock: &mut C, notifier: &mut N) -> u32
    where
        C: Clock + ?Sized,
        N: Notifier + ?Sized,
    {
        let ticks = clock.poll_ticks();
        if let Some(event) = self.apply_ticks(ticks) {
            notifier.notify(&event);
        }
        ticks
    }

    /// Same as calling [`Session::tick`] `ticks` times. The rest countdown
    /// cannot restart while ticking, so at most one event results.
    fn apply_ticks(&mut self, ticks: u32) -> Option<SessionEvent> {
        if ticks == 0 || !self.is_active() {
            return None;
        }

        if self.running {
            self.elapsed_seconds = self.elapsed_seconds.saturating_add(ticks);
        }

        match self.rest {
            RestState::Counting { remaining } if remaining <= ticks => {
                self.rest = RestState::Idle;
                tracing::debug!("Rest complete");
                Some(SessionEvent::RestComplete)
            }
            RestState::Counting { remaining } => {
                self.rest = RestState::Counting {
                    remaining: remaining - ticks,
                };
                None
            }
            RestState::Idle => None,
        }
    }

    // ------------------------------------------------------------------
    // Rest timer
    // ------------------------------------------------------------------

    fn start_rest(&mut self, seconds: u32) {
        self.rest = RestState::Counting { remaining: seconds };
        tracing::debug!("Resting for {}s", seconds);
    }

    pub fn skip_rest(&mut self) -> Result<()> {
        self.ensure_active("skip rest in")?;
        self.rest = RestState::Idle;
        Ok(())
    }

    /// Add time to a running countdown; no effect while idle
    pub fn extend_rest(&mut self, seconds: u32) -> Result<()> {
        self.ensure_active("extend rest in")?;
        if let RestState::Counting { remaining } = self.rest {
            self.rest = RestState::Counting {
                remaining: remaining.saturating_add(seconds),
            };
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Set edits
    // ------------------------------------------------------------------

    /// Overwrite one field of a set
    ///
    /// Returns `Ok(false)` without touching anything when the indices are out
    /// of range.
    pub fn update_set(
        &mut self,
        exercise_index: usize,
        set_index: usize,
        field: SetField,
    ) -> Result<bool> {
        self.ensure_active("edit")?;

        match field {
            SetField::Weight(w) if !w.is_finite() => {
                return Err(Error::validation(format!("weight must be a number, got {}", w)));
            }
            SetField::Reps(r) if r > i64::from(MAX_REPS) => {
                return Err(Error::validation(format!(
                    "reps must be at most {}, got {}",
                    MAX_REPS, r
                )));
            }
            _ => {}
        }

        let Some(set) = self
            .progress
            .get_mut(exercise_index)
            .and_then(|p| p.sets.get_mut(set_index))
        else {
            tracing::warn!(
                "Ignoring set update at out-of-range position ({}, {})",
                exercise_index,
                set_index
            );
            return Ok(false);
        };

        match field {
            SetField::Weight(w) => set.weight = w.max(0.0),
            SetField::Reps(r) => set.reps = u32::try_from(r.max(1)).unwrap_or(MAX_REPS),
            SetField::Notes(notes) => set.notes = notes,
        }
        Ok(true)
    }

    /// Flip a set's completed flag; the cursor does not move
    pub fn toggle_set_completion(&mut self, exercise_index: usize, set_index: usize) -> Result<bool> {
        self.ensure_active("edit")?;
        match self
            .progress
            .get_mut(exercise_index)
            .and_then(|p| p.sets.get_mut(set_index))
        {
            Some(set) => {
                set.completed = !set.completed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Flip the exercise-level completed flag
    ///
    /// Independent of the per-set flags in both directions.
    pub fn mark_exercise_complete(&mut self, exercise_index: usize) -> Result<bool> {
        self.ensure_active("edit")?;
        match self.progress.get_mut(exercise_index) {
            Some(exercise) => {
                exercise.completed = !exercise.completed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    /// Move to the next set, or the first set of the next exercise
    ///
    /// Starts the between-sets or between-exercises rest countdown.
    pub fn advance(&mut self) -> Result<Advance> {
        self.ensure_active("advance")?;

        if !self.is_last_set() {
            let rest = self.workout.exercises[self.exercise_index]
                .rest_seconds
                .unwrap_or(self.rest_config.between_sets_seconds);
            self.set_index += 1;
            self.start_rest(rest);
            return Ok(Advance::NextSet);
        }

        if self.is_last_exercise() {
            tracing::info!("All exercises completed");
            return Ok(Advance::WorkoutComplete);
        }

        self.exercise_index += 1;
        self.set_index = 0;
        self.start_rest(self.rest_config.between_exercises_seconds);
        Ok(Advance::NextExercise)
    }

    /// Step the cursor back one set without resting
    ///
    /// Returns `false` at the first set of the first exercise.
    pub fn retreat(&mut self) -> Result<bool> {
        self.ensure_active("retreat")?;

        if self.set_index > 0 {
            self.set_index -= 1;
        } else if self.exercise_index > 0 {
            self.exercise_index -= 1;
            self.set_index = self.progress[self.exercise_index].sets.len() - 1;
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Ending
    // ------------------------------------------------------------------

    /// Stop the timers and produce the performance record
    pub fn finish(&mut self) -> Result<PerformanceRecord> {
        self.ensure_active("finish")?;

        self.running = false;
        self.rest = RestState::Idle;
        self.phase = SessionPhase::Finished;

        let exercises: Vec<ExercisePerformance> =
            self.progress.iter().map(ExercisePerformance::from).collect();
        let completion_stats = CompletionStats::from_exercises(&exercises);
        let notes = Some(self.notes.trim().to_string()).filter(|n| !n.is_empty());

        tracing::info!(
            "Finished '{}' after {}s ({}/{} exercises complete)",
            self.workout.name,
            self.elapsed_seconds,
            completion_stats.completed_exercises,
            completion_stats.total_exercises
        );

        Ok(PerformanceRecord {
            workout_id: self.workout.id.clone(),
            workout_name: self.workout.name.clone(),
            exercises,
            duration: self.elapsed_seconds,
            notes,
            completion_stats,
        })
    }

    /// Abandon the session without producing a record
    pub fn exit(&mut self) -> Result<()> {
        self.ensure_active("exit")?;
        self.running = false;
        self.rest = RestState::Idle;
        self.phase = SessionPhase::Exited;
        tracing::info!("Exited session for '{}' without saving", self.workout.name);
        Ok(())
    }
}

/// Format seconds as `MM:SS`
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
