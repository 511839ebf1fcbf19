//! File-backed persistence for performances, the weekly schedule and date
//! overrides.
//!
//! Performances are appended to a JSONL (JSON Lines) log under an exclusive
//! file lock. Schedule and override documents are written atomically
//! (temp file, fsync, rename) and read under a shared lock. Edits to a
//! document hold an exclusive lock on a `<name>.lock` sidecar across the
//! whole load, modify, save cycle so concurrent writers never drop each
//! other's changes.

use crate::schedule::{set_date_override, DateOverrides, Schedule};
use crate::types::{PerformanceRecord, StoredPerformance, WorkoutRef};
use crate::{Error, Result};
use chrono::Utc;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Standard file layout below the data directory
#[derive(Clone, Debug)]
pub struct DataPaths {
    pub performances: PathBuf,
    pub schedule: PathBuf,
    pub date_overrides: PathBuf,
    pub export_csv: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            performances: data_dir.join("performances.jsonl"),
            schedule: data_dir.join("schedule.json"),
            date_overrides: data_dir.join("date_overrides.json"),
            export_csv: data_dir.join("performances.csv"),
        }
    }
}

// ============================================================================
// Performance log
// ============================================================================

/// Persistence collaborator for finished sessions
pub trait PerformanceSink {
    fn save(&mut self, record: PerformanceRecord) -> Result<StoredPerformance>;
}

/// JSONL-based performance log with file locking
pub struct JsonlPerformanceLog {
    path: PathBuf,
}

impl JsonlPerformanceLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, performance: &StoredPerformance) -> Result<()> {
        ensure_parent_dir(&self.path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;
        let torn_tail = ends_without_newline(&mut file)?;

        let mut writer = std::io::BufWriter::new(&file);
        if torn_tail {
            // Torn write from an earlier crash
            tracing::warn!("Performance log {:?} ends in a partial line", self.path);
            writer.write_all(b"\n")?;
        }
        let line = serde_json::to_string(performance)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;
        Ok(())
    }
}

fn ends_without_newline(file: &mut File) -> Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

impl PerformanceSink for JsonlPerformanceLog {
    fn save(&mut self, record: PerformanceRecord) -> Result<StoredPerformance> {
        let stored = StoredPerformance::from_record(record, Utc::now());
        self.append(&stored)?;
        tracing::debug!(
            "Appended performance {} ({}) to {:?}",
            stored.id,
            stored.workout_name,
            self.path
        );
        Ok(stored)
    }
}

/// Read all performances from a log, oldest first
///
/// Lines that fail to parse are logged and skipped.
pub fn read_performances(path: &Path) -> Result<Vec<StoredPerformance>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut performances = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<StoredPerformance>(&line) {
            Ok(performance) => performances.push(performance),
            Err(e) => {
                tracing::warn!("Failed to parse performance at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} performances from {:?}", performances.len(), path);
    Ok(performances)
}

// ============================================================================
// Documents
// ============================================================================

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Read a JSON document under a shared lock
///
/// `Ok(None)` when the file does not exist. Unreadable or corrupt files are
/// logged and also yield `Ok(None)`.
fn load_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("Unable to open {:?}: {}. Using defaults.", path, e);
            return Ok(None);
        }
    };

    if let Err(e) = file.lock_shared() {
        tracing::warn!("Unable to lock {:?}: {}. Using defaults.", path, e);
        return Ok(None);
    }

    let mut contents = String::new();
    let read = BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    if let Err(e) = read {
        tracing::warn!("Failed to read {:?}: {}. Using defaults.", path, e);
        return Ok(None);
    }

    match serde_json::from_str::<T>(&contents) {
        Ok(doc) => {
            tracing::debug!("Loaded document from {:?}", path);
            Ok(Some(doc))
        }
        Err(e) => {
            tracing::warn!("Failed to parse {:?}: {}. Using defaults.", path, e);
            Ok(None)
        }
    }
}

/// Atomically replace a JSON document
fn save_document<T: Serialize>(doc: &T, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;

    let parent = path
        .parent()
        .ok_or_else(|| Error::Storage(format!("{:?} has no parent directory", path)))?;
    let temp = NamedTempFile::new_in(parent)?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, doc)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    temp.persist(path)
        .map_err(|e| Error::Storage(format!("Failed to replace {:?}: {}", path, e.error)))?;

    tracing::debug!("Saved document to {:?}", path);
    Ok(())
}

/// Exclusive lock on a document's `.lock` sidecar, released on drop.
///
/// The document itself is replaced by rename on every save, so the lock has
/// to live on a file that outlasts those renames.
struct DocumentLock {
    file: File,
}

impl DocumentLock {
    fn acquire(doc_path: &Path) -> Result<Self> {
        ensure_parent_dir(doc_path)?;

        let mut lock_path = doc_path.as_os_str().to_owned();
        lock_path.push(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(PathBuf::from(lock_path))?;

        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release document lock: {}", e);
        }
    }
}

impl Schedule {
    /// Load the schedule, creating a seven-empty-slot one on first read
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let _lock = DocumentLock::acquire(path)?;
            return Self::load_or_create(path);
        }
        Ok(load_document(path)?.unwrap_or_default())
    }

    // Caller holds the document lock
    fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No schedule found, creating an empty one at {:?}", path);
            let schedule = Schedule::empty();
            schedule.save(path)?;
            return Ok(schedule);
        }
        Ok(load_document(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_document(self, path)
    }

    /// Apply `edit` to the stored schedule under the document lock.
    ///
    /// Returns `(previous, next)`; the file is rewritten only when a day
    /// actually changed.
    pub fn update<F>(path: &Path, edit: F) -> Result<(Schedule, Schedule)>
    where
        F: FnOnce(&Schedule) -> Result<Schedule>,
    {
        let _lock = DocumentLock::acquire(path)?;
        let current = Self::load_or_create(path)?;
        let next = edit(&current)?;
        if next != current {
            next.save(path)?;
        }
        Ok((current, next))
    }
}

impl DateOverrides {
    /// Load overrides; a missing or corrupt file is an empty map
    pub fn load(path: &Path) -> Result<Self> {
        Ok(load_document::<DateOverrides>(path)?
            .unwrap_or_default()
            .normalized())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_document(self, path)
    }

    /// Apply `edit` to the stored overrides under the document lock,
    /// returning the new map
    pub fn update<F>(path: &Path, edit: F) -> Result<DateOverrides>
    where
        F: FnOnce(&DateOverrides) -> Result<DateOverrides>,
    {
        let _lock = DocumentLock::acquire(path)?;
        let current = Self::load(path)?;
        let next = edit(&current)?;
        if next != current {
            next.save(path)?;
        }
        Ok(next)
    }
}

/// Replace one date's workouts in the override file, returning the new map
pub fn save_override(path: &Path, date_key: &str, workouts: Vec<WorkoutRef>) -> Result<DateOverrides> {
    DateOverrides::update(path, |current| set_date_override(current, date_key, workouts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{get_day_slot, set_day_slot, DayName};
    use crate::types::{CompletionStats, ExercisePerformance, SetRecord, WorkoutType};

    fn record(name: &str, weight: f64) -> PerformanceRecord {
        let sets: Vec<SetRecord> = (1..=2)
            .map(|n| SetRecord {
                set_number: n,
                weight,
                reps: 5,
                completed: true,
                notes: String::new(),
            })
            .collect();
        PerformanceRecord {
            workout_id: "w1".into(),
            workout_name: name.into(),
            exercises: vec![ExercisePerformance {
                exercise_name: "Squat".into(),
                sets,
                total_sets: 2,
                completed_sets: 2,
                completed: true,
            }],
            duration: 300,
            notes: None,
            completion_stats: CompletionStats {
                total_exercises: 1,
                completed_exercises: 1,
                all_exercises_completed: true,
            },
        }
    }

    fn leg_day_ref() -> WorkoutRef {
        WorkoutRef {
            workout_id: "w1".into(),
            name: "Leg Day".into(),
            workout_type: WorkoutType::Strength,
            duration: 45,
        }
    }

    #[test]
    fn test_save_and_read_performance() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("performances.jsonl");

        let mut log = JsonlPerformanceLog::new(&path);
        let stored = log.save(record("Leg Day", 100.0)).unwrap();
        assert_eq!(stored.total_weight, 1000.0);
        assert_eq!(stored.total_reps, 10);

        let read = read_performances(&path).unwrap();
        assert_eq!(read, vec![stored]);
    }

    #[test]
    fn test_totals_survive_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("performances.jsonl");

        let mut log = JsonlPerformanceLog::new(&path);
        for weight in [0.0, 52.5, 135.0] {
            log.save(record("Leg Day", weight)).unwrap();
        }

        for performance in read_performances(&path).unwrap() {
            assert_eq!(
                performance.recomputed_totals(),
                (performance.total_weight, performance.total_reps)
            );
        }
    }

    #[test]
    fn test_read_skips_corrupt_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("performances.jsonl");

        let mut log = JsonlPerformanceLog::new(&path);
        log.save(record("A", 10.0)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{ not json").unwrap();
        }
        log.save(record("B", 10.0)).unwrap();

        let read = read_performances(&path).unwrap();
        let names: Vec<_> = read.iter().map(|p| p.workout_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_append_after_partial_line() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("performances.jsonl");

        let mut log = JsonlPerformanceLog::new(&path);
        log.save(record("A", 10.0)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            write!(file, "{{\"id\":\"part").unwrap();
        }
        log.save(record("B", 10.0)).unwrap();

        let read = read_performances(&path).unwrap();
        let names: Vec<_> = read.iter().map(|p| p.workout_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_read_missing_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(read_performances(&temp_dir.path().join("none.jsonl"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_schedule_created_on_first_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("schedule.json");

        let schedule = Schedule::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(schedule.days().len(), 7);
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_schedule_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("schedule.json");

        let schedule = set_day_slot(&Schedule::empty(), "Friday", vec![leg_day_ref()]).unwrap();
        schedule.save(&path).unwrap();

        let loaded = Schedule::load(&path).unwrap();
        assert_eq!(loaded, schedule);
        assert_eq!(get_day_slot(&loaded, DayName::Friday).len(), 1);
    }

    #[test]
    fn test_corrupt_schedule_falls_back_to_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("schedule.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let schedule = Schedule::load(&path).unwrap();
        assert!(schedule.is_empty());
        // the corrupt file is left for manual recovery
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ invalid json }");
    }

    #[test]
    fn test_save_override_set_and_clear() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("date_overrides.json");

        save_override(&path, "2024-05-01", vec![leg_day_ref()]).unwrap();
        let loaded = DateOverrides::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);

        save_override(&path, "2024-05-01", vec![]).unwrap();
        assert!(DateOverrides::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_save_override_rejects_bad_date() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("date_overrides.json");

        let err = save_override(&path, "May 1st", vec![leg_day_ref()]).unwrap_err();
        assert!(err.is_validation());
        assert!(!path.exists());
    }

    #[test]
    fn test_concurrent_override_writers_keep_every_date() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("date_overrides.json");

        let handles: Vec<_> = (1..=8)
            .map(|day| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let key = format!("2024-05-{:02}", day);
                    save_override(&path, &key, vec![leg_day_ref()]).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = DateOverrides::load(&path).unwrap();
        assert_eq!(loaded.len(), 8);
    }

    #[test]
    fn test_concurrent_schedule_updates_keep_every_day() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("schedule.json");
        let days = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

        let handles: Vec<_> = days
            .iter()
            .map(|day| {
                let path = path.clone();
                let day = day.to_string();
                std::thread::spawn(move || {
                    Schedule::update(&path, |current| {
                        set_day_slot(current, &day, vec![leg_day_ref()])
                    })
                    .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = Schedule::load(&path).unwrap();
        for day in DayName::ALL {
            assert_eq!(get_day_slot(&loaded, day).len(), 1, "{:?} lost its workout", day);
        }
    }

    #[test]
    fn test_schedule_update_skips_unchanged_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("schedule.json");
        Schedule::update(&path, |current| set_day_slot(current, "Monday", vec![leg_day_ref()]))
            .unwrap();
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();

        let (previous, next) = Schedule::update(&path, |current| {
            set_day_slot(current, "Monday", vec![leg_day_ref()])
        })
        .unwrap();
        assert_eq!(previous, next);
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("schedule.json");
        Schedule::empty().save(&path).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "schedule.json")
            .collect();
        assert!(extras.is_empty(), "Unexpected files: {:?}", extras);
    }
}
