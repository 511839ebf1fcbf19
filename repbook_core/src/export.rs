//! CSV export of stored performances.
//!
//! One row per set, so the file opens directly in a spreadsheet for the
//! historical-data table. The CSV is written to a temp file, fsynced and
//! renamed over the destination.

use crate::types::StoredPerformance;
use crate::{Error, Result};
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    performance_id: String,
    created_at: String,
    workout_name: &'a str,
    exercise_name: &'a str,
    set_number: u32,
    weight: f64,
    reps: u32,
    completed: bool,
    duration_seconds: u32,
}

/// Write every set of every performance to `csv_path`
///
/// Returns the number of rows written (excluding the header).
pub fn export_performances_csv(performances: &[StoredPerformance], csv_path: &Path) -> Result<usize> {
    let parent = csv_path
        .parent()
        .ok_or_else(|| Error::Storage(format!("{:?} has no parent directory", csv_path)))?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(temp.as_file());

    let mut rows = 0;
    for performance in performances {
        for exercise in &performance.exercises {
            for set in &exercise.performance.sets {
                writer.serialize(CsvRow {
                    performance_id: performance.id.to_string(),
                    created_at: performance.created_at.to_rfc3339(),
                    workout_name: &performance.workout_name,
                    exercise_name: &exercise.performance.exercise_name,
                    set_number: set.set_number,
                    weight: set.weight,
                    reps: set.reps,
                    completed: set.completed,
                    duration_seconds: performance.duration,
                })?;
                rows += 1;
            }
        }
    }

    writer.flush()?;
    drop(writer);
    temp.as_file().sync_all()?;
    temp.persist(csv_path)
        .map_err(|e| Error::Storage(format!("Failed to replace {:?}: {}", csv_path, e.error)))?;

    tracing::info!("Exported {} sets to {:?}", rows, csv_path);
    Ok(rows)
}
