//! Progress queries over stored performances.
//!
//! Recent history for the log view, per-exercise progression and per-day
//! training volume for the progress charts. Single performances can be
//! looked up by id or listed per workout.

use crate::types::{SetRecord, StoredPerformance};
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// One performance's view of a single exercise
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseStat {
    pub date: DateTime<Utc>,
    pub total_reps: u64,
    pub total_weight: f64,
    pub max_weight: f64,
    pub avg_weight: f64,
    pub sets: Vec<SetRecord>,
}

/// Aggregate training volume for one calendar day
#[derive(Clone, Debug, PartialEq)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total_weight: f64,
    pub total_reps: u64,
    pub count: u32,
}

/// Performances from the last `days` days, newest first
pub fn recent_performances(
    performances: &[StoredPerformance],
    now: DateTime<Utc>,
    days: i64,
) -> Vec<&StoredPerformance> {
    let cutoff = now - Duration::days(days);
    let mut recent: Vec<_> = performances
        .iter()
        .filter(|p| p.created_at >= cutoff)
        .collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    tracing::debug!(
        "{} of {} performances within the last {} days",
        recent.len(),
        performances.len(),
        days
    );
    recent
}

/// Find a performance by its full id or an unambiguous id prefix
pub fn performance_by_id<'a>(
    performances: &'a [StoredPerformance],
    id: &str,
) -> Result<&'a StoredPerformance> {
    let needle = id.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Err(Error::validation("performance id must not be empty"));
    }

    let matches: Vec<_> = performances
        .iter()
        .filter(|p| p.id.to_string().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [] => Err(Error::NotFound(format!("performance {}", id))),
        [found] => Ok(*found),
        _ => Err(Error::validation(format!(
            "performance id '{}' matches {} entries, use more characters",
            id,
            matches.len()
        ))),
    }
}

/// Every performance of one workout, newest first
pub fn performances_for_workout<'a>(
    performances: &'a [StoredPerformance],
    workout_id: &str,
) -> Vec<&'a StoredPerformance> {
    let mut matching: Vec<_> = performances
        .iter()
        .filter(|p| p.workout_id == workout_id)
        .collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matching
}

/// Progression of one exercise across performances, oldest first
pub fn exercise_stats(performances: &[StoredPerformance], exercise_name: &str) -> Vec<ExerciseStat> {
    let mut stats: Vec<ExerciseStat> = performances
        .iter()
        .filter_map(|p| {
            let exercise = p
                .exercises
                .iter()
                .find(|e| e.performance.exercise_name == exercise_name)?;
            let sets = &exercise.performance.sets;

            let max_weight = sets.iter().map(|s| s.weight).fold(0.0, f64::max);
            let avg_weight = if sets.is_empty() {
                0.0
            } else {
                sets.iter().map(|s| s.weight).sum::<f64>() / sets.len() as f64
            };

            Some(ExerciseStat {
                date: p.created_at,
                total_reps: exercise.total_reps,
                total_weight: exercise.total_weight,
                max_weight,
                avg_weight,
                sets: sets.clone(),
            })
        })
        .collect();
    stats.sort_by_key(|s| s.date);
    stats
}

/// Per-day sums of volume, reps and session count, in date order
pub fn daily_totals(performances: &[StoredPerformance]) -> Vec<DailyTotal> {
    let mut by_day: BTreeMap<NaiveDate, DailyTotal> = BTreeMap::new();
    for p in performances {
        let date = p.created_at.date_naive();
        let entry = by_day.entry(date).or_insert(DailyTotal {
            date,
            total_weight: 0.0,
            total_reps: 0,
            count: 0,
        });
        entry.total_weight += p.total_weight;
        entry.total_reps = entry.total_reps.saturating_add(p.total_reps);
        entry.count += 1;
    }
    by_day.into_values().collect()
}

/// Distinct exercise names seen in any performance, sorted
pub fn exercise_names(performances: &[StoredPerformance]) -> Vec<String> {
    performances
        .iter()
        .flat_map(|p| p.exercises.iter().map(|e| e.performance.exercise_name.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompletionStats, ExercisePerformance, PerformanceRecord};
    use chrono::TimeZone;

    fn performance(at: DateTime<Utc>, exercise: &str, weights: &[f64]) -> StoredPerformance {
        let sets: Vec<SetRecord> = weights
            .iter()
            .enumerate()
            .map(|(i, &weight)| SetRecord {
                set_number: i as u32 + 1,
                weight,
                reps: 5,
                completed: true,
                notes: String::new(),
            })
            .collect();
        let record = PerformanceRecord {
            workout_id: "w1".into(),
            workout_name: "Leg Day".into(),
            exercises: vec![ExercisePerformance {
                exercise_name: exercise.into(),
                total_sets: sets.len() as u32,
                completed_sets: sets.len() as u32,
                completed: true,
                sets,
            }],
            duration: 600,
            notes: None,
            completion_stats: CompletionStats::default(),
        };
        StoredPerformance::from_record(record, at)
    }

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_performance_by_id() {
        let performances = vec![
            performance(day(1, 9), "Squat", &[100.0]),
            performance(day(2, 9), "Squat", &[110.0]),
        ];
        let target = &performances[1];
        let full = target.id.to_string();

        assert_eq!(performance_by_id(&performances, &full).unwrap(), target);
        assert_eq!(
            performance_by_id(&performances, &full.to_uppercase()).unwrap(),
            target
        );
        assert_eq!(performance_by_id(&performances, &full[..13]).unwrap(), target);

        let err = performance_by_id(&performances, "not-an-id").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(performance_by_id(&performances, "  ").unwrap_err().is_validation());
    }

    #[test]
    fn test_performance_by_id_ambiguous_prefix() {
        let mut performances = vec![
            performance(day(1, 9), "Squat", &[100.0]),
            performance(day(2, 9), "Squat", &[110.0]),
        ];
        performances[0].id = uuid::Uuid::parse_str("aaaaaaaa-0000-4000-8000-000000000001").unwrap();
        performances[1].id = uuid::Uuid::parse_str("aaaaaaaa-0000-4000-8000-000000000002").unwrap();

        assert!(performance_by_id(&performances, "aaaa").unwrap_err().is_validation());
        let found = performance_by_id(&performances, "aaaaaaaa-0000-4000-8000-000000000002").unwrap();
        assert_eq!(found.created_at, day(2, 9));
    }

    #[test]
    fn test_performances_for_workout() {
        let mut performances = vec![
            performance(day(1, 9), "Squat", &[100.0]),
            performance(day(3, 9), "Squat", &[100.0]),
            performance(day(2, 9), "Bench Press", &[80.0]),
        ];
        performances[2].workout_id = "w2".into();

        let dates: Vec<_> = performances_for_workout(&performances, "w1")
            .iter()
            .map(|p| p.created_at)
            .collect();
        assert_eq!(dates, vec![day(3, 9), day(1, 9)]);
        assert!(performances_for_workout(&performances, "missing").is_empty());
    }

    #[test]
    fn test_recent_performances_window_and_order() {
        let performances = vec![
            performance(day(1, 9), "Squat", &[100.0]),
            performance(day(9, 9), "Squat", &[100.0]),
            performance(day(7, 9), "Squat", &[100.0]),
        ];

        let recent = recent_performances(&performances, day(10, 9), 7);
        let dates: Vec<_> = recent.iter().map(|p| p.created_at).collect();
        assert_eq!(dates, vec![day(9, 9), day(7, 9)]);
    }

    #[test]
    fn test_exercise_stats() {
        let performances = vec![
            performance(day(5, 9), "Squat", &[100.0, 120.0]),
            performance(day(2, 9), "Squat", &[90.0, 90.0]),
            performance(day(3, 9), "Bench Press", &[80.0]),
        ];

        let stats = exercise_stats(&performances, "Squat");
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].date, day(2, 9));
        assert_eq!(stats[1].max_weight, 120.0);
        assert_eq!(stats[1].avg_weight, 110.0);
        assert_eq!(stats[1].total_weight, 1100.0);
        assert_eq!(stats[1].total_reps, 10);

        assert!(exercise_stats(&performances, "Deadlift").is_empty());
    }

    #[test]
    fn test_daily_totals_group_by_day() {
        let performances = vec![
            performance(day(2, 8), "Squat", &[100.0]),
            performance(day(2, 18), "Squat", &[50.0]),
            performance(day(1, 8), "Squat", &[10.0]),
        ];

        let totals = daily_totals(&performances);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(totals[1].count, 2);
        assert_eq!(totals[1].total_weight, 750.0);
        assert_eq!(totals[1].total_reps, 10);
    }

    #[test]
    fn test_exercise_names_distinct_sorted() {
        let performances = vec![
            performance(day(2, 8), "Squat", &[100.0]),
            performance(day(3, 8), "Bench Press", &[50.0]),
            performance(day(4, 8), "Squat", &[10.0]),
        ];
        assert_eq!(exercise_names(&performances), vec!["Bench Press", "Squat"]);
    }
}
