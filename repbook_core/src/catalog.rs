//! Workout catalog: the read-only source of workout templates.
//!
//! Sessions are started from catalog workouts and schedule references are
//! resolved against it. The built-in catalog ships a handful of templates;
//! a JSON file can replace it through `[catalog] path` in the config.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

/// Read-only workout lookup
pub trait WorkoutCatalog {
    fn get_by_id(&self, id: &str) -> Option<&Workout>;

    /// All workouts, sorted by name
    fn list(&self) -> Vec<&Workout>;
}

/// In-memory catalog keyed by workout id
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub workouts: HashMap<String, Workout>,
}

impl WorkoutCatalog for Catalog {
    fn get_by_id(&self, id: &str) -> Option<&Workout> {
        self.workouts.get(id)
    }

    fn list(&self) -> Vec<&Workout> {
        let mut workouts: Vec<_> = self.workouts.values().collect();
        workouts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        workouts
    }
}

impl FromIterator<Workout> for Catalog {
    fn from_iter<I: IntoIterator<Item = Workout>>(iter: I) -> Self {
        Catalog {
            workouts: iter.into_iter().map(|w| (w.id.clone(), w)).collect(),
        }
    }
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog with built-in workouts
pub fn build_default_catalog() -> Catalog {
    vec![
        Workout {
            id: "leg_day".into(),
            name: "Leg Day".into(),
            workout_type: WorkoutType::Strength,
            duration: 45,
            exercises: vec![
                Exercise::new("Squat", 3, 10, 135.0),
                Exercise::new("Romanian Deadlift", 3, 8, 115.0),
                Exercise {
                    rest_seconds: Some(45),
                    ..Exercise::new("Walking Lunge", 2, 12, 25.0)
                },
            ],
            notes: "Brace before every rep.".into(),
        },
        Workout {
            id: "upper_push".into(),
            name: "Upper Push".into(),
            workout_type: WorkoutType::Strength,
            duration: 40,
            exercises: vec![
                Exercise::new("Bench Press", 4, 8, 135.0),
                Exercise::new("Overhead Press", 3, 8, 75.0),
                Exercise::new("Dips", 3, 10, 0.0),
            ],
            notes: String::new(),
        },
        Workout {
            id: "hiit_circuit".into(),
            name: "HIIT Circuit".into(),
            workout_type: WorkoutType::Hiit,
            duration: 20,
            exercises: vec![
                Exercise {
                    rest_seconds: Some(20),
                    ..Exercise::new("Burpee", 5, 10, 0.0)
                },
                Exercise {
                    rest_seconds: Some(20),
                    ..Exercise::new("Kettlebell Swing", 5, 15, 35.0)
                },
            ],
            notes: String::new(),
        },
        Workout {
            id: "mobility_flow".into(),
            name: "Mobility Flow".into(),
            workout_type: WorkoutType::Flexibility,
            duration: 15,
            exercises: vec![
                Exercise::new("Hip CARs", 2, 5, 0.0),
                Exercise::new("Cat-Cow", 2, 10, 0.0),
            ],
            notes: String::new(),
        },
    ]
    .into_iter()
    .collect()
}

/// Load a catalog from a JSON array of workouts
///
/// Every workout must pass validation and ids must be unique.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let contents = std::fs::read_to_string(path)?;
    let workouts: Vec<Workout> = serde_json::from_str(&contents)?;
    let count = workouts.len();

    let catalog: Catalog = workouts.into_iter().collect();
    if catalog.workouts.len() != count {
        return Err(Error::CatalogValidation(format!(
            "{:?} contains duplicate workout ids",
            path
        )));
    }

    let errors = catalog.validate();
    if !errors.is_empty() {
        return Err(Error::CatalogValidation(errors.join("; ")));
    }

    tracing::info!("Loaded {} workouts from {:?}", count, path);
    Ok(catalog)
}

impl Catalog {
    /// Validate the catalog for internal consistency
    ///
    /// Returns a list of validation errors (empty if valid)
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, workout) in &self.workouts {
            if id.is_empty() || workout.id.is_empty() {
                errors.push("Workout has empty ID".to_string());
            }
            if id != &workout.id {
                errors.push(format!(
                    "Workout key '{}' doesn't match workout.id '{}'",
                    id, workout.id
                ));
            }
            if let Err(e) = workout.validate() {
                errors.push(format!("Workout '{}': {}", id, e));
            }
        }

        errors
    }
}
