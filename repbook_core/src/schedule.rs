//! Weekly schedule and date-override reconciliation.
//!
//! Two independent documents describe what is planned:
//! - [`Schedule`]: seven weekday slots, each a list of workout references
//! - [`DateOverrides`]: calendar date → workout references
//!
//! They are never merged here. A weekly view reads the schedule, a calendar
//! view reads the overrides. Every operation takes documents by reference
//! and returns new ones, and all input validation for day names, date keys
//! and reference lists lives in this module.

use crate::catalog::WorkoutCatalog;
use crate::types::WorkoutRef;
use crate::{Error, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Day names
// ============================================================================

/// Canonical weekday names, Sunday first
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayName {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayName {
    pub const ALL: [DayName; 7] = [
        DayName::Sunday,
        DayName::Monday,
        DayName::Tuesday,
        DayName::Wednesday,
        DayName::Thursday,
        DayName::Friday,
        DayName::Saturday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayName::Sunday => "Sunday",
            DayName::Monday => "Monday",
            DayName::Tuesday => "Tuesday",
            DayName::Wednesday => "Wednesday",
            DayName::Thursday => "Thursday",
            DayName::Friday => "Friday",
            DayName::Saturday => "Saturday",
        }
    }
}

impl fmt::Display for DayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DayName::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Invalid day: {}", s)))
    }
}

impl From<Weekday> for DayName {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sun => DayName::Sunday,
            Weekday::Mon => DayName::Monday,
            Weekday::Tue => DayName::Tuesday,
            Weekday::Wed => DayName::Wednesday,
            Weekday::Thu => DayName::Thursday,
            Weekday::Fri => DayName::Friday,
            Weekday::Sat => DayName::Saturday,
        }
    }
}

/// The weekday slot a calendar date falls on
pub fn day_for_date(date: NaiveDate) -> DayName {
    date.weekday().into()
}

// ============================================================================
// Weekly schedule
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySlot {
    pub day: DayName,
    #[serde(default)]
    pub workouts: Vec<WorkoutRef>,
}

/// Weekly recurring schedule with exactly one slot per weekday
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "ScheduleDocument")]
pub struct Schedule {
    days: Vec<DaySlot>,
}

/// Wire shape accepted before normalisation
#[derive(Deserialize)]
struct ScheduleDocument {
    #[serde(default)]
    days: Vec<DaySlot>,
}

impl TryFrom<ScheduleDocument> for Schedule {
    type Error = Error;

    fn try_from(doc: ScheduleDocument) -> Result<Self> {
        Schedule::from_slots(doc.days)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::empty()
    }
}

impl Schedule {
    /// Seven empty slots
    pub fn empty() -> Self {
        Schedule {
            days: DayName::ALL
                .into_iter()
                .map(|day| DaySlot {
                    day,
                    workouts: Vec::new(),
                })
                .collect(),
        }
    }

    /// Build from arbitrary slots: missing weekdays become empty, duplicates are rejected
    pub fn from_slots(slots: Vec<DaySlot>) -> Result<Self> {
        let mut by_day: BTreeMap<DayName, Vec<WorkoutRef>> = BTreeMap::new();
        for slot in slots {
            if by_day.insert(slot.day, slot.workouts).is_some() {
                return Err(Error::validation(format!(
                    "Day {} appears more than once",
                    slot.day
                )));
            }
        }

        Ok(Schedule {
            days: DayName::ALL
                .into_iter()
                .map(|day| DaySlot {
                    day,
                    workouts: by_day.remove(&day).unwrap_or_default(),
                })
                .collect(),
        })
    }

    pub fn days(&self) -> &[DaySlot] {
        &self.days
    }

    /// Same schedule with every slot emptied
    pub fn cleared(&self) -> Self {
        Self::empty()
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|slot| slot.workouts.is_empty())
    }
}

/// Workouts planned for a weekday; empty if the slot is missing
pub fn get_day_slot(schedule: &Schedule, day: DayName) -> &[WorkoutRef] {
    schedule
        .days
        .iter()
        .find(|slot| slot.day == day)
        .map(|slot| slot.workouts.as_slice())
        .unwrap_or(&[])
}

/// New schedule with one weekday's list replaced
pub fn set_day_slot(schedule: &Schedule, weekday: &str, workouts: Vec<WorkoutRef>) -> Result<Schedule> {
    let day: DayName = weekday.parse()?;

    let mut days = schedule.days.clone();
    match days.iter_mut().find(|slot| slot.day == day) {
        Some(slot) => slot.workouts = workouts,
        None => days.push(DaySlot { day, workouts }),
    }
    days.sort_by_key(|slot| slot.day);

    tracing::debug!("Replaced {} slot", day);
    Ok(Schedule { days })
}

/// [`set_day_slot`] for untyped input; `workouts` must be a JSON array
pub fn set_day_slot_json(
    schedule: &Schedule,
    weekday: &str,
    workouts: &serde_json::Value,
) -> Result<Schedule> {
    set_day_slot(schedule, weekday, parse_workout_refs(workouts)?)
}

/// Replace every slot from a JSON `days` array
pub fn replace_days_json(days: &serde_json::Value) -> Result<Schedule> {
    if !days.is_array() {
        return Err(Error::validation("Days must be an array"));
    }
    let slots: Vec<DaySlot> = serde_json::from_value(days.clone())
        .map_err(|e| Error::validation(format!("Malformed day slot: {}", e)))?;
    Schedule::from_slots(slots)
}

/// Parse a JSON array of workout references
pub fn parse_workout_refs(value: &serde_json::Value) -> Result<Vec<WorkoutRef>> {
    if !value.is_array() {
        return Err(Error::validation("Workouts must be an array"));
    }
    serde_json::from_value(value.clone())
        .map_err(|e| Error::validation(format!("Malformed workout reference: {}", e)))
}

/// Weekdays whose lists differ between two schedules
pub fn changed_days(previous: &Schedule, next: &Schedule) -> Vec<DayName> {
    DayName::ALL
        .into_iter()
        .filter(|&day| get_day_slot(previous, day) != get_day_slot(next, day))
        .collect()
}

// ============================================================================
// Date overrides
// ============================================================================

/// Workouts pinned to specific calendar dates
///
/// An empty list and a missing date mean the same thing; empty lists are
/// never stored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct DateOverrides {
    entries: BTreeMap<NaiveDate, Vec<WorkoutRef>>,
}

/// Parse a `YYYY-MM-DD` key
pub fn parse_date_key(key: &str) -> Result<NaiveDate> {
    if key.len() != 10 {
        return Err(Error::validation(format!("Invalid date (expected YYYY-MM-DD): {}", key)));
    }
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .map_err(|e| Error::validation(format!("Invalid date {}: {}", key, e)))
}

impl DateOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: NaiveDate) -> &[WorkoutRef] {
        self.entries.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[WorkoutRef])> {
        self.entries.iter().map(|(d, w)| (*d, w.as_slice()))
    }

    /// Overrides between `start` and `end`, inclusive
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<(NaiveDate, &[WorkoutRef])>> {
        if start > end {
            return Err(Error::validation(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }
        Ok(self
            .entries
            .range(start..=end)
            .map(|(d, w)| (*d, w.as_slice()))
            .collect())
    }

    /// Drop entries holding empty lists
    pub fn normalized(mut self) -> Self {
        self.entries.retain(|_, workouts| !workouts.is_empty());
        self
    }
}

/// Workouts pinned to a date key; empty when none
pub fn get_date_override<'a>(overrides: &'a DateOverrides, date_key: &str) -> Result<&'a [WorkoutRef]> {
    Ok(overrides.get(parse_date_key(date_key)?))
}

/// New override map with one date replaced, or removed when `workouts` is empty
pub fn set_date_override(
    overrides: &DateOverrides,
    date_key: &str,
    workouts: Vec<WorkoutRef>,
) -> Result<DateOverrides> {
    let date = parse_date_key(date_key)?;
    let mut next = overrides.clone();
    if workouts.is_empty() {
        next.entries.remove(&date);
        tracing::debug!("Cleared override for {}", date);
    } else {
        tracing::debug!("Override for {} set to {} workouts", date, workouts.len());
        next.entries.insert(date, workouts);
    }
    Ok(next)
}

/// Dates whose lists differ between two override maps
pub fn changed_dates(previous: &DateOverrides, next: &DateOverrides) -> Vec<NaiveDate> {
    let dates: BTreeSet<NaiveDate> = previous
        .entries
        .keys()
        .chain(next.entries.keys())
        .copied()
        .collect();
    dates
        .into_iter()
        .filter(|&d| previous.get(d) != next.get(d))
        .collect()
}

// ============================================================================
// Catalog resolution
// ============================================================================

/// Snapshot references for the given ids, dropping ids the catalog does not know
pub fn resolve_workout_refs<S, C>(ids: &[S], catalog: &C) -> Vec<WorkoutRef>
where
    S: AsRef<str>,
    C: WorkoutCatalog + ?Sized,
{
    ids.iter()
        .filter_map(|id| {
            let id: &str = id.as_ref();
            let found = catalog.get_by_id(id);
            if found.is_none() {
                tracing::debug!("Pruning unknown workout id {}", id);
            }
            found.map(WorkoutRef::from)
        })
        .collect()
}

/// Like [`resolve_workout_refs`] but fails on the first unknown id
pub fn resolve_workout_refs_strict<S, C>(ids: &[S], catalog: &C) -> Result<Vec<WorkoutRef>>
where
    S: AsRef<str>,
    C: WorkoutCatalog + ?Sized,
{
    ids.iter()
        .map(|id| {
            let id: &str = id.as_ref();
            catalog
                .get_by_id(id)
                .map(WorkoutRef::from)
                .ok_or_else(|| Error::NotFound(format!("workout {}", id)))
        })
        .collect()
}
