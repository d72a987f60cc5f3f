// ABOUTME: Completed-workout document supplied by the external workout-logging system
// ABOUTME: Input of set-fact derivation; exercises, per-set effort flags, and end time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A finished workout as reported by the logging system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedWorkout {
    /// Workout identifier assigned by the logging system
    pub workout_id: String,
    /// Owner of the workout
    pub user_id: Uuid,
    /// When the workout was marked complete (UTC)
    pub end_time: DateTime<Utc>,
    /// User's UTC offset at completion time, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Exercises performed, in order
    #[serde(default)]
    pub exercises: Vec<WorkoutExercise>,
}

impl CompletedWorkout {
    /// Monday of the user-local week containing `end_time`
    #[must_use]
    pub fn week_start(&self) -> NaiveDate {
        week_start_for(self.end_time, self.utc_offset_minutes)
    }

    /// Total number of logged sets across all exercises
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// One exercise inside a completed workout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutExercise {
    /// Catalog exercise identifier
    pub exercise_id: String,
    /// Display name, if the logging system sent one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Logged sets
    #[serde(default)]
    pub sets: Vec<LoggedSet>,
}

/// One logged set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggedSet {
    /// Position of the set within its exercise
    pub set_index: u32,
    /// Repetitions performed
    pub reps: i32,
    /// Load in kilograms
    pub weight_kg: f64,
    /// Reps in reserve (0-5), if rated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rir: Option<i32>,
    /// Warmup sets never count as hard sets
    #[serde(default)]
    pub is_warmup: bool,
    /// Set was taken to failure
    #[serde(default)]
    pub is_failure: bool,
    /// Set was actually completed
    #[serde(default = "default_true")]
    pub completed: bool,
    /// Set was deleted by the user before completion
    #[serde(default)]
    pub deleted: bool,
}

impl LoggedSet {
    /// Whether this set should produce a set fact at all
    #[must_use]
    pub const fn qualifies(&self) -> bool {
        self.completed && !self.deleted
    }
}

const fn default_true() -> bool {
    true
}

/// Monday of the local week containing `instant` for a fixed UTC offset.
///
/// Offsets outside ±18h are treated as UTC.
#[must_use]
pub fn week_start_for(instant: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
        .unwrap_or_else(|| Utc.fix());
    let local_date = instant.with_timezone(&offset).date_naive();
    let days_from_monday = i64::from(local_date.weekday().num_days_from_monday());
    local_date - Duration::days(days_from_monday)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_week_start_is_monday() {
        // Wednesday 2025-03-12
        let t = Utc.with_ymd_and_hms(2025, 3, 12, 18, 0, 0).unwrap();
        assert_eq!(
            week_start_for(t, 0),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        );
    }

    #[test]
    fn test_week_start_uses_local_date() {
        // Monday 02:00 UTC is still Sunday in UTC-5, so it belongs to the previous week
        let t = Utc.with_ymd_and_hms(2025, 3, 10, 2, 0, 0).unwrap();
        assert_eq!(
            week_start_for(t, -300),
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
        );
        assert_eq!(
            week_start_for(t, 0),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        );
    }

    #[test]
    fn test_logged_set_defaults() {
        let set: LoggedSet =
            serde_json::from_str(r#"{"set_index":0,"reps":5,"weight_kg":100.0}"#).unwrap();
        assert!(set.qualifies());
        assert!(!set.is_warmup);
        assert_eq!(set.rir, None);
    }
}
