// ABOUTME: Weekly series models for exercise, muscle group, and muscle aggregates
// ABOUTME: WeeklyPoint holds mergeable counters only; averages are derived at read time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::set_fact::RepsBucket;

/// Which entity a series document tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    /// Keyed by `exercise_id`
    Exercise,
    /// Keyed by canonical muscle group id
    MuscleGroup,
    /// Keyed by canonical muscle id
    Muscle,
}

impl SeriesKind {
    /// Storage and wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exercise => "exercise",
            Self::MuscleGroup => "muscle_group",
            Self::Muscle => "muscle",
        }
    }

    /// Parse the storage name
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exercise" => Some(Self::Exercise),
            "muscle_group" => Some(Self::MuscleGroup),
            "muscle" => Some(Self::Muscle),
            _ => None,
        }
    }
}

/// Per-bucket set counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepsBuckets {
    /// 1-5 reps
    #[serde(rename = "1-5")]
    pub one_to_five: i64,
    /// 6-10 reps
    #[serde(rename = "6-10")]
    pub six_to_ten: i64,
    /// 11-15 reps
    #[serde(rename = "11-15")]
    pub eleven_to_fifteen: i64,
    /// 16-20 reps
    #[serde(rename = "16-20")]
    pub sixteen_to_twenty: i64,
}

impl RepsBuckets {
    /// Increment the slot for `bucket`
    pub fn increment(&mut self, bucket: RepsBucket) {
        match bucket {
            RepsBucket::OneToFive => self.one_to_five += 1,
            RepsBucket::SixToTen => self.six_to_ten += 1,
            RepsBucket::ElevenToFifteen => self.eleven_to_fifteen += 1,
            RepsBucket::SixteenToTwenty => self.sixteen_to_twenty += 1,
        }
    }

    fn absorb(&mut self, other: &Self) {
        self.one_to_five += other.one_to_five;
        self.six_to_ten += other.six_to_ten;
        self.eleven_to_fifteen += other.eleven_to_fifteen;
        self.sixteen_to_twenty += other.sixteen_to_twenty;
    }
}

/// Counters for one entity in one calendar week.
///
/// Every field merges commutatively: counters add, `e1rm_max` takes the max.
/// `e1rm_p90` is recomputed from facts, never merged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeeklyPoint {
    /// Working sets
    pub sets: i64,
    /// Sum of hard-set credit (attribution-weighted for muscle series)
    pub hard_sets: f64,
    /// Raw volume of the sets touching this entity
    pub volume: f64,
    /// Attribution-weighted volume
    pub effective_volume: f64,
    /// Sum of rated RIR values
    pub rir_sum: i64,
    /// Number of sets with a rated RIR
    pub rir_count: i64,
    /// Sets taken to failure
    pub failure_sets: i64,
    /// Set counts by rep range
    pub reps_bucket: RepsBuckets,
    /// Best e1RM of the week (exercise series only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e1rm_max: Option<f64>,
    /// 90th percentile e1RM of the week (exercise series only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e1rm_p90: Option<f64>,
}

impl WeeklyPoint {
    /// Merge another delta into this one (increments and monotonic max)
    pub fn absorb(&mut self, other: &Self) {
        self.sets += other.sets;
        self.hard_sets += other.hard_sets;
        self.volume += other.volume;
        self.effective_volume += other.effective_volume;
        self.rir_sum += other.rir_sum;
        self.rir_count += other.rir_count;
        self.failure_sets += other.failure_sets;
        self.reps_bucket.absorb(&other.reps_bucket);
        self.e1rm_max = max_option(self.e1rm_max, other.e1rm_max);
    }

    /// Average RIR, derived as `rir_sum / rir_count`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_rir(&self) -> Option<f64> {
        (self.rir_count > 0).then(|| self.rir_sum as f64 / self.rir_count as f64)
    }

    /// `failure_sets / sets`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn failure_rate(&self) -> Option<f64> {
        (self.sets > 0).then(|| self.failure_sets as f64 / self.sets as f64)
    }
}

/// Larger of two optional values, ignoring `None`
#[must_use]
pub fn max_option(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Small rolling summary kept alongside the weekly points
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesSummary {
    /// Working sets ever aggregated into this series
    pub total_sets: i64,
    /// Volume ever aggregated into this series
    pub total_volume: f64,
    /// Best e1RM ever seen (exercise series only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_e1rm: Option<f64>,
    /// Most recent contributing workout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_workout_end_time: Option<DateTime<Utc>>,
}

/// A weekly point with its derived read-time values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPointView {
    /// Monday of the week
    pub week_start: NaiveDate,
    /// Stored counters
    #[serde(flatten)]
    pub point: WeeklyPoint,
    /// `rir_sum / rir_count`
    pub avg_rir: Option<f64>,
}

/// A series document: weekly points keyed by week start, plus a rolling summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDocument {
    /// Entity kind
    pub kind: SeriesKind,
    /// Entity id
    pub entity_id: String,
    /// Weekly points, oldest first
    pub weeks: BTreeMap<NaiveDate, WeeklyPoint>,
    /// Rolling summary
    pub summary: SeriesSummary,
}

impl SeriesDocument {
    /// An empty series; absent documents read as this, never as an error
    #[must_use]
    pub fn empty(kind: SeriesKind, entity_id: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            weeks: BTreeMap::new(),
            summary: SeriesSummary::default(),
        }
    }

    /// Keep only the weeks in the `window_weeks` calendar weeks ending at `current_week`
    #[must_use]
    pub fn trimmed_to_window(mut self, current_week: NaiveDate, window_weeks: u32) -> Self {
        let earliest = current_week - Duration::weeks(i64::from(window_weeks.saturating_sub(1)));
        self.weeks.retain(|week, _| *week >= earliest && *week <= current_week);
        self
    }

    /// Weekly points with derived values, oldest first
    #[must_use]
    pub fn week_views(&self) -> Vec<WeeklyPointView> {
        self.weeks
            .iter()
            .map(|(week_start, point)| WeeklyPointView {
                week_start: *week_start,
                point: point.clone(),
                avg_rir: point.avg_rir(),
            })
            .collect()
    }

    /// One point per calendar week from the first to the last stored week, oldest first.
    ///
    /// Weeks without a stored row come back as empty points, so neighbouring entries
    /// are always exactly seven days apart.
    #[must_use]
    pub fn contiguous_points(&self) -> Vec<WeeklyPoint> {
        let (Some(&first), Some(&last)) = (self.weeks.keys().next(), self.weeks.keys().next_back())
        else {
            return Vec::new();
        };
        let mut points = Vec::new();
        let mut week = first;
        while week <= last {
            points.push(self.weeks.get(&week).cloned().unwrap_or_default());
            week += Duration::weeks(1);
        }
        points
    }
}
