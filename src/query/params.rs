// ABOUTME: Typed request parameters for the analytics query endpoints
// ABOUTME: Deserialized from tool arguments; caps are applied by the query service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{AppError, AppResult};

/// `sets.query` parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetQueryParams {
    /// Target: one muscle group
    pub muscle_group: Option<String>,
    /// Target: one muscle
    pub muscle: Option<String>,
    /// Target: up to ten exercises
    pub exercise_ids: Option<Vec<String>>,
    /// Inclusive start, `YYYY-MM-DD` or RFC 3339
    pub start_date: Option<String>,
    /// Inclusive end, `YYYY-MM-DD` or RFC 3339
    pub end_date: Option<String>,
    /// Include warmup sets
    #[serde(default)]
    pub include_warmups: bool,
    /// Minimum reps
    pub min_reps: Option<i32>,
    /// Maximum reps
    pub max_reps: Option<i32>,
    /// Minimum load in kg
    pub min_weight_kg: Option<f64>,
    /// Maximum load in kg
    pub max_weight_kg: Option<f64>,
    /// Maximum RIR
    pub max_rir: Option<i32>,
    /// Only failure sets
    #[serde(default)]
    pub failure_only: bool,
    /// Only sets with hard-set credit
    #[serde(default)]
    pub hard_sets_only: bool,
    /// `date_desc` or `e1rm_desc`
    pub sort: Option<String>,
    /// Projection
    pub fields: Option<Vec<String>>,
    /// Page size
    pub limit: Option<i64>,
    /// Resume position
    pub cursor: Option<String>,
}

/// `series.*.get` and `progress.*.summary` parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesParams {
    /// Exercise, muscle-group or muscle id
    pub id: String,
    /// Weeks ending at the anchor week
    pub window_weeks: Option<i64>,
    /// Anchor date, defaults to today
    pub as_of: Option<String>,
}

/// `context.coaching.pack` parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachingPackParams {
    /// Weeks ending at the anchor week, default 4
    pub window_weeks: Option<i64>,
    /// Anchor date, defaults to today
    pub as_of: Option<String>,
}

/// `active.snapshotLite` parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotParams {
    /// Specific workout; the latest active one when absent
    pub workout_id: Option<String>,
    /// Exercises to include
    pub limit: Option<i64>,
}

/// `active.events.list` parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsParams {
    /// Workout whose events to list
    pub workout_id: String,
    /// Page size
    pub limit: Option<i64>,
    /// Resume position
    pub cursor: Option<String>,
}

/// Deserialize tool arguments; `null` reads as an empty object
///
/// # Errors
///
/// Returns `InvalidInput` if the arguments do not match the parameter shape
pub fn parse_params<T: for<'de> Deserialize<'de>>(args: Value) -> AppResult<T> {
    let args = if args.is_null() {
        Value::Object(Map::new())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| AppError::invalid_input(format!("Invalid arguments: {e}")))
}
