// ABOUTME: Single source of truth for query limits, projections, windows, and target filters
// ABOUTME: Clamps what can be clamped and rejects ambiguous or over-cap requests up front
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Query Caps
//!
//! Every endpoint runs its parameters through these functions before touching
//! storage. `limit`, `window_weeks` and `fields` are clamped or filtered and never
//! rejected. Target ambiguity, `exercise_ids` over cap, malformed dates and unknown
//! sorts are `ValidationFailed` errors carrying the offending parameter in `details`.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use pierre_core::constants::limits::{
    DEFAULT_LIMIT, DEFAULT_WINDOW_WEEKS, MAX_EXERCISE_IDS, MAX_FIELDS, MAX_LIMIT, MAX_WINDOW_WEEKS,
};
use pierre_core::models::{week_start_for, SetFactField};
use pierre_core::pagination::SortMode;
use pierre_intelligence::{MuscleTaxonomy, Resolved};
use serde_json::json;

use crate::database::FactTarget;
use crate::errors::{AppError, AppResult};

/// Caps applied to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcedCaps {
    /// Page size in `[1, 200]`
    pub limit: usize,
    /// Window in `[1, 52]` weeks
    pub window_weeks: u32,
    /// Allow-listed projection, at most 20 fields
    pub fields: Vec<SetFactField>,
}

/// Clamp a requested page size; `None` means the default
#[must_use]
pub fn clamp_limit(requested: Option<i64>) -> usize {
    requested.map_or(DEFAULT_LIMIT, |n| {
        usize::try_from(n.max(1)).map_or(MAX_LIMIT, |n| n.min(MAX_LIMIT))
    })
}

/// Clamp a requested window; `None` means `default`
#[must_use]
pub fn clamp_window_weeks(requested: Option<i64>, default: u32) -> u32 {
    requested.map_or(default.clamp(1, MAX_WINDOW_WEEKS), |n| {
        u32::try_from(n.max(1)).map_or(MAX_WINDOW_WEEKS, |n| n.min(MAX_WINDOW_WEEKS))
    })
}

/// Keep allow-listed field names in request order, dropping unknowns and duplicates.
///
/// An absent or fully-unknown list falls back to the default projection.
#[must_use]
pub fn filter_fields(requested: Option<&[String]>) -> Vec<SetFactField> {
    let mut seen = BTreeSet::new();
    let fields: Vec<SetFactField> = requested
        .unwrap_or_default()
        .iter()
        .filter_map(|name| SetFactField::parse(name))
        .filter(|field| seen.insert(*field))
        .take(MAX_FIELDS)
        .collect();

    if fields.is_empty() {
        SetFactField::DEFAULT.to_vec()
    } else {
        fields
    }
}

/// Apply the clamping caps together
#[must_use]
pub fn enforce_query_caps(
    limit: Option<i64>,
    window_weeks: Option<i64>,
    fields: Option<&[String]>,
) -> EnforcedCaps {
    EnforcedCaps {
        limit: clamp_limit(limit),
        window_weeks: clamp_window_weeks(window_weeks, DEFAULT_WINDOW_WEEKS),
        fields: filter_fields(fields),
    }
}

/// Reject `exercise_ids` lists that are empty, over cap, or contain blank ids
///
/// # Errors
///
/// Returns `ValidationFailed` describing the violated bound
pub fn validate_exercise_ids(ids: &[String]) -> AppResult<()> {
    if ids.is_empty() {
        return Err(AppError::validation("exercise_ids must not be empty")
            .with_details(json!({ "parameter": "exercise_ids" })));
    }
    if ids.len() > MAX_EXERCISE_IDS {
        return Err(AppError::validation(format!(
            "exercise_ids accepts at most {MAX_EXERCISE_IDS} ids, got {}",
            ids.len()
        ))
        .with_details(json!({
            "parameter": "exercise_ids",
            "max": MAX_EXERCISE_IDS,
            "received": ids.len(),
        })));
    }
    if ids.iter().any(|id| id.trim().is_empty()) {
        return Err(AppError::validation("exercise_ids must not contain blank ids")
            .with_details(json!({ "parameter": "exercise_ids" })));
    }
    Ok(())
}

/// Resolve the single target dimension of a set query.
///
/// Group and muscle names go through the taxonomy, so aliases such as `"pecs"` work.
///
/// # Errors
///
/// Returns `ValidationFailed` if zero or several dimensions are supplied, if a name
/// is unknown or of the wrong kind, or if `exercise_ids` violates its cap
pub fn resolve_target(
    taxonomy: &MuscleTaxonomy,
    muscle_group: Option<&str>,
    muscle: Option<&str>,
    exercise_ids: Option<&[String]>,
) -> AppResult<FactTarget> {
    match (muscle_group, muscle, exercise_ids) {
        (Some(group), None, None) => match taxonomy.resolve(group) {
            Some(Resolved::Group { group }) => Ok(FactTarget::MuscleGroup(group)),
            _ => Err(unknown_entity("muscle_group", group)),
        },
        (None, Some(name), None) => match taxonomy.resolve(name) {
            Some(Resolved::Muscle { muscle, .. }) => Ok(FactTarget::Muscle(muscle)),
            _ => Err(unknown_entity("muscle", name)),
        },
        (None, None, Some(ids)) => {
            validate_exercise_ids(ids)?;
            Ok(FactTarget::Exercises(ids.to_vec()))
        }
        (group, name, ids) => {
            let supplied = usize::from(group.is_some())
                + usize::from(name.is_some())
                + usize::from(ids.is_some());
            Err(AppError::validation(format!(
                "exactly one of muscle_group, muscle, exercise_ids is required, got {supplied}"
            ))
            .with_details(json!({
                "parameter": "target",
                "supplied": supplied,
            })))
        }
    }
}

/// Resolve a canonical muscle group id for series and summary endpoints
///
/// # Errors
///
/// Returns `ValidationFailed` if the name is not a known group
pub fn resolve_muscle_group(taxonomy: &MuscleTaxonomy, id: &str) -> AppResult<String> {
    match taxonomy.resolve(id) {
        Some(Resolved::Group { group }) => Ok(group),
        _ => Err(unknown_entity("id", id)),
    }
}

/// Resolve a canonical muscle id for series and summary endpoints
///
/// # Errors
///
/// Returns `ValidationFailed` if the name is not a known muscle
pub fn resolve_muscle(taxonomy: &MuscleTaxonomy, id: &str) -> AppResult<String> {
    match taxonomy.resolve(id) {
        Some(Resolved::Muscle { muscle, .. }) => Ok(muscle),
        _ => Err(unknown_entity("id", id)),
    }
}

/// Require a non-blank entity id
///
/// # Errors
///
/// Returns `ValidationFailed` for a blank id
pub fn require_id(id: &str) -> AppResult<&str> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("id must not be empty")
            .with_details(json!({ "parameter": "id" })));
    }
    Ok(trimmed)
}

fn unknown_entity(parameter: &str, value: &str) -> AppError {
    AppError::validation(format!("unknown {parameter} '{value}'"))
        .with_details(json!({ "parameter": parameter, "value": value }))
}

/// Half-open instant range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

/// Parse an inclusive `start_date`..`end_date` pair.
///
/// Each bound is `YYYY-MM-DD` (a whole UTC day) or RFC 3339. Both are required.
///
/// # Errors
///
/// Returns `ValidationFailed` if a bound is missing or malformed, or if start is after end
pub fn parse_date_range(start_date: Option<&str>, end_date: Option<&str>) -> AppResult<DateRange> {
    let start_raw = start_date.ok_or_else(|| missing("start_date"))?;
    let end_raw = end_date.ok_or_else(|| missing("end_date"))?;

    let (start, _) = parse_bound("start_date", start_raw)?;
    let (end_inclusive, end_is_date) = parse_bound("end_date", end_raw)?;
    if start > end_inclusive {
        return Err(AppError::validation(format!(
            "start_date {start_raw} is after end_date {end_raw}"
        ))
        .with_details(json!({ "parameter": "start_date" })));
    }

    let end = if end_is_date {
        end_inclusive + Duration::days(1)
    } else {
        end_inclusive + Duration::milliseconds(1)
    };
    Ok(DateRange { start, end })
}

/// Parse one bound, reporting whether it was a bare date
fn parse_bound(parameter: &str, raw: &str) -> AppResult<(DateTime<Utc>, bool)> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok((date.and_time(NaiveTime::MIN).and_utc(), true));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| (instant.with_timezone(&Utc), false))
        .map_err(|_| {
            AppError::validation(format!(
                "{parameter} must be YYYY-MM-DD or RFC 3339, got '{raw}'"
            ))
            .with_details(json!({ "parameter": parameter, "value": raw }))
        })
}

fn missing(parameter: &str) -> AppError {
    AppError::validation(format!("{parameter} is required"))
        .with_details(json!({ "parameter": parameter }))
}

/// Monday of the week a window ends in: the week of `as_of` (YYYY-MM-DD), or of today
///
/// # Errors
///
/// Returns `ValidationFailed` if `as_of` is malformed
pub fn anchor_week(as_of: Option<&str>) -> AppResult<NaiveDate> {
    let instant = match as_of {
        Some(raw) => parse_bound("as_of", raw)?.0,
        None => Utc::now(),
    };
    Ok(week_start_for(instant, 0))
}

/// First week of a `window_weeks` window ending at `current_week`
#[must_use]
pub fn window_start(current_week: NaiveDate, window_weeks: u32) -> NaiveDate {
    current_week - Duration::weeks(i64::from(window_weeks.saturating_sub(1)))
}

/// Reject inverted optional bounds such as `min_reps > max_reps`
///
/// # Errors
///
/// Returns `ValidationFailed` naming the lower bound
pub fn validate_bounds<T: PartialOrd + Copy>(
    parameter: &str,
    min: Option<T>,
    max: Option<T>,
) -> AppResult<()> {
    match (min, max) {
        (Some(low), Some(high)) if low > high => Err(AppError::validation(format!(
            "min_{parameter} must not exceed max_{parameter}"
        ))
        .with_details(json!({ "parameter": format!("min_{parameter}") }))),
        _ => Ok(()),
    }
}

/// Parse the set-query sort; absent means `date_desc`
///
/// # Errors
///
/// Returns `ValidationFailed` for any other value
pub fn parse_sort(sort: Option<&str>) -> AppResult<SortMode> {
    sort.map_or(Ok(SortMode::DateDesc), |raw| {
        SortMode::parse_set_sort(raw).ok_or_else(|| {
            AppError::validation(format!("unknown sort '{raw}', expected date_desc or e1rm_desc"))
                .with_details(json!({ "parameter": "sort", "value": raw }))
        })
    })
}
