// ABOUTME: Read-only query service behind every analytics endpoint
// ABOUTME: Validates and clamps parameters, reads storage, and shapes capped envelopes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use pierre_core::constants::limits::{DEFAULT_WINDOW_WEEKS, MAX_WINDOW_WEEKS};
use pierre_core::models::{
    ActiveSet, ActiveWorkout, SeriesDocument, SeriesKind, SeriesSummary, SetFact, WeeklyPointView,
};
use pierre_core::pagination::{Cursor, CursorPage, CursorPayload, SortMode};
use pierre_intelligence::MuscleTaxonomy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use super::caps::{
    anchor_week, clamp_limit, clamp_window_weeks, enforce_query_caps, parse_date_range,
    parse_sort, require_id, resolve_muscle, resolve_muscle_group, resolve_target,
    validate_bounds,
};
use super::params::{EventsParams, SeriesParams, SetQueryParams, SnapshotParams};
use super::response::{Envelope, ResponseBuilder};
use crate::config::QueryConfig;
use crate::database::{Database, SetFactQuery};
use crate::errors::{AppError, AppResult};

/// A series trimmed to its window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesView {
    /// Series class
    pub kind: SeriesKind,
    /// Canonical entity id
    pub entity_id: String,
    /// Effective window
    pub window_weeks: u32,
    /// Weeks in the window, oldest first
    pub weeks: Vec<WeeklyPointView>,
    /// All-time summary
    pub summary: SeriesSummary,
    /// Weeks stored for the series, in or out of the window
    pub weeks_tracked: usize,
}

/// Compact state of an in-progress workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSnapshot {
    /// Workout id
    pub workout_id: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
    /// Exercises in the workout, before `limit`
    pub exercise_count: usize,
    /// Sets logged across all exercises
    pub set_count: usize,
    /// Leading exercises, at most `limit`
    pub exercises: Vec<ActiveExerciseLite>,
}

/// One exercise of an [`ActiveSnapshot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveExerciseLite {
    /// Catalog exercise id
    pub exercise_id: String,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Planned set count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_sets: Option<u32>,
    /// Sets logged so far
    pub sets_done: usize,
    /// Highest-index logged set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_set: Option<ActiveSet>,
}

impl ActiveSnapshot {
    fn from_workout(workout: &ActiveWorkout, limit: usize) -> Self {
        Self {
            workout_id: workout.workout_id.clone(),
            started_at: workout.started_at,
            updated_at: workout.updated_at,
            exercise_count: workout.exercises.len(),
            set_count: workout.set_count(),
            exercises: workout
                .exercises
                .iter()
                .take(limit)
                .map(|exercise| ActiveExerciseLite {
                    exercise_id: exercise.exercise_id.clone(),
                    name: exercise.name.clone(),
                    planned_sets: exercise.planned_sets,
                    sets_done: exercise.sets.len(),
                    last_set: exercise.sets.last().cloned(),
                })
                .collect(),
        }
    }
}

/// Stateless read path shared by tools, HTTP routes and the CLI
#[derive(Clone)]
pub struct QueryService {
    pub(super) database: Arc<Database>,
    pub(super) taxonomy: Arc<MuscleTaxonomy>,
    pub(super) config: QueryConfig,
}

impl QueryService {
    /// Create a query service
    #[must_use]
    pub const fn new(
        database: Arc<Database>,
        taxonomy: Arc<MuscleTaxonomy>,
        config: QueryConfig,
    ) -> Self {
        Self {
            database,
            taxonomy,
            config,
        }
    }

    /// Underlying storage
    #[must_use]
    pub const fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Taxonomy used to resolve group and muscle names
    #[must_use]
    pub fn taxonomy(&self) -> &MuscleTaxonomy {
        &self.taxonomy
    }

    /// Read-path settings
    #[must_use]
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// `sets.query`: filtered, sorted, projected set facts.
    ///
    /// Parameters are validated before any storage access. A cursor minted under a
    /// different sort restarts from the first page.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` for an invalid target, date range, sort or bound,
    /// or a storage error
    pub async fn query_sets(
        &self,
        user_id: Uuid,
        params: &SetQueryParams,
    ) -> AppResult<Envelope<Vec<Value>>> {
        let target = resolve_target(
            &self.taxonomy,
            params.muscle_group.as_deref(),
            params.muscle.as_deref(),
            params.exercise_ids.as_deref(),
        )?;
        let range = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
        let sort = parse_sort(params.sort.as_deref())?;
        validate_bounds("reps", params.min_reps, params.max_reps)?;
        validate_bounds("weight_kg", params.min_weight_kg, params.max_weight_kg)?;
        let caps = enforce_query_caps(params.limit, None, params.fields.as_deref());

        let after = decode_cursor(params.cursor.as_deref(), sort);
        let query = SetFactQuery {
            user_id,
            target,
            start: range.start,
            end: range.end,
            include_warmups: params.include_warmups,
            min_reps: params.min_reps,
            max_reps: params.max_reps,
            min_weight_kg: params.min_weight_kg,
            max_weight_kg: params.max_weight_kg,
            max_rir: params.max_rir,
            failure_only: params.failure_only,
            hard_sets_only: params.hard_sets_only,
            sort,
            after,
            limit: caps.limit,
        };

        let page = CursorPage::from_lookahead(self.database.query_set_facts(&query).await?, caps.limit);
        let envelope = ResponseBuilder::raw().page(
            &page.items,
            page.has_more,
            caps.limit,
            |fact| Ok(fact.project(&caps.fields)),
            |fact| set_cursor(sort, fact),
        )?;
        debug!(
            user_id = %user_id,
            sort = sort.as_str(),
            returned = envelope.meta.returned,
            truncated = envelope.truncated,
            "Set query served"
        );
        Ok(envelope)
    }

    /// `series.*.get`: one series document trimmed to the window.
    ///
    /// A series that was never written reads as empty. Never paginated.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` for a blank or unknown id, or a storage error
    pub async fn get_series(
        &self,
        user_id: Uuid,
        kind: SeriesKind,
        params: &SeriesParams,
    ) -> AppResult<Envelope<SeriesView>> {
        let entity_id = self.resolve_entity(kind, &params.id)?;
        let current_week = anchor_week(params.as_of.as_deref())?;
        let window_weeks = clamp_window_weeks(params.window_weeks, DEFAULT_WINDOW_WEEKS);

        let document = self.database.get_series(user_id, kind, &entity_id).await?;
        let weeks_tracked = document.weeks.len();
        let windowed = document.trimmed_to_window(current_week, window_weeks);
        let view = SeriesView {
            kind,
            entity_id,
            window_weeks,
            weeks: windowed.week_views(),
            summary: windowed.summary,
            weeks_tracked,
        };
        let returned = view.weeks.len();
        ResponseBuilder::raw().object(view, returned, window_weeks as usize)
    }

    /// `active.snapshotLite`: the named workout, or the latest one still in progress.
    ///
    /// With no `workout_id` and nothing in progress, `data` is `null`.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown `workout_id`, or a storage error
    pub async fn active_snapshot(
        &self,
        user_id: Uuid,
        params: &SnapshotParams,
    ) -> AppResult<Envelope<Option<ActiveSnapshot>>> {
        let limit = clamp_limit(params.limit);
        let workout = match params.workout_id.as_deref() {
            Some(workout_id) => {
                let workout_id = require_id(workout_id)?;
                let found = self.database.get_active_workout(user_id, workout_id).await?;
                Some(found.ok_or_else(|| {
                    AppError::not_found(format!("Active workout {workout_id}"))
                        .with_details(json!({ "workout_id": workout_id }))
                })?)
            }
            None => self.database.latest_active_workout(user_id).await?,
        };

        let snapshot = workout.as_ref().map(|w| ActiveSnapshot::from_workout(w, limit));
        let returned = snapshot.as_ref().map_or(0, |s| s.exercises.len());
        let truncated = snapshot
            .as_ref()
            .is_some_and(|s| s.exercise_count > s.exercises.len());
        ResponseBuilder::raw().bounded_object(snapshot, returned, limit, truncated)
    }

    /// `active.events.list`: a workout's event log, newest first
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` for a blank workout id, or a storage error
    pub async fn list_events(
        &self,
        user_id: Uuid,
        params: &EventsParams,
    ) -> AppResult<Envelope<Vec<Value>>> {
        let workout_id = require_id(&params.workout_id)?;
        let limit = clamp_limit(params.limit);
        let after = decode_cursor(params.cursor.as_deref(), SortMode::EventTimeDesc);

        let rows = self
            .database
            .list_workout_events(user_id, workout_id, after.as_ref(), limit)
            .await?;
        let page = CursorPage::from_lookahead(rows, limit);
        ResponseBuilder::raw().page(
            &page.items,
            page.has_more,
            limit,
            |event| Ok(serde_json::to_value(event)?),
            |event| {
                CursorPayload::new(SortMode::EventTimeDesc, event.occurred_at, &event.event_id)
                    .encode()
            },
        )
    }

    /// Canonical entity id for a series class
    pub(super) fn resolve_entity(&self, kind: SeriesKind, id: &str) -> AppResult<String> {
        let id = require_id(id)?;
        match kind {
            SeriesKind::Exercise => Ok(id.to_owned()),
            SeriesKind::MuscleGroup => resolve_muscle_group(&self.taxonomy, id),
            SeriesKind::Muscle => resolve_muscle(&self.taxonomy, id),
        }
    }

    /// A series read for summaries: every stored week up to the anchor week
    pub(super) async fn series_history(
        &self,
        user_id: Uuid,
        kind: SeriesKind,
        entity_id: &str,
        current_week: NaiveDate,
    ) -> AppResult<SeriesDocument> {
        Ok(self
            .database
            .get_series(user_id, kind, entity_id)
            .await?
            .trimmed_to_window(current_week, MAX_WINDOW_WEEKS))
    }
}

fn decode_cursor(raw: Option<&str>, sort: SortMode) -> Option<CursorPayload> {
    raw.and_then(|raw| CursorPayload::decode(&Cursor::from_string(raw.to_owned()), sort))
}

fn set_cursor(sort: SortMode, fact: &SetFact) -> Cursor {
    let payload = match (sort, fact.e1rm) {
        (SortMode::E1rmDesc, Some(e1rm)) => {
            CursorPayload::by_e1rm(e1rm, fact.workout_end_time, &fact.set_id)
        }
        _ => CursorPayload::new(sort, fact.workout_end_time, &fact.set_id),
    };
    payload.encode()
}
