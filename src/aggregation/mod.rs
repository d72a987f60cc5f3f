// ABOUTME: Series aggregation: folds a workout's set facts into weekly series increments
// ABOUTME: Pipeline derives facts, persists them, and commits one atomic series delta
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Series Aggregation
//!
//! [`SeriesAggregator`] is pure: it turns the facts of one workout into a
//! [`WorkoutDelta`] holding one point per `(series kind, entity, week)`.
//! [`AggregationPipeline`] wires it to the catalog, the fact generator and storage.
//! The [`worker`] module runs the pipeline off the request path and [`backfill`]
//! replays history from a watermark.

/// Background queue consuming completed workouts
pub mod worker;

/// Resumable historical reprocessing
pub mod backfill;

use std::collections::BTreeMap;
use std::sync::Arc;

use pierre_core::models::{CompletedWorkout, RepsBucket, SeriesKind, SetFact, WeeklyPoint};
use pierre_intelligence::{MuscleTaxonomy, SetFactGenerator};
use tracing::{debug, info};

pub use backfill::{BackfillJob, BackfillReport, InMemoryWorkoutSource, WorkoutSource};
pub use worker::AggregationQueue;

use crate::catalog::ExerciseCatalog;
use crate::database::{CommitOutcome, Database, SeriesDelta, WorkoutDelta};
use crate::errors::AppResult;

/// Builds per-workout series deltas from set facts
pub struct SeriesAggregator;

impl SeriesAggregator {
    /// Fold the facts of one workout into in-memory deltas.
    ///
    /// Warmup facts are ignored. Each fact contributes to its exercise series and to
    /// every muscle group and muscle present in its key arrays.
    #[must_use]
    pub fn build_delta(workout: &CompletedWorkout, facts: &[SetFact]) -> WorkoutDelta {
        let week_start = workout.week_start();
        let mut points: BTreeMap<(SeriesKind, String), WeeklyPoint> = BTreeMap::new();

        for fact in facts.iter().filter(|f| !f.is_warmup) {
            let base = base_point(fact);

            let mut exercise_point = base.clone();
            exercise_point.hard_sets = fact.hard_set_credit;
            exercise_point.effective_volume = fact.volume;
            exercise_point.e1rm_max = fact.e1rm;
            points
                .entry((SeriesKind::Exercise, fact.exercise_id.clone()))
                .or_default()
                .absorb(&exercise_point);

            for group in &fact.muscle_group_keys {
                let mut point = base.clone();
                point.hard_sets = fact.hard_set_credit_by_group.get(group).copied().unwrap_or(0.0);
                point.effective_volume =
                    fact.effective_volume_by_group.get(group).copied().unwrap_or(0.0);
                points
                    .entry((SeriesKind::MuscleGroup, group.clone()))
                    .or_default()
                    .absorb(&point);
            }

            for muscle in &fact.muscle_keys {
                let mut point = base.clone();
                point.hard_sets = fact.hard_set_credit_by_muscle.get(muscle).copied().unwrap_or(0.0);
                point.effective_volume =
                    fact.effective_volume_by_muscle.get(muscle).copied().unwrap_or(0.0);
                points
                    .entry((SeriesKind::Muscle, muscle.clone()))
                    .or_default()
                    .absorb(&point);
            }
        }

        let series = points
            .into_iter()
            .map(|((kind, entity_id), point)| SeriesDelta {
                kind,
                entity_id,
                week_start,
                point,
            })
            .collect();

        WorkoutDelta {
            user_id: workout.user_id,
            workout_id: workout.workout_id.clone(),
            week_start,
            workout_end_time: workout.end_time,
            fact_count: facts.len(),
            series,
        }
    }
}

/// Counters every series receives from one working set
fn base_point(fact: &SetFact) -> WeeklyPoint {
    let mut point = WeeklyPoint {
        sets: 1,
        volume: fact.volume,
        rir_sum: fact.rir.map_or(0, i64::from),
        rir_count: i64::from(fact.rir.is_some()),
        failure_sets: i64::from(fact.is_failure),
        ..WeeklyPoint::default()
    };
    if let Some(bucket) = RepsBucket::for_reps(fact.reps) {
        point.reps_bucket.increment(bucket);
    }
    point
}

/// Result of processing one completed workout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationOutcome {
    /// Facts were written and series incremented
    Aggregated {
        /// Facts persisted
        facts: usize,
        /// Sets rejected by validation
        rejected: usize,
        /// Series-week points incremented
        series_weeks: usize,
    },
    /// The workout was already counted; nothing changed
    AlreadyAggregated,
}

/// Derive, persist and aggregate completed workouts
#[derive(Clone)]
pub struct AggregationPipeline {
    database: Arc<Database>,
    catalog: Arc<dyn ExerciseCatalog>,
    taxonomy: Arc<MuscleTaxonomy>,
}

impl AggregationPipeline {
    /// Create a pipeline over shared storage, catalog and taxonomy
    #[must_use]
    pub fn new(
        database: Arc<Database>,
        catalog: Arc<dyn ExerciseCatalog>,
        taxonomy: Arc<MuscleTaxonomy>,
    ) -> Self {
        Self {
            database,
            catalog,
            taxonomy,
        }
    }

    /// Storage handle
    #[must_use]
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Process one completed workout end to end.
    ///
    /// Safe to call repeatedly for the same workout: facts are upserted by `set_id`
    /// and the series commit is guarded by the per-workout marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog lookup, the fact upsert, or the series commit fails
    pub async fn process(&self, workout: &CompletedWorkout) -> AppResult<AggregationOutcome> {
        if self
            .database
            .is_workout_aggregated(workout.user_id, &workout.workout_id)
            .await?
        {
            debug!(
                user_id = %workout.user_id,
                workout_id = %workout.workout_id,
                "Workout already aggregated"
            );
            return Ok(AggregationOutcome::AlreadyAggregated);
        }

        let attributions = self.catalog.attributions_for(workout).await?;
        let derived = SetFactGenerator::new(&self.taxonomy).derive_workout(workout, &attributions);
        self.database.upsert_set_facts(&derived.facts).await?;

        let delta = SeriesAggregator::build_delta(workout, &derived.facts);
        match self.database.commit_workout_delta(&delta).await? {
            CommitOutcome::Applied { series_weeks } => {
                info!(
                    user_id = %workout.user_id,
                    workout_id = %workout.workout_id,
                    facts = derived.facts.len(),
                    rejected = derived.rejected.len(),
                    skipped = derived.skipped,
                    series_weeks,
                    "Aggregated completed workout"
                );
                Ok(AggregationOutcome::Aggregated {
                    facts: derived.facts.len(),
                    rejected: derived.rejected.len(),
                    series_weeks,
                })
            }
            CommitOutcome::AlreadyAggregated => Ok(AggregationOutcome::AlreadyAggregated),
        }
    }
}
