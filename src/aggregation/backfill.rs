// ABOUTME: Resumable backfill that replays completed workouts through the aggregation pipeline
// ABOUTME: Pages a workout source from a stored watermark and advances it after each commit
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pierre_core::constants::service_names::BACKFILL;
use pierre_core::models::CompletedWorkout;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{AggregationOutcome, AggregationPipeline};
use crate::database::BackfillWatermark;
use crate::errors::{AppError, AppResult};

/// Historical completed workouts, read in `(end_time, workout_id)` order
#[async_trait]
pub trait WorkoutSource: Send + Sync {
    /// Up to `limit` workouts of a user strictly after `after`
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unavailable
    async fn completed_after(
        &self,
        user_id: Uuid,
        after: Option<&BackfillWatermark>,
        limit: u32,
    ) -> AppResult<Vec<CompletedWorkout>>;
}

/// Workout source held in memory, typically loaded from a JSON export
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkoutSource {
    workouts: Vec<CompletedWorkout>,
}

impl InMemoryWorkoutSource {
    /// Wrap a list of workouts
    #[must_use]
    pub fn new(mut workouts: Vec<CompletedWorkout>) -> Self {
        workouts.sort_by(|a, b| {
            a.end_time
                .cmp(&b.end_time)
                .then_with(|| a.workout_id.cmp(&b.workout_id))
        });
        Self { workouts }
    }

    /// Load a JSON array of completed workouts
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, or `SerializationError` if it
    /// is malformed
    pub async fn from_file(path: &Path) -> AppResult<Self> {
        let json = fs::read_to_string(path).await.map_err(|e| {
            AppError::config(format!("Failed to read workouts {}: {e}", path.display()))
        })?;
        let workouts: Vec<CompletedWorkout> = serde_json::from_str(&json)?;
        Ok(Self::new(workouts))
    }

    /// Number of workouts across all users
    #[must_use]
    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    /// Whether the source holds no workouts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }
}

#[async_trait]
impl WorkoutSource for InMemoryWorkoutSource {
    async fn completed_after(
        &self,
        user_id: Uuid,
        after: Option<&BackfillWatermark>,
        limit: u32,
    ) -> AppResult<Vec<CompletedWorkout>> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .workouts
            .iter()
            .filter(|w| w.user_id == user_id)
            .filter(|w| {
                after.is_none_or(|mark| {
                    (w.end_time, w.workout_id.as_str()) > (mark.end_time, mark.workout_id.as_str())
                })
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Counts from one backfill run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// Workouts newly aggregated
    pub processed: usize,
    /// Workouts that were already aggregated
    pub skipped: usize,
    /// Workouts that failed; the run stops at the first one
    pub failed: usize,
    /// Position the next run resumes after
    pub watermark: Option<BackfillWatermark>,
}

/// Replays a user's history through the aggregation pipeline
pub struct BackfillJob {
    pipeline: AggregationPipeline,
    source: Arc<dyn WorkoutSource>,
    batch_size: u32,
}

impl BackfillJob {
    /// Create a job reading `batch_size` workouts per page
    #[must_use]
    pub fn new(pipeline: AggregationPipeline, source: Arc<dyn WorkoutSource>, batch_size: u32) -> Self {
        Self {
            pipeline,
            source,
            batch_size: batch_size.max(1),
        }
    }

    /// Process every workout after the stored watermark.
    ///
    /// The watermark is written after each workout is committed, so an interrupted
    /// run resumes where it stopped. A failed workout ends the run without moving
    /// the watermark past it.
    ///
    /// # Errors
    ///
    /// Returns an error if the source or the watermark storage fails
    pub async fn run(&self, user_id: Uuid) -> AppResult<BackfillReport> {
        let database = self.pipeline.database();
        let mut report = BackfillReport {
            watermark: database.get_backfill_watermark(user_id).await?,
            ..BackfillReport::default()
        };
        info!(
            service = BACKFILL,
            user_id = %user_id,
            resume_after = ?report.watermark.as_ref().map(|w| &w.workout_id),
            "Starting backfill"
        );

        loop {
            let batch = self
                .source
                .completed_after(user_id, report.watermark.as_ref(), self.batch_size)
                .await?;
            let batch_len = batch.len();

            for workout in batch {
                match self.pipeline.process(&workout).await {
                    Ok(AggregationOutcome::Aggregated { .. }) => report.processed += 1,
                    Ok(AggregationOutcome::AlreadyAggregated) => report.skipped += 1,
                    Err(e) => {
                        report.failed += 1;
                        error!(
                            service = BACKFILL,
                            user_id = %user_id,
                            workout_id = %workout.workout_id,
                            error = %e,
                            "Backfill stopped at failing workout"
                        );
                        return Ok(report);
                    }
                }

                let watermark = BackfillWatermark {
                    end_time: workout.end_time,
                    workout_id: workout.workout_id,
                };
                database.set_backfill_watermark(user_id, &watermark).await?;
                report.watermark = Some(watermark);
            }

            if batch_len < usize::try_from(self.batch_size).unwrap_or(usize::MAX) {
                break;
            }
        }

        if report.processed == 0 && report.skipped == 0 {
            warn!(service = BACKFILL, user_id = %user_id, "Backfill found no new workouts");
        } else {
            info!(
                service = BACKFILL,
                user_id = %user_id,
                processed = report.processed,
                skipped = report.skipped,
                "Backfill complete"
            );
        }
        Ok(report)
    }
}
