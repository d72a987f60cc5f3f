// ABOUTME: Atomic per-workout series commit guarded by an aggregated-workout marker
// ABOUTME: Also stores dead-lettered aggregation jobs and backfill watermarks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use pierre_core::constants::limits::MAX_SERIES_WEEKS;
use pierre_core::models::{CompletedWorkout, SeriesKind, WeeklyPoint};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use super::transactions::{retry_transaction, TransactionGuard, DEFAULT_LOCK_RETRIES};
use super::{from_millis, from_week_key, to_millis, to_week_key, Database};
use crate::errors::{AppError, AppResult};

/// Increments for one series-week
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesDelta {
    /// Series class
    pub kind: SeriesKind,
    /// Exercise, group, or muscle id
    pub entity_id: String,
    /// Monday of the week
    pub week_start: NaiveDate,
    /// Counters to add; `e1rm_max` is max-merged, `e1rm_p90` is ignored
    pub point: WeeklyPoint,
}

/// Everything one completed workout adds to the series, applied in one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutDelta {
    /// Owner
    pub user_id: Uuid,
    /// Workout being aggregated
    pub workout_id: String,
    /// Week the workout falls in
    pub week_start: NaiveDate,
    /// Workout end time
    pub workout_end_time: DateTime<Utc>,
    /// Facts derived for the workout, warmups included
    pub fact_count: usize,
    /// Per series-week increments
    pub series: Vec<SeriesDelta>,
}

/// Result of a series commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Increments were applied
    Applied {
        /// Series-weeks written
        series_weeks: usize,
    },
    /// The marker already existed; nothing was written
    AlreadyAggregated,
}

/// A job that exhausted its attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationFailure {
    /// Row id
    pub id: i64,
    /// Owner
    pub user_id: Uuid,
    /// Workout that failed
    pub workout_id: String,
    /// Attempts made
    pub attempts: u32,
    /// Last error message
    pub error: String,
    /// When the job was given up
    pub failed_at: DateTime<Utc>,
}

/// Position of a backfill, ordered by `(end_time, workout_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillWatermark {
    /// End time of the last processed workout
    pub end_time: DateTime<Utc>,
    /// Id of the last processed workout
    pub workout_id: String,
}

impl Database {
    /// Apply a workout's series increments exactly once
    ///
    /// The `aggregated_workouts` marker is inserted first in the same transaction;
    /// if it already exists the transaction is rolled back and nothing is counted twice.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails after lock-contention retries
    pub async fn commit_workout_delta(&self, delta: &WorkoutDelta) -> AppResult<CommitOutcome> {
        retry_transaction(|| self.try_commit_workout_delta(delta), DEFAULT_LOCK_RETRIES).await
    }

    async fn try_commit_workout_delta(&self, delta: &WorkoutDelta) -> AppResult<CommitOutcome> {
        let user_id = delta.user_id.to_string();
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin series commit: {e}")))?;
        let mut guard = TransactionGuard::new(tx);

        let marker = sqlx::query(
            r"
            INSERT INTO aggregated_workouts
                (user_id, workout_id, week_start, workout_end_time, fact_count, aggregated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT(user_id, workout_id) DO NOTHING
            ",
        )
        .bind(&user_id)
        .bind(&delta.workout_id)
        .bind(to_week_key(delta.week_start))
        .bind(to_millis(delta.workout_end_time))
        .bind(i64::try_from(delta.fact_count).unwrap_or(i64::MAX))
        .bind(to_millis(Utc::now()))
        .execute(guard.executor()?)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert aggregation marker: {e}")))?;

        if marker.rows_affected() == 0 {
            guard.rollback().await?;
            debug!(
                user_id = %delta.user_id,
                workout_id = %delta.workout_id,
                "Workout already aggregated, skipping increments"
            );
            return Ok(CommitOutcome::AlreadyAggregated);
        }

        for series in &delta.series {
            apply_week_increment(&mut guard, &user_id, series).await?;
            apply_summary_increment(&mut guard, &user_id, series, delta.workout_end_time).await?;
        }

        for series in delta
            .series
            .iter()
            .filter(|s| s.kind == SeriesKind::Exercise)
        {
            refresh_e1rm_p90(&mut guard, &user_id, &series.entity_id, series.week_start).await?;
        }

        let touched: BTreeSet<(SeriesKind, &str)> = delta
            .series
            .iter()
            .map(|s| (s.kind, s.entity_id.as_str()))
            .collect();
        for (kind, entity_id) in &touched {
            evict_old_weeks(&mut guard, &user_id, *kind, entity_id).await?;
        }

        guard.commit().await?;
        info!(
            user_id = %delta.user_id,
            workout_id = %delta.workout_id,
            series_weeks = delta.series.len(),
            "Committed workout series increments"
        );
        Ok(CommitOutcome::Applied {
            series_weeks: delta.series.len(),
        })
    }

    /// Whether the series already include this workout
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails
    pub async fn is_workout_aggregated(&self, user_id: Uuid, workout_id: &str) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM aggregated_workouts WHERE user_id = $1 AND workout_id = $2",
        )
        .bind(user_id.to_string())
        .bind(workout_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to check aggregation marker: {e}")))?;
        Ok(row.is_some())
    }

    /// Aggregated sessions per week in `[from_week, to_week]`, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails
    pub async fn weekly_session_counts(
        &self,
        user_id: Uuid,
        from_week: NaiveDate,
        to_week: NaiveDate,
    ) -> AppResult<Vec<(NaiveDate, i64)>> {
        let rows = sqlx::query(
            r"
            SELECT week_start, COUNT(*) AS sessions
            FROM aggregated_workouts
            WHERE user_id = $1 AND week_start >= $2 AND week_start <= $3
            GROUP BY week_start
            ORDER BY week_start
            ",
        )
        .bind(user_id.to_string())
        .bind(to_week_key(from_week))
        .bind(to_week_key(to_week))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count weekly sessions: {e}")))?;

        rows.iter()
            .map(|row| {
                let week: String = row.get("week_start");
                Ok((from_week_key(&week)?, row.get("sessions")))
            })
            .collect()
    }

    /// Dead-letter a job that exhausted its attempts
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized or the write fails
    pub async fn record_aggregation_failure(
        &self,
        workout: &CompletedWorkout,
        attempts: u32,
        error: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO aggregation_failures (user_id, workout_id, attempts, error, payload, failed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(workout.user_id.to_string())
        .bind(&workout.workout_id)
        .bind(i64::from(attempts))
        .bind(error)
        .bind(serde_json::to_string(workout)?)
        .bind(to_millis(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record aggregation failure: {e}")))?;
        Ok(())
    }

    /// Dead-lettered jobs, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the read or row decoding fails
    pub async fn list_aggregation_failures(&self, limit: u32) -> AppResult<Vec<AggregationFailure>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, workout_id, attempts, error, failed_at
            FROM aggregation_failures
            ORDER BY failed_at DESC, id DESC
            LIMIT $1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list aggregation failures: {e}")))?;

        rows.iter().map(row_to_failure).collect()
    }

    /// Stored backfill position for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails
    pub async fn get_backfill_watermark(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<BackfillWatermark>> {
        let row = sqlx::query(
            "SELECT last_end_time, last_workout_id FROM backfill_watermarks WHERE user_id = $1",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get backfill watermark: {e}")))?;

        row.map(|row| {
            Ok(BackfillWatermark {
                end_time: from_millis(row.get("last_end_time"))?,
                workout_id: row.get("last_workout_id"),
            })
        })
        .transpose()
    }

    /// Advance the backfill position for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    pub async fn set_backfill_watermark(
        &self,
        user_id: Uuid,
        watermark: &BackfillWatermark,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO backfill_watermarks (user_id, last_end_time, last_workout_id, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(user_id) DO UPDATE SET
                last_end_time = excluded.last_end_time,
                last_workout_id = excluded.last_workout_id,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id.to_string())
        .bind(to_millis(watermark.end_time))
        .bind(&watermark.workout_id)
        .bind(to_millis(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to set backfill watermark: {e}")))?;
        Ok(())
    }
}

async fn apply_week_increment(
    guard: &mut TransactionGuard<'_>,
    user_id: &str,
    series: &SeriesDelta,
) -> AppResult<()> {
    let point = &series.point;
    sqlx::query(
        r"
        INSERT INTO series_weeks (
            user_id, kind, entity_id, week_start,
            sets, hard_sets, volume, effective_volume, rir_sum, rir_count, failure_sets,
            reps_1_5, reps_6_10, reps_11_15, reps_16_20, e1rm_max
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ON CONFLICT(user_id, kind, entity_id, week_start) DO UPDATE SET
            sets = sets + excluded.sets,
            hard_sets = hard_sets + excluded.hard_sets,
            volume = volume + excluded.volume,
            effective_volume = effective_volume + excluded.effective_volume,
            rir_sum = rir_sum + excluded.rir_sum,
            rir_count = rir_count + excluded.rir_count,
            failure_sets = failure_sets + excluded.failure_sets,
            reps_1_5 = reps_1_5 + excluded.reps_1_5,
            reps_6_10 = reps_6_10 + excluded.reps_6_10,
            reps_11_15 = reps_11_15 + excluded.reps_11_15,
            reps_16_20 = reps_16_20 + excluded.reps_16_20,
            e1rm_max = MAX(COALESCE(e1rm_max, excluded.e1rm_max), COALESCE(excluded.e1rm_max, e1rm_max))
        ",
    )
    .bind(user_id)
    .bind(series.kind.as_str())
    .bind(&series.entity_id)
    .bind(to_week_key(series.week_start))
    .bind(point.sets)
    .bind(point.hard_sets)
    .bind(point.volume)
    .bind(point.effective_volume)
    .bind(point.rir_sum)
    .bind(point.rir_count)
    .bind(point.failure_sets)
    .bind(point.reps_bucket.one_to_five)
    .bind(point.reps_bucket.six_to_ten)
    .bind(point.reps_bucket.eleven_to_fifteen)
    .bind(point.reps_bucket.sixteen_to_twenty)
    .bind(point.e1rm_max)
    .execute(guard.executor()?)
    .await
    .map_err(|e| {
        AppError::database(format!(
            "Failed to increment {} series {}: {e}",
            series.kind.as_str(),
            series.entity_id
        ))
    })?;
    Ok(())
}

async fn apply_summary_increment(
    guard: &mut TransactionGuard<'_>,
    user_id: &str,
    series: &SeriesDelta,
    workout_end_time: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        r"
        INSERT INTO series_summaries
            (user_id, kind, entity_id, total_sets, total_volume, best_e1rm, last_workout_end_time)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT(user_id, kind, entity_id) DO UPDATE SET
            total_sets = total_sets + excluded.total_sets,
            total_volume = total_volume + excluded.total_volume,
            best_e1rm = MAX(COALESCE(best_e1rm, excluded.best_e1rm), COALESCE(excluded.best_e1rm, best_e1rm)),
            last_workout_end_time = MAX(COALESCE(last_workout_end_time, excluded.last_workout_end_time), excluded.last_workout_end_time)
        ",
    )
    .bind(user_id)
    .bind(series.kind.as_str())
    .bind(&series.entity_id)
    .bind(series.point.sets)
    .bind(series.point.volume)
    .bind(series.point.e1rm_max)
    .bind(to_millis(workout_end_time))
    .execute(guard.executor()?)
    .await
    .map_err(|e| AppError::database(format!("Failed to update series summary: {e}")))?;
    Ok(())
}

/// Recompute the week's p90 from the persisted facts of aggregated workouts
async fn refresh_e1rm_p90(
    guard: &mut TransactionGuard<'_>,
    user_id: &str,
    exercise_id: &str,
    week_start: NaiveDate,
) -> AppResult<()> {
    let week = to_week_key(week_start);
    let e1rms: Vec<f64> = sqlx::query_scalar(
        r"
        SELECT e1rm FROM set_facts
        WHERE user_id = ?1 AND exercise_id = ?2 AND week_start = ?3
          AND is_warmup = 0 AND e1rm IS NOT NULL
          AND workout_id IN (SELECT workout_id FROM aggregated_workouts WHERE user_id = ?1)
        ORDER BY e1rm ASC
        ",
    )
    .bind(user_id)
    .bind(exercise_id)
    .bind(&week)
    .fetch_all(guard.executor()?)
    .await
    .map_err(|e| AppError::database(format!("Failed to read week e1rm values: {e}")))?;

    sqlx::query(
        r"
        UPDATE series_weeks SET e1rm_p90 = $1
        WHERE user_id = $2 AND kind = 'exercise' AND entity_id = $3 AND week_start = $4
        ",
    )
    .bind(nearest_rank_p90(&e1rms))
    .bind(user_id)
    .bind(exercise_id)
    .bind(&week)
    .execute(guard.executor()?)
    .await
    .map_err(|e| AppError::database(format!("Failed to update e1rm_p90: {e}")))?;
    Ok(())
}

/// Keep the newest weeks of a series by `week_start`
async fn evict_old_weeks(
    guard: &mut TransactionGuard<'_>,
    user_id: &str,
    kind: SeriesKind,
    entity_id: &str,
) -> AppResult<()> {
    let evicted = sqlx::query(
        r"
        DELETE FROM series_weeks
        WHERE user_id = ?1 AND kind = ?2 AND entity_id = ?3
          AND week_start NOT IN (
              SELECT week_start FROM series_weeks
              WHERE user_id = ?1 AND kind = ?2 AND entity_id = ?3
              ORDER BY week_start DESC
              LIMIT ?4
          )
        ",
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(entity_id)
    .bind(i64::try_from(MAX_SERIES_WEEKS).unwrap_or(i64::MAX))
    .execute(guard.executor()?)
    .await
    .map_err(|e| AppError::database(format!("Failed to evict old series weeks: {e}")))?;

    if evicted.rows_affected() > 0 {
        debug!(
            kind = kind.as_str(),
            entity_id = %entity_id,
            evicted = evicted.rows_affected(),
            "Evicted series weeks beyond the retention cap"
        );
    }
    Ok(())
}

/// Nearest-rank 90th percentile of ascending values
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn nearest_rank_p90(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (0.9 * sorted.len() as f64).ceil() as usize;
    sorted.get(rank.clamp(1, sorted.len()) - 1).copied()
}

fn row_to_failure(row: &SqliteRow) -> AppResult<AggregationFailure> {
    let user_id_str: String = row.get("user_id");
    let attempts: i64 = row.get("attempts");
    Ok(AggregationFailure {
        id: row.get("id"),
        user_id: Uuid::parse_str(&user_id_str)
            .map_err(|e| AppError::internal(format!("Invalid UUID: {e}")))?,
        workout_id: row.get("workout_id"),
        attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        error: row.get("error"),
        failed_at: from_millis(row.get("failed_at"))?,
    })
}
