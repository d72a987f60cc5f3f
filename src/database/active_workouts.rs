// ABOUTME: Database operations for in-progress workout snapshots and their event log
// ABOUTME: Appending an event also folds it into the stored snapshot when one exists
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pierre_core::models::{ActiveWorkout, WorkoutEvent, WorkoutEventKind};
use pierre_core::pagination::CursorPayload;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use super::transactions::TransactionGuard;
use super::{from_millis, to_millis, Database};
use crate::errors::{AppError, AppResult};

impl Database {
    /// Create or replace the snapshot of an active workout
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub async fn upsert_active_workout(&self, workout: &ActiveWorkout) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO active_workouts (user_id, workout_id, started_at, updated_at, document)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(user_id, workout_id) DO UPDATE SET
                started_at = excluded.started_at,
                updated_at = excluded.updated_at,
                document = excluded.document
            ",
        )
        .bind(workout.user_id.to_string())
        .bind(&workout.workout_id)
        .bind(to_millis(workout.started_at))
        .bind(to_millis(workout.updated_at))
        .bind(serde_json::to_string(workout)?)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert active workout: {e}")))?;
        Ok(())
    }

    /// Append an event; re-appending the same `event_id` is a no-op
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` if a carried set or patch is invalid, or an error if
    /// the write fails
    pub async fn append_workout_event(&self, event: &WorkoutEvent) -> AppResult<()> {
        event.kind.validate()?;
        let user_id = event.user_id.to_string();

        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin event append: {e}")))?;
        let mut guard = TransactionGuard::new(tx);

        let inserted = sqlx::query(
            r"
            INSERT INTO workout_events (event_id, user_id, workout_id, occurred_at, event_type, payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT(event_id) DO NOTHING
            ",
        )
        .bind(&event.event_id)
        .bind(&user_id)
        .bind(&event.workout_id)
        .bind(to_millis(event.occurred_at))
        .bind(event.kind.as_str())
        .bind(serde_json::to_string(&event.kind)?)
        .execute(guard.executor()?)
        .await
        .map_err(|e| AppError::database(format!("Failed to append workout event: {e}")))?;

        if inserted.rows_affected() == 0 {
            guard.rollback().await?;
            debug!(event_id = %event.event_id, "Workout event already recorded");
            return Ok(());
        }

        let document: Option<String> = sqlx::query_scalar(
            "SELECT document FROM active_workouts WHERE user_id = $1 AND workout_id = $2",
        )
        .bind(&user_id)
        .bind(&event.workout_id)
        .fetch_optional(guard.executor()?)
        .await
        .map_err(|e| AppError::database(format!("Failed to load active workout: {e}")))?;

        if let Some(document) = document {
            let mut workout: ActiveWorkout = serde_json::from_str(&document)?;
            workout.apply_event(event);
            let completed_at = matches!(event.kind, WorkoutEventKind::WorkoutCompleted)
                .then(|| to_millis(event.occurred_at));

            sqlx::query(
                r"
                UPDATE active_workouts
                SET updated_at = $1, document = $2, completed_at = COALESCE($3, completed_at)
                WHERE user_id = $4 AND workout_id = $5
                ",
            )
            .bind(to_millis(workout.updated_at))
            .bind(serde_json::to_string(&workout)?)
            .bind(completed_at)
            .bind(&user_id)
            .bind(&event.workout_id)
            .execute(guard.executor()?)
            .await
            .map_err(|e| AppError::database(format!("Failed to update active workout: {e}")))?;
        }

        guard.commit().await
    }

    /// A specific workout's snapshot, completed or not
    ///
    /// # Errors
    ///
    /// Returns an error if the read or decoding fails
    pub async fn get_active_workout(
        &self,
        user_id: Uuid,
        workout_id: &str,
    ) -> AppResult<Option<ActiveWorkout>> {
        let document: Option<String> = sqlx::query_scalar(
            "SELECT document FROM active_workouts WHERE user_id = $1 AND workout_id = $2",
        )
        .bind(user_id.to_string())
        .bind(workout_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get active workout: {e}")))?;

        document
            .map(|json| serde_json::from_str(&json).map_err(AppError::from))
            .transpose()
    }

    /// Most recently updated workout that has not been completed
    ///
    /// # Errors
    ///
    /// Returns an error if the read or decoding fails
    pub async fn latest_active_workout(&self, user_id: Uuid) -> AppResult<Option<ActiveWorkout>> {
        let document: Option<String> = sqlx::query_scalar(
            r"
            SELECT document FROM active_workouts
            WHERE user_id = $1 AND completed_at IS NULL
            ORDER BY updated_at DESC, workout_id DESC
            LIMIT 1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get latest active workout: {e}")))?;

        document
            .map(|json| serde_json::from_str(&json).map_err(AppError::from))
            .transpose()
    }

    /// Events of a workout, newest first, up to `limit + 1` rows after the cursor
    ///
    /// # Errors
    ///
    /// Returns an error if the read or decoding fails
    pub async fn list_workout_events(
        &self,
        user_id: Uuid,
        workout_id: &str,
        after: Option<&CursorPayload>,
        limit: usize,
    ) -> AppResult<Vec<WorkoutEvent>> {
        let fetch = i64::try_from(limit + 1).unwrap_or(i64::MAX);
        let rows = match after {
            Some(after) => {
                let last_time = to_millis(after.last_workout_end_time);
                sqlx::query(
                    r"
                    SELECT * FROM workout_events
                    WHERE user_id = ?1 AND workout_id = ?2
                      AND (occurred_at < ?3 OR (occurred_at = ?3 AND event_id < ?4))
                    ORDER BY occurred_at DESC, event_id DESC
                    LIMIT ?5
                    ",
                )
                .bind(user_id.to_string())
                .bind(workout_id)
                .bind(last_time)
                .bind(&after.last_set_id)
                .bind(fetch)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r"
                    SELECT * FROM workout_events
                    WHERE user_id = ?1 AND workout_id = ?2
                    ORDER BY occurred_at DESC, event_id DESC
                    LIMIT ?3
                    ",
                )
                .bind(user_id.to_string())
                .bind(workout_id)
                .bind(fetch)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::database(format!("Failed to list workout events: {e}")))?;

        rows.iter().map(row_to_event).collect()
    }
}

/// Convert a `workout_events` row to a `WorkoutEvent`
fn row_to_event(row: &SqliteRow) -> AppResult<WorkoutEvent> {
    let user_id_str: String = row.get("user_id");
    let payload: String = row.get("payload");
    Ok(WorkoutEvent {
        event_id: row.get("event_id"),
        workout_id: row.get("workout_id"),
        user_id: Uuid::parse_str(&user_id_str)
            .map_err(|e| AppError::internal(format!("Invalid UUID: {e}")))?,
        occurred_at: from_millis(row.get("occurred_at"))?,
        kind: serde_json::from_str(&payload)?,
    })
}
