// ABOUTME: Read operations for weekly series documents and window totals
// ABOUTME: Absent series read as empty documents; top-exercise ranking comes from set facts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::NaiveDate;
use pierre_core::models::{RepsBuckets, SeriesDocument, SeriesKind, SeriesSummary, WeeklyPoint};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{from_millis, from_week_key, to_week_key, Database};
use crate::errors::{AppError, AppResult};

/// An exercise's contribution to a group or muscle over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseVolume {
    /// Catalog exercise id
    pub exercise_id: String,
    /// Display name, if one was logged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_name: Option<String>,
    /// Attributed effective volume
    pub effective_volume: f64,
    /// Attributed hard-set credit
    pub hard_sets: f64,
    /// Working sets
    pub sets: i64,
}

/// Window totals of one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesTotal {
    /// Entity id
    pub entity_id: String,
    /// Working sets
    pub sets: i64,
    /// Hard-set credit
    pub hard_sets: f64,
    /// Raw volume
    pub volume: f64,
    /// Attributed effective volume
    pub effective_volume: f64,
}

impl Database {
    /// Read one series document; a missing series is an empty document
    ///
    /// # Errors
    ///
    /// Returns an error if the read or row decoding fails
    pub async fn get_series(
        &self,
        user_id: Uuid,
        kind: SeriesKind,
        entity_id: &str,
    ) -> AppResult<SeriesDocument> {
        let user_id = user_id.to_string();
        let rows = sqlx::query(
            r"
            SELECT * FROM series_weeks
            WHERE user_id = $1 AND kind = $2 AND entity_id = $3
            ORDER BY week_start ASC
            ",
        )
        .bind(&user_id)
        .bind(kind.as_str())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get series weeks: {e}")))?;

        let mut document = SeriesDocument::empty(kind, entity_id);
        for row in &rows {
            let week: String = row.get("week_start");
            document.weeks.insert(from_week_key(&week)?, row_to_point(row));
        }

        let summary = sqlx::query(
            r"
            SELECT total_sets, total_volume, best_e1rm, last_workout_end_time
            FROM series_summaries
            WHERE user_id = $1 AND kind = $2 AND entity_id = $3
            ",
        )
        .bind(&user_id)
        .bind(kind.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get series summary: {e}")))?;

        if let Some(row) = summary {
            let last: Option<i64> = row.get("last_workout_end_time");
            document.summary = SeriesSummary {
                total_sets: row.get("total_sets"),
                total_volume: row.get("total_volume"),
                best_e1rm: row.get("best_e1rm"),
                last_workout_end_time: last.map(from_millis).transpose()?,
            };
        }
        Ok(document)
    }

    /// Per-entity totals of one series class over `[from_week, to_week]`,
    /// highest effective volume first
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails
    pub async fn series_totals(
        &self,
        user_id: Uuid,
        kind: SeriesKind,
        from_week: NaiveDate,
        to_week: NaiveDate,
        limit: u32,
    ) -> AppResult<Vec<SeriesTotal>> {
        let rows = sqlx::query(
            r"
            SELECT entity_id,
                   SUM(sets) AS sets,
                   SUM(hard_sets) AS hard_sets,
                   SUM(volume) AS volume,
                   SUM(effective_volume) AS effective_volume
            FROM series_weeks
            WHERE user_id = $1 AND kind = $2 AND week_start >= $3 AND week_start <= $4
            GROUP BY entity_id
            ORDER BY effective_volume DESC, entity_id ASC
            LIMIT $5
            ",
        )
        .bind(user_id.to_string())
        .bind(kind.as_str())
        .bind(to_week_key(from_week))
        .bind(to_week_key(to_week))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to total series: {e}")))?;

        Ok(rows
            .iter()
            .map(|row| SeriesTotal {
                entity_id: row.get("entity_id"),
                sets: row.get("sets"),
                hard_sets: row.get("hard_sets"),
                volume: row.get("volume"),
                effective_volume: row.get("effective_volume"),
            })
            .collect())
    }

    /// Exercises ranked by effective volume attributed to a group or muscle.
    ///
    /// Only facts of workouts whose series commit landed are counted.
    ///
    /// # Errors
    ///
    /// Returns an error for an exercise series kind, or if the read fails
    pub async fn top_exercises_for(
        &self,
        user_id: Uuid,
        kind: SeriesKind,
        entity_id: &str,
        from_week: NaiveDate,
        to_week: NaiveDate,
        limit: u32,
    ) -> AppResult<Vec<ExerciseVolume>> {
        let (volume_column, credit_column, keys_column) = match kind {
            SeriesKind::MuscleGroup => (
                "effective_volume_by_group",
                "hard_set_credit_by_group",
                "muscle_group_keys",
            ),
            SeriesKind::Muscle => (
                "effective_volume_by_muscle",
                "hard_set_credit_by_muscle",
                "muscle_keys",
            ),
            SeriesKind::Exercise => {
                return Err(AppError::internal(
                    "Top exercises are ranked for muscle groups and muscles only",
                ))
            }
        };

        let sql = format!(
            r#"
            SELECT exercise_id,
                   MAX(exercise_name) AS exercise_name,
                   CAST(SUM(COALESCE(json_extract({volume_column}, '$."' || ?2 || '"'), 0.0)) AS REAL) AS effective_volume,
                   CAST(SUM(COALESCE(json_extract({credit_column}, '$."' || ?2 || '"'), 0.0)) AS REAL) AS hard_sets,
                   COUNT(*) AS sets
            FROM set_facts
            WHERE user_id = ?1 AND is_warmup = 0
              AND week_start >= ?3 AND week_start <= ?4
              AND EXISTS (SELECT 1 FROM json_each(set_facts.{keys_column}) WHERE value = ?2)
              AND EXISTS (
                  SELECT 1 FROM aggregated_workouts a
                  WHERE a.user_id = set_facts.user_id AND a.workout_id = set_facts.workout_id
              )
            GROUP BY exercise_id
            ORDER BY effective_volume DESC, exercise_id ASC
            LIMIT ?5
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(entity_id)
            .bind(to_week_key(from_week))
            .bind(to_week_key(to_week))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to rank exercises: {e}")))?;

        Ok(rows
            .iter()
            .map(|row| ExerciseVolume {
                exercise_id: row.get("exercise_id"),
                exercise_name: row.get("exercise_name"),
                effective_volume: row.get("effective_volume"),
                hard_sets: row.get("hard_sets"),
                sets: row.get("sets"),
            })
            .collect())
    }
}

/// Convert a `series_weeks` row to a `WeeklyPoint`
fn row_to_point(row: &SqliteRow) -> WeeklyPoint {
    WeeklyPoint {
        sets: row.get("sets"),
        hard_sets: row.get("hard_sets"),
        volume: row.get("volume"),
        effective_volume: row.get("effective_volume"),
        rir_sum: row.get("rir_sum"),
        rir_count: row.get("rir_count"),
        failure_sets: row.get("failure_sets"),
        reps_bucket: RepsBuckets {
            one_to_five: row.get("reps_1_5"),
            six_to_ten: row.get("reps_6_10"),
            eleven_to_fifteen: row.get("reps_11_15"),
            sixteen_to_twenty: row.get("reps_16_20"),
        },
        e1rm_max: row.get("e1rm_max"),
        e1rm_p90: row.get("e1rm_p90"),
    }
}
