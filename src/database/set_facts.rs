// ABOUTME: Database operations for set facts (idempotent upsert and filtered paginated reads)
// ABOUTME: Attribution maps are JSON columns; key arrays are filtered with json_each containment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use pierre_core::models::{ContributionMap, SetFact};
use pierre_core::pagination::{CursorPayload, SortMode};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use super::transactions::TransactionGuard;
use super::{from_millis, from_week_key, to_millis, to_week_key, Database};
use crate::errors::{AppError, AppResult};

/// The single target dimension of a set query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactTarget {
    /// Facts whose `muscle_group_keys` contain this group
    MuscleGroup(String),
    /// Facts whose `muscle_keys` contain this muscle
    Muscle(String),
    /// Facts for any of these exercises
    Exercises(Vec<String>),
}

/// Storage-level set query; every bound has already been validated and clamped
#[derive(Debug, Clone)]
pub struct SetFactQuery {
    /// Owner
    pub user_id: Uuid,
    /// Target dimension
    pub target: FactTarget,
    /// Inclusive lower bound on `workout_end_time`
    pub start: DateTime<Utc>,
    /// Exclusive upper bound on `workout_end_time`
    pub end: DateTime<Utc>,
    /// Include warmup sets
    pub include_warmups: bool,
    /// Minimum reps
    pub min_reps: Option<i32>,
    /// Maximum reps
    pub max_reps: Option<i32>,
    /// Minimum load
    pub min_weight_kg: Option<f64>,
    /// Maximum load
    pub max_weight_kg: Option<f64>,
    /// Maximum RIR; unrated sets are excluded when set
    pub max_rir: Option<i32>,
    /// Only sets taken to failure
    pub failure_only: bool,
    /// Only sets with non-zero hard-set credit
    pub hard_sets_only: bool,
    /// Ordering
    pub sort: SortMode,
    /// Resume after this position
    pub after: Option<CursorPayload>,
    /// Rows to return; one extra is fetched to detect more
    pub limit: usize,
}

impl Database {
    /// Upsert facts by `set_id`; re-deriving the same workout overwrites, never duplicates
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub async fn upsert_set_facts(&self, facts: &[SetFact]) -> AppResult<()> {
        if facts.is_empty() {
            return Ok(());
        }
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin fact upsert: {e}")))?;
        let mut guard = TransactionGuard::new(tx);

        for fact in facts {
            sqlx::query(
                r"
                INSERT INTO set_facts (
                    set_id, user_id, workout_id, exercise_id, exercise_name, set_index,
                    workout_end_time, week_start, reps, weight_kg, rir, is_warmup, is_failure,
                    volume, e1rm, e1rm_confidence, hard_set_credit,
                    muscle_group_contrib, muscle_contrib,
                    effective_volume_by_group, effective_volume_by_muscle,
                    hard_set_credit_by_group, hard_set_credit_by_muscle,
                    muscle_group_keys, muscle_keys
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                          $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
                ON CONFLICT(set_id) DO UPDATE SET
                    user_id = excluded.user_id,
                    workout_id = excluded.workout_id,
                    exercise_id = excluded.exercise_id,
                    exercise_name = excluded.exercise_name,
                    set_index = excluded.set_index,
                    workout_end_time = excluded.workout_end_time,
                    week_start = excluded.week_start,
                    reps = excluded.reps,
                    weight_kg = excluded.weight_kg,
                    rir = excluded.rir,
                    is_warmup = excluded.is_warmup,
                    is_failure = excluded.is_failure,
                    volume = excluded.volume,
                    e1rm = excluded.e1rm,
                    e1rm_confidence = excluded.e1rm_confidence,
                    hard_set_credit = excluded.hard_set_credit,
                    muscle_group_contrib = excluded.muscle_group_contrib,
                    muscle_contrib = excluded.muscle_contrib,
                    effective_volume_by_group = excluded.effective_volume_by_group,
                    effective_volume_by_muscle = excluded.effective_volume_by_muscle,
                    hard_set_credit_by_group = excluded.hard_set_credit_by_group,
                    hard_set_credit_by_muscle = excluded.hard_set_credit_by_muscle,
                    muscle_group_keys = excluded.muscle_group_keys,
                    muscle_keys = excluded.muscle_keys
                ",
            )
            .bind(&fact.set_id)
            .bind(fact.user_id.to_string())
            .bind(&fact.workout_id)
            .bind(&fact.exercise_id)
            .bind(&fact.exercise_name)
            .bind(i64::from(fact.set_index))
            .bind(to_millis(fact.workout_end_time))
            .bind(to_week_key(fact.week_start))
            .bind(fact.reps)
            .bind(fact.weight_kg)
            .bind(fact.rir)
            .bind(fact.is_warmup)
            .bind(fact.is_failure)
            .bind(fact.volume)
            .bind(fact.e1rm)
            .bind(fact.e1rm_confidence)
            .bind(fact.hard_set_credit)
            .bind(serde_json::to_string(&fact.muscle_group_contrib)?)
            .bind(serde_json::to_string(&fact.muscle_contrib)?)
            .bind(serde_json::to_string(&fact.effective_volume_by_group)?)
            .bind(serde_json::to_string(&fact.effective_volume_by_muscle)?)
            .bind(serde_json::to_string(&fact.hard_set_credit_by_group)?)
            .bind(serde_json::to_string(&fact.hard_set_credit_by_muscle)?)
            .bind(serde_json::to_string(&fact.muscle_group_keys)?)
            .bind(serde_json::to_string(&fact.muscle_keys)?)
            .execute(guard.executor()?)
            .await
            .map_err(|e| {
                AppError::database(format!("Failed to upsert set fact {}: {e}", fact.set_id))
            })?;
        }

        guard.commit().await?;
        debug!(count = facts.len(), "Upserted set facts");
        Ok(())
    }

    /// Filtered, sorted, cursor-positioned read returning up to `limit + 1` rows
    ///
    /// # Errors
    ///
    /// Returns an error if the read or row decoding fails
    pub async fn query_set_facts(&self, query: &SetFactQuery) -> AppResult<Vec<SetFact>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM set_facts WHERE user_id = ");
        builder.push_bind(query.user_id.to_string());

        match &query.target {
            FactTarget::MuscleGroup(group) => {
                builder.push(
                    " AND EXISTS (SELECT 1 FROM json_each(set_facts.muscle_group_keys) WHERE value = ",
                );
                builder.push_bind(group.clone());
                builder.push(")");
            }
            FactTarget::Muscle(muscle) => {
                builder.push(
                    " AND EXISTS (SELECT 1 FROM json_each(set_facts.muscle_keys) WHERE value = ",
                );
                builder.push_bind(muscle.clone());
                builder.push(")");
            }
            FactTarget::Exercises(ids) => {
                builder.push(" AND exercise_id IN (");
                let mut separated = builder.separated(", ");
                for id in ids {
                    separated.push_bind(id.clone());
                }
                separated.push_unseparated(")");
            }
        }

        builder.push(" AND workout_end_time >= ");
        builder.push_bind(to_millis(query.start));
        builder.push(" AND workout_end_time < ");
        builder.push_bind(to_millis(query.end));

        if !query.include_warmups {
            builder.push(" AND is_warmup = 0");
        }
        if let Some(min_reps) = query.min_reps {
            builder.push(" AND reps >= ");
            builder.push_bind(min_reps);
        }
        if let Some(max_reps) = query.max_reps {
            builder.push(" AND reps <= ");
            builder.push_bind(max_reps);
        }
        if let Some(min_weight) = query.min_weight_kg {
            builder.push(" AND weight_kg >= ");
            builder.push_bind(min_weight);
        }
        if let Some(max_weight) = query.max_weight_kg {
            builder.push(" AND weight_kg <= ");
            builder.push_bind(max_weight);
        }
        if let Some(max_rir) = query.max_rir {
            builder.push(" AND rir IS NOT NULL AND rir <= ");
            builder.push_bind(max_rir);
        }
        if query.failure_only {
            builder.push(" AND is_failure = 1");
        }
        if query.hard_sets_only {
            builder.push(" AND hard_set_credit > 0");
        }

        match query.sort {
            SortMode::E1rmDesc => {
                builder.push(" AND e1rm IS NOT NULL");
                if let Some(after) = &query.after {
                    let last_e1rm = after.last_e1rm.unwrap_or(f64::MAX);
                    let last_time = to_millis(after.last_workout_end_time);
                    builder.push(" AND (e1rm < ");
                    builder.push_bind(last_e1rm);
                    builder.push(" OR (e1rm = ");
                    builder.push_bind(last_e1rm);
                    builder.push(" AND (workout_end_time < ");
                    builder.push_bind(last_time);
                    builder.push(" OR (workout_end_time = ");
                    builder.push_bind(last_time);
                    builder.push(" AND set_id < ");
                    builder.push_bind(after.last_set_id.clone());
                    builder.push("))))");
                }
                builder.push(" ORDER BY e1rm DESC, workout_end_time DESC, set_id DESC");
            }
            SortMode::DateDesc | SortMode::EventTimeDesc => {
                if let Some(after) = &query.after {
                    let last_time = to_millis(after.last_workout_end_time);
                    builder.push(" AND (workout_end_time < ");
                    builder.push_bind(last_time);
                    builder.push(" OR (workout_end_time = ");
                    builder.push_bind(last_time);
                    builder.push(" AND set_id < ");
                    builder.push_bind(after.last_set_id.clone());
                    builder.push("))");
                }
                builder.push(" ORDER BY workout_end_time DESC, set_id DESC");
            }
        }

        builder.push(" LIMIT ");
        builder.push_bind(i64::try_from(query.limit + 1).unwrap_or(i64::MAX));

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to query set facts: {e}")))?;

        rows.iter().map(row_to_set_fact).collect()
    }
}

fn parse_map(row: &SqliteRow, column: &str) -> AppResult<ContributionMap> {
    let json: String = row.get(column);
    Ok(serde_json::from_str(&json)?)
}

fn parse_keys(row: &SqliteRow, column: &str) -> AppResult<Vec<String>> {
    let json: String = row.get(column);
    Ok(serde_json::from_str(&json)?)
}

/// Convert a database row to a `SetFact`
fn row_to_set_fact(row: &SqliteRow) -> AppResult<SetFact> {
    let user_id_str: String = row.get("user_id");
    let set_index: i64 = row.get("set_index");
    let end_time_ms: i64 = row.get("workout_end_time");
    let week_start_str: String = row.get("week_start");

    Ok(SetFact {
        set_id: row.get("set_id"),
        user_id: Uuid::parse_str(&user_id_str)
            .map_err(|e| AppError::internal(format!("Invalid UUID: {e}")))?,
        workout_id: row.get("workout_id"),
        exercise_id: row.get("exercise_id"),
        exercise_name: row.get("exercise_name"),
        set_index: u32::try_from(set_index)
            .map_err(|e| AppError::database(format!("Invalid stored set_index: {e}")))?,
        workout_end_time: from_millis(end_time_ms)?,
        week_start: from_week_key(&week_start_str)?,
        reps: row.get("reps"),
        weight_kg: row.get("weight_kg"),
        rir: row.get("rir"),
        is_warmup: row.get("is_warmup"),
        is_failure: row.get("is_failure"),
        volume: row.get("volume"),
        e1rm: row.get("e1rm"),
        e1rm_confidence: row.get("e1rm_confidence"),
        hard_set_credit: row.get("hard_set_credit"),
        muscle_group_contrib: parse_map(row, "muscle_group_contrib")?,
        muscle_contrib: parse_map(row, "muscle_contrib")?,
        effective_volume_by_group: parse_map(row, "effective_volume_by_group")?,
        effective_volume_by_muscle: parse_map(row, "effective_volume_by_muscle")?,
        hard_set_credit_by_group: parse_map(row, "hard_set_credit_by_group")?,
        hard_set_credit_by_muscle: parse_map(row, "hard_set_credit_by_muscle")?,
        muscle_group_keys: parse_keys(row, "muscle_group_keys")?,
        muscle_keys: parse_keys(row, "muscle_keys")?,
    })
}
