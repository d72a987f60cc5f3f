// ABOUTME: SQLite storage for set facts, weekly series, aggregation markers, and active workouts
// ABOUTME: Owns the connection pool and the schema migrations for every table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Database Management
//!
//! Persistent storage for the analytics core. Facts are upserted by `set_id`,
//! series counters are updated with SQL increments inside one transaction per
//! workout, and an `aggregated_workouts` marker makes that commit idempotent.

mod active_workouts;
mod aggregation;
mod series;
mod set_facts;
/// Transaction guard and lock-contention retry
pub mod transactions;

pub use aggregation::{
    AggregationFailure, BackfillWatermark, CommitOutcome, SeriesDelta, WorkoutDelta,
};
pub use series::{ExerciseVolume, SeriesTotal};
pub use set_facts::{FactTarget, SetFactQuery};

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::fs;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};

/// Connections opened against a file database
const FILE_POOL_CONNECTIONS: u32 = 8;
/// How long a writer waits on a locked database before `SQLITE_BUSY`
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database manager for analytics storage
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) a database and run migrations
    ///
    /// `sqlite::memory:` gets a single long-lived connection so every caller sees
    /// the same in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the connection fails, or a migration fails
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let is_memory = database_url.contains(":memory:");

        let connection_string = if database_url.starts_with("sqlite:")
            && !is_memory
            && !database_url.contains('?')
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        if !is_memory {
            ensure_parent_dir(database_url).await?;
        }

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| AppError::config(format!("Invalid database URL {database_url}: {e}")))?
            .busy_timeout(BUSY_TIMEOUT);

        let pool_options = if is_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(FILE_POOL_CONNECTIONS)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to {database_url}: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        info!(database_url = %database_url, "Database ready");
        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any table or index cannot be created
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_set_facts().await?;
        self.migrate_series().await?;
        self.migrate_aggregation().await?;
        self.migrate_active_workouts().await?;
        debug!("Database migrations complete");
        Ok(())
    }

    async fn migrate_set_facts(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS set_facts (
                set_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                workout_id TEXT NOT NULL,
                exercise_id TEXT NOT NULL,
                exercise_name TEXT,
                set_index INTEGER NOT NULL,
                workout_end_time INTEGER NOT NULL,
                week_start TEXT NOT NULL,
                reps INTEGER NOT NULL,
                weight_kg REAL NOT NULL,
                rir INTEGER CHECK (rir IS NULL OR rir BETWEEN 0 AND 5),
                is_warmup INTEGER NOT NULL,
                is_failure INTEGER NOT NULL,
                volume REAL NOT NULL,
                e1rm REAL,
                e1rm_confidence REAL,
                hard_set_credit REAL NOT NULL,
                muscle_group_contrib TEXT NOT NULL,
                muscle_contrib TEXT NOT NULL,
                effective_volume_by_group TEXT NOT NULL,
                effective_volume_by_muscle TEXT NOT NULL,
                hard_set_credit_by_group TEXT NOT NULL,
                hard_set_credit_by_muscle TEXT NOT NULL,
                muscle_group_keys TEXT NOT NULL,
                muscle_keys TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create set_facts table: {e}")))?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_set_facts_user_time ON set_facts(user_id, workout_end_time DESC, set_id DESC)",
            "CREATE INDEX IF NOT EXISTS idx_set_facts_user_exercise ON set_facts(user_id, exercise_id, workout_end_time DESC)",
            "CREATE INDEX IF NOT EXISTS idx_set_facts_exercise_week ON set_facts(user_id, exercise_id, week_start)",
            "CREATE INDEX IF NOT EXISTS idx_set_facts_workout ON set_facts(user_id, workout_id)",
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to create set_facts index: {e}")))?;
        }
        Ok(())
    }

    async fn migrate_series(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS series_weeks (
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('exercise', 'muscle_group', 'muscle')),
                entity_id TEXT NOT NULL,
                week_start TEXT NOT NULL,
                sets INTEGER NOT NULL DEFAULT 0,
                hard_sets REAL NOT NULL DEFAULT 0,
                volume REAL NOT NULL DEFAULT 0,
                effective_volume REAL NOT NULL DEFAULT 0,
                rir_sum INTEGER NOT NULL DEFAULT 0,
                rir_count INTEGER NOT NULL DEFAULT 0,
                failure_sets INTEGER NOT NULL DEFAULT 0,
                reps_1_5 INTEGER NOT NULL DEFAULT 0,
                reps_6_10 INTEGER NOT NULL DEFAULT 0,
                reps_11_15 INTEGER NOT NULL DEFAULT 0,
                reps_16_20 INTEGER NOT NULL DEFAULT 0,
                e1rm_max REAL,
                e1rm_p90 REAL,
                PRIMARY KEY (user_id, kind, entity_id, week_start)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create series_weeks table: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS series_summaries (
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                total_sets INTEGER NOT NULL DEFAULT 0,
                total_volume REAL NOT NULL DEFAULT 0,
                best_e1rm REAL,
                last_workout_end_time INTEGER,
                PRIMARY KEY (user_id, kind, entity_id)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create series_summaries table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_series_weeks_kind_week ON series_weeks(user_id, kind, week_start)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create series_weeks index: {e}")))?;

        Ok(())
    }

    async fn migrate_aggregation(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS aggregated_workouts (
                user_id TEXT NOT NULL,
                workout_id TEXT NOT NULL,
                week_start TEXT NOT NULL,
                workout_end_time INTEGER NOT NULL,
                fact_count INTEGER NOT NULL,
                aggregated_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, workout_id)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::database(format!("Failed to create aggregated_workouts table: {e}"))
        })?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS aggregation_failures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                workout_id TEXT NOT NULL,
                attempts INTEGER NOT NULL,
                error TEXT NOT NULL,
                payload TEXT NOT NULL,
                failed_at INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::database(format!("Failed to create aggregation_failures table: {e}"))
        })?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS backfill_watermarks (
                user_id TEXT PRIMARY KEY,
                last_end_time INTEGER NOT NULL,
                last_workout_id TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::database(format!("Failed to create backfill_watermarks table: {e}"))
        })?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_aggregated_workouts_week ON aggregated_workouts(user_id, week_start)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::database(format!("Failed to create aggregated_workouts index: {e}"))
        })?;

        Ok(())
    }

    async fn migrate_active_workouts(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS active_workouts (
                user_id TEXT NOT NULL,
                workout_id TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                completed_at INTEGER,
                document TEXT NOT NULL,
                PRIMARY KEY (user_id, workout_id)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create active_workouts table: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS workout_events (
                event_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                workout_id TEXT NOT NULL,
                occurred_at INTEGER NOT NULL,
                event_type TEXT NOT NULL,
                payload TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create workout_events table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_workout_events_workout ON workout_events(user_id, workout_id, occurred_at DESC, event_id DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create workout_events index: {e}")))?;

        Ok(())
    }
}

/// Create the directory holding a file database
async fn ensure_parent_dir(database_url: &str) -> AppResult<()> {
    let raw = database_url
        .strip_prefix("sqlite:")
        .unwrap_or(database_url)
        .trim_start_matches("//");
    let path = raw.split('?').next().unwrap_or(raw);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::config(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }
    Ok(())
}

/// Instants are stored as Unix milliseconds
pub(crate) fn to_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> AppResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| AppError::database(format!("Stored timestamp out of range: {millis}")))
}

/// Week starts are stored as `YYYY-MM-DD`
pub(crate) fn to_week_key(week_start: NaiveDate) -> String {
    week_start.format("%Y-%m-%d").to_string()
}

pub(crate) fn from_week_key(key: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .map_err(|e| AppError::database(format!("Invalid stored week_start {key}: {e}")))
}

#[cfg(test)]
pub(crate) async fn create_test_db() -> AppResult<Database> {
    Database::new("sqlite::memory:").await
}
