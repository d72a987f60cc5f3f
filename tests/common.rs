// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory storage, a fixture catalog, workout builders, and tool calls
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `pierre_training_analytics`

use std::env;
use std::sync::{Arc, Once};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use pierre_core::models::{week_start_for, CompletedWorkout, LoggedSet, WorkoutExercise};
use pierre_intelligence::{ExerciseAttribution, MuscleTaxonomy};
use pierre_training_analytics::aggregation::AggregationPipeline;
use pierre_training_analytics::catalog::{ExerciseCatalog, InMemoryCatalog};
use pierre_training_analytics::config::QueryConfig;
use pierre_training_analytics::database::Database;
use pierre_training_analytics::errors::AppResult;
use pierre_training_analytics::query::QueryService;
use pierre_training_analytics::tools::{ToolExecutionContext, ToolRegistry};
use serde_json::Value;
use tracing::Level;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard test database setup
pub async fn create_test_database() -> Result<Arc<Database>> {
    init_test_logging();
    Ok(Arc::new(Database::new("sqlite::memory:").await?))
}

/// Catalog covering the fixture exercises
pub fn test_catalog() -> InMemoryCatalog {
    let entry = |primary: &[&str], secondary: &[&str]| ExerciseAttribution {
        primary: primary.iter().map(|s| (*s).to_owned()).collect(),
        secondary: secondary.iter().map(|s| (*s).to_owned()).collect(),
        ..ExerciseAttribution::default()
    };
    InMemoryCatalog::new()
        .with_entry("bench_press", entry(&["pecs"], &["triceps", "front_delts"]))
        .with_entry("back_squat", entry(&["quads"], &["glutes"]))
        .with_entry("barbell_row", entry(&["lats"], &["biceps"]))
}

/// Working sets as `(reps, weight_kg, rir)`
pub fn sets(specs: &[(i32, f64, Option<i32>)]) -> Vec<LoggedSet> {
    specs
        .iter()
        .zip(0_u32..)
        .map(|(&(reps, weight_kg, rir), set_index)| LoggedSet {
            set_index,
            reps,
            weight_kg,
            rir,
            is_warmup: false,
            is_failure: false,
            completed: true,
            deleted: false,
        })
        .collect()
}

/// A completed workout with the given exercises
pub fn workout(
    user_id: Uuid,
    workout_id: &str,
    end_time: DateTime<Utc>,
    exercises: Vec<(&str, Vec<LoggedSet>)>,
) -> CompletedWorkout {
    CompletedWorkout {
        workout_id: workout_id.to_owned(),
        user_id,
        end_time,
        utc_offset_minutes: 0,
        exercises: exercises
            .into_iter()
            .map(|(exercise_id, sets)| WorkoutExercise {
                exercise_id: exercise_id.to_owned(),
                name: None,
                sets,
            })
            .collect(),
    }
}

/// Wednesday noon (UTC) of last week, moved back `weeks` weeks
pub fn weeks_ago(weeks: i64) -> DateTime<Utc> {
    let monday = week_start_for(Utc::now(), 0);
    let last_wednesday = (monday - Duration::days(5))
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc();
    last_wednesday - Duration::weeks(weeks)
}

/// A three-set bench workout at [`weeks_ago`]
pub fn bench_workout(user_id: Uuid, weeks: i64, weight_kg: f64) -> CompletedWorkout {
    workout(
        user_id,
        &format!("bench-{weeks}"),
        weeks_ago(weeks),
        vec![(
            "bench_press",
            sets(&[
                (5, weight_kg, Some(2)),
                (5, weight_kg, Some(1)),
                (5, weight_kg, Some(0)),
            ]),
        )],
    )
}

/// Storage, pipeline, and tools wired together over one in-memory database
pub struct TestHarness {
    pub database: Arc<Database>,
    pub pipeline: AggregationPipeline,
    pub query: Arc<QueryService>,
    pub registry: ToolRegistry,
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let database = create_test_database().await?;
        let taxonomy = Arc::new(MuscleTaxonomy::standard());
        let catalog: Arc<dyn ExerciseCatalog> = Arc::new(test_catalog());
        let pipeline = AggregationPipeline::new(database.clone(), catalog, taxonomy.clone());
        let query = Arc::new(QueryService::new(
            database.clone(),
            taxonomy,
            QueryConfig::default(),
        ));
        let mut registry = ToolRegistry::new();
        registry.register_builtin_tools();

        Ok(Self {
            database,
            pipeline,
            query,
            registry,
        })
    }

    /// Aggregate workouts in order
    pub async fn aggregate(&self, workouts: &[CompletedWorkout]) -> Result<()> {
        for workout in workouts {
            self.pipeline.process(workout).await?;
        }
        Ok(())
    }

    /// Execute a tool and return its envelope
    pub async fn call(&self, tool: &str, user_id: Uuid, args: Value) -> AppResult<Value> {
        let context = ToolExecutionContext::new(user_id, self.query.clone());
        Ok(self.registry.execute(tool, args, &context).await?.content)
    }
}
