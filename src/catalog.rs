// ABOUTME: Exercise catalog collaborator supplying per-exercise muscle attribution weights
// ABOUTME: Async trait seam plus an in-memory implementation loaded from JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Exercise Catalog
//!
//! Attribution data lives outside the analytics core. The aggregation pipeline
//! asks an [`ExerciseCatalog`] for each exercise in a workout and hands the answers
//! to the pure set-fact generator.
//!
//! The JSON file format is an object keyed by exercise id:
//!
//! ```json
//! {
//!   "barbell_bench_press": {
//!     "primary": ["pecs"],
//!     "secondary": ["triceps", "front delts"],
//!     "weights": { "pecs": 0.6 }
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use pierre_core::models::CompletedWorkout;
use pierre_intelligence::ExerciseAttribution;
use tokio::fs;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};

/// Lookup of catalog attribution by exercise id
#[async_trait]
pub trait ExerciseCatalog: Send + Sync {
    /// Attribution for one exercise; `None` when the catalog has no entry
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog backend is unavailable
    async fn get_attribution(&self, exercise_id: &str) -> AppResult<Option<ExerciseAttribution>>;

    /// Attribution for every distinct exercise of a workout; missing entries are omitted
    ///
    /// # Errors
    ///
    /// Returns the first backend error
    async fn attributions_for(
        &self,
        workout: &CompletedWorkout,
    ) -> AppResult<HashMap<String, ExerciseAttribution>> {
        let mut attributions = HashMap::new();
        for exercise in &workout.exercises {
            if attributions.contains_key(&exercise.exercise_id) {
                continue;
            }
            match self.get_attribution(&exercise.exercise_id).await? {
                Some(attribution) => {
                    attributions.insert(exercise.exercise_id.clone(), attribution);
                }
                None => debug!(
                    exercise_id = %exercise.exercise_id,
                    "No catalog attribution, facts will carry empty maps"
                ),
            }
        }
        Ok(attributions)
    }
}

/// Catalog held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: HashMap<String, ExerciseAttribution>,
}

impl InMemoryCatalog {
    /// Empty catalog; every exercise gets empty attribution
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry
    #[must_use]
    pub fn with_entry(mut self, exercise_id: impl Into<String>, attribution: ExerciseAttribution) -> Self {
        self.entries.insert(exercise_id.into(), attribution);
        self
    }

    /// Parse the JSON catalog format
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` for malformed JSON
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let entries: HashMap<String, ExerciseAttribution> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    /// Load the JSON catalog from a file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, or `SerializationError` if it
    /// is malformed
    pub async fn from_file(path: &Path) -> AppResult<Self> {
        let json = fs::read_to_string(path).await.map_err(|e| {
            AppError::config(format!("Failed to read catalog {}: {e}", path.display()))
        })?;
        let catalog = Self::from_json_str(&json)?;
        info!(path = %path.display(), entries = catalog.len(), "Loaded exercise catalog");
        Ok(catalog)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ExerciseCatalog for InMemoryCatalog {
    async fn get_attribution(&self, exercise_id: &str) -> AppResult<Option<ExerciseAttribution>> {
        Ok(self.entries.get(exercise_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::fs as std_fs;

    use chrono::Utc;
    use pierre_core::models::{LoggedSet, WorkoutExercise};
    use uuid::Uuid;

    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_parse_catalog_json() {
        let catalog = InMemoryCatalog::from_json_str(
            r#"{
                "bench": { "primary": ["pecs"], "secondary": ["triceps"], "weights": { "pecs": 0.6 } },
                "plank": { "primary": ["abs"] }
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(InMemoryCatalog::from_json_str("[1, 2]").is_err());
    }

    #[tokio::test]
    async fn test_load_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std_fs::write(
            &path,
            r#"{ "row": { "primary": ["lats"], "secondary": ["biceps"] } }"#,
        )
        .unwrap();

        let catalog = InMemoryCatalog::from_file(&path).await.unwrap();
        let row = catalog.get_attribution("row").await.unwrap().unwrap();
        assert_eq!(row.primary, vec!["lats".to_owned()]);
        assert!(catalog.get_attribution("curl").await.unwrap().is_none());

        let missing = InMemoryCatalog::from_file(&dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert_eq!(missing.code, ErrorCode::ConfigError);
    }

    #[tokio::test]
    async fn test_attributions_for_workout_skip_unknown_exercises() {
        let catalog = InMemoryCatalog::new().with_entry(
            "squat",
            ExerciseAttribution {
                primary: vec!["quads".to_owned()],
                ..ExerciseAttribution::default()
            },
        );
        let set = LoggedSet {
            set_index: 0,
            reps: 5,
            weight_kg: 100.0,
            rir: Some(2),
            is_warmup: false,
            is_failure: false,
            completed: true,
            deleted: false,
        };
        let workout = CompletedWorkout {
            workout_id: "w1".to_owned(),
            user_id: Uuid::new_v4(),
            end_time: Utc::now(),
            utc_offset_minutes: 0,
            exercises: vec![
                WorkoutExercise {
                    exercise_id: "squat".to_owned(),
                    name: None,
                    sets: vec![set.clone()],
                },
                WorkoutExercise {
                    exercise_id: "mystery".to_owned(),
                    name: None,
                    sets: vec![set],
                },
            ],
        };

        let attributions = catalog.attributions_for(&workout).await.unwrap();
        assert_eq!(attributions.len(), 1);
        assert!(attributions.contains_key("squat"));
    }
}
