// ABOUTME: Active (in-progress) workout state and its append-only event log
// ABOUTME: Set edits are a typed SetPatch union rather than free-form field/value pairs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::training::RIR_MAX;
use crate::errors::{AppError, AppResult};

/// Current state of a workout that has not been completed yet.
///
/// Written by the logging system; the analytics side only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveWorkout {
    /// Workout id, shared with the eventual `CompletedWorkout`
    pub workout_id: String,
    /// Owner
    pub user_id: Uuid,
    /// When the session began
    pub started_at: DateTime<Utc>,
    /// Last state change
    pub updated_at: DateTime<Utc>,
    /// Exercises in session order
    #[serde(default)]
    pub exercises: Vec<ActiveExercise>,
}

/// One exercise within an active workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveExercise {
    /// Catalog exercise id
    pub exercise_id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Planned working sets, if a template supplied them
    #[serde(default)]
    pub planned_sets: Option<u32>,
    /// Sets logged so far
    #[serde(default)]
    pub sets: Vec<ActiveSet>,
}

/// A set logged during an active workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSet {
    /// Position within the exercise
    pub set_index: u32,
    /// Repetitions
    pub reps: i32,
    /// Load in kilograms
    pub weight_kg: f64,
    /// Reps in reserve
    #[serde(default)]
    pub rir: Option<i32>,
    /// Warmup set
    #[serde(default)]
    pub is_warmup: bool,
    /// Taken to failure
    #[serde(default)]
    pub is_failure: bool,
}

impl ActiveWorkout {
    /// Fold an event into the snapshot. Edits to unknown exercises or sets are ignored.
    pub fn apply_event(&mut self, event: &WorkoutEvent) {
        self.updated_at = self.updated_at.max(event.occurred_at);
        match &event.kind {
            WorkoutEventKind::WorkoutStarted | WorkoutEventKind::WorkoutCompleted => {}
            WorkoutEventKind::ExerciseAdded { exercise_id } => {
                self.exercise_entry(exercise_id);
            }
            WorkoutEventKind::SetLogged { exercise_id, set } => {
                let exercise = self.exercise_entry(exercise_id);
                exercise.sets.retain(|s| s.set_index != set.set_index);
                exercise.sets.push(set.clone());
                exercise.sets.sort_by_key(|s| s.set_index);
            }
            WorkoutEventKind::SetEdited {
                exercise_id,
                set_index,
                patches,
            } => {
                let target = self
                    .exercises
                    .iter_mut()
                    .find(|e| &e.exercise_id == exercise_id)
                    .and_then(|e| e.sets.iter_mut().find(|s| s.set_index == *set_index));
                if let Some(set) = target {
                    patches.iter().for_each(|patch| set.apply(patch));
                }
            }
            WorkoutEventKind::SetDeleted {
                exercise_id,
                set_index,
            } => {
                if let Some(exercise) = self
                    .exercises
                    .iter_mut()
                    .find(|e| &e.exercise_id == exercise_id)
                {
                    exercise.sets.retain(|s| s.set_index != *set_index);
                }
            }
            WorkoutEventKind::ExerciseRemoved { exercise_id } => {
                self.exercises.retain(|e| &e.exercise_id != exercise_id);
            }
        }
    }

    /// Logged sets across all exercises
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    fn exercise_entry(&mut self, exercise_id: &str) -> &mut ActiveExercise {
        let index = match self
            .exercises
            .iter()
            .position(|e| e.exercise_id == exercise_id)
        {
            Some(index) => index,
            None => {
                self.exercises.push(ActiveExercise {
                    exercise_id: exercise_id.to_owned(),
                    name: None,
                    planned_sets: None,
                    sets: Vec::new(),
                });
                self.exercises.len() - 1
            }
        };
        &mut self.exercises[index]
    }
}

impl ActiveSet {
    /// Apply a validated patch in place
    pub fn apply(&mut self, patch: &SetPatch) {
        match *patch {
            SetPatch::Reps(reps) => self.reps = reps,
            SetPatch::WeightKg(weight) => self.weight_kg = weight,
            SetPatch::Rir(rir) => self.rir = rir,
            SetPatch::IsWarmup(flag) => self.is_warmup = flag,
            SetPatch::IsFailure(flag) => self.is_failure = flag,
        }
    }
}

/// A single typed edit to a logged set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum SetPatch {
    /// New rep count
    Reps(i32),
    /// New load
    WeightKg(f64),
    /// New RIR rating, `None` clears it
    Rir(Option<i32>),
    /// Warmup flag
    IsWarmup(bool),
    /// Failure flag
    IsFailure(bool),
}

impl SetPatch {
    /// Reject values no logged set could hold
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` for negative reps, negative or non-finite weight,
    /// or RIR outside 0-5.
    pub fn validate(&self) -> AppResult<()> {
        match *self {
            Self::Reps(reps) if reps < 0 => Err(AppError::validation("reps must be >= 0")),
            Self::WeightKg(weight) if weight < 0.0 || !weight.is_finite() => {
                Err(AppError::validation("weight_kg must be a finite value >= 0"))
            }
            Self::Rir(Some(rir)) if !(0..=RIR_MAX).contains(&rir) => Err(AppError::validation(
                format!("rir must be between 0 and {RIR_MAX}"),
            )),
            _ => Ok(()),
        }
    }
}

/// What happened in a workout event
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkoutEventKind {
    /// Session started
    WorkoutStarted,
    /// An exercise was added to the session
    ExerciseAdded {
        /// Catalog exercise id
        exercise_id: String,
    },
    /// A set was logged
    SetLogged {
        /// Catalog exercise id
        exercise_id: String,
        /// The logged set
        set: ActiveSet,
    },
    /// A logged set was edited
    SetEdited {
        /// Catalog exercise id
        exercise_id: String,
        /// Set position
        set_index: u32,
        /// Edits, applied in order
        patches: Vec<SetPatch>,
    },
    /// A logged set was removed
    SetDeleted {
        /// Catalog exercise id
        exercise_id: String,
        /// Set position
        set_index: u32,
    },
    /// An exercise was removed from the session
    ExerciseRemoved {
        /// Catalog exercise id
        exercise_id: String,
    },
    /// Session completed
    WorkoutCompleted,
}

impl WorkoutEventKind {
    /// Short name stored alongside the payload
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WorkoutStarted => "workout_started",
            Self::ExerciseAdded { .. } => "exercise_added",
            Self::SetLogged { .. } => "set_logged",
            Self::SetEdited { .. } => "set_edited",
            Self::SetDeleted { .. } => "set_deleted",
            Self::ExerciseRemoved { .. } => "exercise_removed",
            Self::WorkoutCompleted => "workout_completed",
        }
    }

    /// Validate every patch carried by this event
    ///
    /// # Errors
    ///
    /// Returns the first patch validation error.
    pub fn validate(&self) -> AppResult<()> {
        match self {
            Self::SetEdited { patches, .. } => patches.iter().try_for_each(SetPatch::validate),
            Self::SetLogged { set, .. } => {
                SetPatch::Reps(set.reps).validate()?;
                SetPatch::WeightKg(set.weight_kg).validate()?;
                SetPatch::Rir(set.rir).validate()
            }
            _ => Ok(()),
        }
    }
}

/// One entry of the append-only event log of a workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEvent {
    /// Unique event id
    pub event_id: String,
    /// Workout the event belongs to
    pub workout_id: String,
    /// Owner
    pub user_id: Uuid,
    /// When the event happened
    pub occurred_at: DateTime<Utc>,
    /// Typed payload
    pub kind: WorkoutEventKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_wire_shape() {
        let json = serde_json::to_value(SetPatch::WeightKg(82.5)).unwrap();
        assert_eq!(json, serde_json::json!({ "field": "weight_kg", "value": 82.5 }));

        let parsed: SetPatch =
            serde_json::from_value(serde_json::json!({ "field": "rir", "value": null })).unwrap();
        assert_eq!(parsed, SetPatch::Rir(None));
    }

    #[test]
    fn test_unknown_patch_field_is_rejected_by_serde() {
        let parsed = serde_json::from_value::<SetPatch>(
            serde_json::json!({ "field": "user_id", "value": "x" }),
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_patch_validation() {
        assert!(SetPatch::Reps(-1).validate().is_err());
        assert!(SetPatch::WeightKg(f64::NAN).validate().is_err());
        assert!(SetPatch::Rir(Some(6)).validate().is_err());
        assert!(SetPatch::Rir(Some(3)).validate().is_ok());
        assert!(SetPatch::IsFailure(true).validate().is_ok());
    }

    #[test]
    fn test_apply_patch() {
        let mut set = ActiveSet {
            set_index: 0,
            reps: 8,
            weight_kg: 60.0,
            rir: Some(2),
            is_warmup: false,
            is_failure: false,
        };
        set.apply(&SetPatch::Reps(10));
        set.apply(&SetPatch::Rir(None));
        assert_eq!(set.reps, 10);
        assert_eq!(set.rir, None);
    }

    fn event(kind: WorkoutEventKind, minute: u32) -> WorkoutEvent {
        WorkoutEvent {
            event_id: format!("e{minute}"),
            workout_id: "w1".to_owned(),
            user_id: Uuid::nil(),
            occurred_at: DateTime::parse_from_rfc3339(&format!("2024-03-04T10:{minute:02}:00Z"))
                .unwrap()
                .with_timezone(&Utc),
            kind,
        }
    }

    #[test]
    fn test_apply_events_to_snapshot() {
        let start = event(WorkoutEventKind::WorkoutStarted, 0);
        let mut workout = ActiveWorkout {
            workout_id: "w1".to_owned(),
            user_id: Uuid::nil(),
            started_at: start.occurred_at,
            updated_at: start.occurred_at,
            exercises: Vec::new(),
        };
        let logged = ActiveSet {
            set_index: 0,
            reps: 5,
            weight_kg: 100.0,
            rir: None,
            is_warmup: false,
            is_failure: false,
        };

        workout.apply_event(&event(
            WorkoutEventKind::SetLogged {
                exercise_id: "squat".to_owned(),
                set: logged,
            },
            5,
        ));
        workout.apply_event(&event(
            WorkoutEventKind::SetEdited {
                exercise_id: "squat".to_owned(),
                set_index: 0,
                patches: vec![SetPatch::Reps(6), SetPatch::Rir(Some(1))],
            },
            6,
        ));
        workout.apply_event(&event(
            WorkoutEventKind::ExerciseAdded {
                exercise_id: "bench".to_owned(),
            },
            7,
        ));

        assert_eq!(workout.exercises.len(), 2);
        assert_eq!(workout.exercises[0].sets[0].reps, 6);
        assert_eq!(workout.exercises[0].sets[0].rir, Some(1));
        assert_eq!(workout.set_count(), 1);
        assert_eq!(workout.updated_at.format("%M").to_string(), "07");

        workout.apply_event(&event(
            WorkoutEventKind::SetDeleted {
                exercise_id: "squat".to_owned(),
                set_index: 0,
            },
            8,
        ));
        workout.apply_event(&event(
            WorkoutEventKind::ExerciseRemoved {
                exercise_id: "bench".to_owned(),
            },
            9,
        ));
        assert_eq!(workout.exercises.len(), 1);
        assert_eq!(workout.set_count(), 0);
    }
}
