// ABOUTME: Immutable per-set fact record derived from a completed working set
// ABOUTME: Includes the typed field allowlist used for projection by the query endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Canonical id → attribution weight in [0, 1]; weights within a map sum to at most 1
pub type ContributionMap = BTreeMap<String, f64>;

/// One completed, non-deleted set. Created once per workout completion, never mutated;
/// reprocessing the same workout overwrites by `set_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetFact {
    /// Deterministic id derived from `(workout_id, exercise_id, set_index)`
    pub set_id: String,
    /// Owner of the workout
    pub user_id: Uuid,
    /// Source workout
    pub workout_id: String,
    /// Catalog exercise id
    pub exercise_id: String,
    /// Display name of the exercise, if known
    pub exercise_name: Option<String>,
    /// Position of the set within its exercise
    pub set_index: u32,
    /// Completion time of the source workout, millisecond precision
    pub workout_end_time: DateTime<Utc>,
    /// Monday of the user-local week
    pub week_start: NaiveDate,
    /// Repetitions performed
    pub reps: i32,
    /// Load in kilograms
    pub weight_kg: f64,
    /// Reps in reserve, clamped to 0-5
    pub rir: Option<i32>,
    /// Warmup set
    pub is_warmup: bool,
    /// Set taken to failure
    pub is_failure: bool,
    /// `reps * weight_kg`
    pub volume: f64,
    /// Estimated one-rep max (Epley), only for 1-12 reps
    pub e1rm: Option<f64>,
    /// Confidence of the e1RM estimate
    pub e1rm_confidence: Option<f64>,
    /// 0, 0.5 or 1.0 depending on proximity to failure
    pub hard_set_credit: f64,
    /// Muscle group attribution
    pub muscle_group_contrib: ContributionMap,
    /// Muscle attribution
    pub muscle_contrib: ContributionMap,
    /// `volume * muscle_group_contrib`
    pub effective_volume_by_group: ContributionMap,
    /// `volume * muscle_contrib`
    pub effective_volume_by_muscle: ContributionMap,
    /// `hard_set_credit * muscle_group_contrib`
    pub hard_set_credit_by_group: ContributionMap,
    /// `hard_set_credit * muscle_contrib`
    pub hard_set_credit_by_muscle: ContributionMap,
    /// Groups with non-zero contribution, for containment filters
    pub muscle_group_keys: Vec<String>,
    /// Muscles with non-zero contribution, for containment filters
    pub muscle_keys: Vec<String>,
}

/// Reps bucket a set falls in, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepsBucket {
    /// 1-5 reps
    #[serde(rename = "1-5")]
    OneToFive,
    /// 6-10 reps
    #[serde(rename = "6-10")]
    SixToTen,
    /// 11-15 reps
    #[serde(rename = "11-15")]
    ElevenToFifteen,
    /// 16-20 reps
    #[serde(rename = "16-20")]
    SixteenToTwenty,
}

impl RepsBucket {
    /// Bucket for a rep count; 0 and >20 reps fall in no bucket
    #[must_use]
    pub const fn for_reps(reps: i32) -> Option<Self> {
        match reps {
            1..=5 => Some(Self::OneToFive),
            6..=10 => Some(Self::SixToTen),
            11..=15 => Some(Self::ElevenToFifteen),
            16..=20 => Some(Self::SixteenToTwenty),
            _ => None,
        }
    }
}

/// Projectable `SetFact` fields. The allowlist is exactly this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetFactField {
    /// `set_id`
    SetId,
    /// `workout_id`
    WorkoutId,
    /// `exercise_id`
    ExerciseId,
    /// `exercise_name`
    ExerciseName,
    /// `set_index`
    SetIndex,
    /// `workout_end_time`
    WorkoutEndTime,
    /// `week_start`
    WeekStart,
    /// `reps`
    Reps,
    /// `weight_kg`
    WeightKg,
    /// `rir`
    Rir,
    /// `is_warmup`
    IsWarmup,
    /// `is_failure`
    IsFailure,
    /// `volume`
    Volume,
    /// `e1rm`
    E1rm,
    /// `e1rm_confidence`
    E1rmConfidence,
    /// `hard_set_credit`
    HardSetCredit,
    /// `muscle_group_contrib`
    MuscleGroupContrib,
    /// `muscle_contrib`
    MuscleContrib,
    /// `effective_volume_by_group`
    EffectiveVolumeByGroup,
    /// `effective_volume_by_muscle`
    EffectiveVolumeByMuscle,
    /// `hard_set_credit_by_group`
    HardSetCreditByGroup,
    /// `hard_set_credit_by_muscle`
    HardSetCreditByMuscle,
    /// `muscle_group_keys`
    MuscleGroupKeys,
    /// `muscle_keys`
    MuscleKeys,
}

impl SetFactField {
    /// Every allow-listed field
    pub const ALL: [Self; 24] = [
        Self::SetId,
        Self::WorkoutId,
        Self::ExerciseId,
        Self::ExerciseName,
        Self::SetIndex,
        Self::WorkoutEndTime,
        Self::WeekStart,
        Self::Reps,
        Self::WeightKg,
        Self::Rir,
        Self::IsWarmup,
        Self::IsFailure,
        Self::Volume,
        Self::E1rm,
        Self::E1rmConfidence,
        Self::HardSetCredit,
        Self::MuscleGroupContrib,
        Self::MuscleContrib,
        Self::EffectiveVolumeByGroup,
        Self::EffectiveVolumeByMuscle,
        Self::HardSetCreditByGroup,
        Self::HardSetCreditByMuscle,
        Self::MuscleGroupKeys,
        Self::MuscleKeys,
    ];

    /// Projection used when a request does not name any fields
    pub const DEFAULT: [Self; 10] = [
        Self::SetId,
        Self::WorkoutEndTime,
        Self::ExerciseId,
        Self::SetIndex,
        Self::Reps,
        Self::WeightKg,
        Self::Rir,
        Self::IsFailure,
        Self::E1rm,
        Self::HardSetCredit,
    ];

    /// Field name on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SetId => "set_id",
            Self::WorkoutId => "workout_id",
            Self::ExerciseId => "exercise_id",
            Self::ExerciseName => "exercise_name",
            Self::SetIndex => "set_index",
            Self::WorkoutEndTime => "workout_end_time",
            Self::WeekStart => "week_start",
            Self::Reps => "reps",
            Self::WeightKg => "weight_kg",
            Self::Rir => "rir",
            Self::IsWarmup => "is_warmup",
            Self::IsFailure => "is_failure",
            Self::Volume => "volume",
            Self::E1rm => "e1rm",
            Self::E1rmConfidence => "e1rm_confidence",
            Self::HardSetCredit => "hard_set_credit",
            Self::MuscleGroupContrib => "muscle_group_contrib",
            Self::MuscleContrib => "muscle_contrib",
            Self::EffectiveVolumeByGroup => "effective_volume_by_group",
            Self::EffectiveVolumeByMuscle => "effective_volume_by_muscle",
            Self::HardSetCreditByGroup => "hard_set_credit_by_group",
            Self::HardSetCreditByMuscle => "hard_set_credit_by_muscle",
            Self::MuscleGroupKeys => "muscle_group_keys",
            Self::MuscleKeys => "muscle_keys",
        }
    }

    /// Look up a field by wire name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Value of this field on a fact
    #[must_use]
    pub fn value_of(self, fact: &SetFact) -> Value {
        match self {
            Self::SetId => json!(fact.set_id),
            Self::WorkoutId => json!(fact.workout_id),
            Self::ExerciseId => json!(fact.exercise_id),
            Self::ExerciseName => json!(fact.exercise_name),
            Self::SetIndex => json!(fact.set_index),
            Self::WorkoutEndTime => json!(fact.workout_end_time),
            Self::WeekStart => json!(fact.week_start),
            Self::Reps => json!(fact.reps),
            Self::WeightKg => json!(fact.weight_kg),
            Self::Rir => json!(fact.rir),
            Self::IsWarmup => json!(fact.is_warmup),
            Self::IsFailure => json!(fact.is_failure),
            Self::Volume => json!(fact.volume),
            Self::E1rm => json!(fact.e1rm),
            Self::E1rmConfidence => json!(fact.e1rm_confidence),
            Self::HardSetCredit => json!(fact.hard_set_credit),
            Self::MuscleGroupContrib => json!(fact.muscle_group_contrib),
            Self::MuscleContrib => json!(fact.muscle_contrib),
            Self::EffectiveVolumeByGroup => json!(fact.effective_volume_by_group),
            Self::EffectiveVolumeByMuscle => json!(fact.effective_volume_by_muscle),
            Self::HardSetCreditByGroup => json!(fact.hard_set_credit_by_group),
            Self::HardSetCreditByMuscle => json!(fact.hard_set_credit_by_muscle),
            Self::MuscleGroupKeys => json!(fact.muscle_group_keys),
            Self::MuscleKeys => json!(fact.muscle_keys),
        }
    }
}

impl SetFact {
    /// Project this fact onto the given fields, in the order given
    #[must_use]
    pub fn project(&self, fields: &[SetFactField]) -> Value {
        let map = fields
            .iter()
            .map(|f| (f.as_str().to_owned(), f.value_of(self)))
            .collect::<serde_json::Map<String, Value>>();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reps_bucket_edges() {
        assert_eq!(RepsBucket::for_reps(0), None);
        assert_eq!(RepsBucket::for_reps(1), Some(RepsBucket::OneToFive));
        assert_eq!(RepsBucket::for_reps(10), Some(RepsBucket::SixToTen));
        assert_eq!(RepsBucket::for_reps(11), Some(RepsBucket::ElevenToFifteen));
        assert_eq!(RepsBucket::for_reps(20), Some(RepsBucket::SixteenToTwenty));
        assert_eq!(RepsBucket::for_reps(21), None);
    }

    #[test]
    fn test_field_names_round_trip_through_serde() {
        for field in SetFactField::ALL {
            let json = serde_json::to_value(field).unwrap();
            assert_eq!(json, Value::String(field.as_str().to_owned()));
            assert_eq!(SetFactField::parse(field.as_str()), Some(field));
        }
        assert_eq!(SetFactField::parse("password"), None);
    }
}
