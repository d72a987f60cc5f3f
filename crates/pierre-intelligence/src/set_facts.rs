// ABOUTME: Set-fact derivation from completed workouts and catalog attribution weights
// ABOUTME: Computes volume, e1RM, confidence, hard-set credit, and muscle attribution maps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Set Fact Generator
//!
//! Pure derivation of one [`SetFact`] per qualifying set. The generator holds only the
//! immutable [`MuscleTaxonomy`]; catalog attribution is passed in per exercise, so the
//! same input always produces the same facts and the same `set_id`s.

use std::collections::{BTreeMap, HashMap};

use chrono::SubsecRound;
use pierre_core::constants::training::{
    DEFAULT_PRIMARY_SHARE, DEFAULT_SECONDARY_SHARE, E1RM_MAX_REPS, EPLEY_DIVISOR, RIR_MAX,
};
use pierre_core::errors::AppError;
use pierre_core::models::{
    CompletedWorkout, ContributionMap, LoggedSet, SetFact, WorkoutExercise,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use crate::taxonomy::{MuscleTaxonomy, Resolved};

/// Field separator used when hashing set identity
const SET_ID_SEPARATOR: u8 = 0x1f;

/// Hex characters kept from the SHA-256 digest
const SET_ID_HEX_LEN: usize = 32;

/// Hard-set credit given to a working set with no RIR rating and no failure flag
const UNRATED_HARD_SET_CREDIT: f64 = 0.5;

/// Catalog attribution for one exercise
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseAttribution {
    /// Primary movers, free-form names
    #[serde(default)]
    pub primary: Vec<String>,
    /// Secondary movers, free-form names
    #[serde(default)]
    pub secondary: Vec<String>,
    /// Explicit per-name weights overriding the default shares
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

/// Attribution resolved against the taxonomy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedAttribution {
    /// Canonical group -> weight
    pub muscle_group: ContributionMap,
    /// Canonical muscle -> weight
    pub muscle: ContributionMap,
}

/// Reasons a set cannot become a fact
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetFactError {
    /// `weight_kg < 0`
    #[error("set {set_index} of {exercise_id} has negative weight {weight_kg}")]
    NegativeWeight {
        /// Exercise of the rejected set
        exercise_id: String,
        /// Position of the rejected set
        set_index: u32,
        /// Offending value
        weight_kg: f64,
    },
    /// `weight_kg` is NaN or infinite
    #[error("set {set_index} of {exercise_id} has non-finite weight")]
    NonFiniteWeight {
        /// Exercise of the rejected set
        exercise_id: String,
        /// Position of the rejected set
        set_index: u32,
    },
    /// `reps < 0`
    #[error("set {set_index} of {exercise_id} has negative reps {reps}")]
    NegativeReps {
        /// Exercise of the rejected set
        exercise_id: String,
        /// Position of the rejected set
        set_index: u32,
        /// Offending value
        reps: i32,
    },
    /// `rir < 0`
    #[error("set {set_index} of {exercise_id} has negative rir {rir}")]
    NegativeRir {
        /// Exercise of the rejected set
        exercise_id: String,
        /// Position of the rejected set
        set_index: u32,
        /// Offending value
        rir: i32,
    },
}

impl From<SetFactError> for AppError {
    fn from(error: SetFactError) -> Self {
        Self::validation(error.to_string())
    }
}

/// Facts derived from one workout, plus the sets that were rejected
#[derive(Debug, Clone, Default)]
pub struct WorkoutFacts {
    /// One fact per qualifying set, in workout order
    pub facts: Vec<SetFact>,
    /// Validation rejections; the remaining sets still produce facts
    pub rejected: Vec<SetFactError>,
    /// Sets skipped because they were incomplete or deleted
    pub skipped: usize,
}

/// Deterministic set id: first 32 hex chars of `sha256(workout_id \x1f exercise_id \x1f set_index)`
#[must_use]
pub fn set_id(workout_id: &str, exercise_id: &str, set_index: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(workout_id.as_bytes());
    hasher.update([SET_ID_SEPARATOR]);
    hasher.update(exercise_id.as_bytes());
    hasher.update([SET_ID_SEPARATOR]);
    hasher.update(set_index.to_string().as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(SET_ID_HEX_LEN);
    id
}

/// Epley e1RM for 1-12 reps at a positive load
#[must_use]
pub fn estimate_e1rm(reps: i32, weight_kg: f64) -> Option<f64> {
    ((1..=E1RM_MAX_REPS).contains(&reps) && weight_kg > 0.0)
        .then(|| weight_kg * (1.0 + f64::from(reps) / EPLEY_DIVISOR))
}

/// Confidence of an e1RM estimate by rep count
#[must_use]
pub fn e1rm_confidence(reps: i32) -> Option<f64> {
    match reps {
        1 => Some(1.00),
        2..=3 => Some(0.95),
        4..=6 => Some(0.90),
        7..=10 => Some(0.80),
        11..=12 => Some(0.70),
        _ => None,
    }
}

/// Credit toward effective training stress.
///
/// Warmups never count. Failure or RIR 0-2 count fully, RIR 3-4 count half,
/// RIR 5 counts nothing. A working set logged without RIR counts half.
#[must_use]
pub fn hard_set_credit(is_warmup: bool, is_failure: bool, rir: Option<i32>) -> f64 {
    if is_warmup {
        return 0.0;
    }
    if is_failure {
        return 1.0;
    }
    match rir {
        Some(0..=2) => 1.0,
        Some(3..=4) => 0.5,
        Some(_) => 0.0,
        None => UNRATED_HARD_SET_CREDIT,
    }
}

/// Derives set facts from completed workouts
#[derive(Debug, Clone, Copy)]
pub struct SetFactGenerator<'a> {
    taxonomy: &'a MuscleTaxonomy,
}

impl<'a> SetFactGenerator<'a> {
    /// Create a generator over an immutable taxonomy
    #[must_use]
    pub const fn new(taxonomy: &'a MuscleTaxonomy) -> Self {
        Self { taxonomy }
    }

    /// Derive facts for every qualifying set in a workout.
    ///
    /// Exercises missing from `attributions` get empty attribution maps.
    #[must_use]
    pub fn derive_workout(
        &self,
        workout: &CompletedWorkout,
        attributions: &HashMap<String, ExerciseAttribution>,
    ) -> WorkoutFacts {
        let mut result = WorkoutFacts::default();

        for exercise in &workout.exercises {
            let resolved = self.resolve_attribution(
                &exercise.exercise_id,
                attributions.get(&exercise.exercise_id),
            );
            for set in &exercise.sets {
                if !set.qualifies() {
                    result.skipped += 1;
                    continue;
                }
                match self.derive_set(workout, exercise, set, &resolved) {
                    Ok(fact) => result.facts.push(fact),
                    Err(error) => {
                        warn!(
                            workout_id = %workout.workout_id,
                            exercise_id = %exercise.exercise_id,
                            set_index = set.set_index,
                            %error,
                            "Rejected set during fact derivation"
                        );
                        result.rejected.push(error);
                    }
                }
            }
        }

        result
    }

    /// Derive one fact from a qualifying set
    ///
    /// # Errors
    ///
    /// Returns [`SetFactError`] for negative or non-finite weight, negative reps,
    /// or negative RIR.
    pub fn derive_set(
        &self,
        workout: &CompletedWorkout,
        exercise: &WorkoutExercise,
        set: &LoggedSet,
        attribution: &ResolvedAttribution,
    ) -> Result<SetFact, SetFactError> {
        validate_set(&exercise.exercise_id, set)?;
        let rir = set.rir.map(|rir| rir.min(RIR_MAX));

        let volume = f64::from(set.reps) * set.weight_kg;
        let e1rm = estimate_e1rm(set.reps, set.weight_kg);
        let e1rm_confidence = e1rm.and_then(|_| e1rm_confidence(set.reps));
        let credit = hard_set_credit(set.is_warmup, set.is_failure, rir);

        let muscle_group_contrib = attribution.muscle_group.clone();
        let muscle_contrib = attribution.muscle.clone();

        Ok(SetFact {
            set_id: set_id(&workout.workout_id, &exercise.exercise_id, set.set_index),
            user_id: workout.user_id,
            workout_id: workout.workout_id.clone(),
            exercise_id: exercise.exercise_id.clone(),
            exercise_name: exercise.name.clone(),
            set_index: set.set_index,
            workout_end_time: workout.end_time.trunc_subsecs(3),
            week_start: workout.week_start(),
            reps: set.reps,
            weight_kg: set.weight_kg,
            rir,
            is_warmup: set.is_warmup,
            is_failure: set.is_failure,
            volume,
            e1rm,
            e1rm_confidence,
            hard_set_credit: credit,
            effective_volume_by_group: scale(&muscle_group_contrib, volume),
            effective_volume_by_muscle: scale(&muscle_contrib, volume),
            hard_set_credit_by_group: scale(&muscle_group_contrib, credit),
            hard_set_credit_by_muscle: scale(&muscle_contrib, credit),
            muscle_group_keys: nonzero_keys(&muscle_group_contrib),
            muscle_keys: nonzero_keys(&muscle_contrib),
            muscle_group_contrib,
            muscle_contrib,
        })
    }

    /// Resolve catalog names to canonical attribution maps.
    ///
    /// Unresolved names are logged and dropped. Weights are clamped to [0, 1] and the
    /// combined map is scaled down if it sums above 1.
    #[must_use]
    pub fn resolve_attribution(
        &self,
        exercise_id: &str,
        attribution: Option<&ExerciseAttribution>,
    ) -> ResolvedAttribution {
        let Some(attribution) = attribution else {
            return ResolvedAttribution::default();
        };

        let mut muscle = ContributionMap::new();
        let mut group_level = ContributionMap::new();

        for (name, weight) in listed_weights(attribution) {
            match self.taxonomy.resolve(&name) {
                Some(Resolved::Muscle { muscle: id, .. }) => {
                    *muscle.entry(id).or_insert(0.0) += weight;
                }
                Some(Resolved::Group { group }) => {
                    *group_level.entry(group).or_insert(0.0) += weight;
                }
                None => {
                    warn!(exercise_id, muscle = %name, "Unresolved muscle name dropped from attribution");
                }
            }
        }

        let total: f64 = muscle.values().chain(group_level.values()).sum();
        if total > 1.0 {
            for weight in muscle.values_mut().chain(group_level.values_mut()) {
                *weight /= total;
            }
        }

        let mut muscle_group = group_level;
        for (id, weight) in &muscle {
            if let Some(group) = self.taxonomy.group_of(id) {
                *muscle_group.entry(group.to_owned()).or_insert(0.0) += weight;
            }
        }

        muscle.retain(|_, w| *w > 0.0);
        muscle_group.retain(|_, w| *w > 0.0);
        ResolvedAttribution {
            muscle_group,
            muscle,
        }
    }
}

fn validate_set(exercise_id: &str, set: &LoggedSet) -> Result<(), SetFactError> {
    if !set.weight_kg.is_finite() {
        return Err(SetFactError::NonFiniteWeight {
            exercise_id: exercise_id.to_owned(),
            set_index: set.set_index,
        });
    }
    if set.weight_kg < 0.0 {
        return Err(SetFactError::NegativeWeight {
            exercise_id: exercise_id.to_owned(),
            set_index: set.set_index,
            weight_kg: set.weight_kg,
        });
    }
    if set.reps < 0 {
        return Err(SetFactError::NegativeReps {
            exercise_id: exercise_id.to_owned(),
            set_index: set.set_index,
            reps: set.reps,
        });
    }
    if let Some(rir) = set.rir.filter(|rir| *rir < 0) {
        return Err(SetFactError::NegativeRir {
            exercise_id: exercise_id.to_owned(),
            set_index: set.set_index,
            rir,
        });
    }
    Ok(())
}

/// `(name, weight)` for every name the catalog lists, with default shares filled in
#[allow(clippy::cast_precision_loss)]
fn listed_weights(attribution: &ExerciseAttribution) -> Vec<(String, f64)> {
    let primary_share = if attribution.secondary.is_empty() {
        1.0
    } else {
        DEFAULT_PRIMARY_SHARE
    };
    let primary_default = primary_share / attribution.primary.len().max(1) as f64;
    let secondary_default = DEFAULT_SECONDARY_SHARE / attribution.secondary.len().max(1) as f64;

    let explicit = |name: &String, default: f64| {
        let weight = attribution.weights.get(name).copied().unwrap_or(default);
        if weight.is_finite() {
            weight.clamp(0.0, 1.0)
        } else {
            0.0
        }
    };

    let mut weights: Vec<(String, f64)> = attribution
        .primary
        .iter()
        .map(|name| (name.clone(), explicit(name, primary_default)))
        .chain(
            attribution
                .secondary
                .iter()
                .map(|name| (name.clone(), explicit(name, secondary_default))),
        )
        .collect();

    // Weighted names that appear in neither list still count
    for name in attribution.weights.keys() {
        if !attribution.primary.contains(name) && !attribution.secondary.contains(name) {
            weights.push((name.clone(), explicit(name, 0.0)));
        }
    }
    weights
}

fn scale(contrib: &ContributionMap, factor: f64) -> ContributionMap {
    contrib
        .iter()
        .map(|(id, weight)| (id.clone(), weight * factor))
        .collect()
}

fn nonzero_keys(contrib: &ContributionMap) -> Vec<String> {
    contrib
        .iter()
        .filter(|(_, weight)| **weight > 0.0)
        .map(|(id, _)| id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    const EPSILON: f64 = 1e-9;

    fn set(set_index: u32, reps: i32, weight_kg: f64, rir: Option<i32>) -> LoggedSet {
        LoggedSet {
            set_index,
            reps,
            weight_kg,
            rir,
            is_warmup: false,
            is_failure: false,
            completed: true,
            deleted: false,
        }
    }

    fn workout(sets: Vec<LoggedSet>) -> CompletedWorkout {
        CompletedWorkout {
            workout_id: "w-1".to_owned(),
            user_id: Uuid::nil(),
            end_time: Utc.with_ymd_and_hms(2024, 3, 14, 18, 30, 0).unwrap(),
            utc_offset_minutes: 0,
            exercises: vec![WorkoutExercise {
                exercise_id: "bench_press".to_owned(),
                name: Some("Bench Press".to_owned()),
                sets,
            }],
        }
    }

    fn bench_attribution() -> ExerciseAttribution {
        ExerciseAttribution {
            primary: vec!["pecs".to_owned()],
            secondary: vec!["triceps".to_owned(), "front delts".to_owned()],
            weights: BTreeMap::new(),
        }
    }

    fn derive_one(logged: LoggedSet) -> Result<SetFact, SetFactError> {
        let taxonomy = MuscleTaxonomy::standard();
        let generator = SetFactGenerator::new(&taxonomy);
        let workout = workout(vec![logged]);
        let resolved = generator.resolve_attribution("bench_press", Some(&bench_attribution()));
        generator.derive_set(&workout, &workout.exercises[0], &workout.exercises[0].sets[0], &resolved)
    }

    #[test]
    fn test_ten_reps_at_100kg() {
        let fact = derive_one(set(0, 10, 100.0, Some(2))).unwrap();
        assert!((fact.volume - 1000.0).abs() < EPSILON);
        assert!((fact.e1rm.unwrap() - 133.333_333_333).abs() < 1e-6);
        assert_eq!(fact.e1rm_confidence, Some(0.80));
    }

    #[test]
    fn test_fifteen_reps_has_no_e1rm() {
        let fact = derive_one(set(0, 15, 60.0, None)).unwrap();
        assert_eq!(fact.e1rm, None);
        assert_eq!(fact.e1rm_confidence, None);
        assert!((fact.volume - 900.0).abs() < EPSILON);
    }

    #[test]
    fn test_e1rm_formula_for_all_valid_rep_counts() {
        for reps in 1..=12 {
            let e1rm = estimate_e1rm(reps, 80.0).unwrap();
            let expected = 80.0 * (1.0 + f64::from(reps) / 30.0);
            assert!((e1rm - expected).abs() < EPSILON);
        }
        assert_eq!(estimate_e1rm(13, 80.0), None);
        assert_eq!(estimate_e1rm(0, 80.0), None);
        assert_eq!(estimate_e1rm(5, 0.0), None);
    }

    #[test]
    fn test_confidence_table() {
        assert_eq!(e1rm_confidence(1), Some(1.00));
        assert_eq!(e1rm_confidence(3), Some(0.95));
        assert_eq!(e1rm_confidence(6), Some(0.90));
        assert_eq!(e1rm_confidence(10), Some(0.80));
        assert_eq!(e1rm_confidence(12), Some(0.70));
        assert_eq!(e1rm_confidence(13), None);
    }

    #[test]
    fn test_hard_set_credit_rules() {
        assert!((hard_set_credit(true, true, Some(0))).abs() < EPSILON);
        assert!((hard_set_credit(true, false, Some(1))).abs() < EPSILON);
        for rir in 0..=2 {
            assert!((hard_set_credit(false, false, Some(rir)) - 1.0).abs() < EPSILON);
        }
        assert!((hard_set_credit(false, false, Some(3)) - 0.5).abs() < EPSILON);
        assert!((hard_set_credit(false, false, Some(4)) - 0.5).abs() < EPSILON);
        assert!((hard_set_credit(false, false, Some(5))).abs() < EPSILON);
        assert!((hard_set_credit(false, true, Some(5)) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_unrated_working_set_earns_half_credit() {
        assert!((hard_set_credit(false, false, None) - 0.5).abs() < EPSILON);
        assert!((hard_set_credit(false, true, None) - 1.0).abs() < EPSILON);
        assert!(hard_set_credit(true, false, None).abs() < EPSILON);
    }

    #[test]
    fn test_warmup_with_low_rir_earns_no_credit() {
        let mut warmup = set(0, 8, 40.0, Some(1));
        warmup.is_warmup = true;
        let fact = derive_one(warmup).unwrap();
        assert!(fact.hard_set_credit.abs() < EPSILON);
        assert!(fact.hard_set_credit_by_muscle.values().all(|v| v.abs() < EPSILON));
    }

    #[test]
    fn test_set_id_is_deterministic() {
        let a = derive_one(set(2, 5, 100.0, Some(1))).unwrap();
        let b = derive_one(set(2, 5, 100.0, Some(1))).unwrap();
        assert_eq!(a.set_id, b.set_id);
        assert_eq!(a.set_id.len(), 32);
        assert_ne!(a.set_id, set_id("w-1", "bench_press", 3));
        // The separator keeps ("ab", "c") distinct from ("a", "bc")
        assert_ne!(set_id("ab", "c", 0), set_id("a", "bc", 0));
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            derive_one(set(0, 5, -1.0, None)),
            Err(SetFactError::NegativeWeight { .. })
        ));
        assert!(matches!(
            derive_one(set(0, -3, 50.0, None)),
            Err(SetFactError::NegativeReps { .. })
        ));
        assert!(matches!(
            derive_one(set(0, 5, 50.0, Some(-1))),
            Err(SetFactError::NegativeRir { .. })
        ));
        assert!(matches!(
            derive_one(set(0, 5, f64::INFINITY, None)),
            Err(SetFactError::NonFiniteWeight { .. })
        ));
    }

    #[test]
    fn test_rir_above_five_is_clamped() {
        let fact = derive_one(set(0, 5, 50.0, Some(8))).unwrap();
        assert_eq!(fact.rir, Some(5));
        assert!(fact.hard_set_credit.abs() < EPSILON);
    }

    #[test]
    fn test_default_shares_and_group_rollup() {
        let taxonomy = MuscleTaxonomy::standard();
        let generator = SetFactGenerator::new(&taxonomy);
        let resolved = generator.resolve_attribution("bench_press", Some(&bench_attribution()));

        assert!((resolved.muscle["pectoralis_major"] - 0.7).abs() < EPSILON);
        assert!((resolved.muscle["triceps"] - 0.15).abs() < EPSILON);
        assert!((resolved.muscle["anterior_deltoid"] - 0.15).abs() < EPSILON);
        assert!((resolved.muscle_group["chest"] - 0.7).abs() < EPSILON);
        assert!((resolved.muscle_group["arms"] - 0.15).abs() < EPSILON);
        assert!((resolved.muscle_group["shoulders"] - 0.15).abs() < EPSILON);
        assert!(resolved.muscle_group.values().sum::<f64>() <= 1.0 + EPSILON);
    }

    #[test]
    fn test_unknown_muscles_dropped_and_group_names_stay_group_level() {
        let taxonomy = MuscleTaxonomy::standard();
        let generator = SetFactGenerator::new(&taxonomy);
        let attribution = ExerciseAttribution {
            primary: vec!["back".to_owned(), "spleen".to_owned()],
            secondary: vec![],
            weights: BTreeMap::new(),
        };
        let resolved = generator.resolve_attribution("row", Some(&attribution));

        assert!(resolved.muscle.is_empty());
        assert_eq!(resolved.muscle_group.keys().collect::<Vec<_>>(), vec!["back"]);
        assert!((resolved.muscle_group["back"] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_oversized_explicit_weights_are_scaled() {
        let taxonomy = MuscleTaxonomy::standard();
        let generator = SetFactGenerator::new(&taxonomy);
        let attribution = ExerciseAttribution {
            primary: vec!["quads".to_owned(), "glutes".to_owned()],
            secondary: vec![],
            weights: BTreeMap::from([("quads".to_owned(), 3.0), ("glutes".to_owned(), 1.0)]),
        };
        let resolved = generator.resolve_attribution("squat", Some(&attribution));

        // quads clamped to 1.0, then both scaled so the map sums to 1
        assert!((resolved.muscle["quadriceps"] - 0.5).abs() < EPSILON);
        assert!((resolved.muscle["glutes"] - 0.5).abs() < EPSILON);
        assert!((resolved.muscle_group["legs"] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_missing_catalog_entry_gives_empty_attribution() {
        let taxonomy = MuscleTaxonomy::standard();
        let generator = SetFactGenerator::new(&taxonomy);
        let facts = generator.derive_workout(&workout(vec![set(0, 5, 100.0, Some(2))]), &HashMap::new());

        assert_eq!(facts.facts.len(), 1);
        let fact = &facts.facts[0];
        assert!(fact.muscle_contrib.is_empty());
        assert!(fact.muscle_group_keys.is_empty());
        assert!((fact.hard_set_credit - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_workout_skips_incomplete_and_collects_rejections() {
        let taxonomy = MuscleTaxonomy::standard();
        let generator = SetFactGenerator::new(&taxonomy);
        let mut deleted = set(1, 5, 100.0, None);
        deleted.deleted = true;
        let mut incomplete = set(2, 5, 100.0, None);
        incomplete.completed = false;
        let bad = set(3, -1, 100.0, None);

        let attributions = HashMap::from([("bench_press".to_owned(), bench_attribution())]);
        let facts = generator.derive_workout(
            &workout(vec![set(0, 5, 100.0, Some(1)), deleted, incomplete, bad]),
            &attributions,
        );

        assert_eq!(facts.facts.len(), 1);
        assert_eq!(facts.skipped, 2);
        assert_eq!(facts.rejected.len(), 1);

        let fact = &facts.facts[0];
        assert!((fact.effective_volume_by_muscle["pectoralis_major"] - 350.0).abs() < 1e-6);
        assert!((fact.hard_set_credit_by_group["chest"] - 0.7).abs() < EPSILON);
        assert_eq!(fact.muscle_group_keys, vec!["arms", "chest", "shoulders"]);
        assert_eq!(fact.week_start.to_string(), "2024-03-11");
    }
}
