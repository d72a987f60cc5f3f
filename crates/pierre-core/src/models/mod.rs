// ABOUTME: Core data models for the training analytics pipeline
// ABOUTME: Re-exports workout inputs, set facts, weekly series, and active-workout types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! - `CompletedWorkout`: input document from the workout-logging system
//! - `SetFact`: one immutable derived record per qualifying set
//! - `WeeklyPoint` / `SeriesDocument`: mergeable weekly aggregates per entity
//! - `ActiveWorkout` / `WorkoutEvent`: in-progress session state and its event log

mod active;
mod series;
mod set_fact;
mod workout;

pub use active::{ActiveExercise, ActiveSet, ActiveWorkout, SetPatch, WorkoutEvent, WorkoutEventKind};
pub use series::{
    max_option, RepsBuckets, SeriesDocument, SeriesKind, SeriesSummary, WeeklyPoint,
    WeeklyPointView,
};
pub use set_fact::{ContributionMap, RepsBucket, SetFact, SetFactField};
pub use workout::{week_start_for, CompletedWorkout, LoggedSet, WorkoutExercise};
