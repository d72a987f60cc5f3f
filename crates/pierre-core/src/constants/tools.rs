// ABOUTME: Tool identifiers for the analytics read endpoints
// ABOUTME: Names are the public contract consumed by the coaching agent
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Tool name constants

/// Raw set-fact query
pub const SETS_QUERY: &str = "sets.query";
/// Exercise weekly series
pub const SERIES_EXERCISE_GET: &str = "series.exercise.get";
/// Muscle group weekly series
pub const SERIES_MUSCLE_GROUP_GET: &str = "series.muscle_group.get";
/// Muscle weekly series
pub const SERIES_MUSCLE_GET: &str = "series.muscle.get";
/// Exercise progress summary
pub const PROGRESS_EXERCISE_SUMMARY: &str = "progress.exercise.summary";
/// Muscle group progress summary
pub const PROGRESS_MUSCLE_GROUP_SUMMARY: &str = "progress.muscle_group.summary";
/// Muscle progress summary
pub const PROGRESS_MUSCLE_SUMMARY: &str = "progress.muscle.summary";
/// Fixed-shape coaching snapshot, the agent's first call
pub const CONTEXT_COACHING_PACK: &str = "context.coaching.pack";
/// Minimal current-workout state
pub const ACTIVE_SNAPSHOT_LITE: &str = "active.snapshotLite";
/// Paginated event log of a workout
pub const ACTIVE_EVENTS_LIST: &str = "active.events.list";
