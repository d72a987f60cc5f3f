// ABOUTME: Training intelligence algorithms for the analytics pipeline
// ABOUTME: Muscle taxonomy, set-fact derivation, and read-time progress flags
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Intelligence
//!
//! Pure, I/O-free algorithms. Storage and scheduling live in the main crate; everything
//! here is deterministic given its inputs.

/// Canonical muscles, muscle groups, and alias normalization
pub mod taxonomy;

/// Set-fact derivation (volume, e1RM, hard-set credit, attribution)
pub mod set_facts;

/// Plateau, deload, and overreach detection over weekly series
pub mod progress;

pub use progress::{E1rmTrend, ProgressAnalyzer, ProgressFlags, RepRangeMix};
pub use set_facts::{
    ExerciseAttribution, ResolvedAttribution, SetFactError, SetFactGenerator, WorkoutFacts,
};
pub use taxonomy::{MuscleTaxonomy, Resolved};
