// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Query caps, byte budgets, aggregation limits, and tool identifiers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.
//! `limits` is the single source of truth for every cap enforced by the read endpoints.

/// Query caps, response byte budgets, and series retention limits
pub mod limits;
/// Tool identifiers exposed to the coaching agent
pub mod tools;
/// Derivation thresholds for set facts and progress flags
pub mod training;

pub use tools::*;

/// Service names used in structured logs and health output
pub mod service_names {
    /// Analytics service
    pub const PIERRE_TRAINING_ANALYTICS: &str = "pierre-training-analytics";
    /// Aggregation worker
    pub const AGGREGATION_WORKER: &str = "aggregation-worker";
    /// Backfill job
    pub const BACKFILL: &str = "backfill";
}
