// ABOUTME: Module containing all analytics tool implementations organized by category.
// ABOUTME: Each submodule exposes a create_*_tools function used by the registry.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Tool Implementations
//!
//! - `sets` - raw set facts (`sets.query`)
//! - `series` - weekly series documents (`series.*.get`)
//! - `progress` - progress summaries (`progress.*.summary`)
//! - `coaching` - the coaching pack (`context.coaching.pack`)
//! - `active` - in-progress workouts (`active.snapshotLite`, `active.events.list`)

/// `active.*` tools
pub mod active;
/// `context.coaching.pack`
pub mod coaching;
/// `progress.*.summary` tools
pub mod progress;
/// `series.*.get` tools
pub mod series;
/// `sets.query`
pub mod sets;

pub use active::create_active_tools;
pub use coaching::create_coaching_tools;
pub use progress::create_progress_tools;
pub use series::create_series_tools;
pub use sets::create_sets_tools;
