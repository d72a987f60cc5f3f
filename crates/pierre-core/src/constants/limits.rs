// ABOUTME: Hard caps shared by every analytics read endpoint and the series writer
// ABOUTME: Limits, projection, window sizes, filter cardinality, and byte budgets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Hard caps for query endpoints and series retention.

/// Default page size when a request omits `limit`
pub const DEFAULT_LIMIT: usize = 50;

/// Maximum page size; larger requests are clamped, never rejected
pub const MAX_LIMIT: usize = 200;

/// Maximum number of projected fields per request
pub const MAX_FIELDS: usize = 20;

/// Default series window when a request omits `window_weeks`
pub const DEFAULT_WINDOW_WEEKS: u32 = 12;

/// Maximum series window; also the retention cap of a series document
pub const MAX_WINDOW_WEEKS: u32 = 52;

/// Weekly points retained per series document
pub const MAX_SERIES_WEEKS: usize = 52;

/// Maximum `exercise_ids` in a single filter; more is a validation error
pub const MAX_EXERCISE_IDS: usize = 10;

/// Byte budget for raw paginated queries (`sets.query`, `active.events.list`)
pub const MAX_RAW_RESPONSE_BYTES: usize = 32 * 1024;

/// Byte budget target for summaries, snapshots, and the coaching pack
pub const MAX_SUMMARY_RESPONSE_BYTES: usize = 15 * 1024;

/// Default coaching pack window
pub const COACHING_PACK_WINDOW_WEEKS: u32 = 4;

/// Fixed list sizes the coaching pack steps down through when over budget
pub const COACHING_PACK_TRIM_STEPS: [usize; 4] = [8, 5, 3, 1];

/// Maximum alerts included in the coaching pack before trimming
pub const COACHING_PACK_MAX_ALERTS: usize = 10;

/// Top exercises shown in a muscle group / muscle summary
pub const SUMMARY_TOP_EXERCISES: usize = 5;

/// Proxy exercise trends shown in a muscle group / muscle summary
pub const SUMMARY_PROXY_TRENDS: usize = 3;
