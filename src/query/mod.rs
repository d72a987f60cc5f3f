// ABOUTME: Read path for analytics endpoints: caps, parameters, envelopes, and the query service
// ABOUTME: Every endpoint is stateless and read-only
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Limit, window, projection and target enforcement
pub mod caps;
/// `context.coaching.pack`
pub mod coaching;
/// Typed endpoint parameters
pub mod params;
/// Envelope and byte-budget truncation
pub mod response;
/// The query service
pub mod service;
/// `progress.*.summary`
pub mod summaries;

pub use caps::{enforce_query_caps, EnforcedCaps};
pub use coaching::{Adherence, Alert, CoachingPack};
pub use params::{
    parse_params, CoachingPackParams, EventsParams, SeriesParams, SetQueryParams, SnapshotParams,
};
pub use response::{Envelope, ResponseBuilder, ResponseMeta};
pub use service::{ActiveExerciseLite, ActiveSnapshot, QueryService, SeriesView};
pub use summaries::{EntityProgressSummary, ExerciseProgressSummary, ProgressSummary, ProxyTrend};
