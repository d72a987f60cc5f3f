// ABOUTME: Numeric thresholds for set-fact derivation and progress flag detection
// ABOUTME: Keeps e1RM, hard-set, and plateau/deload/overreach rules in one place
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Training derivation constants

/// Highest rep count for which an e1RM is estimated
pub const E1RM_MAX_REPS: i32 = 12;

/// Epley divisor: `e1rm = weight * (1 + reps / 30)`
pub const EPLEY_DIVISOR: f64 = 30.0;

/// RIR values above this are clamped
pub const RIR_MAX: i32 = 5;

/// Share of attribution given to primary muscles when the catalog omits weights
pub const DEFAULT_PRIMARY_SHARE: f64 = 0.7;

/// Share of attribution given to secondary muscles when the catalog omits weights
pub const DEFAULT_SECONDARY_SHARE: f64 = 0.3;

/// Weeks examined by the plateau flag
pub const PLATEAU_WEEKS: usize = 4;

/// Maximum relative deviation of weekly e1RM from its mean for a plateau
pub const PLATEAU_E1RM_TOLERANCE: f64 = 0.025;

/// Maximum relative deviation of weekly volume from its mean for a plateau
pub const PLATEAU_VOLUME_TOLERANCE: f64 = 0.10;

/// Volume drop versus the prior week that marks a deload
pub const DELOAD_VOLUME_DROP: f64 = 0.40;

/// Failure rate above which a week counts toward overreach
pub const OVERREACH_FAILURE_RATE: f64 = 0.35;

/// Derived average RIR at or below which a week counts toward overreach
pub const OVERREACH_MAX_AVG_RIR: f64 = 1.0;

/// Consecutive weekly volume increases required for overreach
pub const OVERREACH_RISING_WEEKS: usize = 2;
