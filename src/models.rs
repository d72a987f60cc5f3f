// ABOUTME: Re-exports the analytics data models from pierre-core
// ABOUTME: Completed workouts, set facts, weekly series, and active-workout events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use pierre_core::models::*;
