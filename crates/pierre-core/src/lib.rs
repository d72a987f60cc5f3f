// ABOUTME: Core types and constants for the Pierre training analytics platform
// ABOUTME: Foundation crate with error handling, pagination, models, and query caps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Core
//!
//! Foundation crate providing shared types and constants for the training analytics
//! service. This crate is designed to change infrequently, enabling incremental
//! compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **constants**: Query caps, byte budgets, derivation thresholds, tool names
//! - **pagination**: Opaque, sort-mode-bound cursors
//! - **models**: Completed workouts, set facts, weekly series, active workouts

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Cursor-based pagination for efficient data traversal
pub mod pagination;

/// Core data models (`CompletedWorkout`, `SetFact`, `WeeklyPoint`, ...)
pub mod models;
