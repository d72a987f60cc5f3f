// ABOUTME: Configuration management module for centralized server settings and parameters
// ABOUTME: Environment-only configuration for storage, HTTP, aggregation, and query paths
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//! Configuration module for Pierre training analytics
//!
//! All settings come from environment variables. Query caps and byte budgets are
//! compile-time constants in `pierre_core::constants::limits`, not configuration.

/// Environment and server configuration
pub mod environment;

pub use environment::{AggregationConfig, DatabaseUrl, QueryConfig, ServerConfig};
