// ABOUTME: Main library entry point for Pierre training analytics
// ABOUTME: Set-fact aggregation into weekly series and bounded, LLM-friendly query tools
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Crate-level attributes:
// - recursion_limit: Increased from default 128 to 256 for the json! macros
//   building nested tool schemas and response envelopes
// - deny(unsafe_code): Zero-tolerance unsafe policy
#![recursion_limit = "256"]
#![deny(unsafe_code)]

//! # Pierre Training Analytics
//!
//! Turns completed strength workouts into durable, query-friendly analytics and
//! serves them to an LLM coaching agent through bounded endpoints.
//!
//! ## Features
//!
//! - **Set facts**: one normalized row per completed working set
//! - **Weekly series**: per-exercise, per-muscle-group and per-muscle rollups, capped at 52 weeks
//! - **Bounded reads**: item caps, byte budgets, field projection and cursor pagination
//! - **Summaries**: progress trends, plateau/deload/overreach flags and a coaching pack
//! - **Active workouts**: lightweight snapshot and event log of the in-progress session
//!
//! ## Architecture
//!
//! - **Aggregation**: fire-and-forget queue feeding an idempotent per-workout commit
//! - **Query**: stateless read path that enforces every cap before touching storage
//! - **Tools**: each endpoint is an `AnalyticsTool`, shared by HTTP and the CLI
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pierre_training_analytics::config::ServerConfig;
//! use pierre_training_analytics::database::Database;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let database = Database::new(&config.database_url.to_connection_string()).await?;
//!     println!("Analytics storage ready on port {}", config.http_port);
//!     drop(database);
//!     Ok(())
//! }
//! ```

/// Aggregation pipeline, worker queue and backfill
pub mod aggregation;

/// Exercise catalog collaborator
pub mod catalog;

/// Environment-driven configuration
pub mod config;

/// Caps, byte budgets, tool names and training thresholds
pub mod constants;

/// SQLite storage
pub mod database;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Production logging and structured output
pub mod logging;

/// Workout, set-fact, series and active-workout models
pub mod models;

/// Cursor-based pagination
pub mod pagination;

/// Bounded read path: caps, projection, envelopes and the query service
pub mod query;

/// `HTTP` routes
pub mod routes;

/// Analytics tool trait, registry and implementations
pub mod tools;
