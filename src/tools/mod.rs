// ABOUTME: Pluggable analytics tools: trait, registry, execution context, and implementations
// ABOUTME: Shared by the HTTP routes and the CLI so both expose the same endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Tool execution layer for the analytics service.
//!
//! Each endpoint is an [`AnalyticsTool`] registered in the [`ToolRegistry`]; callers
//! pass JSON arguments and get the response envelope back as JSON.

/// Per-request execution context
pub mod context;
/// Tool implementations by category
pub mod implementations;
/// Tool registry
pub mod registry;
/// Tool result type
pub mod result;
/// Tool argument schemas
pub mod schema;
/// Tool trait and capability flags
pub mod traits;

pub use context::ToolExecutionContext;
pub use registry::ToolRegistry;
pub use result::ToolResult;
pub use schema::{JsonSchema, PropertySchema, ToolSchema};
pub use traits::{AnalyticsTool, ToolCapabilities};
