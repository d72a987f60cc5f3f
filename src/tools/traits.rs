// ABOUTME: Defines the AnalyticsTool trait and ToolCapabilities for the pluggable tools architecture.
// ABOUTME: Tools implement this trait to be registered and executed via the ToolRegistry.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Analytics Tool Trait and Capabilities
//!
//! Every endpoint is a tool: metadata for discovery, capability flags, and async
//! execution against a [`ToolExecutionContext`].

use async_trait::async_trait;
use bitflags::bitflags;
use serde_json::Value;

use crate::errors::AppResult;

use super::context::ToolExecutionContext;
use super::result::ToolResult;
use super::schema::JsonSchema;

bitflags! {
    /// Capabilities that tools can declare for filtering and discovery.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ToolCapabilities: u8 {
        /// Tool requires an authenticated user
        const REQUIRES_AUTH = 0b0000_0001;
        /// Tool reads persisted data
        const READS_DATA = 0b0000_0010;
        /// Tool returns raw rows under the raw byte budget
        const RAW_ROWS = 0b0000_0100;
        /// Tool returns a computed summary under the summary budget
        const SUMMARY = 0b0000_1000;
        /// Tool reads in-progress workout state
        const ACTIVE_WORKOUT = 0b0001_0000;
    }
}

impl ToolCapabilities {
    /// Get a description of all enabled capabilities for logging
    #[must_use]
    pub fn describe(&self) -> String {
        let parts: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        if parts.is_empty() {
            "none".to_owned()
        } else {
            parts.join(", ").to_lowercase()
        }
    }
}

/// The trait all analytics tools implement.
///
/// - Tools are `Send + Sync` for sharing across async tasks
/// - `name()` returns `&'static str` for zero-allocation lookup
/// - `execute()` receives raw JSON arguments and validates them itself
#[async_trait]
pub trait AnalyticsTool: Send + Sync {
    /// Unique identifier for the tool (e.g., `sets.query`)
    fn name(&self) -> &'static str;

    /// Human-readable description for LLM consumption
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> JsonSchema;

    /// Capability flags for filtering
    fn capabilities(&self) -> ToolCapabilities;

    /// Execute the tool with given arguments and context
    ///
    /// # Errors
    ///
    /// Returns `AppError` for invalid arguments or storage failures
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult>;
}
