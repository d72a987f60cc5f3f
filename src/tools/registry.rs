// ABOUTME: Central registry for analytics tools with lookup, listing, and execution.
// ABOUTME: Built once at startup and then shared immutably behind an Arc.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Tool Registry
//!
//! Central registry for analytics tools, providing:
//! - Tool registration and lookup
//! - Schema generation for the tool listing endpoint

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};

use super::context::ToolExecutionContext;
use super::implementations::{
    create_active_tools, create_coaching_tools, create_progress_tools, create_series_tools,
    create_sets_tools,
};
use super::result::ToolResult;
use super::schema::ToolSchema;
use super::traits::AnalyticsTool;

/// Central registry for analytics tools.
///
/// All registered tools are `Arc`-wrapped for sharing across async tasks.
///
/// # Example
///
/// ```
/// use pierre_training_analytics::tools::registry::ToolRegistry;
///
/// let mut registry = ToolRegistry::new();
/// registry.register_builtin_tools();
/// assert!(registry.contains("sets.query"));
/// ```
pub struct ToolRegistry {
    /// Registered tools by name
    tools: HashMap<String, Arc<dyn AnalyticsTool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool in the registry
    ///
    /// # Returns
    ///
    /// `true` if the tool was registered, `false` if a tool with the same name exists
    pub fn register(&mut self, tool: Arc<dyn AnalyticsTool>) -> bool {
        let name = tool.name().to_owned();

        if self.tools.contains_key(&name) {
            warn!("Tool '{name}' is already registered, skipping");
            return false;
        }

        debug!(
            "Registering tool '{name}' with capabilities: {}",
            tool.capabilities().describe()
        );
        self.tools.insert(name, tool);
        true
    }

    /// Get a tool by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn AnalyticsTool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All tool names, sorted
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Schemas of every registered tool, sorted by name
    #[must_use]
    pub fn all_schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|tool| ToolSchema {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                input_schema: tool.input_schema(),
                capabilities: tool
                    .capabilities()
                    .iter_names()
                    .map(|(name, _)| name.to_lowercase())
                    .collect(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Execute a tool by name
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown tool, or the tool's own error
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        context: &ToolExecutionContext,
    ) -> AppResult<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| AppError::not_found(format!("Tool '{name}'")))?;

        let started = Instant::now();
        let result = tool.execute(args, context).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(output) => info!(
                tool = name,
                user_id = %context.user_id,
                request_id = context.request_id.as_deref(),
                returned = output.content["meta"]["returned"].as_u64(),
                response_bytes = output.content["meta"]["response_bytes"].as_u64(),
                truncated = output.content["truncated"].as_bool(),
                elapsed_ms,
                "Tool executed"
            ),
            Err(e) => warn!(
                tool = name,
                user_id = %context.user_id,
                request_id = context.request_id.as_deref(),
                error_code = e.code.as_str(),
                error = %e,
                elapsed_ms,
                "Tool failed"
            ),
        }
        result
    }

    /// Register all built-in tools
    pub fn register_builtin_tools(&mut self) {
        info!("Registering built-in tools...");

        let groups = [
            create_sets_tools(),
            create_series_tools(),
            create_progress_tools(),
            create_coaching_tools(),
            create_active_tools(),
        ];
        for tool in groups.into_iter().flatten() {
            self.register(Arc::from(tool));
        }

        info!("Registered {} built-in tools", self.len());
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}
