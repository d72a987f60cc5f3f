// ABOUTME: Defines ToolExecutionContext which provides tools with the caller and the query service.
// ABOUTME: Built per request by the HTTP routes and the CLI.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::query::QueryService;

/// Context provided to every tool execution.
///
/// `query` is shared across concurrent requests; cloning the context clones the `Arc`.
#[derive(Clone)]
pub struct ToolExecutionContext {
    /// Caller whose data the tool reads
    pub user_id: Uuid,
    /// Request ID for tracing
    pub request_id: Option<String>,
    /// Read path
    pub query: Arc<QueryService>,
}

impl ToolExecutionContext {
    /// Create a new context
    #[must_use]
    pub const fn new(user_id: Uuid, query: Arc<QueryService>) -> Self {
        Self {
            user_id,
            request_id: None,
            query,
        }
    }

    /// Set request ID for tracing
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl fmt::Debug for ToolExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolExecutionContext")
            .field("user_id", &self.user_id)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}
