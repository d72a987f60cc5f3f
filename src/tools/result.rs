// ABOUTME: Defines ToolResult, the value returned by tool execution.
// ABOUTME: Wraps the serialized response envelope handed back to callers.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::Serialize;
use serde_json::Value;

/// Result returned by tool execution.
///
/// Failures are `AppError`s, which the HTTP layer renders as the error envelope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolResult {
    /// The envelope returned to the client
    pub content: Value,
}

impl ToolResult {
    /// Create a successful result
    #[must_use]
    pub const fn ok(content: Value) -> Self {
        Self { content }
    }

    /// Create a result from a serializable value
    ///
    /// # Errors
    ///
    /// Returns the serialization error if the value cannot be converted to JSON
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::ok(serde_json::to_value(value)?))
    }
}
