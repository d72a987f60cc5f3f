// ABOUTME: The context.coaching.pack tool, the agent's first call for a user.
// ABOUTME: Returns a fixed-shape snapshot capped at the summary byte budget.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use pierre_core::constants::tools::CONTEXT_COACHING_PACK;
use serde_json::Value;

use crate::errors::AppResult;
use crate::query::{parse_params, CoachingPackParams};
use crate::tools::context::ToolExecutionContext;
use crate::tools::result::ToolResult;
use crate::tools::schema::JsonSchema;
use crate::tools::traits::{AnalyticsTool, ToolCapabilities};

/// Tool for the coaching pack.
pub struct CoachingPackTool;

#[async_trait]
impl AnalyticsTool for CoachingPackTool {
    fn name(&self) -> &'static str {
        CONTEXT_COACHING_PACK
    }

    fn description(&self) -> &'static str {
        "Compact training snapshot: top muscle groups, adherence, and alert flags. \
         Call this first; drill down with series or set queries only if needed."
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::object(
            &[
                ("window_weeks", "integer", "Weeks ending at the anchor week, default 4, max 52"),
                ("as_of", "string", "Anchor date YYYY-MM-DD, default today"),
            ],
            &[],
        )
    }

    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::REQUIRES_AUTH | ToolCapabilities::READS_DATA | ToolCapabilities::SUMMARY
    }

    async fn execute(&self, args: Value, ctx: &ToolExecutionContext) -> AppResult<ToolResult> {
        let params: CoachingPackParams = parse_params(args)?;
        let envelope = ctx.query.coaching_pack(ctx.user_id, &params).await?;
        Ok(ToolResult::from_serializable(&envelope)?)
    }
}

/// Create the coaching tools for registration
#[must_use]
pub fn create_coaching_tools() -> Vec<Box<dyn AnalyticsTool>> {
    vec![Box::new(CoachingPackTool)]
}
