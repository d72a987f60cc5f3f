// ABOUTME: The sets.query tool: filtered, paginated, projected set facts.
// ABOUTME: Exactly one target dimension and a date range are required.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use pierre_core::constants::tools::SETS_QUERY;
use serde_json::Value;

use crate::errors::AppResult;
use crate::query::{parse_params, SetQueryParams};
use crate::tools::context::ToolExecutionContext;
use crate::tools::result::ToolResult;
use crate::tools::schema::JsonSchema;
use crate::tools::traits::{AnalyticsTool, ToolCapabilities};

/// Tool for querying individual set facts.
pub struct QuerySetsTool;

#[async_trait]
impl AnalyticsTool for QuerySetsTool {
    fn name(&self) -> &'static str {
        SETS_QUERY
    }

    fn description(&self) -> &'static str {
        "Query individual logged sets for one muscle group, muscle, or up to 10 exercises \
         within a date range. Use only when summaries are insufficient."
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::object(
            &[
                ("muscle_group", "string", "Muscle group, e.g. chest (exclusive with muscle and exercise_ids)"),
                ("muscle", "string", "Muscle, e.g. quadriceps (exclusive with muscle_group and exercise_ids)"),
                ("exercise_ids", "array", "Up to 10 exercise ids (exclusive with muscle_group and muscle)"),
                ("start_date", "string", "Inclusive start, YYYY-MM-DD or RFC 3339"),
                ("end_date", "string", "Inclusive end, YYYY-MM-DD or RFC 3339"),
                ("include_warmups", "boolean", "Include warmup sets (default false)"),
                ("min_reps", "integer", "Minimum reps"),
                ("max_reps", "integer", "Maximum reps"),
                ("min_weight_kg", "number", "Minimum load in kg"),
                ("max_weight_kg", "number", "Maximum load in kg"),
                ("max_rir", "integer", "Maximum reps in reserve"),
                ("failure_only", "boolean", "Only sets taken to failure"),
                ("hard_sets_only", "boolean", "Only sets with hard-set credit"),
                ("sort", "string", "date_desc (default) or e1rm_desc"),
                ("fields", "array", "Fields to return, at most 20"),
                ("limit", "integer", "Page size, default 50, max 200"),
                ("cursor", "string", "next_cursor from the previous page"),
            ],
            &["start_date", "end_date"],
        )
    }

    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::REQUIRES_AUTH | ToolCapabilities::READS_DATA | ToolCapabilities::RAW_ROWS
    }

    async fn execute(&self, args: Value, ctx: &ToolExecutionContext) -> AppResult<ToolResult> {
        let params: SetQueryParams = parse_params(args)?;
        let envelope = ctx.query.query_sets(ctx.user_id, &params).await?;
        Ok(ToolResult::from_serializable(&envelope)?)
    }
}

/// Create the set tools for registration
#[must_use]
pub fn create_sets_tools() -> Vec<Box<dyn AnalyticsTool>> {
    vec![Box::new(QuerySetsTool)]
}
