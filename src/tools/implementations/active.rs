// ABOUTME: Active-workout tools: a compact snapshot and the paginated event log.
// ABOUTME: Reads state written by the workout-logging system; never mutates it.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use pierre_core::constants::tools::{ACTIVE_EVENTS_LIST, ACTIVE_SNAPSHOT_LITE};
use serde_json::Value;

use crate::errors::AppResult;
use crate::query::{parse_params, EventsParams, SnapshotParams};
use crate::tools::context::ToolExecutionContext;
use crate::tools::result::ToolResult;
use crate::tools::schema::JsonSchema;
use crate::tools::traits::{AnalyticsTool, ToolCapabilities};

/// Tool for the current workout's compact state.
pub struct ActiveSnapshotTool;

#[async_trait]
impl AnalyticsTool for ActiveSnapshotTool {
    fn name(&self) -> &'static str {
        ACTIVE_SNAPSHOT_LITE
    }

    fn description(&self) -> &'static str {
        "Compact state of the in-progress workout: exercises, sets done, last set"
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::object(
            &[
                ("workout_id", "string", "Workout id; the latest in-progress workout if absent"),
                ("limit", "integer", "Exercises to include, default 50, max 200"),
            ],
            &[],
        )
    }

    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::REQUIRES_AUTH
            | ToolCapabilities::READS_DATA
            | ToolCapabilities::ACTIVE_WORKOUT
    }

    async fn execute(&self, args: Value, ctx: &ToolExecutionContext) -> AppResult<ToolResult> {
        let params: SnapshotParams = parse_params(args)?;
        let envelope = ctx.query.active_snapshot(ctx.user_id, &params).await?;
        Ok(ToolResult::from_serializable(&envelope)?)
    }
}

/// Tool for a workout's event log.
pub struct ListEventsTool;

#[async_trait]
impl AnalyticsTool for ListEventsTool {
    fn name(&self) -> &'static str {
        ACTIVE_EVENTS_LIST
    }

    fn description(&self) -> &'static str {
        "Events of one workout, newest first, with cursor pagination"
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::object(
            &[
                ("workout_id", "string", "Workout id"),
                ("limit", "integer", "Page size, default 50, max 200"),
                ("cursor", "string", "next_cursor from the previous page"),
            ],
            &["workout_id"],
        )
    }

    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::REQUIRES_AUTH
            | ToolCapabilities::READS_DATA
            | ToolCapabilities::RAW_ROWS
            | ToolCapabilities::ACTIVE_WORKOUT
    }

    async fn execute(&self, args: Value, ctx: &ToolExecutionContext) -> AppResult<ToolResult> {
        let params: EventsParams = parse_params(args)?;
        let envelope = ctx.query.list_events(ctx.user_id, &params).await?;
        Ok(ToolResult::from_serializable(&envelope)?)
    }
}

/// Create the active-workout tools for registration
#[must_use]
pub fn create_active_tools() -> Vec<Box<dyn AnalyticsTool>> {
    vec![Box::new(ActiveSnapshotTool), Box::new(ListEventsTool)]
}
