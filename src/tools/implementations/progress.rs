// ABOUTME: The progress.*.summary tools: trends, rep-range mix, and read-time flags.
// ABOUTME: Group and muscle summaries add top exercises and proxy e1RM trends.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use pierre_core::constants::tools::{
    PROGRESS_EXERCISE_SUMMARY, PROGRESS_MUSCLE_GROUP_SUMMARY, PROGRESS_MUSCLE_SUMMARY,
};
use pierre_core::models::SeriesKind;
use serde_json::Value;

use super::series::{id_description, series_schema};
use crate::errors::AppResult;
use crate::query::{parse_params, SeriesParams};
use crate::tools::context::ToolExecutionContext;
use crate::tools::result::ToolResult;
use crate::tools::schema::JsonSchema;
use crate::tools::traits::{AnalyticsTool, ToolCapabilities};

/// Tool for summarizing progress on one entity.
pub struct ProgressSummaryTool {
    kind: SeriesKind,
}

impl ProgressSummaryTool {
    /// Tool for one series class
    #[must_use]
    pub const fn new(kind: SeriesKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl AnalyticsTool for ProgressSummaryTool {
    fn name(&self) -> &'static str {
        match self.kind {
            SeriesKind::Exercise => PROGRESS_EXERCISE_SUMMARY,
            SeriesKind::MuscleGroup => PROGRESS_MUSCLE_GROUP_SUMMARY,
            SeriesKind::Muscle => PROGRESS_MUSCLE_SUMMARY,
        }
    }

    fn description(&self) -> &'static str {
        match self.kind {
            SeriesKind::Exercise => {
                "e1RM trend, rep-range mix, and plateau/deload/overreach flags for one exercise"
            }
            SeriesKind::MuscleGroup => {
                "Top exercises, proxy strength trends, and flags for one muscle group"
            }
            SeriesKind::Muscle => "Top exercises, proxy strength trends, and flags for one muscle",
        }
    }

    fn input_schema(&self) -> JsonSchema {
        series_schema(id_description(self.kind))
    }

    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::REQUIRES_AUTH | ToolCapabilities::READS_DATA | ToolCapabilities::SUMMARY
    }

    async fn execute(&self, args: Value, ctx: &ToolExecutionContext) -> AppResult<ToolResult> {
        let params: SeriesParams = parse_params(args)?;
        let envelope = ctx
            .query
            .progress_summary(ctx.user_id, self.kind, &params)
            .await?;
        Ok(ToolResult::from_serializable(&envelope)?)
    }
}

/// Create the progress tools for registration
#[must_use]
pub fn create_progress_tools() -> Vec<Box<dyn AnalyticsTool>> {
    vec![
        Box::new(ProgressSummaryTool::new(SeriesKind::Exercise)),
        Box::new(ProgressSummaryTool::new(SeriesKind::MuscleGroup)),
        Box::new(ProgressSummaryTool::new(SeriesKind::Muscle)),
    ]
}
