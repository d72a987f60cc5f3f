// ABOUTME: The series.*.get tools: one weekly series trimmed to a window.
// ABOUTME: One tool type serves the exercise, muscle-group, and muscle series.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use pierre_core::constants::tools::{SERIES_EXERCISE_GET, SERIES_MUSCLE_GET, SERIES_MUSCLE_GROUP_GET};
use pierre_core::models::SeriesKind;
use serde_json::Value;

use crate::errors::AppResult;
use crate::query::{parse_params, SeriesParams};
use crate::tools::context::ToolExecutionContext;
use crate::tools::result::ToolResult;
use crate::tools::schema::JsonSchema;
use crate::tools::traits::{AnalyticsTool, ToolCapabilities};

/// Schema shared by the series and progress tools
pub(super) fn series_schema(id_description: &'static str) -> JsonSchema {
    JsonSchema::object(
        &[
            ("id", "string", id_description),
            ("window_weeks", "integer", "Weeks ending at the anchor week, default 12, max 52"),
            ("as_of", "string", "Anchor date YYYY-MM-DD, default today"),
        ],
        &["id"],
    )
}

/// Id description per series class
pub(super) const fn id_description(kind: SeriesKind) -> &'static str {
    match kind {
        SeriesKind::Exercise => "Exercise id",
        SeriesKind::MuscleGroup => "Muscle group, e.g. chest or back",
        SeriesKind::Muscle => "Muscle, e.g. quadriceps or pecs",
    }
}

/// Tool for reading one weekly series.
pub struct GetSeriesTool {
    kind: SeriesKind,
}

impl GetSeriesTool {
    /// Tool for one series class
    #[must_use]
    pub const fn new(kind: SeriesKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl AnalyticsTool for GetSeriesTool {
    fn name(&self) -> &'static str {
        match self.kind {
            SeriesKind::Exercise => SERIES_EXERCISE_GET,
            SeriesKind::MuscleGroup => SERIES_MUSCLE_GROUP_GET,
            SeriesKind::Muscle => SERIES_MUSCLE_GET,
        }
    }

    fn description(&self) -> &'static str {
        match self.kind {
            SeriesKind::Exercise => "Weekly sets, volume, RIR and best e1RM for one exercise",
            SeriesKind::MuscleGroup => {
                "Weekly sets, hard sets and effective volume attributed to one muscle group"
            }
            SeriesKind::Muscle => {
                "Weekly sets, hard sets and effective volume attributed to one muscle"
            }
        }
    }

    fn input_schema(&self) -> JsonSchema {
        series_schema(id_description(self.kind))
    }

    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::REQUIRES_AUTH | ToolCapabilities::READS_DATA
    }

    async fn execute(&self, args: Value, ctx: &ToolExecutionContext) -> AppResult<ToolResult> {
        let params: SeriesParams = parse_params(args)?;
        let envelope = ctx.query.get_series(ctx.user_id, self.kind, &params).await?;
        Ok(ToolResult::from_serializable(&envelope)?)
    }
}

/// Create the series tools for registration
#[must_use]
pub fn create_series_tools() -> Vec<Box<dyn AnalyticsTool>> {
    vec![
        Box::new(GetSeriesTool::new(SeriesKind::Exercise)),
        Box::new(GetSeriesTool::new(SeriesKind::MuscleGroup)),
        Box::new(GetSeriesTool::new(SeriesKind::Muscle)),
    ]
}
