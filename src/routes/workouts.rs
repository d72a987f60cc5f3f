// ABOUTME: Workout completion intake route feeding the aggregation queue
// ABOUTME: Accepts a completed workout and returns before aggregation runs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use pierre_core::models::CompletedWorkout;
use serde_json::{json, Value};
use tracing::info;

use super::{user_id_from_headers, AppState};
use crate::errors::AppError;

/// Workout completion routes
pub struct WorkoutRoutes;

impl WorkoutRoutes {
    /// Create workout intake routes
    pub fn routes(state: AppState) -> Router {
        Router::new()
            .route("/api/v1/workouts/completed", post(Self::handle_completed))
            .with_state(state)
    }

    /// Enqueue a completed workout for aggregation.
    ///
    /// `accepted` is false when the same workout is already queued or running.
    async fn handle_completed(
        State(state): State<AppState>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<(StatusCode, Json<Value>), AppError> {
        let user_id = user_id_from_headers(&headers)?;
        let workout: CompletedWorkout = serde_json::from_slice(&body)
            .map_err(|e| AppError::invalid_input(format!("Invalid completed workout: {e}")))?;
        if workout.user_id != user_id {
            return Err(AppError::invalid_input(
                "Workout user_id does not match the calling user",
            ));
        }

        let workout_id = workout.workout_id.clone();
        let set_count = workout.set_count();
        let accepted = state.queue.enqueue(workout);
        info!(
            user_id = %user_id,
            workout_id = %workout_id,
            set_count,
            accepted,
            "Workout completion received"
        );

        Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "accepted": accepted, "workout_id": workout_id })),
        ))
    }
}
