// ABOUTME: Health check route for load balancers and process supervisors
// ABOUTME: Reports liveness plus the number of workouts awaiting aggregation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use pierre_core::constants::service_names::PIERRE_TRAINING_ANALYTICS;
use serde_json::{json, Value};

use super::AppState;

/// Health check routes
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create health check routes
    pub fn routes(state: AppState) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .with_state(state)
    }

    async fn handle_health(State(state): State<AppState>) -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": PIERRE_TRAINING_ANALYTICS,
            "version": env!("CARGO_PKG_VERSION"),
            "pending_aggregations": state.queue.pending(),
            "timestamp": Utc::now().to_rfc3339()
        }))
    }
}
