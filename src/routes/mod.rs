// ABOUTME: HTTP route assembly for the training analytics service
// ABOUTME: Shared router state, caller identification, and the tower middleware stack
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route modules for the analytics HTTP surface.
//!
//! Every analytics endpoint is exposed through the tool routes so HTTP and CLI
//! callers share the same registry.

/// Liveness endpoint
pub mod health;
/// Tool listing and execution
pub mod tools;
/// Workout completion intake
pub mod workouts;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::aggregation::AggregationQueue;
use crate::errors::{AppError, AppResult};
use crate::query::QueryService;
use crate::tools::ToolRegistry;

pub use health::HealthRoutes;
pub use tools::ToolRoutes;
pub use workouts::WorkoutRoutes;

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Optional header carrying a client-supplied request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Registered analytics tools
    pub registry: Arc<ToolRegistry>,
    /// Read path handed to tool executions
    pub query: Arc<QueryService>,
    /// Aggregation intake
    pub queue: Arc<AggregationQueue>,
}

/// Build the full application router with tracing and request timeouts
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(HealthRoutes::routes(state.clone()))
        .merge(ToolRoutes::routes(state.clone()))
        .merge(WorkoutRoutes::routes(state))
        .layer(request_timeout_layer(request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Requests still running after `timeout` are answered with 408
pub(crate) fn request_timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Read the caller's user id from the request headers
pub(crate) fn user_id_from_headers(headers: &HeaderMap) -> AppResult<Uuid> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::invalid_input(format!("Missing {USER_ID_HEADER} header")))?;

    Uuid::parse_str(raw.trim())
        .map_err(|e| AppError::invalid_input(format!("Invalid {USER_ID_HEADER} header: {e}")))
}

/// Read the optional request id header
pub(crate) fn request_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{HeaderValue, Request};
    use axum::routing::get;
    use tokio::time::sleep;
    use tower::ServiceExt;

    use super::*;
    use crate::errors::ErrorCode;

    #[tokio::test]
    async fn test_slow_request_times_out_with_408() {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(request_timeout_layer(Duration::from_millis(20)));

        let response = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_user_id_header_required_and_parsed() {
        let mut headers = HeaderMap::new();
        let missing = user_id_from_headers(&headers).unwrap_err();
        assert_eq!(missing.code, ErrorCode::InvalidInput);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(user_id_from_headers(&headers).is_err());

        let user_id = Uuid::new_v4();
        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_str(&user_id.to_string()).unwrap(),
        );
        assert_eq!(user_id_from_headers(&headers).unwrap(), user_id);
        assert_eq!(request_id_from_headers(&headers), None);
    }
}
