// ABOUTME: Tool listing and execution routes over HTTP
// ABOUTME: Identifies the caller from headers and forwards JSON arguments to the registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};

use super::{request_id_from_headers, user_id_from_headers, AppState};
use crate::errors::{AppError, AppResult};
use crate::tools::ToolExecutionContext;

/// Tool routes
pub struct ToolRoutes;

impl ToolRoutes {
    /// Create tool listing and execution routes
    pub fn routes(state: AppState) -> Router {
        Router::new()
            .route("/api/v1/tools", get(Self::handle_list))
            .route("/api/v1/tools/:name", post(Self::handle_execute))
            .with_state(state)
    }

    /// List every registered tool with its argument schema
    async fn handle_list(State(state): State<AppState>) -> Json<Value> {
        Json(json!({ "tools": state.registry.all_schemas() }))
    }

    /// Execute one tool; an empty body means no arguments
    async fn handle_execute(
        State(state): State<AppState>,
        Path(name): Path<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Json<Value>, AppError> {
        let user_id = user_id_from_headers(&headers)?;
        let args = parse_args(&body)?;

        let mut context = ToolExecutionContext::new(user_id, state.query.clone());
        if let Some(request_id) = request_id_from_headers(&headers) {
            context = context.with_request_id(request_id);
        }

        let result = state.registry.execute(&name, args, &context).await?;
        Ok(Json(result.content))
    }
}

fn parse_args(body: &[u8]) -> AppResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::invalid_input(format!("Request body is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_no_arguments() {
        assert_eq!(parse_args(b"").unwrap(), json!({}));
        assert_eq!(parse_args(b"  \n").unwrap(), json!({}));
        assert_eq!(parse_args(br#"{"limit": 5}"#).unwrap(), json!({"limit": 5}));
        assert!(parse_args(b"{not json").is_err());
    }
}
