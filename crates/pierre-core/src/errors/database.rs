// ABOUTME: Conversion from sqlx errors into the unified AppError type
// ABOUTME: Enabled by the database-errors feature so pure crates stay sqlx-free
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use sqlx::Error as SqlxError;

use super::AppError;

impl From<SqlxError> for AppError {
    fn from(error: SqlxError) -> Self {
        match error {
            SqlxError::RowNotFound => Self::not_found("Row"),
            other => Self::database(other.to_string()),
        }
    }
}
