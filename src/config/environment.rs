// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses database, HTTP, aggregation worker, backfill, and query settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management for production deployment

use std::env;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default `DATABASE_URL`
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/training_analytics.db";
/// Default `HTTP_PORT`
pub const DEFAULT_HTTP_PORT: u16 = 8090;
/// Default `AGGREGATION_WORKERS`
pub const DEFAULT_AGGREGATION_WORKERS: usize = 4;
/// Default `AGGREGATION_MAX_ATTEMPTS`
pub const DEFAULT_AGGREGATION_MAX_ATTEMPTS: u32 = 5;
/// Default `AGGREGATION_RETRY_BASE_MS`
pub const DEFAULT_AGGREGATION_RETRY_BASE_MS: u64 = 50;
/// Default `REQUEST_TIMEOUT_SECS`
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Default `BACKFILL_BATCH_SIZE`
pub const DEFAULT_BACKFILL_BATCH_SIZE: u32 = 50;
/// Default `ADHERENCE_TARGET_SESSIONS`
pub const DEFAULT_ADHERENCE_TARGET_SESSIONS: u32 = 3;

/// Type-safe database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string with validation
    ///
    /// # Errors
    ///
    /// Returns an error for non-SQLite URLs
    pub fn parse_url(s: &str) -> Result<Self> {
        if let Some(path) = s.strip_prefix("sqlite:") {
            if path == ":memory:" {
                Ok(Self::Memory)
            } else {
                Ok(Self::SQLite {
                    path: PathBuf::from(path.trim_start_matches("//")),
                })
            }
        } else if s.contains("://") {
            Err(anyhow!("Unsupported database URL scheme: {s}"))
        } else {
            // Fallback: treat as SQLite file path
            Ok(Self::SQLite {
                path: PathBuf::from(s),
            })
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from("./data/training_analytics.db"),
        }
    }
}

impl Display for DatabaseUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Aggregation worker settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregationConfig {
    /// Maximum concurrent aggregation jobs
    pub workers: usize,
    /// Attempts before a job is dead-lettered
    pub max_attempts: u32,
    /// Exponential backoff base
    pub retry_base_ms: u64,
}

impl AggregationConfig {
    /// Backoff base as a duration
    #[must_use]
    pub const fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_AGGREGATION_WORKERS,
            max_attempts: DEFAULT_AGGREGATION_MAX_ATTEMPTS,
            retry_base_ms: DEFAULT_AGGREGATION_RETRY_BASE_MS,
        }
    }
}

/// Read-path settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryConfig {
    /// Per-request timeout for query endpoints
    pub request_timeout_secs: u64,
    /// Sessions per week considered fully adherent
    pub adherence_target_sessions: u32,
}

impl QueryConfig {
    /// Request timeout as a duration
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            adherence_target_sessions: DEFAULT_ADHERENCE_TARGET_SESSIONS,
        }
    }
}

/// Server configuration loaded from the environment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Database location
    pub database_url: DatabaseUrl,
    /// Aggregation worker settings
    pub aggregation: AggregationConfig,
    /// Read-path settings
    pub query: QueryConfig,
    /// Workouts fetched per backfill page
    pub backfill_batch_size: u32,
    /// JSON file with exercise attribution entries
    pub catalog_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            database_url: DatabaseUrl::default(),
            aggregation: AggregationConfig::default(),
            query: QueryConfig::default(),
            backfill_batch_size: DEFAULT_BACKFILL_BATCH_SIZE,
            catalog_path: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed, or if the
    /// resulting configuration is invalid
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed or the configuration is invalid
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned());

        let config = Self {
            http_port: parse_or(&lookup, "HTTP_PORT", DEFAULT_HTTP_PORT)?,
            database_url: DatabaseUrl::parse_url(&database_url)
                .context("Invalid DATABASE_URL value")?,
            aggregation: AggregationConfig {
                workers: parse_or(&lookup, "AGGREGATION_WORKERS", DEFAULT_AGGREGATION_WORKERS)?,
                max_attempts: parse_or(
                    &lookup,
                    "AGGREGATION_MAX_ATTEMPTS",
                    DEFAULT_AGGREGATION_MAX_ATTEMPTS,
                )?,
                retry_base_ms: parse_or(
                    &lookup,
                    "AGGREGATION_RETRY_BASE_MS",
                    DEFAULT_AGGREGATION_RETRY_BASE_MS,
                )?,
            },
            query: QueryConfig {
                request_timeout_secs: parse_or(
                    &lookup,
                    "REQUEST_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                )?,
                adherence_target_sessions: parse_or(
                    &lookup,
                    "ADHERENCE_TARGET_SESSIONS",
                    DEFAULT_ADHERENCE_TARGET_SESSIONS,
                )?,
            },
            backfill_batch_size: parse_or(
                &lookup,
                "BACKFILL_BATCH_SIZE",
                DEFAULT_BACKFILL_BATCH_SIZE,
            )?,
            catalog_path: lookup("CATALOG_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if any count or timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.aggregation.workers == 0 {
            return Err(anyhow!("AGGREGATION_WORKERS must be at least 1"));
        }
        if self.aggregation.max_attempts == 0 {
            return Err(anyhow!("AGGREGATION_MAX_ATTEMPTS must be at least 1"));
        }
        if self.query.request_timeout_secs == 0 {
            return Err(anyhow!("REQUEST_TIMEOUT_SECS must be at least 1"));
        }
        if self.backfill_batch_size == 0 {
            return Err(anyhow!("BACKFILL_BATCH_SIZE must be at least 1"));
        }
        if self.query.adherence_target_sessions == 0 {
            return Err(anyhow!("ADHERENCE_TARGET_SESSIONS must be at least 1"));
        }
        Ok(())
    }

    /// Get a summary of the configuration for logging
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Pierre Training Analytics Configuration:\n\
             - HTTP Port: {}\n\
             - Database: {}\n\
             - Aggregation Workers: {} (max attempts {}, backoff base {}ms)\n\
             - Request Timeout: {}s\n\
             - Backfill Batch Size: {}\n\
             - Catalog: {}",
            self.http_port,
            self.database_url,
            self.aggregation.workers,
            self.aggregation.max_attempts,
            self.aggregation.retry_base_ms,
            self.query.request_timeout_secs,
            self.backfill_batch_size,
            self.catalog_path
                .as_ref()
                .map_or_else(|| "none".to_owned(), |p| p.display().to_string()),
        )
    }
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: StdError + Send + Sync + 'static,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw}"))
    })
}
