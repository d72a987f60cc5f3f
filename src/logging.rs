// ABOUTME: Logging configuration and structured logging setup for observability and debugging
// ABOUTME: Configures log levels, formatters, output stream, and noise filters for the analytics service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Structured logging for the analytics service.
//!
//! The HTTP server logs to stdout. One-shot CLI commands print their JSON result on
//! stdout, so they log to stderr instead.

use std::env;
use std::io;

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::{
        self,
        format::{DefaultFields, FmtSpan, Format},
        MakeWriter,
    },
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::constants::service_names::PIERRE_TRAINING_ANALYTICS as SERVICE_NAME;

/// Third-party targets held at a fixed level regardless of `RUST_LOG`
const NOISE_DIRECTIVES: &[&str] = &[
    "hyper=warn",
    "hyper::proto=warn",
    "sqlx=warn",
    "sqlx::query=warn",
    "tower_http=info",
];

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `JSON` format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value; anything unrecognized is pretty
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Stream log lines are written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Standard output (long-running server)
    Stdout,
    /// Standard error (commands whose stdout is a JSON result)
    Stderr,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for this crate when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Output stream
    pub output: LogOutput,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Emit span open/close events
    pub include_spans: bool,
    /// Service name attached to the startup record
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            output: LogOutput::Stdout,
            include_location: false,
            include_spans: false,
            service_name: SERVICE_NAME.into(),
        }
    }
}

impl LoggingConfig {
    /// Read `RUST_LOG`, `LOG_FORMAT`, `LOG_INCLUDE_LOCATION`, `LOG_INCLUDE_SPANS`
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            format: env::var("LOG_FORMAT").map_or(LogFormat::Pretty, |v| LogFormat::parse(&v)),
            include_location: env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            ..Self::default()
        }
    }

    /// Send log lines to the given stream
    #[must_use]
    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// `RUST_LOG` (or the configured level) plus the fixed noise directives
    fn env_filter(&self) -> EnvFilter {
        let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));
        let filter = NOISE_DIRECTIVES.iter().fold(base, |filter, directive| {
            match directive.parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => filter,
            }
        });
        filter.add_directive(
            format!("pierre_training_analytics={}", self.level)
                .parse()
                .unwrap_or_else(|_| Level::INFO.into()),
        )
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let registry = tracing_subscriber::registry().with(self.env_filter());

        match (self.format, self.output) {
            (LogFormat::Json, LogOutput::Stdout) => registry
                .with(self.full_layer(io::stdout, span_events).json())
                .try_init()?,
            (LogFormat::Json, LogOutput::Stderr) => registry
                .with(self.full_layer(io::stderr, span_events).json())
                .try_init()?,
            (LogFormat::Pretty, LogOutput::Stdout) => registry
                .with(self.full_layer(io::stdout, span_events))
                .try_init()?,
            (LogFormat::Pretty, LogOutput::Stderr) => registry
                .with(self.full_layer(io::stderr, span_events))
                .try_init()?,
            (LogFormat::Compact, LogOutput::Stdout) => registry
                .with(fmt::layer().compact().with_target(false).with_writer(io::stdout))
                .try_init()?,
            (LogFormat::Compact, LogOutput::Stderr) => registry
                .with(fmt::layer().compact().with_target(false).with_writer(io::stderr))
                .try_init()?,
        }

        info!(
            service.name = %self.service_name,
            service.version = env!("CARGO_PKG_VERSION"),
            log.level = %self.level,
            log.format = ?self.format,
            log.output = ?self.output,
            "Logging initialized"
        );
        Ok(())
    }

    /// Pretty layer with location and span settings applied
    fn full_layer<S, W>(&self, writer: W, span_events: FmtSpan) -> fmt::Layer<S, DefaultFields, Format, W>
    where
        W: for<'w> MakeWriter<'w> + 'static,
    {
        fmt::layer()
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_target(true)
            .with_span_events(span_events)
            .with_writer(writer)
    }
}

/// Initialize logging from environment, writing to stdout
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}
