// ABOUTME: Command-line entry point for the training analytics service
// ABOUTME: Serves the HTTP API, replays workout history, and runs one-off tool queries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![recursion_limit = "256"]

//! # Pierre Training Analytics Binary
//!
//! Usage:
//! ```bash
//! # Start the HTTP API with the aggregation worker
//! pierre-analytics serve --http-port 8090
//!
//! # Replay a JSON export of completed workouts for one user
//! pierre-analytics backfill --user-id <uuid> --from-file workouts.json
//!
//! # Run a single tool and print its envelope
//! pierre-analytics query series.exercise.get --user-id <uuid> --args '{"id": "barbell_squat"}'
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pierre_intelligence::MuscleTaxonomy;
use pierre_training_analytics::aggregation::{
    AggregationPipeline, AggregationQueue, BackfillJob, InMemoryWorkoutSource,
};
use pierre_training_analytics::catalog::{ExerciseCatalog, InMemoryCatalog};
use pierre_training_analytics::config::ServerConfig;
use pierre_training_analytics::database::Database;
use pierre_training_analytics::logging::{LogOutput, LoggingConfig};
use pierre_training_analytics::query::QueryService;
use pierre_training_analytics::routes::{self, AppState};
use pierre_training_analytics::tools::{ToolExecutionContext, ToolRegistry};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "pierre-analytics",
    about = "Pierre Training Analytics - bounded strength training analytics for LLM coaches"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override
    #[arg(long, global = true)]
    database_url: Option<String>,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and the aggregation worker
    Serve {
        /// Override HTTP port
        #[arg(long)]
        http_port: Option<u16>,
    },

    /// Aggregate a user's workout history, resuming from the stored watermark
    Backfill {
        /// User whose workouts are replayed
        #[arg(long)]
        user_id: Uuid,

        /// JSON array of completed workouts
        #[arg(long)]
        from_file: PathBuf,
    },

    /// Execute one analytics tool and print the response envelope
    Query {
        /// Tool name (e.g. `series.exercise.get`)
        tool: String,

        /// Calling user
        #[arg(long)]
        user_id: Uuid,

        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

/// Shared collaborators built once per process
struct Services {
    database: Arc<Database>,
    catalog: Arc<dyn ExerciseCatalog>,
    taxonomy: Arc<MuscleTaxonomy>,
}

impl Services {
    fn pipeline(&self) -> AggregationPipeline {
        AggregationPipeline::new(
            self.database.clone(),
            self.catalog.clone(),
            self.taxonomy.clone(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = match cli.command {
        Command::Serve { .. } => LogOutput::Stdout,
        Command::Backfill { .. } | Command::Query { .. } => LogOutput::Stderr,
    };
    LoggingConfig::from_env().with_output(output).init()?;

    let mut config = ServerConfig::from_env()?;
    info!("{}", config.summary());

    let database_url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| config.database_url.to_connection_string());
    let services = bootstrap(&database_url, config.catalog_path.as_deref()).await?;

    match cli.command {
        Command::Serve { http_port } => {
            if let Some(http_port) = http_port {
                config.http_port = http_port;
            }
            serve(&config, &services).await
        }
        Command::Backfill { user_id, from_file } => {
            backfill(&config, &services, user_id, &from_file).await
        }
        Command::Query {
            tool,
            user_id,
            args,
        } => query(&config, &services, &tool, user_id, &args).await,
    }
}

async fn bootstrap(database_url: &str, catalog_path: Option<&Path>) -> Result<Services> {
    let database = Database::new(database_url)
        .await
        .context("Failed to open analytics database")?;

    let catalog = if let Some(path) = catalog_path {
        InMemoryCatalog::from_file(path)
            .await
            .context("Failed to load exercise catalog")?
    } else {
        warn!("CATALOG_PATH not set, using an empty exercise catalog");
        InMemoryCatalog::new()
    };

    Ok(Services {
        database: Arc::new(database),
        catalog: Arc::new(catalog),
        taxonomy: Arc::new(MuscleTaxonomy::standard()),
    })
}

fn query_service(config: &ServerConfig, services: &Services) -> Arc<QueryService> {
    Arc::new(QueryService::new(
        services.database.clone(),
        services.taxonomy.clone(),
        config.query.clone(),
    ))
}

fn builtin_registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register_builtin_tools();
    Arc::new(registry)
}

async fn serve(config: &ServerConfig, services: &Services) -> Result<()> {
    let queue = Arc::new(AggregationQueue::start(
        services.pipeline(),
        &config.aggregation,
    ));
    let state = AppState {
        registry: builtin_registry(),
        query: query_service(config, services),
        queue: queue.clone(),
    };
    let app = routes::router(state, config.query.request_timeout());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {addr}"))?;
    info!("HTTP server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped, draining aggregation queue");
    queue.shutdown().await;
    Ok(())
}

async fn backfill(
    config: &ServerConfig,
    services: &Services,
    user_id: Uuid,
    from_file: &Path,
) -> Result<()> {
    let source = InMemoryWorkoutSource::from_file(from_file)
        .await
        .context("Failed to load workout history")?;
    info!(workouts = source.len(), "Loaded workout history");

    let job = BackfillJob::new(
        services.pipeline(),
        Arc::new(source),
        config.backfill_batch_size,
    );
    let report = job.run(user_id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn query(
    config: &ServerConfig,
    services: &Services,
    tool: &str,
    user_id: Uuid,
    args: &str,
) -> Result<()> {
    let args: Value = serde_json::from_str(args).context("--args must be a JSON object")?;
    let registry = builtin_registry();
    let context = ToolExecutionContext::new(user_id, query_service(config, services))
        .with_request_id(Uuid::new_v4().to_string());

    let result = registry.execute(tool, args, &context).await?;
    println!("{}", serde_json::to_string_pretty(&result.content)?);
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!("SIGTERM handler failed: {e}");
                if let Err(e) = ctrl_c().await {
                    error!("Ctrl+C handler failed: {e}");
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = ctrl_c().await {
            error!("Ctrl+C handler failed: {e}");
        }
    }
    info!("Shutdown signal received");
}
