// ABOUTME: Fire-and-forget aggregation queue with bounded concurrency and retry
// ABOUTME: Deduplicates in-flight workouts and dead-letters jobs that exhaust their attempts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use pierre_core::constants::service_names::AGGREGATION_WORKER;
use pierre_core::models::CompletedWorkout;
use tokio::sync::{mpsc, watch, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{AggregationOutcome, AggregationPipeline};
use crate::config::AggregationConfig;

type JobKey = (Uuid, String);

/// Retry settings copied into each job
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_attempts: u32,
    retry_base: Duration,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`: `base * 2^(attempt - 1)`
    fn backoff(self, attempt: u32) -> Duration {
        self.retry_base
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Queue of completed workouts awaiting aggregation.
///
/// `enqueue` never blocks the caller. A dispatcher task runs at most
/// `workers` jobs at a time.
pub struct AggregationQueue {
    sender: mpsc::UnboundedSender<CompletedWorkout>,
    in_flight: Arc<DashSet<JobKey>>,
    shutdown_tx: watch::Sender<bool>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl AggregationQueue {
    /// Start the dispatcher on the current runtime
    #[must_use]
    pub fn start(pipeline: AggregationPipeline, config: &AggregationConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let in_flight = Arc::new(DashSet::new());
        let policy = RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            retry_base: config.retry_base(),
        };

        let dispatcher = tokio::spawn(dispatch(
            pipeline,
            receiver,
            shutdown_rx,
            in_flight.clone(),
            config.workers.max(1),
            policy,
        ));
        info!(
            service = AGGREGATION_WORKER,
            workers = config.workers.max(1),
            max_attempts = policy.max_attempts,
            "Aggregation queue started"
        );

        Self {
            sender,
            in_flight,
            shutdown_tx,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Queue a workout for aggregation.
    ///
    /// Returns `false` if the same workout is already queued or running, or if the
    /// queue has shut down.
    pub fn enqueue(&self, workout: CompletedWorkout) -> bool {
        let key = (workout.user_id, workout.workout_id.clone());
        if !self.in_flight.insert(key.clone()) {
            debug!(
                user_id = %workout.user_id,
                workout_id = %workout.workout_id,
                "Workout already queued for aggregation"
            );
            return false;
        }
        if self.sender.send(workout).is_err() {
            self.in_flight.remove(&key);
            warn!(user_id = %key.0, workout_id = %key.1, "Aggregation queue is closed");
            return false;
        }
        true
    }

    /// Workouts queued or running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Stop accepting work, drain the queue and wait for running jobs
    pub async fn shutdown(&self) {
        // send_replace succeeds even when the dispatcher has already exited
        self.shutdown_tx.send_replace(true);
        let handle = self.dispatcher.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Aggregation dispatcher task failed");
            }
        }
        info!(service = AGGREGATION_WORKER, "Aggregation queue stopped");
    }
}

async fn dispatch(
    pipeline: AggregationPipeline,
    mut receiver: mpsc::UnboundedReceiver<CompletedWorkout>,
    mut shutdown_rx: watch::Receiver<bool>,
    in_flight: Arc<DashSet<JobKey>>,
    workers: usize,
    policy: RetryPolicy,
) {
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut jobs = JoinSet::new();
    let mut closing = false;

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed(), if !closing => {
                debug!("Aggregation dispatcher draining");
                closing = true;
                receiver.close();
            }
            next = receiver.recv() => {
                let Some(workout) = next else { break };
                let Ok(permit) = semaphore.clone().acquire_owned().await else { break };
                let pipeline = pipeline.clone();
                let in_flight = in_flight.clone();
                jobs.spawn(async move {
                    let _permit = permit;
                    run_job(&pipeline, &workout, policy).await;
                    in_flight.remove(&(workout.user_id, workout.workout_id));
                });
            }
        }

        while let Some(joined) = jobs.try_join_next() {
            if let Err(e) = joined {
                error!(error = %e, "Aggregation job panicked");
            }
        }
    }

    while let Some(joined) = jobs.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Aggregation job panicked");
        }
    }
}

/// Run one job with retries, dead-lettering it on exhaustion
async fn run_job(pipeline: &AggregationPipeline, workout: &CompletedWorkout, policy: RetryPolicy) {
    for attempt in 1..=policy.max_attempts {
        match pipeline.process(workout).await {
            Ok(AggregationOutcome::AlreadyAggregated) => {
                debug!(
                    user_id = %workout.user_id,
                    workout_id = %workout.workout_id,
                    attempt,
                    "Duplicate aggregation job ignored"
                );
                return;
            }
            Ok(AggregationOutcome::Aggregated { .. }) => return,
            Err(e) if !e.code.is_client_error() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    user_id = %workout.user_id,
                    workout_id = %workout.workout_id,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Aggregation attempt failed, retrying"
                );
                sleep(delay).await;
            }
            Err(e) => {
                error!(
                    user_id = %workout.user_id,
                    workout_id = %workout.workout_id,
                    attempt,
                    error = %e,
                    "Aggregation failed permanently"
                );
                if let Err(record_error) = pipeline
                    .database()
                    .record_aggregation_failure(workout, attempt, &e.to_string())
                    .await
                {
                    error!(
                        workout_id = %workout.workout_id,
                        error = %record_error,
                        "Failed to dead-letter aggregation job"
                    );
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use pierre_core::models::{LoggedSet, WorkoutExercise};
    use pierre_intelligence::{ExerciseAttribution, MuscleTaxonomy};

    use super::*;
    use crate::catalog::{ExerciseCatalog, InMemoryCatalog};
    use crate::database::create_test_db;
    use crate::errors::{AppError, AppResult};

    struct UnavailableCatalog {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ExerciseCatalog for UnavailableCatalog {
        async fn get_attribution(&self, _: &str) -> AppResult<Option<ExerciseAttribution>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::database("catalog offline"))
        }
    }

    fn workout(user_id: Uuid, workout_id: &str) -> CompletedWorkout {
        CompletedWorkout {
            workout_id: workout_id.to_owned(),
            user_id,
            end_time: Utc::now(),
            utc_offset_minutes: 0,
            exercises: vec![WorkoutExercise {
                exercise_id: "squat".to_owned(),
                name: None,
                sets: vec![LoggedSet {
                    set_index: 0,
                    reps: 5,
                    weight_kg: 120.0,
                    rir: Some(1),
                    is_warmup: false,
                    is_failure: false,
                    completed: true,
                    deleted: false,
                }],
            }],
        }
    }

    fn fast_config() -> AggregationConfig {
        AggregationConfig {
            workers: 2,
            max_attempts: 3,
            retry_base_ms: 1,
        }
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 5,
            retry_base: Duration::from_millis(50),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(50));
        assert_eq!(policy.backoff(2), Duration::from_millis(100));
        assert_eq!(policy.backoff(4), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_enqueue_rejects_duplicates_and_drains_on_shutdown() {
        let database = Arc::new(create_test_db().await.unwrap());
        let pipeline = AggregationPipeline::new(
            database.clone(),
            Arc::new(InMemoryCatalog::new()),
            Arc::new(MuscleTaxonomy::standard()),
        );
        let queue = AggregationQueue::start(pipeline, &fast_config());
        let user_id = Uuid::new_v4();

        assert!(queue.enqueue(workout(user_id, "w1")));
        assert!(!queue.enqueue(workout(user_id, "w1")));
        assert!(queue.enqueue(workout(user_id, "w2")));

        queue.shutdown().await;
        assert_eq!(queue.pending(), 0);
        assert!(database.is_workout_aggregated(user_id, "w1").await.unwrap());
        assert!(database.is_workout_aggregated(user_id, "w2").await.unwrap());
        assert!(!queue.enqueue(workout(user_id, "w3")));
    }

    #[tokio::test]
    async fn test_exhausted_job_is_dead_lettered() {
        let database = Arc::new(create_test_db().await.unwrap());
        let catalog = Arc::new(UnavailableCatalog {
            calls: AtomicU32::new(0),
        });
        let pipeline = AggregationPipeline::new(
            database.clone(),
            catalog.clone(),
            Arc::new(MuscleTaxonomy::standard()),
        );
        let queue = AggregationQueue::start(pipeline, &fast_config());
        let user_id = Uuid::new_v4();

        assert!(queue.enqueue(workout(user_id, "doomed")));
        queue.shutdown().await;

        assert_eq!(catalog.calls.load(Ordering::SeqCst), 3);
        let failures = database.list_aggregation_failures(10).await.unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].workout_id, "doomed");
        assert_eq!(failures[0].attempts, 3);
        assert!(!database.is_workout_aggregated(user_id, "doomed").await.unwrap());
    }
}
