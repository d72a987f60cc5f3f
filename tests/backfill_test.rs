// ABOUTME: Integration tests for resumable history backfill
// ABOUTME: Verifies watermark resume, idempotent re-runs, per-user filtering, and duplicate delivery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{bench_workout, TestHarness};
use pierre_core::models::{CompletedWorkout, SeriesKind};
use pierre_training_analytics::aggregation::{
    AggregationQueue, BackfillJob, InMemoryWorkoutSource,
};
use pierre_training_analytics::config::AggregationConfig;
use pierre_training_analytics::database::BackfillWatermark;
use uuid::Uuid;

fn history(user_id: Uuid, weeks: i64) -> Vec<CompletedWorkout> {
    (0..weeks)
        .map(|w| bench_workout(user_id, w, 100.0))
        .collect()
}

fn job(harness: &TestHarness, workouts: Vec<CompletedWorkout>, batch_size: u32) -> BackfillJob {
    BackfillJob::new(
        harness.pipeline.clone(),
        Arc::new(InMemoryWorkoutSource::new(workouts)),
        batch_size,
    )
}

async fn total_bench_sets(harness: &TestHarness, user_id: Uuid) -> i64 {
    harness
        .database
        .get_series(user_id, SeriesKind::Exercise, "bench_press")
        .await
        .unwrap()
        .summary
        .total_sets
}

#[tokio::test]
async fn test_backfill_processes_history_across_batches() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    let workouts = history(user_id, 5);
    let newest = workouts[0].clone();

    let report = job(&harness, workouts, 2).run(user_id).await.unwrap();
    assert_eq!(report.processed, 5);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(
        report.watermark,
        Some(BackfillWatermark {
            end_time: newest.end_time,
            workout_id: newest.workout_id,
        })
    );
    assert_eq!(total_bench_sets(&harness, user_id).await, 15);
}

#[tokio::test]
async fn test_rerun_after_completion_does_nothing() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();

    job(&harness, history(user_id, 4), 10)
        .run(user_id)
        .await
        .unwrap();
    let rerun = job(&harness, history(user_id, 4), 10)
        .run(user_id)
        .await
        .unwrap();

    assert_eq!(rerun.processed, 0);
    assert_eq!(rerun.skipped, 0);
    assert_eq!(total_bench_sets(&harness, user_id).await, 12);
}

#[tokio::test]
async fn test_resume_from_stored_watermark() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    let workouts = history(user_id, 5);

    // The two oldest were committed before the interruption
    let oldest = &workouts[4];
    let second = &workouts[3];
    harness.aggregate(&[oldest.clone(), second.clone()]).await.unwrap();
    harness
        .database
        .set_backfill_watermark(
            user_id,
            &BackfillWatermark {
                end_time: second.end_time,
                workout_id: second.workout_id.clone(),
            },
        )
        .await
        .unwrap();

    let report = job(&harness, workouts, 2).run(user_id).await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(total_bench_sets(&harness, user_id).await, 15);
}

#[tokio::test]
async fn test_interrupted_commit_is_skipped_not_double_counted() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    let workouts = history(user_id, 3);

    // Committed, but the watermark write never happened
    harness.aggregate(&[workouts[1].clone()]).await.unwrap();

    let report = job(&harness, workouts, 50).run(user_id).await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(total_bench_sets(&harness, user_id).await, 9);
}

#[tokio::test]
async fn test_backfill_only_touches_the_requested_user() {
    let user_id = Uuid::new_v4();
    let other_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    let mut workouts = history(user_id, 2);
    workouts.extend(
        history(other_id, 2)
            .into_iter()
            .map(|mut w| {
                w.workout_id = format!("other-{}", w.workout_id);
                w
            }),
    );

    let report = job(&harness, workouts, 50).run(user_id).await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(total_bench_sets(&harness, user_id).await, 6);
    assert_eq!(total_bench_sets(&harness, other_id).await, 0);
}

#[tokio::test]
async fn test_duplicate_and_concurrent_deliveries_count_once() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    let workout = bench_workout(user_id, 0, 100.0);
    let config = AggregationConfig::default();

    let first = AggregationQueue::start(harness.pipeline.clone(), &config);
    let second = AggregationQueue::start(harness.pipeline.clone(), &config);
    assert!(first.enqueue(workout.clone()));
    assert!(!first.enqueue(workout.clone()));
    assert!(second.enqueue(workout.clone()));
    first.shutdown().await;
    second.shutdown().await;
    assert_eq!(first.pending(), 0);

    let redelivery = AggregationQueue::start(harness.pipeline.clone(), &config);
    assert!(redelivery.enqueue(workout.clone()));
    redelivery.shutdown().await;

    assert_eq!(total_bench_sets(&harness, user_id).await, 3);
    assert!(harness
        .database
        .is_workout_aggregated(user_id, &workout.workout_id)
        .await
        .unwrap());
}
