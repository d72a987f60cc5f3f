// ABOUTME: Integration tests for the active workout snapshot and event log endpoints
// ABOUTME: Writes sessions through storage and reads them back through the tools
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use common::TestHarness;
use pierre_core::constants::tools::{ACTIVE_EVENTS_LIST, ACTIVE_SNAPSHOT_LITE};
use pierre_core::models::{ActiveSet, ActiveWorkout, SetPatch, WorkoutEvent, WorkoutEventKind};
use pierre_training_analytics::errors::ErrorCode;
use serde_json::{json, Value};
use uuid::Uuid;

fn event(
    user_id: Uuid,
    workout_id: &str,
    occurred_at: DateTime<Utc>,
    kind: WorkoutEventKind,
) -> WorkoutEvent {
    WorkoutEvent {
        event_id: Uuid::new_v4().to_string(),
        workout_id: workout_id.to_owned(),
        user_id,
        occurred_at,
        kind,
    }
}

fn logged(set_index: u32, reps: i32, weight_kg: f64) -> ActiveSet {
    ActiveSet {
        set_index,
        reps,
        weight_kg,
        rir: Some(2),
        is_warmup: false,
        is_failure: false,
    }
}

/// Start a session and log `sets_per_exercise` sets on each exercise
async fn start_session(
    harness: &TestHarness,
    user_id: Uuid,
    workout_id: &str,
    started_at: DateTime<Utc>,
    exercises: &[&str],
    sets_per_exercise: u32,
) -> usize {
    harness
        .database
        .upsert_active_workout(&ActiveWorkout {
            workout_id: workout_id.to_owned(),
            user_id,
            started_at,
            updated_at: started_at,
            exercises: Vec::new(),
        })
        .await
        .unwrap();

    let mut at = started_at;
    let mut events = vec![event(user_id, workout_id, at, WorkoutEventKind::WorkoutStarted)];
    for exercise_id in exercises {
        at += Duration::minutes(1);
        events.push(event(
            user_id,
            workout_id,
            at,
            WorkoutEventKind::ExerciseAdded {
                exercise_id: (*exercise_id).to_owned(),
            },
        ));
        for set_index in 0..sets_per_exercise {
            at += Duration::minutes(2);
            events.push(event(
                user_id,
                workout_id,
                at,
                WorkoutEventKind::SetLogged {
                    exercise_id: (*exercise_id).to_owned(),
                    set: logged(set_index, 8, 60.0),
                },
            ));
        }
    }
    for event in &events {
        harness.database.append_workout_event(event).await.unwrap();
    }
    events.len()
}

#[tokio::test]
async fn test_no_active_workout_reads_as_null() {
    let harness = TestHarness::new().await.unwrap();

    let envelope = harness
        .call(ACTIVE_SNAPSHOT_LITE, Uuid::new_v4(), json!({}))
        .await
        .unwrap();
    assert_eq!(envelope["success"], json!(true));
    assert_eq!(envelope["data"], Value::Null);
    assert_eq!(envelope["meta"]["returned"], json!(0));
}

#[tokio::test]
async fn test_snapshot_reflects_logged_and_edited_sets() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    let started_at = Utc::now() - Duration::minutes(30);
    start_session(&harness, user_id, "w-live", started_at, &["bench_press"], 3).await;

    harness
        .database
        .append_workout_event(&event(
            user_id,
            "w-live",
            Utc::now(),
            WorkoutEventKind::SetEdited {
                exercise_id: "bench_press".to_owned(),
                set_index: 2,
                patches: vec![SetPatch::WeightKg(62.5), SetPatch::IsFailure(true)],
            },
        ))
        .await
        .unwrap();

    let envelope = harness
        .call(ACTIVE_SNAPSHOT_LITE, user_id, json!({}))
        .await
        .unwrap();
    let snapshot = &envelope["data"];
    assert_eq!(snapshot["workout_id"], json!("w-live"));
    assert_eq!(snapshot["exercise_count"], json!(1));
    assert_eq!(snapshot["set_count"], json!(3));
    assert_eq!(snapshot["exercises"][0]["sets_done"], json!(3));
    assert_eq!(snapshot["exercises"][0]["last_set"]["weight_kg"], json!(62.5));
    assert_eq!(snapshot["exercises"][0]["last_set"]["is_failure"], json!(true));
    assert_eq!(envelope["truncated"], json!(false));
}

#[tokio::test]
async fn test_snapshot_limit_truncates_exercises() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    start_session(
        &harness,
        user_id,
        "w-big",
        Utc::now() - Duration::hours(1),
        &["bench_press", "barbell_row", "back_squat"],
        2,
    )
    .await;

    let envelope = harness
        .call(ACTIVE_SNAPSHOT_LITE, user_id, json!({ "limit": 2 }))
        .await
        .unwrap();
    assert_eq!(envelope["truncated"], json!(true));
    assert_eq!(envelope["meta"]["returned"], json!(2));
    assert_eq!(envelope["data"]["exercise_count"], json!(3));
    assert_eq!(envelope["data"]["set_count"], json!(6));
}

#[tokio::test]
async fn test_completed_workout_is_no_longer_latest() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    start_session(
        &harness,
        user_id,
        "w-done",
        Utc::now() - Duration::hours(2),
        &["bench_press"],
        1,
    )
    .await;
    harness
        .database
        .append_workout_event(&event(
            user_id,
            "w-done",
            Utc::now(),
            WorkoutEventKind::WorkoutCompleted,
        ))
        .await
        .unwrap();

    let latest = harness
        .call(ACTIVE_SNAPSHOT_LITE, user_id, json!({}))
        .await
        .unwrap();
    assert_eq!(latest["data"], Value::Null);

    let named = harness
        .call(ACTIVE_SNAPSHOT_LITE, user_id, json!({ "workout_id": "w-done" }))
        .await
        .unwrap();
    assert_eq!(named["data"]["workout_id"], json!("w-done"));

    let missing = harness
        .call(ACTIVE_SNAPSHOT_LITE, user_id, json!({ "workout_id": "w-nope" }))
        .await
        .unwrap_err();
    assert_eq!(missing.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_events_page_newest_first_without_gaps() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    let total = start_session(
        &harness,
        user_id,
        "w-log",
        Utc::now() - Duration::hours(1),
        &["bench_press", "barbell_row"],
        3,
    )
    .await;

    let mut seen = HashSet::new();
    let mut times = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut args = json!({ "workout_id": "w-log", "limit": 3 });
        if let Some(cursor) = &cursor {
            args["cursor"] = json!(cursor);
        }
        let envelope = harness.call(ACTIVE_EVENTS_LIST, user_id, args).await.unwrap();
        for item in envelope["data"].as_array().unwrap() {
            assert!(seen.insert(item["event_id"].as_str().unwrap().to_owned()));
            times.push(
                item["occurred_at"]
                    .as_str()
                    .unwrap()
                    .parse::<DateTime<Utc>>()
                    .unwrap(),
            );
        }
        match envelope["next_cursor"].as_str() {
            Some(next) => cursor = Some(next.to_owned()),
            None => break,
        }
    }

    assert_eq!(seen.len(), total);
    assert!(times.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[tokio::test]
async fn test_events_require_workout_id() {
    let harness = TestHarness::new().await.unwrap();

    let missing = harness
        .call(ACTIVE_EVENTS_LIST, Uuid::new_v4(), json!({}))
        .await
        .unwrap_err();
    assert_eq!(missing.code, ErrorCode::InvalidInput);

    let blank = harness
        .call(ACTIVE_EVENTS_LIST, Uuid::new_v4(), json!({ "workout_id": "" }))
        .await
        .unwrap_err();
    assert_eq!(blank.code, ErrorCode::ValidationFailed);
}
