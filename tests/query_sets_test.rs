// ABOUTME: Integration tests for the sets.query endpoint
// ABOUTME: Covers cursor pagination, caps, projection, target resolution, and user isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::collections::HashSet;

use chrono::{Duration, Utc};
use common::{bench_workout, sets, workout, TestHarness};
use pierre_core::constants::tools::SETS_QUERY;
use pierre_training_analytics::errors::ErrorCode;
use serde_json::{json, Value};
use uuid::Uuid;

fn date_range() -> (String, String) {
    let today = Utc::now().date_naive();
    (
        (today - Duration::weeks(60)).to_string(),
        today.to_string(),
    )
}

fn bench_args(extra: Value) -> Value {
    let (start, end) = date_range();
    let mut args = json!({
        "exercise_ids": ["bench_press"],
        "start_date": start,
        "end_date": end,
    });
    if let (Some(args), Some(extra)) = (args.as_object_mut(), extra.as_object()) {
        args.extend(extra.clone());
    }
    args
}

async fn seeded(user_id: Uuid) -> TestHarness {
    let harness = TestHarness::new().await.unwrap();
    let mut workouts: Vec<_> = (0..6)
        .map(|weeks_ago| bench_workout(user_id, weeks_ago, 80.0 + weeks_ago as f64))
        .collect();
    workouts.push(workout(
        user_id,
        "squat-1",
        Utc::now() - Duration::days(2),
        vec![("back_squat", sets(&[(5, 120.0, Some(2))]))],
    ));
    harness.aggregate(&workouts).await.unwrap();
    harness
}

#[tokio::test]
async fn test_cursor_pagination_visits_every_set_once() {
    let user_id = Uuid::new_v4();
    let harness = seeded(user_id).await;

    let mut seen = HashSet::new();
    let mut page_sizes = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut args = bench_args(json!({ "limit": 5 }));
        if let Some(cursor) = &cursor {
            args["cursor"] = json!(cursor);
        }
        let envelope = harness.call(SETS_QUERY, user_id, args).await.unwrap();
        let items = envelope["data"].as_array().unwrap();
        page_sizes.push(items.len());
        for item in items {
            assert!(seen.insert(item["set_id"].as_str().unwrap().to_owned()));
        }
        match envelope["next_cursor"].as_str() {
            Some(next) => cursor = Some(next.to_owned()),
            None => break,
        }
    }

    assert_eq!(seen.len(), 18);
    assert_eq!(page_sizes, vec![5, 5, 5, 3]);
}

#[tokio::test]
async fn test_newest_sets_come_first() {
    let user_id = Uuid::new_v4();
    let harness = seeded(user_id).await;

    let envelope = harness
        .call(SETS_QUERY, user_id, bench_args(json!({ "limit": 18 })))
        .await
        .unwrap();
    let times: Vec<&str> = envelope["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["workout_end_time"].as_str().unwrap())
        .collect();
    let mut sorted = times.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(times, sorted);
    assert_eq!(envelope["data"][0]["weight_kg"], json!(80.0));
}

#[tokio::test]
async fn test_limit_is_clamped_not_rejected() {
    let user_id = Uuid::new_v4();
    let harness = seeded(user_id).await;

    let large = harness
        .call(SETS_QUERY, user_id, bench_args(json!({ "limit": 100_000 })))
        .await
        .unwrap();
    assert_eq!(large["meta"]["limit"], json!(200));
    assert_eq!(large["meta"]["returned"], json!(18));
    assert_eq!(large["truncated"], json!(false));

    let zero = harness
        .call(SETS_QUERY, user_id, bench_args(json!({ "limit": 0 })))
        .await
        .unwrap();
    assert_eq!(zero["meta"]["limit"], json!(1));
    assert_eq!(zero["meta"]["returned"], json!(1));
    assert!(zero["next_cursor"].is_string());
}

#[tokio::test]
async fn test_fields_are_projected_to_allowlist() {
    let user_id = Uuid::new_v4();
    let harness = seeded(user_id).await;

    let envelope = harness
        .call(
            SETS_QUERY,
            user_id,
            bench_args(json!({ "fields": ["set_id", "reps", "password_hash", "reps"] })),
        )
        .await
        .unwrap();
    for item in envelope["data"].as_array().unwrap() {
        let keys: Vec<&String> = item.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(item.get("set_id").is_some());
        assert!(item.get("reps").is_some());
    }
}

#[tokio::test]
async fn test_muscle_targets_resolve_through_taxonomy() {
    let user_id = Uuid::new_v4();
    let harness = seeded(user_id).await;
    let (start, end) = date_range();

    let chest = harness
        .call(
            SETS_QUERY,
            user_id,
            json!({ "muscle_group": "chest", "start_date": start, "end_date": end, "limit": 200 }),
        )
        .await
        .unwrap();
    assert_eq!(chest["meta"]["returned"], json!(18));

    let pecs = harness
        .call(
            SETS_QUERY,
            user_id,
            json!({ "muscle": "pecs", "start_date": start, "end_date": end, "limit": 200 }),
        )
        .await
        .unwrap();
    assert_eq!(pecs["meta"]["returned"], json!(18));

    let legs = harness
        .call(
            SETS_QUERY,
            user_id,
            json!({ "muscle_group": "legs", "start_date": start, "end_date": end }),
        )
        .await
        .unwrap();
    assert_eq!(legs["meta"]["returned"], json!(1));
    assert_eq!(legs["data"][0]["exercise_id"], json!("back_squat"));

    let wrong_kind = harness
        .call(
            SETS_QUERY,
            user_id,
            json!({ "muscle_group": "pecs", "start_date": start, "end_date": end }),
        )
        .await
        .unwrap_err();
    assert_eq!(wrong_kind.code, ErrorCode::ValidationFailed);
}

#[tokio::test]
async fn test_invalid_targets_are_rejected_before_storage() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    let (start, end) = date_range();

    let ambiguous = harness
        .call(
            SETS_QUERY,
            user_id,
            json!({
                "muscle_group": "chest",
                "exercise_ids": ["bench_press"],
                "start_date": start,
                "end_date": end,
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(ambiguous.code, ErrorCode::ValidationFailed);

    let ids: Vec<String> = (0..11).map(|i| format!("exercise_{i}")).collect();
    let too_many = harness
        .call(
            SETS_QUERY,
            user_id,
            json!({ "exercise_ids": ids, "start_date": start, "end_date": end }),
        )
        .await
        .unwrap_err();
    assert_eq!(too_many.code, ErrorCode::ValidationFailed);

    let reversed = harness
        .call(
            SETS_QUERY,
            user_id,
            json!({ "exercise_ids": ["bench_press"], "start_date": end, "end_date": start }),
        )
        .await
        .unwrap_err();
    assert_eq!(reversed.code, ErrorCode::ValidationFailed);

    let bad_sort = harness
        .call(SETS_QUERY, user_id, bench_args(json!({ "sort": "random" })))
        .await
        .unwrap_err();
    assert_eq!(bad_sort.code, ErrorCode::ValidationFailed);
}

#[tokio::test]
async fn test_cursor_from_other_sort_restarts_pagination() {
    let user_id = Uuid::new_v4();
    let harness = seeded(user_id).await;

    let by_date = harness
        .call(SETS_QUERY, user_id, bench_args(json!({ "limit": 4 })))
        .await
        .unwrap();
    let date_cursor = by_date["next_cursor"].as_str().unwrap().to_owned();

    let first_by_e1rm = harness
        .call(
            SETS_QUERY,
            user_id,
            bench_args(json!({ "limit": 4, "sort": "e1rm_desc" })),
        )
        .await
        .unwrap();
    let reused = harness
        .call(
            SETS_QUERY,
            user_id,
            bench_args(json!({ "limit": 4, "sort": "e1rm_desc", "cursor": date_cursor })),
        )
        .await
        .unwrap();
    assert_eq!(reused["data"], first_by_e1rm["data"]);

    let e1rms: Vec<f64> = first_by_e1rm["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["e1rm"].as_f64().unwrap())
        .collect();
    assert!(e1rms.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[tokio::test]
async fn test_users_only_see_their_own_sets() {
    let user_id = Uuid::new_v4();
    let harness = seeded(user_id).await;

    let envelope = harness
        .call(SETS_QUERY, Uuid::new_v4(), bench_args(json!({})))
        .await
        .unwrap();
    assert_eq!(envelope["meta"]["returned"], json!(0));
    assert_eq!(envelope["next_cursor"], Value::Null);
    assert_eq!(envelope["success"], json!(true));
}

/// Walk every page of a query, returning page sizes and the set ids in order
async fn walk_pages(harness: &TestHarness, user_id: Uuid, base: &Value) -> (Vec<usize>, Vec<String>) {
    let mut page_sizes = Vec::new();
    let mut ids = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut args = base.clone();
        if let Some(cursor) = &cursor {
            args["cursor"] = json!(cursor);
        }
        let envelope = harness.call(SETS_QUERY, user_id, args).await.unwrap();
        let items = envelope["data"].as_array().unwrap();
        page_sizes.push(items.len());
        ids.extend(items.iter().map(|item| item["set_id"].as_str().unwrap().to_owned()));
        match envelope["next_cursor"].as_str() {
            Some(next) => cursor = Some(next.to_owned()),
            None => break,
        }
        assert!(page_sizes.len() < 100, "pagination did not advance");
    }
    (page_sizes, ids)
}

#[tokio::test]
async fn test_e1rm_pagination_advances_through_tied_values() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    // Every set is 5 x 100kg, so all 18 share the e1rm 116.666...
    let workouts: Vec<_> = (0..6)
        .map(|weeks| bench_workout(user_id, weeks, 100.0))
        .collect();
    harness.aggregate(&workouts).await.unwrap();

    let (page_sizes, ids) = walk_pages(
        &harness,
        user_id,
        &bench_args(json!({ "sort": "e1rm_desc", "limit": 4 })),
    )
    .await;

    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(ids.len(), 18);
    assert_eq!(page_sizes, vec![4, 4, 4, 4, 2]);
}

#[tokio::test]
async fn test_wide_projection_is_cut_to_byte_budget_and_resumes() {
    let user_id = Uuid::new_v4();
    let harness = TestHarness::new().await.unwrap();
    let workouts: Vec<_> = (0..40)
        .map(|day| {
            workout(
                user_id,
                &format!("volume-day-{day}"),
                Utc::now() - Duration::days(day + 1),
                vec![(
                    "bench_press",
                    sets(&[
                        (8, 80.0, Some(2)),
                        (8, 80.0, Some(2)),
                        (8, 80.0, Some(1)),
                        (8, 80.0, Some(1)),
                        (8, 80.0, Some(0)),
                    ]),
                )],
            )
        })
        .collect();
    harness.aggregate(&workouts).await.unwrap();

    let fields = [
        "set_id",
        "workout_id",
        "exercise_id",
        "exercise_name",
        "set_index",
        "workout_end_time",
        "week_start",
        "reps",
        "weight_kg",
        "rir",
        "is_warmup",
        "is_failure",
        "volume",
        "e1rm",
        "e1rm_confidence",
        "hard_set_credit",
        "muscle_group_contrib",
        "muscle_contrib",
        "effective_volume_by_group",
        "effective_volume_by_muscle",
    ];
    let args = bench_args(json!({ "limit": 200, "fields": fields }));

    let first = harness.call(SETS_QUERY, user_id, args.clone()).await.unwrap();
    let returned = first["meta"]["returned"].as_u64().unwrap();
    assert_eq!(first["truncated"], json!(true));
    assert!(returned > 0 && returned < 200);
    assert!(first["meta"]["response_bytes"].as_u64().unwrap() <= 32 * 1024);
    let last_id = first["data"][returned as usize - 1]["set_id"].clone();
    assert!(first["next_cursor"].is_string());

    let (page_sizes, ids) = walk_pages(&harness, user_id, &args).await;
    assert_eq!(page_sizes[0] as u64, returned);
    assert_eq!(json!(ids[returned as usize - 1]), last_id);
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), 200);
    assert_eq!(ids.len(), 200);
}
