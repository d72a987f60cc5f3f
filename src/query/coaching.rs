// ABOUTME: Fixed-shape coaching pack: top muscle groups, adherence, and alert flags
// ABOUTME: Lists are cut by fixed counts until the pack fits its byte budget
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Coaching Pack
//!
//! The first call an agent makes for a user. Everything is computed from the weekly
//! series and the aggregation markers, so the pack costs a handful of indexed reads.

use chrono::{DateTime, NaiveDate, Utc};
use pierre_core::constants::limits::{
    COACHING_PACK_MAX_ALERTS, COACHING_PACK_TRIM_STEPS, COACHING_PACK_WINDOW_WEEKS,
    SUMMARY_TOP_EXERCISES,
};
use pierre_core::models::SeriesKind;
use pierre_intelligence::ProgressAnalyzer;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::caps::{anchor_week, clamp_window_weeks, window_start};
use super::params::CoachingPackParams;
use super::response::{Envelope, ResponseBuilder};
use super::service::QueryService;
use crate::database::SeriesTotal;
use crate::errors::AppResult;

/// Sessions per week against the configured target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adherence {
    /// Weeks in the window with at least one session
    pub weeks_trained: usize,
    /// Effective window
    pub window_weeks: u32,
    /// Sessions divided by window weeks
    pub avg_sessions_per_week: f64,
    /// Sessions per week considered fully adherent
    pub target: u32,
    /// `min(avg / target, 1)`
    pub score: f64,
}

/// One raised flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    /// Series class the flag was raised on
    pub entity_kind: SeriesKind,
    /// Entity id
    pub entity_id: String,
    /// `plateau`, `deload` or `overreach`
    pub flag: &'static str,
}

/// `context.coaching.pack` payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachingPack {
    /// Effective window
    pub window_weeks: u32,
    /// First week of the window
    pub window_start: NaiveDate,
    /// Anchor week
    pub window_end: NaiveDate,
    /// Muscle groups ranked by effective volume in the window
    pub top_muscle_groups: Vec<SeriesTotal>,
    /// Training frequency
    pub adherence: Adherence,
    /// Flags raised on the leading groups and exercises
    pub alerts: Vec<Alert>,
    /// Computation time
    pub generated_at: DateTime<Utc>,
}

impl CoachingPack {
    fn cut_to(&mut self, n: usize) {
        self.top_muscle_groups.truncate(n);
        self.alerts.truncate(n);
    }
}

impl QueryService {
    /// `context.coaching.pack`
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` for a malformed `as_of`, or a storage error
    pub async fn coaching_pack(
        &self,
        user_id: Uuid,
        params: &CoachingPackParams,
    ) -> AppResult<Envelope<CoachingPack>> {
        let current_week = anchor_week(params.as_of.as_deref())?;
        let window_weeks = clamp_window_weeks(params.window_weeks, COACHING_PACK_WINDOW_WEEKS);
        let from_week = window_start(current_week, window_weeks);
        let [initial, trim_steps @ ..] = COACHING_PACK_TRIM_STEPS;

        let top_muscle_groups = self
            .database
            .series_totals(
                user_id,
                SeriesKind::MuscleGroup,
                from_week,
                current_week,
                initial as u32,
            )
            .await?;
        let top_exercises = self
            .database
            .series_totals(
                user_id,
                SeriesKind::Exercise,
                from_week,
                current_week,
                SUMMARY_TOP_EXERCISES as u32,
            )
            .await?;

        let mut alerts = Vec::new();
        let candidates = top_muscle_groups
            .iter()
            .map(|g| (SeriesKind::MuscleGroup, g))
            .chain(top_exercises.iter().map(|e| (SeriesKind::Exercise, e)));
        for (kind, total) in candidates {
            if alerts.len() >= COACHING_PACK_MAX_ALERTS {
                break;
            }
            let history = self
                .series_history(user_id, kind, &total.entity_id, current_week)
                .await?;
            let flags = ProgressAnalyzer::series_flags(&history);
            alerts.extend(flags.active().into_iter().map(|flag| Alert {
                entity_kind: kind,
                entity_id: total.entity_id.clone(),
                flag,
            }));
        }
        alerts.truncate(COACHING_PACK_MAX_ALERTS);

        let adherence = self
            .adherence(user_id, from_week, current_week, window_weeks)
            .await?;
        let mut pack = CoachingPack {
            window_weeks,
            window_start: from_week,
            window_end: current_week,
            top_muscle_groups,
            adherence,
            alerts,
            generated_at: Utc::now(),
        };

        let builder = ResponseBuilder::summary();
        let mut truncated = false;
        let mut limit = initial;
        for step in trim_steps {
            let candidate =
                builder.bounded_object(&pack, pack.top_muscle_groups.len(), limit, truncated)?;
            if candidate.meta.response_bytes.unwrap_or_default() <= builder.budget() {
                break;
            }
            debug!(
                user_id = %user_id,
                response_bytes = candidate.meta.response_bytes,
                cut_to = step,
                "Coaching pack over budget, trimming lists"
            );
            truncated |= pack.top_muscle_groups.len() > step || pack.alerts.len() > step;
            pack.cut_to(step);
            limit = step;
        }

        let returned = pack.top_muscle_groups.len();
        builder.bounded_object(pack, returned, limit, truncated)
    }

    async fn adherence(
        &self,
        user_id: Uuid,
        from_week: NaiveDate,
        to_week: NaiveDate,
        window_weeks: u32,
    ) -> AppResult<Adherence> {
        let counts = self
            .database
            .weekly_session_counts(user_id, from_week, to_week)
            .await?;
        let weeks_trained = counts.iter().filter(|(_, sessions)| *sessions > 0).count();
        let sessions: i64 = counts.iter().map(|(_, sessions)| sessions).sum();
        let avg_sessions_per_week = sessions as f64 / f64::from(window_weeks.max(1));
        let target = self.config.adherence_target_sessions;
        let score = if target == 0 {
            1.0
        } else {
            (avg_sessions_per_week / f64::from(target)).min(1.0)
        };

        Ok(Adherence {
            weeks_trained,
            window_weeks,
            avg_sessions_per_week,
            target,
            score,
        })
    }
}
