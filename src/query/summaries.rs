// ABOUTME: Progress summaries combining a windowed series with trends and read-time flags
// ABOUTME: Group and muscle summaries use their top exercises as strength proxies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::NaiveDate;
use pierre_core::constants::limits::{
    DEFAULT_WINDOW_WEEKS, SUMMARY_PROXY_TRENDS, SUMMARY_TOP_EXERCISES,
};
use pierre_core::models::{SeriesDocument, SeriesKind, WeeklyPoint, WeeklyPointView};
use pierre_intelligence::{E1rmTrend, ProgressAnalyzer, ProgressFlags, RepRangeMix};
use serde::Serialize;
use uuid::Uuid;

use super::caps::{anchor_week, clamp_window_weeks, window_start};
use super::params::SeriesParams;
use super::response::{Envelope, ResponseBuilder};
use super::service::QueryService;
use crate::database::ExerciseVolume;
use crate::errors::AppResult;

/// Counters summed over a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowTotals {
    /// Working sets
    pub sets: i64,
    /// Hard-set credit
    pub hard_sets: f64,
    /// Raw volume
    pub volume: f64,
    /// Attributed effective volume
    pub effective_volume: f64,
    /// Average RIR over rated sets
    pub avg_rir: Option<f64>,
}

impl WindowTotals {
    fn of(document: &SeriesDocument) -> Self {
        let merged = document
            .weeks
            .values()
            .fold(WeeklyPoint::default(), |mut acc, point| {
                acc.absorb(point);
                acc
            });
        Self {
            sets: merged.sets,
            hard_sets: merged.hard_sets,
            volume: merged.volume,
            effective_volume: merged.effective_volume,
            avg_rir: merged.avg_rir(),
        }
    }
}

/// `progress.exercise.summary` payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseProgressSummary {
    /// Exercise id
    pub exercise_id: String,
    /// Effective window
    pub window_weeks: u32,
    /// Weeks with data in the window
    pub weeks_in_window: usize,
    /// Weekly best e1RM, first to last week of the window
    pub e1rm_trend: Option<E1rmTrend>,
    /// Share of sets per rep range in the window
    pub rep_range_mix: RepRangeMix,
    /// Read-time flags
    pub flags: ProgressFlags,
    /// Names of the flags that are set
    pub active_flags: Vec<&'static str>,
    /// Window totals
    pub totals: WindowTotals,
    /// Best e1RM ever recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_e1rm: Option<f64>,
    /// Most recent week in the window
    pub latest_week: Option<WeeklyPointView>,
}

/// e1RM trend of one proxy exercise
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyTrend {
    /// Exercise id
    pub exercise_id: String,
    /// Trend over the window, if the exercise has e1RM weeks
    pub e1rm_trend: Option<E1rmTrend>,
}

/// `progress.muscle_group.summary` and `progress.muscle.summary` payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityProgressSummary {
    /// `muscle_group` or `muscle`
    pub kind: SeriesKind,
    /// Canonical id
    pub entity_id: String,
    /// Effective window
    pub window_weeks: u32,
    /// Weeks with data in the window
    pub weeks_in_window: usize,
    /// Window totals
    pub totals: WindowTotals,
    /// Exercises ranked by attributed effective volume
    pub top_exercises: Vec<ExerciseVolume>,
    /// e1RM trends of the leading exercises
    pub proxy_trends: Vec<ProxyTrend>,
    /// Exercise the plateau flag was evaluated on
    pub plateau_proxy: Option<String>,
    /// Read-time flags
    pub flags: ProgressFlags,
    /// Names of the flags that are set
    pub active_flags: Vec<&'static str>,
    /// Most recent week in the window
    pub latest_week: Option<WeeklyPointView>,
}

/// Either summary shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProgressSummary {
    /// Exercise summary
    Exercise(ExerciseProgressSummary),
    /// Muscle-group or muscle summary
    Entity(EntityProgressSummary),
}

impl QueryService {
    /// `progress.*.summary` for any series class
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` for a blank or unknown id, or a storage error
    pub async fn progress_summary(
        &self,
        user_id: Uuid,
        kind: SeriesKind,
        params: &SeriesParams,
    ) -> AppResult<Envelope<ProgressSummary>> {
        let entity_id = self.resolve_entity(kind, &params.id)?;
        let current_week = anchor_week(params.as_of.as_deref())?;
        let window_weeks = clamp_window_weeks(params.window_weeks, DEFAULT_WINDOW_WEEKS);

        let (summary, returned) = match kind {
            SeriesKind::Exercise => {
                let summary = self
                    .exercise_summary(user_id, entity_id, current_week, window_weeks)
                    .await?;
                let returned = summary.weeks_in_window;
                (ProgressSummary::Exercise(summary), returned)
            }
            SeriesKind::MuscleGroup | SeriesKind::Muscle => {
                let summary = self
                    .entity_summary(user_id, kind, entity_id, current_week, window_weeks)
                    .await?;
                let returned = summary.weeks_in_window;
                (ProgressSummary::Entity(summary), returned)
            }
        };
        ResponseBuilder::summary().object(summary, returned, window_weeks as usize)
    }

    async fn exercise_summary(
        &self,
        user_id: Uuid,
        exercise_id: String,
        current_week: NaiveDate,
        window_weeks: u32,
    ) -> AppResult<ExerciseProgressSummary> {
        let history = self
            .series_history(user_id, SeriesKind::Exercise, &exercise_id, current_week)
            .await?;
        let flags = ProgressAnalyzer::series_flags(&history);
        let window = history.trimmed_to_window(current_week, window_weeks);
        let points: Vec<&WeeklyPoint> = window.weeks.values().collect();

        Ok(ExerciseProgressSummary {
            exercise_id,
            window_weeks,
            weeks_in_window: points.len(),
            e1rm_trend: ProgressAnalyzer::e1rm_trend(&points),
            rep_range_mix: ProgressAnalyzer::rep_range_mix(&points),
            flags,
            active_flags: flags.active(),
            totals: WindowTotals::of(&window),
            best_e1rm: window.summary.best_e1rm,
            latest_week: window.week_views().pop(),
        })
    }

    async fn entity_summary(
        &self,
        user_id: Uuid,
        kind: SeriesKind,
        entity_id: String,
        current_week: NaiveDate,
        window_weeks: u32,
    ) -> AppResult<EntityProgressSummary> {
        let history = self
            .series_history(user_id, kind, &entity_id, current_week)
            .await?;
        let mut flags = ProgressAnalyzer::series_flags(&history);

        let top_exercises = self
            .database
            .top_exercises_for(
                user_id,
                kind,
                &entity_id,
                window_start(current_week, window_weeks),
                current_week,
                SUMMARY_TOP_EXERCISES as u32,
            )
            .await?;

        let mut proxy_trends = Vec::with_capacity(SUMMARY_PROXY_TRENDS);
        let mut plateau_proxy = None;
        for exercise in top_exercises.iter().take(SUMMARY_PROXY_TRENDS) {
            let proxy = self
                .series_history(user_id, SeriesKind::Exercise, &exercise.exercise_id, current_week)
                .await?;
            if plateau_proxy.is_none() {
                flags.plateau = ProgressAnalyzer::series_plateau(&proxy);
                plateau_proxy = Some(exercise.exercise_id.clone());
            }
            let proxy_window = proxy.trimmed_to_window(current_week, window_weeks);
            proxy_trends.push(ProxyTrend {
                exercise_id: exercise.exercise_id.clone(),
                e1rm_trend: ProgressAnalyzer::e1rm_trend(
                    &proxy_window.weeks.values().collect::<Vec<_>>(),
                ),
            });
        }
        // Group and muscle points carry no e1RM, so plateau needs a proxy
        if plateau_proxy.is_none() {
            flags.plateau = false;
        }

        let window = history.trimmed_to_window(current_week, window_weeks);
        Ok(EntityProgressSummary {
            kind,
            entity_id,
            window_weeks,
            weeks_in_window: window.weeks.len(),
            totals: WindowTotals::of(&window),
            top_exercises,
            proxy_trends,
            plateau_proxy,
            flags,
            active_flags: flags.active(),
            latest_week: window.week_views().pop(),
        })
    }
}
