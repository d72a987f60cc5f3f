// ABOUTME: Deterministic progress flags computed from merged weekly series
// ABOUTME: Plateau, deload, and overreach detection plus e1RM trend and rep-range mix
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pierre_core::constants::training::{
    DELOAD_VOLUME_DROP, OVERREACH_FAILURE_RATE, OVERREACH_MAX_AVG_RIR, OVERREACH_RISING_WEEKS,
    PLATEAU_E1RM_TOLERANCE, PLATEAU_VOLUME_TOLERANCE, PLATEAU_WEEKS,
};
use pierre_core::models::{RepsBuckets, SeriesDocument, WeeklyPoint};
use serde::{Deserialize, Serialize};

/// The three read-time flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressFlags {
    /// e1RM and volume both flat over the last four weeks
    pub plateau: bool,
    /// Latest week's volume fell sharply versus the prior week
    pub deload: bool,
    /// High failure rate, low RIR, and rising volume
    pub overreach: bool,
}

impl ProgressFlags {
    /// Names of the flags that are set
    #[must_use]
    pub fn active(&self) -> Vec<&'static str> {
        [
            (self.plateau, "plateau"),
            (self.deload, "deload"),
            (self.overreach, "overreach"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

/// First-to-last change of weekly best e1RM
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct E1rmTrend {
    /// Earliest weekly `e1rm_max` in the window
    pub first: f64,
    /// Latest weekly `e1rm_max` in the window
    pub last: f64,
    /// `(last - first) / first * 100`
    pub change_pct: f64,
    /// Weeks that had an e1RM
    pub weeks: usize,
}

/// Share of sets per rep range
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RepRangeMix {
    /// 1-5 reps
    #[serde(rename = "1-5")]
    pub one_to_five: f64,
    /// 6-10 reps
    #[serde(rename = "6-10")]
    pub six_to_ten: f64,
    /// 11-15 reps
    #[serde(rename = "11-15")]
    pub eleven_to_fifteen: f64,
    /// 16-20 reps
    #[serde(rename = "16-20")]
    pub sixteen_to_twenty: f64,
}

/// Progress analysis over weekly points ordered oldest first
pub struct ProgressAnalyzer;

impl ProgressAnalyzer {
    /// Evaluate all three flags on one series
    #[must_use]
    pub fn flags(points: &[&WeeklyPoint]) -> ProgressFlags {
        ProgressFlags {
            plateau: Self::detect_plateau(points),
            deload: Self::detect_deload(points),
            overreach: Self::detect_overreach(points),
        }
    }

    /// Evaluate all three flags on a series document, counting untrained weeks as empty
    #[must_use]
    pub fn series_flags(series: &SeriesDocument) -> ProgressFlags {
        let points = series.contiguous_points();
        Self::flags(&points.iter().collect::<Vec<_>>())
    }

    /// Plateau check on a series document, counting untrained weeks as empty
    #[must_use]
    pub fn series_plateau(series: &SeriesDocument) -> bool {
        let points = series.contiguous_points();
        Self::detect_plateau(&points.iter().collect::<Vec<_>>())
    }

    /// Last four weekly `e1rm_max` values each within 2.5% of their mean, and the
    /// matching volumes each within 10% of theirs
    #[must_use]
    pub fn detect_plateau(points: &[&WeeklyPoint]) -> bool {
        let Some(recent) = last_n(points, PLATEAU_WEEKS) else {
            return false;
        };
        let e1rms: Option<Vec<f64>> = recent.iter().map(|p| p.e1rm_max).collect();
        let Some(e1rms) = e1rms else {
            return false;
        };
        let volumes: Vec<f64> = recent.iter().map(|p| p.volume).collect();

        within_tolerance(&e1rms, PLATEAU_E1RM_TOLERANCE)
            && within_tolerance(&volumes, PLATEAU_VOLUME_TOLERANCE)
    }

    /// Most recent week's volume more than 40% below the prior week's
    #[must_use]
    pub fn detect_deload(points: &[&WeeklyPoint]) -> bool {
        let [.., prior, latest] = points else {
            return false;
        };
        prior.volume > 0.0 && latest.volume < prior.volume * (1.0 - DELOAD_VOLUME_DROP)
    }

    /// Latest failure rate above 0.35, derived average RIR at most 1, and volume
    /// rising for at least two consecutive weeks
    #[must_use]
    pub fn detect_overreach(points: &[&WeeklyPoint]) -> bool {
        let Some(recent) = last_n(points, OVERREACH_RISING_WEEKS + 1) else {
            return false;
        };
        let Some(latest) = recent.last() else {
            return false;
        };

        let failing = latest
            .failure_rate()
            .is_some_and(|rate| rate > OVERREACH_FAILURE_RATE);
        let low_rir = latest
            .avg_rir()
            .is_some_and(|rir| rir <= OVERREACH_MAX_AVG_RIR);
        let rising = recent.windows(2).all(|w| w[1].volume > w[0].volume);

        failing && low_rir && rising
    }

    /// e1RM trend over the points that have one
    #[must_use]
    pub fn e1rm_trend(points: &[&WeeklyPoint]) -> Option<E1rmTrend> {
        let values: Vec<f64> = points.iter().filter_map(|p| p.e1rm_max).collect();
        let (&first, &last) = (values.first()?, values.last()?);
        let change_pct = if first > 0.0 {
            (last - first) / first * 100.0
        } else {
            0.0
        };
        Some(E1rmTrend {
            first,
            last,
            change_pct,
            weeks: values.len(),
        })
    }

    /// Share of sets per rep range across the points
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rep_range_mix(points: &[&WeeklyPoint]) -> RepRangeMix {
        let totals = points.iter().fold(RepsBuckets::default(), |mut acc, p| {
            acc.one_to_five += p.reps_bucket.one_to_five;
            acc.six_to_ten += p.reps_bucket.six_to_ten;
            acc.eleven_to_fifteen += p.reps_bucket.eleven_to_fifteen;
            acc.sixteen_to_twenty += p.reps_bucket.sixteen_to_twenty;
            acc
        });
        let sum = totals.one_to_five
            + totals.six_to_ten
            + totals.eleven_to_fifteen
            + totals.sixteen_to_twenty;
        if sum == 0 {
            return RepRangeMix::default();
        }
        let share = |n: i64| n as f64 / sum as f64;
        RepRangeMix {
            one_to_five: share(totals.one_to_five),
            six_to_ten: share(totals.six_to_ten),
            eleven_to_fifteen: share(totals.eleven_to_fifteen),
            sixteen_to_twenty: share(totals.sixteen_to_twenty),
        }
    }
}

/// The last `n` points, or `None` if there are fewer
fn last_n<'a, 'b>(points: &'b [&'a WeeklyPoint], n: usize) -> Option<&'b [&'a WeeklyPoint]> {
    points.len().checked_sub(n).map(|start| &points[start..])
}

/// Every value within `tolerance` (relative) of the mean; a non-positive mean never qualifies
#[allow(clippy::cast_precision_loss)]
fn within_tolerance(values: &[f64], tolerance: f64) -> bool {
    if values.is_empty() {
        return false;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    mean > 0.0 && values.iter().all(|v| ((v - mean) / mean).abs() <= tolerance)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use pierre_core::models::SeriesKind;

    use super::*;

    fn point(volume: f64, e1rm_max: Option<f64>) -> WeeklyPoint {
        WeeklyPoint {
            sets: 10,
            volume,
            e1rm_max,
            ..WeeklyPoint::default()
        }
    }

    fn refs(points: &[WeeklyPoint]) -> Vec<&WeeklyPoint> {
        points.iter().collect()
    }

    #[test]
    fn test_plateau_on_flat_e1rm_and_volume() {
        let points = [
            point(5000.0, Some(100.0)),
            point(5100.0, Some(101.0)),
            point(4900.0, Some(99.0)),
            point(5050.0, Some(100.0)),
        ];
        assert!(ProgressAnalyzer::detect_plateau(&refs(&points)));
    }

    #[test]
    fn test_no_plateau_when_e1rm_climbs() {
        let points = [
            point(5000.0, Some(100.0)),
            point(5000.0, Some(104.0)),
            point(5000.0, Some(108.0)),
            point(5000.0, Some(112.0)),
        ];
        assert!(!ProgressAnalyzer::detect_plateau(&refs(&points)));
    }

    #[test]
    fn test_no_plateau_when_volume_swings() {
        let points = [
            point(3000.0, Some(100.0)),
            point(5000.0, Some(100.0)),
            point(5000.0, Some(100.0)),
            point(5000.0, Some(100.0)),
        ];
        assert!(!ProgressAnalyzer::detect_plateau(&refs(&points)));
    }

    #[test]
    fn test_plateau_needs_four_weeks_with_e1rm() {
        let three = vec![point(5000.0, Some(100.0)); 3];
        assert!(!ProgressAnalyzer::detect_plateau(&refs(&three)));
        let gap = [
            point(5000.0, Some(100.0)),
            point(5000.0, None),
            point(5000.0, Some(100.0)),
            point(5000.0, Some(100.0)),
        ];
        assert!(!ProgressAnalyzer::detect_plateau(&refs(&gap)));
    }

    #[test]
    fn test_deload() {
        let dropped = [point(5000.0, None), point(2900.0, None)];
        assert!(ProgressAnalyzer::detect_deload(&refs(&dropped)));
        let mild = [point(5000.0, None), point(3100.0, None)];
        assert!(!ProgressAnalyzer::detect_deload(&refs(&mild)));
        assert!(!ProgressAnalyzer::detect_deload(&refs(&dropped[..1])));
    }

    #[test]
    fn test_overreach() {
        let mut latest = point(6000.0, None);
        latest.failure_sets = 4;
        latest.rir_sum = 5;
        latest.rir_count = 10;
        let points = [point(4000.0, None), point(5000.0, None), latest.clone()];
        assert!(ProgressAnalyzer::detect_overreach(&refs(&points)));

        // Volume not rising for two consecutive weeks
        let flat = [point(5000.0, None), point(5000.0, None), latest.clone()];
        assert!(!ProgressAnalyzer::detect_overreach(&refs(&flat)));

        // No RIR ratings means avg_rir is unknown
        let mut unrated = latest;
        unrated.rir_count = 0;
        unrated.rir_sum = 0;
        let points = [point(4000.0, None), point(5000.0, None), unrated];
        assert!(!ProgressAnalyzer::detect_overreach(&refs(&points)));
    }

    fn series(weeks: &[(i64, WeeklyPoint)]) -> SeriesDocument {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut doc = SeriesDocument::empty(SeriesKind::Exercise, "bench");
        for (n, point) in weeks {
            doc.weeks.insert(monday + Duration::weeks(*n), point.clone());
        }
        doc
    }

    #[test]
    fn test_deload_ignores_weeks_separated_by_a_gap() {
        let doc = series(&[(0, point(5000.0, None)), (7, point(2000.0, None))]);
        assert!(!ProgressAnalyzer::series_flags(&doc).deload);

        let adjacent = series(&[(6, point(5000.0, None)), (7, point(2000.0, None))]);
        assert!(ProgressAnalyzer::series_flags(&adjacent).deload);
    }

    #[test]
    fn test_overreach_needs_consecutive_calendar_weeks() {
        let mut latest = point(6000.0, None);
        latest.failure_sets = 10;
        latest.rir_count = 10;
        let doc = series(&[
            (0, point(4000.0, None)),
            (5, point(5000.0, None)),
            (10, latest.clone()),
        ]);
        assert!(!ProgressAnalyzer::series_flags(&doc).overreach);

        let consecutive = series(&[
            (8, point(4000.0, None)),
            (9, point(5000.0, None)),
            (10, latest),
        ]);
        assert!(ProgressAnalyzer::series_flags(&consecutive).overreach);
    }

    #[test]
    fn test_plateau_broken_by_untrained_week() {
        let flat = point(5000.0, Some(100.0));
        let doc = series(&[
            (0, flat.clone()),
            (1, flat.clone()),
            (3, flat.clone()),
            (4, flat.clone()),
        ]);
        assert!(!ProgressAnalyzer::series_plateau(&doc));
        let unbroken = series(&[(0, flat.clone()), (1, flat.clone()), (2, flat.clone()), (3, flat)]);
        assert!(ProgressAnalyzer::series_plateau(&unbroken));
    }

    #[test]
    fn test_e1rm_trend() {
        let points = [
            point(1.0, Some(100.0)),
            point(1.0, None),
            point(1.0, Some(110.0)),
        ];
        let trend = ProgressAnalyzer::e1rm_trend(&refs(&points)).unwrap();
        assert!((trend.change_pct - 10.0).abs() < 1e-9);
        assert_eq!(trend.weeks, 2);
        assert!(ProgressAnalyzer::e1rm_trend(&[]).is_none());
    }

    #[test]
    fn test_rep_range_mix() {
        let mut a = point(1.0, None);
        a.reps_bucket.one_to_five = 3;
        a.reps_bucket.six_to_ten = 1;
        let mix = ProgressAnalyzer::rep_range_mix(&[&a]);
        assert!((mix.one_to_five - 0.75).abs() < 1e-9);
        assert!((mix.six_to_ten - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_active_flag_names() {
        let flags = ProgressFlags {
            plateau: true,
            deload: false,
            overreach: true,
        };
        assert_eq!(flags.active(), vec!["plateau", "overreach"]);
    }
}
