//! Stress estimation from heart-rate elevation
//!
//! Stress is read from how far heart rate sits above the user's resting
//! baseline, optionally reinforced by suppressed HRV. Readings close to a
//! workout are flagged as exercise-related and left out of the daily
//! aggregates, since elevated heart rate around training is expected.
//!
//! Scale: 0-3
//! - Low: < 1.0
//! - Medium: 1.0-2.0
//! - High: >= 2.0

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{Sample, WorkoutSummary};
use crate::outlier::mean;

/// Stress estimation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Heart-rate elevation (% above resting) worth one stress level
    pub percent_per_level: f64,

    /// Contribution of fully suppressed HRV
    pub hrv_weight: f64,

    /// Upper bound of the stress scale
    pub max_level: f64,

    /// Lower bounds of the medium and high zones
    pub zone_thresholds: (f64, f64),

    /// Minutes around a workout during which readings count as exercise
    pub exercise_buffer_minutes: i64,

    /// Minutes between stress readings
    pub cadence_minutes: i64,

    /// Largest gap in minutes still merged into one high-stress period
    pub gap_tolerance_minutes: i64,
}

impl Default for StressConfig {
    fn default() -> Self {
        StressConfig {
            percent_per_level: 15.0,
            hrv_weight: 1.0,
            max_level: 3.0,
            zone_thresholds: (1.0, 2.0),
            exercise_buffer_minutes: 60,
            cadence_minutes: 5,
            gap_tolerance_minutes: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressZone {
    Low,
    Medium,
    High,
}

impl StressZone {
    pub fn description(&self) -> &'static str {
        match self {
            StressZone::Low => "Low",
            StressZone::Medium => "Medium",
            StressZone::High => "High",
        }
    }
}

/// Instantaneous stress estimate for one heart-rate reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressReading {
    pub timestamp: DateTime<Utc>,
    pub heart_rate: f64,
    pub stress_level: f64,
    pub zone: StressZone,
    pub is_exercise_related: bool,
}

/// Contiguous stretch of high stress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl StressPeriod {
    pub fn minutes(&self) -> f64 {
        (self.end - self.start).num_seconds().max(0) as f64 / 60.0
    }
}

/// Daily stress aggregates over non-exercise readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStressSummary {
    pub average: Option<f64>,
    pub max: Option<f64>,
    pub low_minutes: f64,
    pub medium_minutes: f64,
    pub high_minutes: f64,
    pub dominant_zone: Option<StressZone>,
    pub longest_high_stress: Option<StressPeriod>,

    /// Readings that contributed to the aggregates
    pub reading_count: usize,

    /// Readings dropped for being close to a workout
    pub exercise_excluded: usize,
}

/// Stress estimation engine
#[derive(Debug, Clone, Default)]
pub struct StressEstimator {
    config: StressConfig,
}

impl StressEstimator {
    /// Create new estimator with default configuration
    pub fn new() -> Self {
        StressEstimator::default()
    }

    /// Create new estimator with custom configuration
    pub fn with_config(config: StressConfig) -> Self {
        StressEstimator { config }
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Stress level (0-3) from heart-rate elevation and optional HRV
    ///
    /// A non-positive resting baseline yields 0.
    pub fn stress_level(
        &self,
        heart_rate: f64,
        baseline_rhr: f64,
        baseline_hrv: Option<f64>,
        current_hrv: Option<f64>,
    ) -> f64 {
        if baseline_rhr <= 0.0 || !heart_rate.is_finite() || self.config.percent_per_level <= 0.0 {
            return 0.0;
        }

        let elevation_pct = ((heart_rate - baseline_rhr) / baseline_rhr * 100.0).max(0.0);
        let mut level = elevation_pct / self.config.percent_per_level;

        if let (Some(baseline), Some(current)) = (baseline_hrv, current_hrv) {
            if baseline > 0.0 && current.is_finite() && current >= 0.0 {
                level += self.config.hrv_weight * (1.0 - current / baseline).max(0.0);
            }
        }

        level.clamp(0.0, self.config.max_level)
    }

    /// Estimate stress for a single heart-rate sample
    pub fn estimate(
        &self,
        sample: &Sample,
        baseline_rhr: f64,
        baseline_hrv: Option<f64>,
        current_hrv: Option<f64>,
        workouts: &[WorkoutSummary],
    ) -> StressReading {
        let stress_level = self.stress_level(sample.value, baseline_rhr, baseline_hrv, current_hrv);
        StressReading {
            timestamp: sample.timestamp,
            heart_rate: sample.value,
            stress_level,
            zone: self.zone(stress_level),
            is_exercise_related: self.is_exercise_related(sample.timestamp, workouts),
        }
    }

    /// Resample heart rate onto the cadence grid and estimate each slot
    ///
    /// Each slot holds the mean of the valid samples that fall in it;
    /// empty slots produce no reading.
    pub fn readings(
        &self,
        samples: &[Sample],
        baseline_rhr: f64,
        baseline_hrv: Option<f64>,
        current_hrv: Option<f64>,
        workouts: &[WorkoutSummary],
    ) -> Vec<StressReading> {
        let cadence_seconds = self.cadence().num_seconds().max(1);

        let mut slots: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
        for sample in samples.iter().filter(|s| s.value.is_finite() && s.value > 0.0) {
            let slot = sample.timestamp.timestamp().div_euclid(cadence_seconds);
            slots.entry(slot).or_default().push(sample.value);
        }

        slots
            .into_iter()
            .filter_map(|(slot, values)| {
                let timestamp = Utc.timestamp_opt(slot * cadence_seconds, 0).single()?;
                let heart_rate = mean(values)?;
                Some(self.estimate(
                    &Sample::new(timestamp, heart_rate),
                    baseline_rhr,
                    baseline_hrv,
                    current_hrv,
                    workouts,
                ))
            })
            .collect()
    }

    /// Aggregate a day's readings, skipping exercise-related ones
    pub fn summarize(&self, readings: &[StressReading]) -> DailyStressSummary {
        let mut counted: Vec<&StressReading> =
            readings.iter().filter(|r| !r.is_exercise_related).collect();
        counted.sort_by_key(|r| r.timestamp);
        let exercise_excluded = readings.len() - counted.len();

        let cadence_minutes = self.config.cadence_minutes as f64;
        let minutes_in = |zone: StressZone| {
            counted.iter().filter(|r| r.zone == zone).count() as f64 * cadence_minutes
        };
        let low_minutes = minutes_in(StressZone::Low);
        let medium_minutes = minutes_in(StressZone::Medium);
        let high_minutes = minutes_in(StressZone::High);

        // Ties go to the higher zone
        let dominant_zone = if counted.is_empty() {
            None
        } else {
            [
                (StressZone::Low, low_minutes),
                (StressZone::Medium, medium_minutes),
                (StressZone::High, high_minutes),
            ]
            .into_iter()
            .fold(None, |best: Option<(StressZone, f64)>, (zone, minutes)| match best {
                Some((_, best_minutes)) if best_minutes > minutes => best,
                _ => Some((zone, minutes)),
            })
            .map(|(zone, _)| zone)
        };

        let summary = DailyStressSummary {
            average: mean(counted.iter().map(|r| r.stress_level)),
            max: counted.iter().map(|r| r.stress_level).reduce(f64::max),
            low_minutes,
            medium_minutes,
            high_minutes,
            dominant_zone,
            longest_high_stress: self.longest_high_stress(&counted),
            reading_count: counted.len(),
            exercise_excluded,
        };

        debug!(
            average = ?summary.average,
            max = ?summary.max,
            readings = summary.reading_count,
            excluded = summary.exercise_excluded,
            "Stress summary"
        );
        summary
    }

    /// Zone for a stress level
    pub fn zone(&self, level: f64) -> StressZone {
        let (medium, high) = self.config.zone_thresholds;
        if level >= high {
            StressZone::High
        } else if level >= medium {
            StressZone::Medium
        } else {
            StressZone::Low
        }
    }

    /// True when `timestamp` is within the buffer around any workout
    pub fn is_exercise_related(&self, timestamp: DateTime<Utc>, workouts: &[WorkoutSummary]) -> bool {
        let buffer = Duration::minutes(self.config.exercise_buffer_minutes);
        workouts
            .iter()
            .any(|w| timestamp >= w.start_time - buffer && timestamp <= w.end_time + buffer)
    }

    fn cadence(&self) -> Duration {
        Duration::minutes(self.config.cadence_minutes)
    }

    /// Longest run of high readings where consecutive readings are no
    /// further apart than the gap tolerance; expects time-sorted input
    fn longest_high_stress(&self, readings: &[&StressReading]) -> Option<StressPeriod> {
        let tolerance = Duration::minutes(self.config.gap_tolerance_minutes);
        let cadence = self.cadence();

        let mut longest: Option<StressPeriod> = None;
        let mut current: Option<StressPeriod> = None;

        for reading in readings.iter().filter(|r| r.zone == StressZone::High) {
            let reading_end = reading.timestamp + cadence;
            current = match current.take() {
                Some(period) if reading.timestamp - (period.end - cadence) <= tolerance => {
                    Some(StressPeriod {
                        start: period.start,
                        end: reading_end,
                    })
                }
                Some(period) => {
                    longest = Self::longer(longest, period);
                    Some(StressPeriod {
                        start: reading.timestamp,
                        end: reading_end,
                    })
                }
                None => Some(StressPeriod {
                    start: reading.timestamp,
                    end: reading_end,
                }),
            };
        }

        match current {
            Some(period) => Self::longer(longest, period),
            None => longest,
        }
    }

    fn longer(best: Option<StressPeriod>, candidate: StressPeriod) -> Option<StressPeriod> {
        match best {
            Some(best) if best.minutes() >= candidate.minutes() => Some(best),
            _ => Some(candidate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityType;
    use proptest::prelude::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, hour, minute, 0).unwrap()
    }

    fn workout(start: DateTime<Utc>, end: DateTime<Utc>) -> WorkoutSummary {
        WorkoutSummary {
            id: "run-1".to_string(),
            activity: ActivityType::Running,
            start_time: start,
            end_time: end,
            duration_seconds: (end - start).num_seconds(),
            distance: None,
            calories: 0.0,
            avg_heart_rate: None,
            max_heart_rate: None,
            strain: 10.0,
            heart_rate_intensity: None,
            zone_minutes: [0.0; 5],
        }
    }

    fn reading(estimator: &StressEstimator, time: DateTime<Utc>, level: f64) -> StressReading {
        StressReading {
            timestamp: time,
            heart_rate: 70.0,
            stress_level: level,
            zone: estimator.zone(level),
            is_exercise_related: false,
        }
    }

    #[test]
    fn test_stress_level_from_elevation() {
        let estimator = StressEstimator::new();
        assert_eq!(estimator.stress_level(60.0, 60.0, None, None), 0.0);
        assert_eq!(estimator.stress_level(50.0, 60.0, None, None), 0.0);
        assert!((estimator.stress_level(69.0, 60.0, None, None) - 1.0).abs() < 1e-9);
        assert!((estimator.stress_level(78.0, 60.0, None, None) - 2.0).abs() < 1e-9);
        assert_eq!(estimator.stress_level(150.0, 60.0, None, None), 3.0);
        assert_eq!(estimator.stress_level(90.0, 0.0, None, None), 0.0);
    }

    #[test]
    fn test_suppressed_hrv_adds_stress() {
        let estimator = StressEstimator::new();
        let without = estimator.stress_level(66.0, 60.0, None, None);
        let suppressed = estimator.stress_level(66.0, 60.0, Some(50.0), Some(25.0));
        let elevated = estimator.stress_level(66.0, 60.0, Some(50.0), Some(70.0));
        assert!((suppressed - without - 0.5).abs() < 1e-9);
        assert_eq!(elevated, without);
    }

    #[test]
    fn test_zone_boundaries() {
        let estimator = StressEstimator::new();
        assert_eq!(estimator.zone(0.99), StressZone::Low);
        assert_eq!(estimator.zone(1.0), StressZone::Medium);
        assert_eq!(estimator.zone(1.99), StressZone::Medium);
        assert_eq!(estimator.zone(2.0), StressZone::High);
        assert_eq!(estimator.zone(3.0), StressZone::High);
    }

    #[test]
    fn test_post_workout_reading_excluded() {
        let estimator = StressEstimator::new();
        let run = workout(at(7, 0), at(7, 30));
        let baseline_rhr = 60.0;

        // 20% above baseline, 10 minutes after the run ends
        let post_run = Sample::new(at(7, 40), 72.0);
        let reading = estimator.estimate(&post_run, baseline_rhr, None, None, &[run.clone()]);
        assert!(reading.is_exercise_related);
        assert!(reading.stress_level > 0.0);

        let calm = estimator.estimate(&Sample::new(at(14, 0), 63.0), baseline_rhr, None, None, &[run]);
        assert!(!calm.is_exercise_related);

        let summary = estimator.summarize(&[reading, calm.clone()]);
        assert_eq!(summary.exercise_excluded, 1);
        assert_eq!(summary.reading_count, 1);
        assert_eq!(summary.average, Some(calm.stress_level));
        assert_eq!(summary.max, Some(calm.stress_level));
    }

    #[test]
    fn test_exercise_buffer_edges() {
        let estimator = StressEstimator::new();
        let run = [workout(at(10, 0), at(11, 0))];
        assert!(estimator.is_exercise_related(at(9, 0), &run));
        assert!(estimator.is_exercise_related(at(12, 0), &run));
        assert!(!estimator.is_exercise_related(at(8, 59), &run));
        assert!(!estimator.is_exercise_related(at(12, 1), &run));
        assert!(!estimator.is_exercise_related(at(10, 30), &[]));
    }

    #[test]
    fn test_readings_resample_to_cadence() {
        let estimator = StressEstimator::new();
        let samples = vec![
            Sample::new(at(9, 0), 60.0),
            Sample::new(at(9, 2), 72.0),
            Sample::new(at(9, 4), 0.0),
            Sample::new(at(9, 11), 75.0),
        ];
        let readings = estimator.readings(&samples, 60.0, None, None, &[]);
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].timestamp, at(9, 0));
        assert_eq!(readings[0].heart_rate, 66.0);
        assert_eq!(readings[1].timestamp, at(9, 10));
        assert_eq!(readings[1].zone, StressZone::Medium);
    }

    #[test]
    fn test_summary_zones_and_longest_period() {
        let estimator = StressEstimator::new();
        let mut readings = vec![
            reading(&estimator, at(9, 0), 0.5),
            reading(&estimator, at(9, 5), 0.5),
            reading(&estimator, at(9, 10), 0.5),
            reading(&estimator, at(9, 15), 0.5),
        ];
        // 10:00-10:15 high, then a 10 minute gap still merges
        readings.extend([
            reading(&estimator, at(10, 0), 2.5),
            reading(&estimator, at(10, 5), 2.2),
            reading(&estimator, at(10, 15), 2.8),
        ]);
        // Isolated high reading after a long gap
        readings.push(reading(&estimator, at(15, 0), 2.1));

        let summary = estimator.summarize(&readings);
        assert_eq!(summary.low_minutes, 20.0);
        assert_eq!(summary.high_minutes, 20.0);
        assert_eq!(summary.medium_minutes, 0.0);
        // Tie between low and high goes to high
        assert_eq!(summary.dominant_zone, Some(StressZone::High));
        assert_eq!(summary.max, Some(2.8));

        let longest = summary.longest_high_stress.unwrap();
        assert_eq!(longest.start, at(10, 0));
        assert_eq!(longest.end, at(10, 20));
        assert_eq!(longest.minutes(), 20.0);
    }

    #[test]
    fn test_gap_beyond_tolerance_splits_periods() {
        let estimator = StressEstimator::new();
        let readings = vec![
            reading(&estimator, at(10, 0), 2.5),
            reading(&estimator, at(10, 20), 2.5),
            reading(&estimator, at(10, 25), 2.5),
        ];
        let longest = estimator.summarize(&readings).longest_high_stress.unwrap();
        assert_eq!(longest.start, at(10, 20));
        assert_eq!(longest.minutes(), 10.0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = StressEstimator::new().summarize(&[]);
        assert_eq!(summary.average, None);
        assert_eq!(summary.max, None);
        assert_eq!(summary.dominant_zone, None);
        assert_eq!(summary.longest_high_stress, None);
        assert_eq!(summary.reading_count, 0);
    }

    proptest! {
        #[test]
        fn test_stress_level_bounded(
            hr in -100.0f64..400.0,
            rhr in -10.0f64..120.0,
            baseline_hrv in prop::option::of(-10.0f64..200.0),
            current_hrv in prop::option::of(-10.0f64..200.0),
        ) {
            let level = StressEstimator::new().stress_level(hr, rhr, baseline_hrv, current_hrv);
            prop_assert!((0.0..=3.0).contains(&level));
        }
    }
}
