//! Strain: cardiovascular load on a 0-21 scale
//!
//! # Algorithm
//!
//! 1. Each heart-rate sample is converted to Karvonen intensity `I` and
//!    weighted by the minutes it stands for.
//! 2. Per-minute load follows Banister's exponential TRIMP weighting
//!    `I · 0.64 · e^(1.92·I)`, so time in zones 4-5 counts several times
//!    more than the same time in zones 1-2.
//! 3. Swimming load is scaled by the stroke multiplier.
//! 4. Load saturates onto the strain scale: `21 · (1 − e^(−load / scale))`.
//!
//! Daily strain maps each workout back to load, sums, and re-saturates,
//! so repeated hard efforts approach 21 without exceeding it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::heart_rate::{sample_intervals, HeartRateProfile};
use crate::models::{ActivityType, Sample, SwimStroke, WorkoutSession, WorkoutSummary};

/// Strain calculation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrainConfig {
    /// Upper end of the strain scale
    pub max_strain: f64,

    /// Load at which strain reaches ~63% of the maximum
    pub load_scale: f64,

    /// TRIMP intensity coefficient
    pub intensity_coefficient: f64,

    /// TRIMP intensity exponent
    pub intensity_exponent: f64,

    /// Longest gap a single sample may stand for, in seconds
    pub max_sample_gap_seconds: f64,

    /// Lower bounds of the moderate, hard and very hard bands
    pub band_thresholds: [f64; 3],
}

impl Default for StrainConfig {
    fn default() -> Self {
        StrainConfig {
            max_strain: 21.0,
            load_scale: 100.0,
            intensity_coefficient: 0.64,
            intensity_exponent: 1.92,
            max_sample_gap_seconds: 300.0,
            band_thresholds: [5.0, 10.0, 15.0],
        }
    }
}

/// Strain interpretation bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrainBand {
    Light,
    Moderate,
    Hard,
    VeryHard,
}

impl StrainBand {
    pub fn description(&self) -> &'static str {
        match self {
            StrainBand::Light => "Light (active recovery)",
            StrainBand::Moderate => "Moderate (maintaining fitness)",
            StrainBand::Hard => "Hard (building fitness)",
            StrainBand::VeryHard => "Very hard (overreaching)",
        }
    }
}

/// Strain calculation engine
#[derive(Debug, Clone, Default)]
pub struct StrainCalculator {
    config: StrainConfig,
}

impl StrainCalculator {
    /// Create new calculator with default configuration
    pub fn new() -> Self {
        StrainCalculator::default()
    }

    /// Create new calculator with custom configuration
    pub fn with_config(config: StrainConfig) -> Self {
        StrainCalculator { config }
    }

    pub fn config(&self) -> &StrainConfig {
        &self.config
    }

    /// Strain (0-21) for one workout's heart-rate samples
    ///
    /// Zero or non-finite heart rates (sensor gaps) contribute nothing.
    pub fn workout_strain(
        &self,
        samples: &[Sample],
        profile: &HeartRateProfile,
        stroke: Option<SwimStroke>,
    ) -> f64 {
        let multiplier = stroke.map(|s| s.strain_multiplier()).unwrap_or(1.0);
        let load = self.workout_load(samples, profile) * multiplier;
        self.strain_from_load(load)
    }

    /// Combine a day's workouts into one strain value
    pub fn daily_strain(&self, workouts: &[WorkoutSummary]) -> f64 {
        let total_load: f64 = workouts.iter().map(|w| self.load_from_strain(w.strain)).sum();
        self.strain_from_load(total_load)
    }

    /// Score a workout session into a summary
    pub fn score_workout(
        &self,
        session: &WorkoutSession,
        profile: &HeartRateProfile,
    ) -> WorkoutSummary {
        let valid: Vec<f64> = session
            .heart_rate
            .iter()
            .map(|s| s.value)
            .filter(|hr| hr.is_finite() && *hr > 0.0)
            .collect();

        let avg_heart_rate = if valid.is_empty() {
            None
        } else {
            Some(valid.iter().sum::<f64>() / valid.len() as f64)
        };
        let max_heart_rate = valid.iter().copied().reduce(f64::max);
        let heart_rate_intensity = avg_heart_rate.map(|_| {
            valid
                .iter()
                .map(|hr| profile.intensity_from_heart_rate_reserve(*hr))
                .sum::<f64>()
                / valid.len() as f64
        });

        let stroke = match session.activity {
            ActivityType::Swimming => Some(session.swim_stroke.unwrap_or(SwimStroke::Freestyle)),
            _ => None,
        };
        let strain = self.workout_strain(&session.heart_rate, profile, stroke);

        debug!(
            workout = %session.id,
            activity = ?session.activity,
            samples = session.heart_rate.len(),
            strain,
            "Workout scored"
        );

        WorkoutSummary {
            id: session.id.clone(),
            activity: session.activity,
            start_time: session.start,
            end_time: session.end,
            duration_seconds: (session.end - session.start).num_seconds().max(0),
            distance: session.distance_meters,
            calories: session.calories.unwrap_or(0.0),
            avg_heart_rate,
            max_heart_rate,
            strain,
            heart_rate_intensity,
            zone_minutes: profile
                .time_in_zones(&session.heart_rate, self.config.max_sample_gap_seconds),
        }
    }

    /// Band for a strain value
    pub fn band(&self, strain: f64) -> StrainBand {
        let [moderate, hard, very_hard] = self.config.band_thresholds;
        if strain >= very_hard {
            StrainBand::VeryHard
        } else if strain >= hard {
            StrainBand::Hard
        } else if strain >= moderate {
            StrainBand::Moderate
        } else {
            StrainBand::Light
        }
    }

    /// Accumulated TRIMP-style load for a sample series
    fn workout_load(&self, samples: &[Sample], profile: &HeartRateProfile) -> f64 {
        samples
            .iter()
            .zip(sample_intervals(samples, self.config.max_sample_gap_seconds))
            .filter(|(s, _)| s.value.is_finite() && s.value > 0.0)
            .map(|(s, seconds)| {
                let intensity = profile.intensity_from_heart_rate_reserve(s.value);
                (seconds / 60.0) * self.load_per_minute(intensity)
            })
            .sum()
    }

    fn load_per_minute(&self, intensity: f64) -> f64 {
        intensity
            * self.config.intensity_coefficient
            * (self.config.intensity_exponent * intensity).exp()
    }

    fn strain_from_load(&self, load: f64) -> f64 {
        if !load.is_finite() {
            return if load > 0.0 { self.config.max_strain } else { 0.0 };
        }
        if load <= 0.0 || self.config.load_scale <= 0.0 {
            return 0.0;
        }
        let strain = self.config.max_strain * (1.0 - (-load / self.config.load_scale).exp());
        strain.clamp(0.0, self.config.max_strain)
    }

    fn load_from_strain(&self, strain: f64) -> f64 {
        if !strain.is_finite() || strain <= 0.0 || self.config.max_strain <= 0.0 {
            return 0.0;
        }
        let fraction = (strain / self.config.max_strain).min(1.0 - 1e-9);
        -self.config.load_scale * (1.0 - fraction).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn profile() -> HeartRateProfile {
        HeartRateProfile::new(60.0, Some(190.0), None)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap()
    }

    /// Samples every 5 seconds at a constant heart rate
    fn constant_samples(heart_rate: f64, minutes: i64) -> Vec<Sample> {
        (0..minutes * 12)
            .map(|i| Sample::new(start() + Duration::seconds(i * 5), heart_rate))
            .collect()
    }

    fn session(activity: ActivityType, stroke: Option<SwimStroke>, heart_rate: f64) -> WorkoutSession {
        WorkoutSession {
            id: "w1".to_string(),
            activity,
            start: start(),
            end: start() + Duration::minutes(30),
            distance_meters: Some(1500.0),
            calories: Some(300.0),
            swim_stroke: stroke,
            heart_rate: constant_samples(heart_rate, 30),
        }
    }

    #[test]
    fn test_hard_thirty_minute_run() {
        let calc = StrainCalculator::new();
        let p = profile();
        // 85% of heart rate reserve
        let hr = p.resting_heart_rate + 0.85 * p.heart_rate_reserve();
        let strain = calc.workout_strain(&constant_samples(hr, 30), &p, None);

        assert!(strain >= 10.0 && strain <= 15.0, "strain {}", strain);
        assert_eq!(calc.band(strain), StrainBand::Hard);
    }

    #[test]
    fn test_low_intensity_contributes_little() {
        let calc = StrainCalculator::new();
        let p = profile();
        let easy = calc.workout_strain(&constant_samples(80.0, 30), &p, None);
        let hard = calc.workout_strain(&constant_samples(175.0, 30), &p, None);

        assert!(easy < 1.5, "easy strain {}", easy);
        assert!(hard > easy * 5.0);
    }

    #[test]
    fn test_zero_samples_contribute_nothing() {
        let calc = StrainCalculator::new();
        assert_eq!(calc.workout_strain(&constant_samples(0.0, 30), &profile(), None), 0.0);
        assert_eq!(calc.workout_strain(&[], &profile(), None), 0.0);
    }

    #[test]
    fn test_bounded_for_extreme_input() {
        let calc = StrainCalculator::new();
        let strain = calc.workout_strain(&constant_samples(250.0, 24 * 60), &profile(), None);
        assert!(strain <= 21.0);
        assert!(strain > 20.9);
    }

    #[test]
    fn test_swim_stroke_multiplier() {
        let calc = StrainCalculator::new();
        let p = profile();
        let freestyle = calc.score_workout(&session(ActivityType::Swimming, None, 150.0), &p);
        let butterfly = calc.score_workout(
            &session(ActivityType::Swimming, Some(SwimStroke::Butterfly), 150.0),
            &p,
        );
        // Stroke is ignored outside the pool
        let run = calc.score_workout(
            &session(ActivityType::Running, Some(SwimStroke::Butterfly), 150.0),
            &p,
        );

        assert!(butterfly.strain > freestyle.strain);
        assert!((run.strain - freestyle.strain).abs() < 1e-9);
    }

    #[test]
    fn test_score_workout_summary() {
        let calc = StrainCalculator::new();
        let summary = calc.score_workout(&session(ActivityType::Running, None, 125.0), &profile());

        assert_eq!(summary.duration_seconds, 1800);
        assert_eq!(summary.avg_heart_rate, Some(125.0));
        assert_eq!(summary.max_heart_rate, Some(125.0));
        assert!((summary.heart_rate_intensity.unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(summary.calories, 300.0);
        let total_minutes: f64 = summary.zone_minutes.iter().sum();
        assert!((total_minutes - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_daily_strain_saturates() {
        let calc = StrainCalculator::new();
        let p = profile();
        let hr = p.resting_heart_rate + 0.85 * p.heart_rate_reserve();
        let workout = calc.score_workout(
            &WorkoutSession {
                heart_rate: constant_samples(hr, 30),
                ..session(ActivityType::Running, None, hr)
            },
            &p,
        );

        let single = calc.daily_strain(std::slice::from_ref(&workout));
        assert!((single - workout.strain).abs() < 1e-6);

        let double = calc.daily_strain(&[workout.clone(), workout.clone()]);
        assert!(double > single);
        assert!(double < single * 2.0);

        let many = calc.daily_strain(&vec![workout; 20]);
        assert!(many <= 21.0);
        assert!(calc.daily_strain(&[]) == 0.0);
    }

    #[test]
    fn test_bands() {
        let calc = StrainCalculator::new();
        assert_eq!(calc.band(4.9), StrainBand::Light);
        assert_eq!(calc.band(5.0), StrainBand::Moderate);
        assert_eq!(calc.band(10.0), StrainBand::Hard);
        assert_eq!(calc.band(15.0), StrainBand::VeryHard);
    }

    proptest! {
        #[test]
        fn test_monotonic_in_intensity(a in 40.0f64..220.0, b in 40.0f64..220.0, minutes in 1i64..120) {
            let calc = StrainCalculator::new();
            let p = profile();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let low_strain = calc.workout_strain(&constant_samples(low, minutes), &p, None);
            let high_strain = calc.workout_strain(&constant_samples(high, minutes), &p, None);
            prop_assert!(low_strain <= high_strain);
        }

        #[test]
        fn test_strain_bounded(hr in -50.0f64..400.0, minutes in 0i64..600) {
            let calc = StrainCalculator::new();
            let strain = calc.workout_strain(&constant_samples(hr, minutes), &profile(), Some(SwimStroke::Butterfly));
            prop_assert!((0.0..=21.0).contains(&strain));
        }
    }
}
