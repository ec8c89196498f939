//! Heart-rate profile and zone math
//!
//! Zones use fixed percentage-of-max breakpoints:
//! - Z1: < 60% MaxHR (Recovery)
//! - Z2: 60-70% MaxHR (Aerobic Base)
//! - Z3: 70-80% MaxHR (Tempo)
//! - Z4: 80-90% MaxHR (Threshold)
//! - Z5: >= 90% MaxHR (VO2 Max)
//!
//! Strain uses heart-rate reserve (Karvonen) intensity instead, which
//! accounts for the user's resting heart rate.

use serde::{Deserialize, Serialize};

use crate::models::Sample;

/// Max heart rate used when neither a measured value nor an age is known
pub const FALLBACK_MAX_HEART_RATE: f64 = 190.0;

/// Resting heart rate used when no measurement or baseline exists
pub const DEFAULT_RESTING_HEART_RATE: f64 = 60.0;

/// Lower bounds of zones 2-5 as a fraction of max heart rate
const ZONE_BREAKPOINTS: [f64; 4] = [0.60, 0.70, 0.80, 0.90];

/// Target bands per zone as fractions of max heart rate
const ZONE_TARGETS: [(f64, f64); 5] = [
    (0.50, 0.60),
    (0.60, 0.70),
    (0.70, 0.80),
    (0.80, 0.90),
    (0.90, 1.00),
];

/// Per-user heart-rate model
///
/// The invariant `max > resting > 0` is not enforced at construction;
/// when it does not hold, intensity and zone functions return 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateProfile {
    pub max_heart_rate: f64,
    pub resting_heart_rate: f64,
    pub age: Option<u32>,
}

impl HeartRateProfile {
    /// Build a profile, resolving max HR from the measured value, then
    /// `220 − age`, then [`FALLBACK_MAX_HEART_RATE`]
    pub fn new(resting_heart_rate: f64, max_heart_rate: Option<f64>, age: Option<u32>) -> Self {
        let max_heart_rate = max_heart_rate
            .filter(|hr| hr.is_finite() && *hr > 0.0)
            .or_else(|| age.map(|a| 220.0 - a as f64))
            .unwrap_or(FALLBACK_MAX_HEART_RATE);

        HeartRateProfile {
            max_heart_rate,
            resting_heart_rate,
            age,
        }
    }

    /// `max − resting`
    pub fn heart_rate_reserve(&self) -> f64 {
        self.max_heart_rate - self.resting_heart_rate
    }

    /// True when `max > resting > 0`
    pub fn is_valid(&self) -> bool {
        self.resting_heart_rate > 0.0 && self.max_heart_rate > self.resting_heart_rate
    }

    /// Fraction of max heart rate, clamped to [0, 1]
    pub fn intensity_from_heart_rate(&self, heart_rate: f64) -> f64 {
        if self.max_heart_rate <= 0.0 || !heart_rate.is_finite() {
            return 0.0;
        }
        (heart_rate / self.max_heart_rate).clamp(0.0, 1.0)
    }

    /// Karvonen intensity `(hr − resting) / reserve`, clamped to [0, 1]
    pub fn intensity_from_heart_rate_reserve(&self, heart_rate: f64) -> f64 {
        let reserve = self.heart_rate_reserve();
        if !self.is_valid() || !heart_rate.is_finite() || reserve <= 0.0 {
            return 0.0;
        }
        ((heart_rate - self.resting_heart_rate) / reserve).clamp(0.0, 1.0)
    }

    /// Zone 1-5 for a heart rate, 0 when the profile is invalid
    pub fn heart_rate_zone(&self, heart_rate: f64) -> u8 {
        if self.max_heart_rate <= 0.0 {
            return 0;
        }
        let intensity = self.intensity_from_heart_rate(heart_rate);
        1 + ZONE_BREAKPOINTS.iter().filter(|b| intensity >= **b).count() as u8
    }

    /// Absolute BPM band `(lower, upper)` for zone 1-5
    pub fn target_heart_rate(&self, zone: u8) -> Option<(f64, f64)> {
        if zone == 0 || zone as usize > ZONE_TARGETS.len() {
            return None;
        }
        let (low, high) = ZONE_TARGETS[zone as usize - 1];
        Some((
            (self.max_heart_rate * low).round(),
            (self.max_heart_rate * high).round(),
        ))
    }

    /// Minutes spent in each zone, weighting each sample by the time until
    /// the next one (capped at `max_gap_seconds`)
    pub fn time_in_zones(&self, samples: &[Sample], max_gap_seconds: f64) -> [f64; 5] {
        let mut minutes = [0.0; 5];
        for (sample, seconds) in samples.iter().zip(sample_intervals(samples, max_gap_seconds)) {
            if sample.value <= 0.0 || !sample.value.is_finite() {
                continue;
            }
            let zone = self.heart_rate_zone(sample.value);
            if zone > 0 {
                minutes[zone as usize - 1] += seconds / 60.0;
            }
        }
        minutes
    }
}

/// Seconds each sample stands for: the gap to the next sample capped at
/// `max_gap_seconds`; the last sample reuses the previous interval
pub(crate) fn sample_intervals(samples: &[Sample], max_gap_seconds: f64) -> Vec<f64> {
    let mut intervals: Vec<f64> = samples
        .windows(2)
        .map(|w| {
            let gap = (w[1].timestamp - w[0].timestamp).num_milliseconds() as f64 / 1000.0;
            gap.clamp(0.0, max_gap_seconds)
        })
        .collect();

    if !samples.is_empty() {
        let last = intervals.last().copied().unwrap_or(0.0);
        intervals.push(last);
    }
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn profile() -> HeartRateProfile {
        HeartRateProfile::new(60.0, Some(200.0), None)
    }

    #[test]
    fn test_max_heart_rate_resolution() {
        assert_eq!(HeartRateProfile::new(55.0, Some(185.0), Some(30)).max_heart_rate, 185.0);
        assert_eq!(HeartRateProfile::new(55.0, None, Some(30)).max_heart_rate, 190.0);
        assert_eq!(HeartRateProfile::new(55.0, None, Some(40)).max_heart_rate, 180.0);
        assert_eq!(
            HeartRateProfile::new(55.0, None, None).max_heart_rate,
            FALLBACK_MAX_HEART_RATE
        );
    }

    #[test]
    fn test_karvonen_intensity() {
        let p = profile();
        assert_eq!(p.heart_rate_reserve(), 140.0);
        assert!((p.intensity_from_heart_rate_reserve(130.0) - 0.5).abs() < 1e-9);
        assert_eq!(p.intensity_from_heart_rate_reserve(50.0), 0.0);
        assert_eq!(p.intensity_from_heart_rate_reserve(230.0), 1.0);
        assert!((p.intensity_from_heart_rate(150.0) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_zone_breakpoints() {
        let p = profile();
        assert_eq!(p.heart_rate_zone(100.0), 1);
        assert_eq!(p.heart_rate_zone(119.0), 1);
        assert_eq!(p.heart_rate_zone(120.0), 2);
        assert_eq!(p.heart_rate_zone(140.0), 3);
        assert_eq!(p.heart_rate_zone(160.0), 4);
        assert_eq!(p.heart_rate_zone(179.0), 4);
        assert_eq!(p.heart_rate_zone(180.0), 5);
        assert_eq!(p.heart_rate_zone(250.0), 5);
    }

    #[test]
    fn test_target_heart_rate() {
        let p = profile();
        assert_eq!(p.target_heart_rate(1), Some((100.0, 120.0)));
        assert_eq!(p.target_heart_rate(3), Some((140.0, 160.0)));
        assert_eq!(p.target_heart_rate(5), Some((180.0, 200.0)));
        assert_eq!(p.target_heart_rate(0), None);
        assert_eq!(p.target_heart_rate(6), None);
    }

    #[test]
    fn test_invalid_profile_degrades_to_zero() {
        let inverted = HeartRateProfile::new(190.0, Some(180.0), None);
        assert!(!inverted.is_valid());
        assert_eq!(inverted.intensity_from_heart_rate_reserve(170.0), 0.0);

        let zero_max = HeartRateProfile {
            max_heart_rate: 0.0,
            resting_heart_rate: 60.0,
            age: None,
        };
        assert_eq!(zero_max.intensity_from_heart_rate(150.0), 0.0);
        assert_eq!(zero_max.heart_rate_zone(150.0), 0);
    }

    #[test]
    fn test_time_in_zones() {
        let p = profile();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap();
        // 10 minutes at 150 bpm (zone 3), then 5 minutes at 185 bpm (zone 5)
        let samples: Vec<Sample> = (0..15)
            .map(|m| {
                let hr = if m < 10 { 150.0 } else { 185.0 };
                Sample::new(start + Duration::minutes(m), hr)
            })
            .collect();

        let zones = p.time_in_zones(&samples, 300.0);
        assert!((zones[2] - 10.0).abs() < 1e-9);
        assert!((zones[4] - 5.0).abs() < 1e-9);
        assert_eq!(zones[0], 0.0);
    }

    #[test]
    fn test_sample_intervals_capped() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap();
        let samples = vec![
            Sample::new(start, 120.0),
            Sample::new(start + Duration::seconds(5), 121.0),
            Sample::new(start + Duration::hours(2), 122.0),
        ];
        assert_eq!(sample_intervals(&samples, 60.0), vec![5.0, 60.0, 60.0]);
        assert_eq!(sample_intervals(&samples[..1], 60.0), vec![0.0]);
        assert!(sample_intervals(&[], 60.0).is_empty());
    }

    proptest! {
        #[test]
        fn test_intensity_always_clamped(
            hr in -1000.0f64..5000.0,
            resting in 1.0f64..120.0,
            max in 1.0f64..260.0,
        ) {
            let p = HeartRateProfile::new(resting, Some(max), None);
            let by_max = p.intensity_from_heart_rate(hr);
            let by_reserve = p.intensity_from_heart_rate_reserve(hr);
            prop_assert!((0.0..=1.0).contains(&by_max));
            prop_assert!((0.0..=1.0).contains(&by_reserve));
        }

        #[test]
        fn test_zone_in_range(hr in 0.0f64..400.0) {
            let zone = profile().heart_rate_zone(hr);
            prop_assert!((1..=5).contains(&zone));
        }
    }
}
