//! Rolling personal baselines
//!
//! Every score is relative to the user's own "normal". Baselines are
//! recomputed once per scoring run from stored daily records strictly
//! before the target date, over two trailing windows:
//!
//! - **Recent** (7 days): HRV, resting HR, respiratory rate, acute strain
//! - **Historical** (28 days): chronic strain

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::DailyRecord;
use crate::outlier::{mean, sample_std_dev, OutlierFilter};

/// Snapshot of the user's baselines as of a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineMetrics {
    /// Mean filtered HRV (ms)
    pub hrv_baseline: Option<f64>,
    pub hrv_std_dev: Option<f64>,

    /// Mean resting heart rate (bpm)
    pub rhr_baseline: Option<f64>,
    pub rhr_std_dev: Option<f64>,

    /// Mean strain over the recent window
    pub acute_strain: f64,

    /// Mean strain over the historical window
    pub chronic_strain: f64,

    /// Mean respiratory rate (breaths/min)
    pub respiratory_rate_baseline: Option<f64>,

    /// Date the baseline applies to (exclusive end of both windows)
    pub calculated_date: NaiveDate,

    /// Recent-window days with both HRV and RHR present
    pub days_of_data: usize,

    /// Enough days of data for the baseline to be considered stable
    pub is_established: bool,
}

/// Baseline window and sample-size configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Recent window length in days
    pub recent_window_days: i64,

    /// Historical window length in days
    pub historical_window_days: i64,

    /// Minimum recent-window records required for any baseline
    pub min_recent_days: usize,

    /// Days of HRV+RHR data for a baseline to count as established
    pub established_days: usize,

    /// Exclusive plausibility bounds for resting heart rate (bpm)
    pub rhr_bounds: (f64, f64),

    /// Exclusive plausibility bounds for respiratory rate (breaths/min)
    pub respiratory_bounds: (f64, f64),
}

impl Default for BaselineConfig {
    fn default() -> Self {
        BaselineConfig {
            recent_window_days: 7,
            historical_window_days: 28,
            min_recent_days: 5,
            established_days: 7,
            rhr_bounds: (0.0, 120.0),
            respiratory_bounds: (5.0, 40.0),
        }
    }
}

/// Baseline calculation engine
#[derive(Debug, Clone, Default)]
pub struct BaselineCalculator {
    config: BaselineConfig,
    hrv_filter: OutlierFilter,
}

impl BaselineCalculator {
    /// Create new calculator with default configuration
    pub fn new() -> Self {
        BaselineCalculator::default()
    }

    /// Create new calculator with custom configuration
    pub fn with_config(config: BaselineConfig, hrv_filter: OutlierFilter) -> Self {
        BaselineCalculator { config, hrv_filter }
    }

    pub fn config(&self) -> &BaselineConfig {
        &self.config
    }

    /// Compute baselines from `history` as of `as_of`
    ///
    /// Only records dated strictly before `as_of` are used. Returns `None`
    /// when the recent window holds fewer than `min_recent_days` records.
    pub fn compute(&self, history: &[DailyRecord], as_of: NaiveDate) -> Option<BaselineMetrics> {
        let recent_start = as_of - Duration::days(self.config.recent_window_days);
        let historical_start = as_of - Duration::days(self.config.historical_window_days);

        let recent: Vec<&DailyRecord> = history
            .iter()
            .filter(|r| r.date >= recent_start && r.date < as_of)
            .collect();
        let historical: Vec<&DailyRecord> = history
            .iter()
            .filter(|r| r.date >= historical_start && r.date < as_of)
            .collect();

        if recent.len() < self.config.min_recent_days {
            debug!(
                %as_of,
                recent_days = recent.len(),
                required = self.config.min_recent_days,
                "Insufficient data for baseline"
            );
            return None;
        }

        let raw_hrv: Vec<f64> = recent
            .iter()
            .filter_map(|r| r.hrv_average)
            .filter(|v| *v > 0.0)
            .collect();
        let hrv = self.hrv_filter.filter(&raw_hrv);

        let (rhr_low, rhr_high) = self.config.rhr_bounds;
        let rhr: Vec<f64> = recent
            .iter()
            .filter_map(|r| r.resting_heart_rate)
            .filter(|v| *v > rhr_low && *v < rhr_high)
            .collect();

        let (resp_low, resp_high) = self.config.respiratory_bounds;
        let respiratory = mean(
            recent
                .iter()
                .filter_map(|r| r.respiratory_rate)
                .filter(|v| *v > resp_low && *v < resp_high),
        );

        let acute_strain = mean(recent.iter().map(|r| r.strain)).unwrap_or(0.0);
        let chronic_strain = mean(historical.iter().map(|r| r.strain)).unwrap_or(acute_strain);

        let days_of_data = recent
            .iter()
            .filter(|r| r.hrv_average.is_some() && r.resting_heart_rate.is_some())
            .count();

        let hrv_baseline = mean(hrv.iter().copied());
        let rhr_baseline = mean(rhr.iter().copied());

        let metrics = BaselineMetrics {
            hrv_baseline,
            hrv_std_dev: hrv_baseline.map(|_| sample_std_dev(&hrv)),
            rhr_baseline,
            rhr_std_dev: rhr_baseline.map(|_| sample_std_dev(&rhr)),
            acute_strain,
            chronic_strain,
            respiratory_rate_baseline: respiratory,
            calculated_date: as_of,
            days_of_data,
            is_established: days_of_data >= self.config.established_days,
        };

        debug!(
            %as_of,
            hrv = ?metrics.hrv_baseline,
            rhr = ?metrics.rhr_baseline,
            acute = metrics.acute_strain,
            chronic = metrics.chronic_strain,
            days = metrics.days_of_data,
            "Baseline computed"
        );

        Some(metrics)
    }
}
