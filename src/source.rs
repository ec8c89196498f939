//! Health data source boundary
//!
//! The scoring engine never talks to a health platform directly. It reads
//! through [`HealthDataSource`], which hands back owned snapshots so that
//! every scoring call works on its own copy of the data.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SourceError;
use crate::models::{Sample, WorkoutSession};
use crate::outlier::mean;
use crate::sleep::SleepInterval;

/// Trailing window used to average resting and respiratory rates
pub const DEFAULT_TRAILING_WINDOW_HOURS: i64 = 24;

/// Read access to a health platform
///
/// Ranges are half-open: `[from, to)`.
#[async_trait]
pub trait HealthDataSource: Send + Sync {
    async fn heart_rate(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>, SourceError>;

    async fn hrv(&self, from: DateTime<Utc>, to: DateTime<Utc>)
        -> Result<Vec<Sample>, SourceError>;

    /// Latest resting heart rate, averaged over a trailing window ending at `as_of`
    async fn resting_heart_rate(&self, as_of: DateTime<Utc>) -> Result<Option<f64>, SourceError>;

    /// Latest respiratory rate, averaged over a trailing window ending at `as_of`
    async fn respiratory_rate(&self, as_of: DateTime<Utc>) -> Result<Option<f64>, SourceError>;

    /// Stage-annotated sleep intervals starting in the range
    async fn sleep(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SleepInterval>, SourceError>;

    /// Workouts starting in the range, with their heart-rate samples
    async fn workouts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkoutSession>, SourceError>;

    fn source_name(&self) -> &'static str;
}

/// Exported health data, as written by a platform export job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthExport {
    #[serde(default)]
    pub heart_rate: Vec<Sample>,
    #[serde(default)]
    pub hrv: Vec<Sample>,
    #[serde(default)]
    pub resting_heart_rate: Vec<Sample>,
    #[serde(default)]
    pub respiratory_rate: Vec<Sample>,
    #[serde(default)]
    pub sleep: Vec<SleepInterval>,
    #[serde(default)]
    pub workouts: Vec<WorkoutSession>,
}

/// Health data source backed by an in-memory export
#[derive(Debug, Clone)]
pub struct InMemoryHealthSource {
    export: HealthExport,
    trailing_window: Duration,
}

impl InMemoryHealthSource {
    pub fn new(export: HealthExport) -> Self {
        InMemoryHealthSource {
            export,
            trailing_window: Duration::hours(DEFAULT_TRAILING_WINDOW_HOURS),
        }
    }

    pub fn with_trailing_window(mut self, window: Duration) -> Self {
        self.trailing_window = window;
        self
    }

    /// Load a JSON export from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read health export: {}", path.display()))?;
        let export: HealthExport = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse health export: {}", path.display()))?;
        Ok(InMemoryHealthSource::new(export))
    }

    pub fn export(&self) -> &HealthExport {
        &self.export
    }

    fn in_range(samples: &[Sample], from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Sample> {
        let mut selected: Vec<Sample> = samples
            .iter()
            .filter(|s| s.timestamp >= from && s.timestamp < to)
            .copied()
            .collect();
        selected.sort_by_key(|s| s.timestamp);
        selected
    }

    fn trailing_average(&self, samples: &[Sample], as_of: DateTime<Utc>) -> Option<f64> {
        let from = as_of - self.trailing_window;
        mean(
            samples
                .iter()
                .filter(|s| s.timestamp > from && s.timestamp <= as_of)
                .map(|s| s.value),
        )
    }
}

#[async_trait]
impl HealthDataSource for InMemoryHealthSource {
    async fn heart_rate(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>, SourceError> {
        Ok(Self::in_range(&self.export.heart_rate, from, to))
    }

    async fn hrv(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>, SourceError> {
        Ok(Self::in_range(&self.export.hrv, from, to))
    }

    async fn resting_heart_rate(&self, as_of: DateTime<Utc>) -> Result<Option<f64>, SourceError> {
        Ok(self.trailing_average(&self.export.resting_heart_rate, as_of))
    }

    async fn respiratory_rate(&self, as_of: DateTime<Utc>) -> Result<Option<f64>, SourceError> {
        Ok(self.trailing_average(&self.export.respiratory_rate, as_of))
    }

    async fn sleep(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SleepInterval>, SourceError> {
        let mut intervals: Vec<SleepInterval> = self
            .export
            .sleep
            .iter()
            .filter(|i| i.start >= from && i.start < to)
            .cloned()
            .collect();
        intervals.sort_by_key(|i| i.start);
        Ok(intervals)
    }

    async fn workouts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkoutSession>, SourceError> {
        let mut workouts: Vec<WorkoutSession> = self
            .export
            .workouts
            .iter()
            .filter(|w| w.start >= from && w.start < to)
            .cloned()
            .collect();
        workouts.sort_by_key(|w| w.start);
        Ok(workouts)
    }

    fn source_name(&self) -> &'static str {
        "in_memory"
    }
}
