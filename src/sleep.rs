//! Sleep stage summaries
//!
//! # Sleep Science Background
//!
//! Healthy adult sleep architecture (% of total sleep time):
//! - Deep: 13-23%
//! - Light: 45-55%
//! - REM: 20-25%
//! - Awake: <5% of time in bed
//!
//! The data source delivers stage-annotated intervals; this module reduces
//! a night of intervals to durations, efficiency and bedtime consistency.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::outlier::sample_std_dev;

/// Minimum nights needed to judge bedtime consistency
const MIN_CONSISTENCY_NIGHTS: usize = 3;

/// Onset spread (std-dev, minutes) at which consistency reaches zero
const CONSISTENCY_SPREAD_MINUTES: f64 = 120.0;

/// Sleep stages reported by the health platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    /// In bed, not necessarily asleep
    InBed,
    /// Awake periods during sleep
    Awake,
    /// Light sleep (NREM 1 & 2)
    Light,
    /// Deep sleep / Slow-wave sleep (NREM 3)
    Deep,
    /// REM (Rapid Eye Movement) sleep
    Rem,
    /// Asleep with no stage information
    Asleep,
}

impl SleepStage {
    pub fn is_asleep(&self) -> bool {
        matches!(
            self,
            SleepStage::Light | SleepStage::Deep | SleepStage::Rem | SleepStage::Asleep
        )
    }
}

impl fmt::Display for SleepStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SleepStage::InBed => write!(f, "In Bed"),
            SleepStage::Awake => write!(f, "Awake"),
            SleepStage::Light => write!(f, "Light"),
            SleepStage::Deep => write!(f, "Deep"),
            SleepStage::Rem => write!(f, "REM"),
            SleepStage::Asleep => write!(f, "Asleep"),
        }
    }
}

/// Stage-annotated interval from the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepInterval {
    pub stage: SleepStage,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SleepInterval {
    pub fn new(stage: SleepStage, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        SleepInterval { stage, start, end }
    }

    /// Duration in minutes; inverted intervals count as zero
    pub fn minutes(&self) -> f64 {
        ((self.end - self.start).num_seconds().max(0)) as f64 / 60.0
    }
}

/// One night of sleep reduced to durations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSummary {
    /// First asleep interval start
    pub sleep_start: DateTime<Utc>,

    /// Last asleep interval end
    pub sleep_end: DateTime<Utc>,

    /// Total sleep time in minutes (excludes awake time)
    pub total_sleep_minutes: f64,

    /// Time in bed in minutes
    pub time_in_bed_minutes: f64,

    pub deep_minutes: f64,
    pub light_minutes: f64,
    pub rem_minutes: f64,
    pub awake_minutes: f64,

    /// Asleep / in bed (0-1)
    pub efficiency: Option<f64>,

    /// Bedtime regularity over recent nights (0-1)
    pub consistency: Option<f64>,
}

impl SleepSummary {
    /// Summarize a night; `None` when no asleep time was recorded
    ///
    /// Overlapping or duplicated intervals are merged before their minutes
    /// are counted, so a generic `Asleep` interval under staged ones adds
    /// nothing twice.
    pub fn from_intervals(intervals: &[SleepInterval]) -> Option<Self> {
        let asleep: Vec<&SleepInterval> = intervals
            .iter()
            .filter(|i| i.stage.is_asleep() && i.end > i.start)
            .collect();

        let sleep_start = asleep.iter().map(|i| i.start).min()?;
        let sleep_end = asleep.iter().map(|i| i.end).max()?;

        let minutes_in = |stage: SleepStage| -> f64 {
            covered_minutes(intervals.iter().filter(|i| i.stage == stage))
        };

        let total_sleep_minutes = covered_minutes(asleep.iter().copied());
        let awake_minutes = minutes_in(SleepStage::Awake);

        // Explicit in-bed intervals win; otherwise the span from first to
        // last sleep-related interval stands in for time in bed.
        let explicit_in_bed = minutes_in(SleepStage::InBed);
        let time_in_bed_minutes = if explicit_in_bed > 0.0 {
            explicit_in_bed.max(total_sleep_minutes)
        } else {
            let first = intervals
                .iter()
                .filter(|i| i.stage != SleepStage::InBed)
                .map(|i| i.start)
                .min()
                .unwrap_or(sleep_start);
            let last = intervals
                .iter()
                .filter(|i| i.stage != SleepStage::InBed)
                .map(|i| i.end)
                .max()
                .unwrap_or(sleep_end);
            ((last - first).num_seconds().max(0) as f64 / 60.0).max(total_sleep_minutes)
        };

        let efficiency = if time_in_bed_minutes > 0.0 {
            Some((total_sleep_minutes / time_in_bed_minutes).clamp(0.0, 1.0))
        } else {
            None
        };

        Some(SleepSummary {
            sleep_start,
            sleep_end,
            total_sleep_minutes,
            time_in_bed_minutes,
            deep_minutes: minutes_in(SleepStage::Deep),
            light_minutes: minutes_in(SleepStage::Light),
            rem_minutes: minutes_in(SleepStage::Rem),
            awake_minutes,
            efficiency,
            consistency: None,
        })
    }

    pub fn with_consistency(&self, consistency: Option<f64>) -> Self {
        SleepSummary {
            consistency,
            ..self.clone()
        }
    }

    pub fn total_sleep_hours(&self) -> f64 {
        self.total_sleep_minutes / 60.0
    }

    /// Stage percentages of total sleep (deep, light, REM)
    pub fn stage_percentages(&self) -> (f64, f64, f64) {
        if self.total_sleep_minutes <= 0.0 {
            return (0.0, 0.0, 0.0);
        }
        let total = self.total_sleep_minutes;
        (
            self.deep_minutes / total * 100.0,
            self.light_minutes / total * 100.0,
            self.rem_minutes / total * 100.0,
        )
    }
}

/// Minutes covered by the union of `intervals`
fn covered_minutes<'a>(intervals: impl Iterator<Item = &'a SleepInterval>) -> f64 {
    let mut spans: Vec<(DateTime<Utc>, DateTime<Utc>)> = intervals
        .filter(|i| i.end > i.start)
        .map(|i| (i.start, i.end))
        .collect();
    spans.sort_by_key(|(start, _)| *start);

    let mut seconds = 0;
    let mut current: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
    for (start, end) in spans {
        current = match current {
            Some((open, close)) if start <= close => Some((open, close.max(end))),
            Some((open, close)) => {
                seconds += (close - open).num_seconds();
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((open, close)) = current {
        seconds += (close - open).num_seconds();
    }
    seconds as f64 / 60.0
}

/// Bedtime regularity from sleep onsets, 1 = same time every night
///
/// Onsets are converted to local time with `utc_offset_minutes` and
/// measured in minutes from local noon, so bedtimes either side of
/// midnight stay close together.
pub fn sleep_consistency(onsets: &[DateTime<Utc>], utc_offset_minutes: i32) -> Option<f64> {
    if onsets.len() < MIN_CONSISTENCY_NIGHTS {
        return None;
    }
    let offset = Duration::minutes(utc_offset_minutes as i64);
    let minutes: Vec<f64> = onsets
        .iter()
        .map(|t| {
            let local = (*t + offset).naive_utc();
            let of_day = (local.hour() * 60 + local.minute()) as f64;
            (of_day - 12.0 * 60.0).rem_euclid(24.0 * 60.0)
        })
        .collect();

    let spread = sample_std_dev(&minutes);
    Some((1.0 - spread / CONSISTENCY_SPREAD_MINUTES).clamp(0.0, 1.0))
}
