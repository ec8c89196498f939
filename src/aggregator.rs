//! Daily aggregation: fetch, score, persist
//!
//! The aggregator is the only async, stateful part of the engine. For a
//! target day it fetches raw health data concurrently, loads stored
//! history strictly before the day, runs the pure calculators in causal
//! order (baseline, profile, strain, sleep, recovery, stress, ACWR) and
//! writes one complete [`DailyRecord`].
//!
//! If any fetch fails nothing is written. Writes for the same day are
//! serialized with a per-day lock so overlapping refreshes cannot lose
//! updates.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::acwr::AcwrEvaluator;
use crate::baseline::{BaselineCalculator, BaselineMetrics};
use crate::config::{ScoringConfig, UserProfile};
use crate::error::{AggregationError, SourceError};
use crate::models::{DailyRecord, Sample, WorkoutSession, WorkoutSummary};
use crate::outlier::{mean, OutlierFilter};
use crate::recovery::{RecoveryCalculator, RecoveryInputs};
use crate::sleep::{sleep_consistency, SleepInterval, SleepSummary};
use crate::source::HealthDataSource;
use crate::store::MetricsStore;
use crate::strain::StrainCalculator;
use crate::stress::StressEstimator;

/// Day boundary and history configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Offset of the user's local day from UTC, in minutes
    pub utc_offset_minutes: i32,

    /// Local hour on the previous day when the sleep window opens
    pub sleep_window_start_hour: u32,

    /// Local hour on the target day when the sleep window closes
    pub sleep_window_end_hour: u32,

    /// Previous nights used for bedtime consistency
    pub consistency_nights: i64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            utc_offset_minutes: 0,
            sleep_window_start_hour: 18,
            sleep_window_end_hour: 12,
            consistency_nights: 7,
        }
    }
}

/// Everything fetched from the source for one day
struct DayData {
    heart_rate: Vec<Sample>,
    hrv: Vec<Sample>,
    resting_heart_rate: Option<f64>,
    respiratory_rate: Option<f64>,
    sleep: Vec<SleepInterval>,
    workouts: Vec<WorkoutSession>,
}

impl DayData {
    fn is_empty(&self) -> bool {
        self.heart_rate.is_empty()
            && self.hrv.is_empty()
            && self.resting_heart_rate.is_none()
            && self.respiratory_rate.is_none()
            && self.sleep.is_empty()
            && self.workouts.is_empty()
    }
}

/// Outcome of a multi-day backfill
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackfillReport {
    /// Records written, in date order
    pub records: Vec<DailyRecord>,

    /// Days with no health data at all
    pub skipped: Vec<NaiveDate>,
}

/// Orchestrates scoring for calendar days
pub struct DailyAggregator<S, M> {
    source: Arc<S>,
    store: Arc<M>,
    profile: UserProfile,
    config: AggregatorConfig,
    hrv_filter: OutlierFilter,
    baseline: BaselineCalculator,
    strain: StrainCalculator,
    recovery: RecoveryCalculator,
    stress: StressEstimator,
    acwr: AcwrEvaluator,
    day_locks: Mutex<HashMap<NaiveDate, Arc<Mutex<()>>>>,
}

impl<S: HealthDataSource, M: MetricsStore> DailyAggregator<S, M> {
    /// Create an aggregator with default scoring configuration
    pub fn new(source: Arc<S>, store: Arc<M>) -> Self {
        Self::with_config(
            source,
            store,
            UserProfile::default(),
            ScoringConfig::default(),
            AggregatorConfig::default(),
        )
    }

    pub fn with_config(
        source: Arc<S>,
        store: Arc<M>,
        profile: UserProfile,
        scoring: ScoringConfig,
        config: AggregatorConfig,
    ) -> Self {
        let hrv_filter = OutlierFilter::with_config(scoring.outlier);
        DailyAggregator {
            source,
            store,
            profile,
            config,
            baseline: BaselineCalculator::with_config(scoring.baseline, hrv_filter.clone()),
            hrv_filter,
            strain: StrainCalculator::with_config(scoring.strain),
            recovery: RecoveryCalculator::with_config(scoring.recovery),
            stress: StressEstimator::with_config(scoring.stress),
            acwr: AcwrEvaluator::with_config(scoring.acwr),
            day_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<M> {
        &self.store
    }

    /// UTC instant of local midnight starting `date`
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let local_midnight = date.and_time(NaiveTime::MIN);
        Utc.from_utc_datetime(
            &(local_midnight - Duration::minutes(self.config.utc_offset_minutes as i64)),
        )
    }

    /// `[start, end)` of the local calendar day in UTC
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.day_start(date);
        (start, start + Duration::days(1))
    }

    /// Window for the night ending on `date`
    pub fn sleep_window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.day_start(date);
        (
            start - Duration::days(1) + Duration::hours(self.config.sleep_window_start_hour as i64),
            start + Duration::hours(self.config.sleep_window_end_hour as i64),
        )
    }

    /// Score one day and persist the record
    ///
    /// Returns [`AggregationError::NoDataAvailable`] when the source holds
    /// nothing for the day, and [`AggregationError::FetchFailed`] when a
    /// request fails. In both cases the store is left untouched.
    #[instrument(skip(self), fields(source = self.source.source_name()))]
    pub async fn aggregate_day(&self, date: NaiveDate) -> Result<DailyRecord, AggregationError> {
        let lock = self.day_lock(date).await;
        let _guard = lock.lock().await;

        let data = self.fetch_day(date).await.map_err(|e| {
            if !e.is_benign() {
                warn!(error = %e, "Fetch failed, nothing written");
            }
            e
        })?;
        if data.is_empty() {
            info!("No health data for day");
            return Err(AggregationError::NoDataAvailable { date });
        }

        let history_days = self
            .baseline
            .config()
            .historical_window_days
            .max(self.config.consistency_nights);
        let history = self
            .store
            .get_range(date - Duration::days(history_days), date)
            .await?;

        let record = self.score_day(date, data, &history);
        self.store.put(&record).await?;

        info!(
            strain = record.strain,
            recovery = ?record.recovery,
            workouts = record.workouts.len(),
            acwr_status = ?record.acwr_status,
            "Day aggregated"
        );
        Ok(record)
    }

    /// Score every day in `from..=to` in date order
    ///
    /// Days with no data are skipped; any other failure stops the backfill
    /// with earlier days already written.
    pub async fn aggregate_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BackfillReport, AggregationError> {
        let mut report = BackfillReport::default();
        for date in from.iter_days().take_while(|d| *d <= to) {
            match self.aggregate_day(date).await {
                Ok(record) => report.records.push(record),
                Err(e) if e.is_benign() => report.skipped.push(date),
                Err(e) => return Err(e),
            }
        }
        debug!(
            written = report.records.len(),
            skipped = report.skipped.len(),
            "Backfill complete"
        );
        Ok(report)
    }

    async fn day_lock(&self, date: NaiveDate) -> Arc<Mutex<()>> {
        let mut locks = self.day_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(date).or_default())
    }

    async fn fetch_day(&self, date: NaiveDate) -> Result<DayData, AggregationError> {
        let (day_start, day_end) = self.day_bounds(date);
        let (sleep_start, sleep_end) = self.sleep_window(date);
        let source = &self.source;

        let (heart_rate, hrv, resting_heart_rate, respiratory_rate, sleep, workouts) = tokio::try_join!(
            fetch(date, source.heart_rate(day_start, day_end)),
            fetch(date, source.hrv(day_start, day_end)),
            fetch(date, source.resting_heart_rate(day_end)),
            fetch(date, source.respiratory_rate(day_end)),
            fetch(date, source.sleep(sleep_start, sleep_end)),
            fetch(date, source.workouts(day_start, day_end)),
        )?;

        Ok(DayData {
            heart_rate,
            hrv,
            resting_heart_rate,
            respiratory_rate,
            sleep,
            workouts,
        })
    }

    /// Pure scoring of one day from fetched data and prior history
    fn score_day(&self, date: NaiveDate, data: DayData, history: &[DailyRecord]) -> DailyRecord {
        let baseline = self.baseline.compute(history, date);

        // Configured resting HR overrides both of these in the profile
        let resting_reference = baseline
            .as_ref()
            .and_then(|b| b.rhr_baseline)
            .or(data.resting_heart_rate);
        let profile = self.profile.heart_rate_profile(resting_reference);

        let workouts: Vec<WorkoutSummary> = data
            .workouts
            .iter()
            .map(|session| self.strain.score_workout(session, &profile))
            .collect();
        let strain = self.strain.daily_strain(&workouts);

        let sleep = self.sleep_summary(date, &data, history);

        let hrv_values: Vec<f64> = data.hrv.iter().map(|s| s.value).collect();
        let hrv_average = mean(self.hrv_filter.filter(&hrv_values));

        let recovery_inputs =
            self.recovery_inputs(date, &data, hrv_average, sleep.as_ref(), baseline.as_ref(), history);
        let components = self.recovery.components(&recovery_inputs);
        let recovery = components.composite(&self.recovery.config().weights);

        let stress_reference = self.profile.resting_heart_rate.or(resting_reference);
        let stress = stress_reference.and_then(|rhr| {
            let readings = self.stress.readings(
                &data.heart_rate,
                rhr,
                baseline.as_ref().and_then(|b| b.hrv_baseline),
                hrv_average,
                &workouts,
            );
            (!readings.is_empty()).then(|| self.stress.summarize(&readings))
        });

        let acwr = self.acwr.acwr(
            baseline.as_ref().map(|b| b.acute_strain),
            baseline.as_ref().map(|b| b.chronic_strain),
        );
        let acwr_status = self.acwr.status(acwr);

        DailyRecord::empty(date)
            .with_workouts(workouts, strain)
            .with_sleep(sleep)
            .with_vitals(hrv_average, data.resting_heart_rate, data.respiratory_rate)
            .with_recovery(recovery, recovery.map(|_| components))
            .with_stress(stress)
            .with_training_load(baseline, acwr, acwr_status)
    }

    fn sleep_summary(
        &self,
        date: NaiveDate,
        data: &DayData,
        history: &[DailyRecord],
    ) -> Option<SleepSummary> {
        let tonight = SleepSummary::from_intervals(&data.sleep)?;

        let earliest = date - Duration::days(self.config.consistency_nights);
        let mut onsets: Vec<DateTime<Utc>> = history
            .iter()
            .filter(|r| r.date >= earliest)
            .filter_map(|r| r.sleep.as_ref().map(|s| s.sleep_start))
            .collect();
        onsets.push(tonight.sleep_start);

        let consistency = sleep_consistency(&onsets, self.config.utc_offset_minutes);
        Some(tonight.with_consistency(consistency))
    }

    fn recovery_inputs(
        &self,
        date: NaiveDate,
        data: &DayData,
        hrv_average: Option<f64>,
        sleep: Option<&SleepSummary>,
        baseline: Option<&BaselineMetrics>,
        history: &[DailyRecord],
    ) -> RecoveryInputs {
        let yesterday = date - Duration::days(1);
        RecoveryInputs {
            hrv_current: hrv_average,
            hrv_baseline: baseline.and_then(|b| b.hrv_baseline),
            hrv_std_dev: baseline.and_then(|b| b.hrv_std_dev),
            rhr_current: data.resting_heart_rate,
            rhr_baseline: baseline.and_then(|b| b.rhr_baseline),
            rhr_std_dev: baseline.and_then(|b| b.rhr_std_dev),
            sleep_duration_hours: sleep.map(SleepSummary::total_sleep_hours),
            sleep_efficiency: sleep.and_then(|s| s.efficiency),
            sleep_consistency: sleep.and_then(|s| s.consistency),
            recent_strain: history.iter().find(|r| r.date == yesterday).map(|r| r.strain),
            acute_strain: baseline.map(|b| b.acute_strain),
            chronic_strain: baseline.map(|b| b.chronic_strain),
            respiratory_rate: data.respiratory_rate,
            respiratory_baseline: baseline.and_then(|b| b.respiratory_rate_baseline),
        }
    }
}

/// Await a source call; a metric with no data is empty rather than an error
async fn fetch<T, F>(date: NaiveDate, request: F) -> Result<T, AggregationError>
where
    T: Default,
    F: Future<Output = Result<T, SourceError>>,
{
    match request.await {
        Ok(value) => Ok(value),
        Err(SourceError::NoData { metric }) => {
            debug!(%metric, "Source reported no data");
            Ok(T::default())
        }
        Err(e) => Err(AggregationError::from_source(date, e)),
    }
}
