//! Recovery: daily readiness on a 0-100 scale
//!
//! # Sports Science Background
//!
//! Recovery combines four signals, each judged against the user's own
//! baseline rather than population norms:
//!
//! - **HRV** (40%): higher than baseline indicates parasympathetic
//!   dominance and good recovery.
//! - **Resting heart rate** (30%): lower than baseline is good; an
//!   elevated RHR often precedes illness or reflects accumulated fatigue.
//! - **Sleep** (20%): duration against a 7-9 hour target, blended with
//!   efficiency and bedtime consistency.
//! - **Respiratory rate** (10%): deviation in either direction is a
//!   warning sign.
//!
//! Missing signals drop out and the remaining weights are renormalized.
//! With no HRV, RHR or sleep at all there is no recovery score.
//!
//! A modest training-load penalty is subtracted when the acute:chronic
//! ratio is in the caution range or yesterday's strain was very high.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Component weights of the composite score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryWeights {
    pub hrv: f64,
    pub resting_heart_rate: f64,
    pub sleep: f64,
    pub respiratory: f64,
}

impl Default for RecoveryWeights {
    fn default() -> Self {
        RecoveryWeights {
            hrv: 0.40,
            resting_heart_rate: 0.30,
            sleep: 0.20,
            respiratory: 0.10,
        }
    }
}

/// Recovery calculation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub weights: RecoveryWeights,

    /// Score points per standard deviation away from baseline
    pub z_score_scale: f64,

    /// Std-dev used when the baseline has none, as a fraction of baseline
    pub fallback_std_dev_fraction: f64,

    /// Adequate sleep range in hours
    pub sleep_target_hours: (f64, f64),

    /// Points lost per hour below the target range
    pub under_sleep_penalty_per_hour: f64,

    /// Points lost per hour above the target range
    pub over_sleep_penalty_per_hour: f64,

    /// Blend of duration, efficiency and consistency in the sleep component
    pub sleep_blend: (f64, f64, f64),

    /// Points lost per percent of respiratory-rate deviation
    pub respiratory_penalty_per_percent: f64,

    /// Acute:chronic ratio above which the load penalty starts
    pub load_ratio_threshold: f64,

    /// Penalty points per unit of ratio above the threshold
    pub load_ratio_penalty: f64,

    /// Previous-day strain above which the load penalty starts
    pub recent_strain_threshold: f64,

    /// Penalty points per strain point above the threshold
    pub recent_strain_penalty: f64,

    /// Cap on the total load penalty
    pub max_load_penalty: f64,

    /// Lower bounds of the yellow and green bands
    pub band_thresholds: (f64, f64),
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            weights: RecoveryWeights::default(),
            z_score_scale: 25.0,
            fallback_std_dev_fraction: 0.10,
            sleep_target_hours: (7.0, 9.0),
            under_sleep_penalty_per_hour: 25.0,
            over_sleep_penalty_per_hour: 10.0,
            sleep_blend: (0.60, 0.25, 0.15),
            respiratory_penalty_per_percent: 5.0,
            load_ratio_threshold: 1.3,
            load_ratio_penalty: 20.0,
            recent_strain_threshold: 14.0,
            recent_strain_penalty: 1.0,
            max_load_penalty: 10.0,
            band_thresholds: (34.0, 67.0),
        }
    }
}

/// Everything the recovery score can use; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryInputs {
    pub hrv_current: Option<f64>,
    pub hrv_baseline: Option<f64>,
    pub hrv_std_dev: Option<f64>,
    pub rhr_current: Option<f64>,
    pub rhr_baseline: Option<f64>,
    pub rhr_std_dev: Option<f64>,

    /// Hours slept; `None` or non-positive means no sleep recorded
    pub sleep_duration_hours: Option<f64>,

    /// Asleep / in bed (0-1)
    pub sleep_efficiency: Option<f64>,

    /// Bedtime regularity (0-1)
    pub sleep_consistency: Option<f64>,

    /// Previous day's strain
    pub recent_strain: Option<f64>,
    pub acute_strain: Option<f64>,
    pub chronic_strain: Option<f64>,

    pub respiratory_rate: Option<f64>,
    pub respiratory_baseline: Option<f64>,
}

/// Per-signal sub-scores (0-100) behind a recovery score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryComponents {
    pub hrv: Option<f64>,
    pub resting_heart_rate: Option<f64>,
    pub sleep: Option<f64>,
    pub respiratory: Option<f64>,

    /// Points subtracted from the weighted composite
    pub load_penalty: f64,
}

impl RecoveryComponents {
    /// Weighted composite over present components, minus the load penalty
    pub fn composite(&self, weights: &RecoveryWeights) -> Option<f64> {
        if self.hrv.is_none() && self.resting_heart_rate.is_none() && self.sleep.is_none() {
            return None;
        }

        let parts = [
            (self.hrv, weights.hrv),
            (self.resting_heart_rate, weights.resting_heart_rate),
            (self.sleep, weights.sleep),
            (self.respiratory, weights.respiratory),
        ];

        let (weighted, total_weight) = parts
            .iter()
            .filter_map(|(score, weight)| score.map(|s| (s * weight, *weight)))
            .fold((0.0, 0.0), |(sum, total), (ws, w)| (sum + ws, total + w));

        if total_weight <= 0.0 {
            return None;
        }

        Some((weighted / total_weight - self.load_penalty).clamp(0.0, 100.0))
    }
}

/// Recovery interpretation bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryBand {
    /// Body is struggling; favour rest
    Red,
    /// Partially recovered; moderate training
    Yellow,
    /// Well recovered; ready for strain
    Green,
}

impl RecoveryBand {
    pub fn recommendation(&self) -> &'static str {
        match self {
            RecoveryBand::Red => "Prioritize rest and recovery today",
            RecoveryBand::Yellow => "Train at moderate intensity",
            RecoveryBand::Green => "Ready for high-intensity training",
        }
    }
}

/// Recovery calculation engine
#[derive(Debug, Clone, Default)]
pub struct RecoveryCalculator {
    config: RecoveryConfig,
}

impl RecoveryCalculator {
    /// Create new calculator with default configuration
    pub fn new() -> Self {
        RecoveryCalculator::default()
    }

    /// Create new calculator with custom configuration
    pub fn with_config(config: RecoveryConfig) -> Self {
        RecoveryCalculator { config }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Recovery score (0-100), `None` without HRV, RHR and sleep
    pub fn score(&self, inputs: &RecoveryInputs) -> Option<f64> {
        let score = self.components(inputs).composite(&self.config.weights);
        debug!(?score, "Recovery score");
        score
    }

    /// The individual sub-scores used by [`Self::score`]
    pub fn components(&self, inputs: &RecoveryInputs) -> RecoveryComponents {
        RecoveryComponents {
            hrv: self
                .z_component(inputs.hrv_current, inputs.hrv_baseline, inputs.hrv_std_dev)
                .map(|z| self.z_to_score(z)),
            resting_heart_rate: self
                .z_component(inputs.rhr_current, inputs.rhr_baseline, inputs.rhr_std_dev)
                .map(|z| self.z_to_score(-z)),
            sleep: self.sleep_component(inputs),
            respiratory: self.respiratory_component(inputs),
            load_penalty: self.load_penalty(inputs),
        }
    }

    /// Band for a recovery score
    pub fn band(&self, score: f64) -> RecoveryBand {
        let (yellow, green) = self.config.band_thresholds;
        if score >= green {
            RecoveryBand::Green
        } else if score >= yellow {
            RecoveryBand::Yellow
        } else {
            RecoveryBand::Red
        }
    }

    /// Sleep duration adequacy (0-100)
    ///
    /// Full marks inside the target range; under-sleeping loses points
    /// faster than modest over-sleeping.
    pub fn sleep_duration_score(&self, hours: f64) -> f64 {
        let (low, high) = self.config.sleep_target_hours;
        let score = if hours < low {
            100.0 - (low - hours) * self.config.under_sleep_penalty_per_hour
        } else if hours > high {
            100.0 - (hours - high) * self.config.over_sleep_penalty_per_hour
        } else {
            100.0
        };
        score.clamp(0.0, 100.0)
    }

    /// z-score of `current` against `baseline`
    fn z_component(
        &self,
        current: Option<f64>,
        baseline: Option<f64>,
        std_dev: Option<f64>,
    ) -> Option<f64> {
        let current = current.filter(|v| v.is_finite())?;
        let baseline = baseline.filter(|b| b.is_finite() && *b > 0.0)?;
        let spread = std_dev
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(baseline * self.config.fallback_std_dev_fraction);
        Some((current - baseline) / spread)
    }

    fn z_to_score(&self, z: f64) -> f64 {
        (50.0 + z * self.config.z_score_scale).clamp(0.0, 100.0)
    }

    fn sleep_component(&self, inputs: &RecoveryInputs) -> Option<f64> {
        let hours = inputs
            .sleep_duration_hours
            .filter(|h| h.is_finite() && *h > 0.0)?;
        let (duration_weight, efficiency_weight, consistency_weight) = self.config.sleep_blend;

        let parts = [
            Some((self.sleep_duration_score(hours), duration_weight)),
            inputs
                .sleep_efficiency
                .filter(|e| e.is_finite())
                .map(|e| ((e * 100.0).clamp(0.0, 100.0), efficiency_weight)),
            inputs
                .sleep_consistency
                .filter(|c| c.is_finite())
                .map(|c| ((c * 100.0).clamp(0.0, 100.0), consistency_weight)),
        ];

        let (weighted, total) = parts
            .iter()
            .flatten()
            .fold((0.0, 0.0), |(sum, total), (score, weight)| {
                (sum + score * weight, total + weight)
            });

        if total <= 0.0 {
            return None;
        }
        Some((weighted / total).clamp(0.0, 100.0))
    }

    fn respiratory_component(&self, inputs: &RecoveryInputs) -> Option<f64> {
        let current = inputs.respiratory_rate.filter(|v| v.is_finite())?;
        let baseline = inputs
            .respiratory_baseline
            .filter(|b| b.is_finite() && *b > 0.0)?;
        let deviation_pct = ((current - baseline) / baseline).abs() * 100.0;
        Some((100.0 - deviation_pct * self.config.respiratory_penalty_per_percent).clamp(0.0, 100.0))
    }

    fn load_penalty(&self, inputs: &RecoveryInputs) -> f64 {
        let ratio_penalty = match (inputs.acute_strain, inputs.chronic_strain) {
            (Some(acute), Some(chronic)) if chronic > 0.0 && acute.is_finite() => {
                let ratio = acute / chronic;
                (ratio - self.config.load_ratio_threshold).max(0.0) * self.config.load_ratio_penalty
            }
            _ => 0.0,
        };

        let strain_penalty = inputs
            .recent_strain
            .filter(|s| s.is_finite())
            .map(|s| (s - self.config.recent_strain_threshold).max(0.0) * self.config.recent_strain_penalty)
            .unwrap_or(0.0);

        (ratio_penalty + strain_penalty).clamp(0.0, self.config.max_load_penalty)
    }
}
