//! Acute:Chronic Workload Ratio
//!
//! ACWR compares the last 7 days of strain with the last 28:
//!
//! - < 0.8: undertraining, fitness may be declining
//! - 0.8-1.3: optimal "sweet spot"
//! - 1.3-1.5: caution, load is ramping quickly
//! - > 1.5: high injury risk

use serde::{Deserialize, Serialize};

/// ACWR zone thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcwrConfig {
    /// Below this ratio is undertraining
    pub undertraining_below: f64,

    /// Upper bound (inclusive) of the optimal zone
    pub optimal_max: f64,

    /// Upper bound (inclusive) of the caution zone
    pub caution_max: f64,
}

impl Default for AcwrConfig {
    fn default() -> Self {
        AcwrConfig {
            undertraining_below: 0.8,
            optimal_max: 1.3,
            caution_max: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcwrStatus {
    Undertraining,
    Optimal,
    Caution,
    HighRisk,
    /// No ratio could be computed
    Unknown,
}

impl AcwrStatus {
    pub fn description(&self) -> &'static str {
        match self {
            AcwrStatus::Undertraining => "Undertraining",
            AcwrStatus::Optimal => "Optimal",
            AcwrStatus::Caution => "Caution",
            AcwrStatus::HighRisk => "High Risk",
            AcwrStatus::Unknown => "Unknown",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            AcwrStatus::Undertraining => "Training load is low; build volume gradually",
            AcwrStatus::Optimal => "Training load is in the optimal zone",
            AcwrStatus::Caution => "Load is rising quickly; watch for fatigue",
            AcwrStatus::HighRisk => "Load spike; reduce intensity to limit injury risk",
            AcwrStatus::Unknown => "Not enough training history yet",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AcwrEvaluator {
    config: AcwrConfig,
}

impl AcwrEvaluator {
    pub fn new() -> Self {
        AcwrEvaluator::default()
    }

    pub fn with_config(config: AcwrConfig) -> Self {
        AcwrEvaluator { config }
    }

    pub fn config(&self) -> &AcwrConfig {
        &self.config
    }

    /// `acute / chronic`; absent when either is missing or chronic <= 0
    pub fn acwr(&self, acute: Option<f64>, chronic: Option<f64>) -> Option<f64> {
        let acute = acute.filter(|a| a.is_finite())?;
        let chronic = chronic.filter(|c| c.is_finite() && *c > 0.0)?;
        Some(acute / chronic)
    }

    pub fn status(&self, ratio: Option<f64>) -> AcwrStatus {
        match ratio {
            None => AcwrStatus::Unknown,
            Some(r) if r.is_nan() => AcwrStatus::Unknown,
            Some(r) if r < self.config.undertraining_below => AcwrStatus::Undertraining,
            Some(r) if r <= self.config.optimal_max => AcwrStatus::Optimal,
            Some(r) if r <= self.config.caution_max => AcwrStatus::Caution,
            Some(_) => AcwrStatus::HighRisk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_thresholds() {
        let evaluator = AcwrEvaluator::new();
        assert_eq!(evaluator.status(Some(0.79)), AcwrStatus::Undertraining);
        assert_eq!(evaluator.status(Some(0.8)), AcwrStatus::Optimal);
        assert_eq!(evaluator.status(Some(1.3)), AcwrStatus::Optimal);
        assert_eq!(evaluator.status(Some(1.31)), AcwrStatus::Caution);
        assert_eq!(evaluator.status(Some(1.5)), AcwrStatus::Caution);
        assert_eq!(evaluator.status(Some(1.51)), AcwrStatus::HighRisk);
        assert_eq!(evaluator.status(None), AcwrStatus::Unknown);
    }

    #[test]
    fn test_ratio_scenarios() {
        let evaluator = AcwrEvaluator::new();

        let ratio = evaluator.acwr(Some(12.0), Some(10.0));
        assert!((ratio.unwrap() - 1.2).abs() < 1e-9);
        assert_eq!(evaluator.status(ratio), AcwrStatus::Optimal);

        let ratio = evaluator.acwr(Some(16.0), Some(10.0));
        assert!((ratio.unwrap() - 1.6).abs() < 1e-9);
        assert_eq!(evaluator.status(ratio), AcwrStatus::HighRisk);
    }

    #[test]
    fn test_missing_or_zero_chronic() {
        let evaluator = AcwrEvaluator::new();
        assert_eq!(evaluator.acwr(Some(12.0), None), None);
        assert_eq!(evaluator.acwr(None, Some(10.0)), None);
        assert_eq!(evaluator.acwr(Some(12.0), Some(0.0)), None);
        assert_eq!(evaluator.status(evaluator.acwr(Some(12.0), None)), AcwrStatus::Unknown);
    }
}
