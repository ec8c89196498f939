//! Outlier filtering for physiological sample series
//!
//! Wearable sensors regularly emit garbage: dropped contacts read as 0 ms,
//! motion artefacts as 300+ ms HRV. Two stages clean a series before it
//! reaches any baseline or score:
//!
//! 1. **Absolute bounds**: values outside a physiologically plausible range
//!    for the metric are dropped.
//! 2. **Modified z-score** (Iglewicz & Hoaglin): with at least five
//!    survivors, values whose score `0.6745 · |x − median| / MAD` exceeds
//!    the threshold are dropped. The stage repeats until it removes
//!    nothing, so filtering an already-filtered series is a no-op.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};
use tracing::debug;

/// Consistency constant relating MAD to the standard deviation of a normal
const MAD_SCALE: f64 = 0.6745;

/// Outlier filter configuration, tunable per metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Lowest plausible value (inclusive)
    pub lower_bound: f64,

    /// Highest plausible value (inclusive)
    pub upper_bound: f64,

    /// Maximum modified z-score a value may have and still be kept
    pub mad_threshold: f64,

    /// Minimum number of values needed before the robust stage runs
    pub min_samples: usize,
}

impl Default for OutlierConfig {
    /// Defaults are tuned for HRV (RMSSD, milliseconds)
    fn default() -> Self {
        OutlierConfig {
            lower_bound: 10.0,
            upper_bound: 200.0,
            mad_threshold: 3.0,
            min_samples: 5,
        }
    }
}

/// Diagnostic breakdown of a filtering pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierAnalysis {
    pub original_count: usize,
    pub removed_by_bounds: usize,
    pub removed_by_mad: usize,
    pub filtered_count: usize,
    pub original_mean: Option<f64>,
    pub filtered_mean: Option<f64>,

    /// `filtered_mean − original_mean`
    pub mean_shift: Option<f64>,
}

/// Two-stage outlier filter
#[derive(Debug, Clone, Default)]
pub struct OutlierFilter {
    config: OutlierConfig,
}

impl OutlierFilter {
    /// Create new filter with default (HRV) configuration
    pub fn new() -> Self {
        OutlierFilter::default()
    }

    /// Create new filter with custom configuration
    pub fn with_config(config: OutlierConfig) -> Self {
        OutlierFilter { config }
    }

    pub fn config(&self) -> &OutlierConfig {
        &self.config
    }

    /// Filter a series, preserving the relative order of kept values
    pub fn filter(&self, values: &[f64]) -> Vec<f64> {
        let bounded = self.within_bounds(values);
        self.robust_stage(bounded)
    }

    /// Check a single new value against a reference population
    ///
    /// Applies the bounds test, then the modified z-score test against the
    /// in-bounds part of `reference` when it is large enough.
    pub fn is_likely_outlier(&self, value: f64, reference: &[f64]) -> bool {
        if !self.in_bounds(value) {
            return true;
        }

        let population = self.within_bounds(reference);
        if population.len() < self.config.min_samples {
            return false;
        }

        let Some((center, mad)) = median_and_mad(&population) else {
            return false;
        };
        if mad <= 0.0 {
            return false;
        }

        modified_z_score(value, center, mad) > self.config.mad_threshold
    }

    /// Run the filter and report what each stage removed
    pub fn analyze(&self, values: &[f64]) -> OutlierAnalysis {
        let bounded = self.within_bounds(values);
        let after_bounds = bounded.len();
        let filtered = self.robust_stage(bounded);

        let original_mean = mean(values.iter().copied().filter(|v| v.is_finite()));
        let filtered_mean = mean(filtered.iter().copied());
        let mean_shift = match (original_mean, filtered_mean) {
            (Some(before), Some(after)) => Some(after - before),
            _ => None,
        };

        let analysis = OutlierAnalysis {
            original_count: values.len(),
            removed_by_bounds: values.len() - after_bounds,
            removed_by_mad: after_bounds - filtered.len(),
            filtered_count: filtered.len(),
            original_mean,
            filtered_mean,
            mean_shift,
        };

        debug!(
            original = analysis.original_count,
            removed_by_bounds = analysis.removed_by_bounds,
            removed_by_mad = analysis.removed_by_mad,
            mean_shift = ?analysis.mean_shift,
            "Outlier analysis"
        );

        analysis
    }

    fn in_bounds(&self, value: f64) -> bool {
        value >= self.config.lower_bound && value <= self.config.upper_bound
    }

    fn within_bounds(&self, values: &[f64]) -> Vec<f64> {
        values.iter().copied().filter(|v| self.in_bounds(*v)).collect()
    }

    fn robust_stage(&self, mut kept: Vec<f64>) -> Vec<f64> {
        while kept.len() >= self.config.min_samples {
            let Some((center, mad)) = median_and_mad(&kept) else {
                break;
            };
            if mad <= 0.0 {
                break;
            }

            let before = kept.len();
            let threshold = self.config.mad_threshold;
            kept.retain(|v| modified_z_score(*v, center, mad) <= threshold);

            if kept.len() == before {
                break;
            }
        }
        kept
    }
}

fn modified_z_score(value: f64, center: f64, mad: f64) -> f64 {
    MAD_SCALE * (value - center).abs() / mad
}

/// Median of a non-empty series
pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut data = Data::new(values.to_vec());
    Some(data.median())
}

/// Median and median absolute deviation
fn median_and_mad(values: &[f64]) -> Option<(f64, f64)> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    let mad = median(&deviations)?;
    Some((center, mad))
}

/// Arithmetic mean, `None` for an empty series
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let collected: Vec<f64> = values.into_iter().collect();
    if collected.is_empty() {
        return None;
    }
    Some(collected.iter().mean())
}

/// Sample standard deviation (n − 1 divisor), 0 for one or no values
pub(crate) fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    values.iter().std_dev()
}
