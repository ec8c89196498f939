use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::acwr::AcwrConfig;
use crate::aggregator::AggregatorConfig;
use crate::baseline::BaselineConfig;
use crate::error::VitalRsError;
use crate::heart_rate::{HeartRateProfile, DEFAULT_RESTING_HEART_RATE};
use crate::logging::LogConfig;
use crate::outlier::OutlierConfig;
use crate::recovery::RecoveryConfig;
use crate::strain::StrainConfig;
use crate::stress::StressConfig;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database holding daily records
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Application metadata
    pub metadata: ConfigMetadata,

    /// User physiology used to build the heart-rate profile
    #[serde(default)]
    pub profile: UserProfile,

    /// Scoring tunables
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Day boundaries and history windows
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// User physiology overrides
///
/// Anything left unset is derived: max HR from age, resting HR from the
/// rolling baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Age in years, used for the `220 − age` max HR estimate
    pub age: Option<u32>,

    /// Measured maximum heart rate
    pub max_heart_rate: Option<f64>,

    /// Fixed resting heart rate; overrides the baseline when set
    pub resting_heart_rate: Option<f64>,
}

impl UserProfile {
    /// Heart-rate profile for a day, falling back through the fixed value,
    /// the measured resting rate, then [`DEFAULT_RESTING_HEART_RATE`]
    pub fn heart_rate_profile(&self, measured_resting: Option<f64>) -> HeartRateProfile {
        let resting = self
            .resting_heart_rate
            .or(measured_resting)
            .filter(|hr| hr.is_finite() && *hr > 0.0)
            .unwrap_or(DEFAULT_RESTING_HEART_RATE);
        HeartRateProfile::new(resting, self.max_heart_rate, self.age)
    }
}

/// Every scoring tunable, grouped by calculator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub outlier: OutlierConfig,
    pub baseline: BaselineConfig,
    pub strain: StrainConfig,
    pub recovery: RecoveryConfig,
    pub stress: StressConfig,
    pub acwr: AcwrConfig,
}

fn default_database_path() -> PathBuf {
    AppConfig::default_data_dir().join("metrics.db")
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            database_path: default_database_path(),
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            profile: UserProfile::default(),
            scoring: ScoringConfig::default(),
            aggregator: AggregatorConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Directory holding the config file and database
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vitalrs")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Load configuration with fallback to defaults
    ///
    /// A missing file yields defaults; a file that exists but does not
    /// parse is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!(
                path = %path.as_ref().display(),
                "Config file not found, using defaults"
            );
            Ok(Self::default())
        }
    }

    /// Reject values the calculators cannot work with
    pub fn validate(&self) -> std::result::Result<(), VitalRsError> {
        let outlier = &self.scoring.outlier;
        if outlier.lower_bound >= outlier.upper_bound {
            return Err(invalid(format!(
                "outlier bounds must satisfy lower < upper (got {} and {})",
                outlier.lower_bound, outlier.upper_bound
            )));
        }
        if outlier.mad_threshold <= 0.0 {
            return Err(invalid("outlier MAD threshold must be positive"));
        }

        let baseline = &self.scoring.baseline;
        if baseline.recent_window_days <= 0
            || baseline.historical_window_days < baseline.recent_window_days
        {
            return Err(invalid("baseline windows must satisfy 0 < recent <= historical"));
        }

        let acwr = &self.scoring.acwr;
        if !(acwr.undertraining_below <= acwr.optimal_max && acwr.optimal_max <= acwr.caution_max) {
            return Err(invalid("ACWR thresholds must be increasing"));
        }

        let (medium, high) = self.scoring.stress.zone_thresholds;
        if medium > high {
            return Err(invalid("stress zone thresholds must be increasing"));
        }
        if self.scoring.stress.cadence_minutes <= 0 {
            return Err(invalid("stress cadence must be positive"));
        }

        let weights = &self.scoring.recovery.weights;
        if [weights.hrv, weights.resting_heart_rate, weights.sleep, weights.respiratory]
            .iter()
            .any(|w| *w < 0.0)
        {
            return Err(invalid("recovery weights must be non-negative"));
        }

        if self.aggregator.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(invalid(format!(
                "UTC offset must be within ±24h (got {} minutes)",
                self.aggregator.utc_offset_minutes
            )));
        }

        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> VitalRsError {
    VitalRsError::Configuration(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.scoring, deserialized.scoring);
        assert_eq!(config.aggregator, deserialized.aggregator);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = AppConfig::default();
        original.profile.age = Some(34);
        original.scoring.stress.exercise_buffer_minutes = 45;

        original.save_to_file(&config_path).unwrap();
        let loaded = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded.profile.age, Some(34));
        assert_eq!(loaded.scoring.stress.exercise_buffer_minutes, 45);
    }

    #[test]
    fn test_sparse_file_fills_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
            [metadata]
            version = "1.0"
            created_at = "2024-01-01T00:00:00Z"
            updated_at = "2024-01-01T00:00:00Z"

            [profile]
            max_heart_rate = 188.0

            [scoring.acwr]
            undertraining_below = 0.75
            optimal_max = 1.25
            caution_max = 1.5
            "#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.profile.max_heart_rate, Some(188.0));
        assert_eq!(config.scoring.acwr.optimal_max, 1.25);
        assert_eq!(config.scoring.outlier, OutlierConfig::default());
        assert_eq!(config.scoring.recovery.weights.hrv, 0.40);
    }

    #[test]
    fn test_load_or_default() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        let config = AppConfig::load_or_default(&missing).unwrap();
        assert_eq!(config.scoring, ScoringConfig::default());

        let broken = temp_dir.path().join("broken.toml");
        fs::write(&broken, "not = [valid").unwrap();
        assert!(AppConfig::load_or_default(&broken).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.scoring.outlier.lower_bound = 250.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scoring.acwr.optimal_max = 2.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.aggregator.utc_offset_minutes = 24 * 60;
        assert!(matches!(
            config.validate(),
            Err(VitalRsError::Configuration(reason)) if reason.contains("UTC offset")
        ));
    }

    #[test]
    fn test_invalid_file_reports_configuration_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
            [metadata]
            version = "1.0"
            created_at = "2024-01-01T00:00:00Z"
            updated_at = "2024-01-01T00:00:00Z"

            [scoring.outlier]
            mad_threshold = -1.0
            "#,
        )
        .unwrap();

        let err = AppConfig::load_from_file(&config_path).unwrap_err();
        let config_err = err.downcast_ref::<VitalRsError>().unwrap();
        assert!(matches!(config_err, VitalRsError::Configuration(_)));
        assert!(config_err.user_message().contains("MAD threshold"));
    }

    #[test]
    fn test_single_tuned_field_per_section() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
            [metadata]
            version = "1.0"
            created_at = "2024-01-01T00:00:00Z"
            updated_at = "2024-01-01T00:00:00Z"

            [scoring.outlier]
            mad_threshold = 2.5

            [scoring.baseline]
            min_recent_days = 4

            [scoring.strain]
            load_scale = 120.0

            [scoring.recovery]
            z_score_scale = 20.0

            [scoring.recovery.weights]
            hrv = 0.5

            [scoring.stress]
            exercise_buffer_minutes = 30

            [scoring.acwr]
            caution_max = 1.6
            "#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&config_path).unwrap();
        let scoring = &config.scoring;
        assert_eq!(scoring.outlier.mad_threshold, 2.5);
        assert_eq!(scoring.outlier.upper_bound, OutlierConfig::default().upper_bound);
        assert_eq!(scoring.baseline.min_recent_days, 4);
        assert_eq!(scoring.baseline.established_days, 7);
        assert_eq!(scoring.strain.load_scale, 120.0);
        assert_eq!(scoring.strain.max_strain, 21.0);
        assert_eq!(scoring.recovery.z_score_scale, 20.0);
        assert_eq!(scoring.recovery.weights.hrv, 0.5);
        assert_eq!(scoring.recovery.weights.sleep, 0.20);
        assert_eq!(scoring.recovery.band_thresholds, (34.0, 67.0));
        assert_eq!(scoring.stress.exercise_buffer_minutes, 30);
        assert_eq!(scoring.stress.cadence_minutes, 5);
        assert_eq!(scoring.acwr.caution_max, 1.6);
        assert_eq!(scoring.acwr.optimal_max, 1.3);
    }

    #[test]
    fn test_heart_rate_profile_fallbacks() {
        let profile = UserProfile {
            age: Some(40),
            max_heart_rate: None,
            resting_heart_rate: None,
        };
        let hr = profile.heart_rate_profile(Some(52.0));
        assert_eq!(hr.max_heart_rate, 180.0);
        assert_eq!(hr.resting_heart_rate, 52.0);

        let hr = profile.heart_rate_profile(None);
        assert_eq!(hr.resting_heart_rate, DEFAULT_RESTING_HEART_RATE);

        let fixed = UserProfile {
            resting_heart_rate: Some(48.0),
            ..profile
        };
        assert_eq!(fixed.heart_rate_profile(Some(60.0)).resting_heart_rate, 48.0);
    }
}
