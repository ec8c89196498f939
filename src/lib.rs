// Library interface for vitalrs modules
// This allows integration tests and the CLI to access the scoring engine

pub mod acwr;
pub mod aggregator;
pub mod baseline;
pub mod config;
pub mod digest;
pub mod error;
pub mod heart_rate;
pub mod logging;
pub mod models;
pub mod outlier;
pub mod recovery;
pub mod sleep;
pub mod source;
pub mod store;
pub mod strain;
pub mod stress;

// Re-export commonly used types for convenience
pub use acwr::{AcwrEvaluator, AcwrStatus};
pub use aggregator::{AggregatorConfig, BackfillReport, DailyAggregator};
pub use baseline::{BaselineCalculator, BaselineMetrics};
pub use config::{AppConfig, ScoringConfig, UserProfile};
pub use digest::ChatContextBuilder;
pub use error::{AggregationError, Result, SourceError, StoreError, VitalRsError};
pub use heart_rate::HeartRateProfile;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use outlier::OutlierFilter;
pub use recovery::{RecoveryCalculator, RecoveryComponents, RecoveryInputs};
pub use source::{HealthDataSource, HealthExport, InMemoryHealthSource};
pub use store::{InMemoryMetricsStore, MetricsStore, SqliteMetricsStore};
pub use strain::StrainCalculator;
pub use stress::{DailyStressSummary, StressEstimator, StressReading};
