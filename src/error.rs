//! Unified error hierarchy for vitalrs
//!
//! Scoring functions never fail: missing or implausible inputs make them
//! return `None` or drop the offending samples. Errors only appear at the
//! I/O boundary (health data source, metrics store) and in the daily
//! aggregation that ties the two together.

use chrono::NaiveDate;
use thiserror::Error;

/// Top-level error type for all vitalrs operations
#[derive(Debug, Error)]
pub enum VitalRsError {
    /// Health data source failures
    #[error("Health data error: {0}")]
    Source(#[from] SourceError),

    /// Metrics store failures
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Daily aggregation failures
    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    /// Configuration file holds values the calculators cannot use
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a health data source
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// The platform has no samples for the metric (e.g. new device)
    #[error("No {metric} data available")]
    NoData { metric: String },

    /// Read access to the metric was revoked or never granted
    #[error("Permission denied for {metric}")]
    PermissionDenied { metric: String },

    /// Platform or transport failure
    #[error("Failed to fetch {metric}: {reason}")]
    Fetch { metric: String, reason: String },
}

impl SourceError {
    /// Metric the failing request was for
    pub fn metric(&self) -> &str {
        match self {
            SourceError::NoData { metric }
            | SourceError::PermissionDenied { metric }
            | SourceError::Fetch { metric, .. } => metric,
        }
    }
}

/// Metrics store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored date key could not be parsed
    #[error("Corrupt date key: {0}")]
    CorruptKey(String),

    /// Background storage task failed
    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Daily aggregation errors
///
/// Distinguishes the benign "nothing recorded yet" case from fetch
/// failures that should be retried or shown to the user.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// No samples of any kind exist for the day
    #[error("No health data available for {date}")]
    NoDataAvailable { date: NaiveDate },

    /// A health data request failed; nothing was written for the day
    #[error("Fetching {metric} for {date} failed: {reason}")]
    FetchFailed {
        date: NaiveDate,
        metric: String,
        reason: String,
    },

    /// Reading history or writing the record failed
    #[error("Metrics store failure: {0}")]
    Store(#[from] StoreError),
}

impl AggregationError {
    /// Build from a source error raised while aggregating `date`
    pub fn from_source(date: NaiveDate, err: SourceError) -> Self {
        match err {
            SourceError::NoData { .. } => AggregationError::NoDataAvailable { date },
            SourceError::PermissionDenied { metric } => AggregationError::FetchFailed {
                date,
                metric,
                reason: "permission denied".to_string(),
            },
            SourceError::Fetch { metric, reason } => {
                AggregationError::FetchFailed { date, metric, reason }
            }
        }
    }

    /// True for the "no data yet" case that callers should not report
    pub fn is_benign(&self) -> bool {
        matches!(self, AggregationError::NoDataAvailable { .. })
    }
}

/// Result type alias for vitalrs operations
pub type Result<T> = std::result::Result<T, VitalRsError>;

impl VitalRsError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VitalRsError::Source(SourceError::Fetch { .. })
                | VitalRsError::Aggregation(AggregationError::FetchFailed { .. })
                | VitalRsError::Aggregation(AggregationError::Store(_))
                | VitalRsError::Store(_)
                | VitalRsError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            VitalRsError::Source(SourceError::NoData { .. }) => ErrorSeverity::Info,
            VitalRsError::Aggregation(AggregationError::NoDataAvailable { .. }) => {
                ErrorSeverity::Info
            }
            VitalRsError::Configuration(_) => ErrorSeverity::Warning,
            VitalRsError::Source(SourceError::PermissionDenied { .. }) => ErrorSeverity::Warning,
            VitalRsError::Store(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            VitalRsError::Aggregation(AggregationError::NoDataAvailable { date }) => {
                format!("No health data recorded for {} yet.", date)
            }
            VitalRsError::Aggregation(AggregationError::FetchFailed { metric, .. }) => {
                format!(
                    "Could not read {} from your health data. Please try again.",
                    metric
                )
            }
            VitalRsError::Source(SourceError::PermissionDenied { metric }) => {
                format!("Access to {} was denied. Check your health data permissions.", metric)
            }
            VitalRsError::Configuration(reason) => {
                format!(
                    "Invalid configuration: {}. Edit the config file or remove it to use defaults.",
                    reason
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Storage corruption or other state the user cannot recover from
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Expected condition, e.g. no data yet
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_source_error_mapping() {
        let err = AggregationError::from_source(
            day(),
            SourceError::NoData {
                metric: "heart_rate".to_string(),
            },
        );
        assert!(err.is_benign());

        let err = AggregationError::from_source(
            day(),
            SourceError::Fetch {
                metric: "hrv".to_string(),
                reason: "timeout".to_string(),
            },
        );
        assert!(!err.is_benign());
        match err {
            AggregationError::FetchFailed { metric, reason, .. } => {
                assert_eq!(metric, "hrv");
                assert_eq!(reason, "timeout");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_severity() {
        let err = VitalRsError::Aggregation(AggregationError::NoDataAvailable { date: day() });
        assert_eq!(err.severity(), ErrorSeverity::Info);

        let err = VitalRsError::Store(StoreError::CorruptKey("x".to_string()));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_error_retryable() {
        let err = VitalRsError::Aggregation(AggregationError::FetchFailed {
            date: day(),
            metric: "sleep".to_string(),
            reason: "offline".to_string(),
        });
        assert!(err.is_retryable());

        let err = VitalRsError::Aggregation(AggregationError::NoDataAvailable { date: day() });
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let err = VitalRsError::Source(SourceError::PermissionDenied {
            metric: "hrv".to_string(),
        });
        assert!(err.user_message().contains("denied"));
        assert_eq!(
            SourceError::PermissionDenied { metric: "hrv".to_string() }.metric(),
            "hrv"
        );
    }
}
