use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::acwr::AcwrStatus;
use crate::baseline::BaselineMetrics;
use crate::recovery::RecoveryComponents;
use crate::sleep::SleepSummary;
use crate::stress::DailyStressSummary;

/// A single timestamped scalar reading from the health data source
///
/// Samples are never assumed clean: duplicates and physiologically
/// impossible values are filtered downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Sample { timestamp, value }
    }
}

/// Activity types tracked by the scoring engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Running,
    Walking,
    Hiking,
    Cycling,
    Swimming,
    Rowing,
    Elliptical,
    StrengthTraining,
    FunctionalStrength,
    HighIntensityInterval,
    Yoga,
    Other,
}

/// Platform workout identifiers and the activity each maps to.
///
/// Unknown identifiers map to [`ActivityType::Other`]; the platform's
/// enum space is not assumed to be exhaustive or stable.
const PLATFORM_ACTIVITY_TABLE: &[(&str, ActivityType)] = &[
    ("running", ActivityType::Running),
    ("walking", ActivityType::Walking),
    ("hiking", ActivityType::Hiking),
    ("cycling", ActivityType::Cycling),
    ("swimming", ActivityType::Swimming),
    ("rowing", ActivityType::Rowing),
    ("elliptical", ActivityType::Elliptical),
    ("traditional_strength_training", ActivityType::StrengthTraining),
    ("functional_strength_training", ActivityType::FunctionalStrength),
    ("high_intensity_interval_training", ActivityType::HighIntensityInterval),
    ("yoga", ActivityType::Yoga),
];

impl ActivityType {
    /// Map a platform workout identifier onto an activity type
    pub fn from_platform(identifier: &str) -> Self {
        let normalized = identifier.trim().to_ascii_lowercase();
        PLATFORM_ACTIVITY_TABLE
            .iter()
            .find(|(key, _)| *key == normalized)
            .map(|(_, activity)| *activity)
            .unwrap_or(ActivityType::Other)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ActivityType::Running => "Running",
            ActivityType::Walking => "Walking",
            ActivityType::Hiking => "Hiking",
            ActivityType::Cycling => "Cycling",
            ActivityType::Swimming => "Swimming",
            ActivityType::Rowing => "Rowing",
            ActivityType::Elliptical => "Elliptical",
            ActivityType::StrengthTraining => "Strength Training",
            ActivityType::FunctionalStrength => "Functional Strength",
            ActivityType::HighIntensityInterval => "HIIT",
            ActivityType::Yoga => "Yoga",
            ActivityType::Other => "Other",
        }
    }
}

/// Swim stroke styles, used to scale swimming strain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwimStroke {
    Freestyle,
    Backstroke,
    Breaststroke,
    Butterfly,
    Mixed,
}

impl SwimStroke {
    /// Load multiplier relative to freestyle
    pub fn strain_multiplier(&self) -> f64 {
        match self {
            SwimStroke::Freestyle => 1.0,
            SwimStroke::Backstroke => 1.1,
            SwimStroke::Breaststroke => 1.2,
            SwimStroke::Butterfly => 1.4,
            SwimStroke::Mixed => 1.2,
        }
    }
}

/// Workout metadata and heart-rate samples as delivered by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    /// Platform identifier; generated when the export has none
    #[serde(default = "generate_workout_id")]
    pub id: String,
    pub activity: ActivityType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    /// Distance in meters
    #[serde(default)]
    pub distance_meters: Option<f64>,

    /// Active energy in kilocalories
    #[serde(default)]
    pub calories: Option<f64>,

    /// Dominant stroke for swimming workouts
    #[serde(default)]
    pub swim_stroke: Option<SwimStroke>,

    #[serde(default)]
    pub heart_rate: Vec<Sample>,
}

fn generate_workout_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Scored workout, owned by the daily record that references it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub id: String,
    pub activity: ActivityType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    /// Duration in seconds
    pub duration_seconds: i64,

    /// Distance in meters
    pub distance: Option<f64>,

    /// Kilocalories (0 when the source did not report any)
    pub calories: f64,

    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,

    /// Workout strain on the 0-21 scale
    pub strain: f64,

    /// Mean heart-rate-reserve intensity (0-1)
    pub heart_rate_intensity: Option<f64>,

    /// Minutes spent in heart-rate zones 1-5
    pub zone_minutes: [f64; 5],
}

impl WorkoutSummary {
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_seconds)
    }
}

/// One calendar day of computed metrics, the unit of persistence
///
/// Records are replaced wholesale: the `with_*` functions return an
/// updated copy and leave the original untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,

    /// Day strain (0-21)
    pub strain: f64,

    /// Recovery (0-100); `None` means not yet available, not zero
    pub recovery: Option<f64>,
    pub recovery_components: Option<RecoveryComponents>,

    pub workouts: Vec<WorkoutSummary>,
    pub sleep: Option<SleepSummary>,

    /// Mean of the day's filtered HRV samples (ms)
    pub hrv_average: Option<f64>,
    pub resting_heart_rate: Option<f64>,
    pub respiratory_rate: Option<f64>,

    pub stress: Option<DailyStressSummary>,
    pub baseline_metrics: Option<BaselineMetrics>,

    pub acwr: Option<f64>,
    pub acwr_status: AcwrStatus,

    pub last_updated: DateTime<Utc>,
}

impl DailyRecord {
    /// Empty record for a day with nothing computed yet
    pub fn empty(date: NaiveDate) -> Self {
        DailyRecord {
            date,
            strain: 0.0,
            recovery: None,
            recovery_components: None,
            workouts: Vec::new(),
            sleep: None,
            hrv_average: None,
            resting_heart_rate: None,
            respiratory_rate: None,
            stress: None,
            baseline_metrics: None,
            acwr: None,
            acwr_status: AcwrStatus::Unknown,
            last_updated: Utc::now(),
        }
    }

    pub fn with_workouts(&self, workouts: Vec<WorkoutSummary>, strain: f64) -> Self {
        DailyRecord {
            workouts,
            strain,
            last_updated: Utc::now(),
            ..self.clone()
        }
    }

    pub fn with_recovery(
        &self,
        recovery: Option<f64>,
        components: Option<RecoveryComponents>,
    ) -> Self {
        DailyRecord {
            recovery,
            recovery_components: components,
            last_updated: Utc::now(),
            ..self.clone()
        }
    }

    pub fn with_sleep(&self, sleep: Option<SleepSummary>) -> Self {
        DailyRecord {
            sleep,
            last_updated: Utc::now(),
            ..self.clone()
        }
    }

    pub fn with_vitals(
        &self,
        hrv_average: Option<f64>,
        resting_heart_rate: Option<f64>,
        respiratory_rate: Option<f64>,
    ) -> Self {
        DailyRecord {
            hrv_average,
            resting_heart_rate,
            respiratory_rate,
            last_updated: Utc::now(),
            ..self.clone()
        }
    }

    pub fn with_stress(&self, stress: Option<DailyStressSummary>) -> Self {
        DailyRecord {
            stress,
            last_updated: Utc::now(),
            ..self.clone()
        }
    }

    pub fn with_training_load(
        &self,
        baseline: Option<BaselineMetrics>,
        acwr: Option<f64>,
        status: AcwrStatus,
    ) -> Self {
        DailyRecord {
            baseline_metrics: baseline,
            acwr,
            acwr_status: status,
            last_updated: Utc::now(),
            ..self.clone()
        }
    }

    /// Sleep duration in hours, if sleep was recorded
    pub fn sleep_hours(&self) -> Option<f64> {
        self.sleep.as_ref().map(|s| s.total_sleep_minutes / 60.0)
    }
}
