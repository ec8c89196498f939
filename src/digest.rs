//! Plain-text digest of recent metrics for a chat assistant's context
//!
//! Derived only from stored [`DailyRecord`] fields. Missing values are
//! written as `n/a` so the reader never mistakes "not measured" for zero.

use chrono::Duration;

use crate::models::DailyRecord;
use crate::outlier::mean;

const MISSING: &str = "n/a";

#[derive(Debug, Clone)]
pub struct ChatContextBuilder {
    window_days: i64,
}

impl Default for ChatContextBuilder {
    fn default() -> Self {
        ChatContextBuilder { window_days: 7 }
    }
}

impl ChatContextBuilder {
    pub fn new() -> Self {
        ChatContextBuilder::default()
    }

    pub fn with_window_days(window_days: i64) -> Self {
        ChatContextBuilder {
            window_days: window_days.max(1),
        }
    }

    /// Digest for `today` plus rolling averages over the window ending today
    ///
    /// `recent` may or may not contain today's record; records outside the
    /// window are ignored.
    pub fn build(&self, today: &DailyRecord, recent: &[DailyRecord]) -> String {
        let window_start = today.date - Duration::days(self.window_days - 1);
        let mut window: Vec<&DailyRecord> = recent
            .iter()
            .filter(|r| r.date >= window_start && r.date < today.date)
            .collect();
        window.push(today);

        let avg = |f: fn(&DailyRecord) -> Option<f64>| mean(window.iter().filter_map(|r| f(r)));

        let mut lines = vec![
            format!("Health summary for {}", today.date),
            "Today:".to_string(),
            format!("- Strain: {} / 21", fmt(Some(today.strain), 1)),
            format!("- Recovery: {}", percent(today.recovery)),
            format!("- Sleep: {}", hours(today.sleep_hours())),
            format!("- HRV: {}", unit(today.hrv_average, 0, "ms")),
            format!("- Resting HR: {}", unit(today.resting_heart_rate, 0, "bpm")),
            format!("- Workouts: {}", today.workouts.len()),
        ];

        if let Some(ratio) = today.acwr {
            lines.push(format!(
                "- Training load: {} (ACWR {:.2})",
                today.acwr_status.description(),
                ratio
            ));
        }

        lines.push(format!("{}-day averages ({} days recorded):", self.window_days, window.len()));
        lines.push(format!("- Strain: {}", fmt(avg(|r| Some(r.strain)), 1)));
        lines.push(format!("- Recovery: {}", percent(avg(|r| r.recovery))));
        lines.push(format!("- Sleep: {}", hours(avg(|r| r.sleep_hours()))));
        lines.push(format!("- HRV: {}", unit(avg(|r| r.hrv_average), 0, "ms")));
        lines.push(format!(
            "- Resting HR: {}",
            unit(avg(|r| r.resting_heart_rate), 0, "bpm")
        ));
        lines.push(format!(
            "- Workouts per day: {}",
            fmt(avg(|r| Some(r.workouts.len() as f64)), 1)
        ));

        lines.join("\n")
    }
}

fn fmt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => MISSING.to_string(),
    }
}

fn unit(value: Option<f64>, decimals: usize, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.*} {}", decimals, v, suffix),
        None => MISSING.to_string(),
    }
}

fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}%", v),
        None => MISSING.to_string(),
    }
}

fn hours(value: Option<f64>) -> String {
    unit(value, 1, "h")
}
