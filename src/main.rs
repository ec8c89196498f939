use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};

use vitalrs::acwr::AcwrStatus;
use vitalrs::aggregator::DailyAggregator;
use vitalrs::config::AppConfig;
use vitalrs::digest::ChatContextBuilder;
use vitalrs::error::VitalRsError;
use vitalrs::logging::{init_logging, LogLevel};
use vitalrs::models::DailyRecord;
use vitalrs::recovery::{RecoveryBand, RecoveryCalculator};
use vitalrs::source::InMemoryHealthSource;
use vitalrs::store::{MetricsStore, SqliteMetricsStore};
use vitalrs::strain::StrainCalculator;

/// vitalrs - Daily strain and recovery scoring
///
/// Scores exported wearable data into daily strain (0-21), recovery
/// (0-100), stress and training-load metrics relative to your own
/// rolling baselines.
#[derive(Parser)]
#[command(name = "vitalrs")]
#[command(version)]
#[command(about = "Daily strain, recovery and stress scoring", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a single day from a health export
    Score {
        /// Health export (JSON)
        #[arg(short, long)]
        export: PathBuf,

        /// Day to score (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Score a range of days in order
    Backfill {
        /// Health export (JSON)
        #[arg(short, long)]
        export: PathBuf,

        /// First day (YYYY-MM-DD)
        #[arg(short, long)]
        from: NaiveDate,

        /// Last day, inclusive (YYYY-MM-DD, default today)
        #[arg(short, long)]
        to: Option<NaiveDate>,
    },

    /// Show the stored record for a day
    Show {
        /// Day to show (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Show recent days as a table
    History {
        /// Number of days, ending today
        #[arg(short = 'n', long, default_value = "14")]
        days: i64,
    },

    /// Print the plain-text digest for a chat assistant
    Digest {
        /// Day to summarize (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Manage the configuration file
    Config {
        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Strain")]
    strain: String,
    #[tabled(rename = "Recovery")]
    recovery: String,
    #[tabled(rename = "Sleep")]
    sleep: String,
    #[tabled(rename = "HRV")]
    hrv: String,
    #[tabled(rename = "RHR")]
    rhr: String,
    #[tabled(rename = "Workouts")]
    workouts: usize,
    #[tabled(rename = "ACWR")]
    acwr: String,
}

impl HistoryRow {
    fn from_record(record: &DailyRecord) -> Self {
        HistoryRow {
            date: record.date.to_string(),
            strain: format!("{:.1}", record.strain),
            recovery: opt(record.recovery, 0, "%"),
            sleep: opt(record.sleep_hours(), 1, "h"),
            hrv: opt(record.hrv_average, 0, ""),
            rhr: opt(record.resting_heart_rate, 0, ""),
            workouts: record.workouts.len(),
            acwr: match record.acwr {
                Some(ratio) => format!("{:.2} {}", ratio, record.acwr_status.description()),
                None => "-".to_string(),
            },
        }
    }
}

fn opt(value: Option<f64>, decimals: usize, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.*}{}", decimals, v, suffix),
        None => "-".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let mut config = AppConfig::load_or_default(&config_path)?;

    match cli.verbose {
        0 => {}
        1 => config.logging.level = LogLevel::Debug,
        _ => config.logging.level = LogLevel::Trace,
    }
    init_logging(&config.logging)?;

    let today = local_today(&config);

    match cli.command {
        Commands::Score { export, date } => {
            let date = date.unwrap_or(today);
            let aggregator = build_aggregator(&config, &export)?;

            println!("{}", format!("Scoring {}...", date).blue().bold());
            match aggregator.aggregate_day(date).await {
                Ok(record) => print_record(&record),
                Err(e) if e.is_benign() => {
                    println!("{}", VitalRsError::from(e).user_message().yellow());
                }
                Err(e) => {
                    let err = VitalRsError::from(e);
                    eprintln!("{}", err.user_message().red());
                    return Err(err.into());
                }
            }
        }

        Commands::Backfill { export, from, to } => {
            let to = to.unwrap_or(today);
            if from > to {
                anyhow::bail!("--from ({}) is after --to ({})", from, to);
            }
            let aggregator = build_aggregator(&config, &export)?;

            println!("{}", format!("Backfilling {} to {}...", from, to).blue().bold());
            let report = aggregator
                .aggregate_range(from, to)
                .await
                .map_err(VitalRsError::from)?;

            let rows: Vec<HistoryRow> = report.records.iter().map(HistoryRow::from_record).collect();
            if !rows.is_empty() {
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
            println!(
                "{}",
                format!(
                    "✓ {} days scored, {} days without data",
                    report.records.len(),
                    report.skipped.len()
                )
                .green()
            );
        }

        Commands::Show { date } => {
            let date = date.unwrap_or(today);
            let store = open_store(&config)?;
            match store.get(date).await.map_err(VitalRsError::from)? {
                Some(record) => print_record(&record),
                None => println!("{}", format!("No record for {}", date).yellow()),
            }
        }

        Commands::History { days } => {
            let store = open_store(&config)?;
            let from = today - Duration::days(days.max(1) - 1);
            let records = store
                .get_range(from, today + Duration::days(1))
                .await
                .map_err(VitalRsError::from)?;

            if records.is_empty() {
                println!("{}", "No records stored yet".yellow());
            } else {
                let rows: Vec<HistoryRow> = records.iter().map(HistoryRow::from_record).collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }

        Commands::Digest { date } => {
            let date = date.unwrap_or(today);
            let store = open_store(&config)?;
            let recent = store
                .get_range(date - Duration::days(6), date + Duration::days(1))
                .await
                .map_err(VitalRsError::from)?;
            let today_record = recent
                .iter()
                .find(|r| r.date == date)
                .cloned()
                .unwrap_or_else(|| DailyRecord::empty(date));

            println!("{}", ChatContextBuilder::new().build(&today_record, &recent));
        }

        Commands::Config { init, show } => {
            if init {
                if config_path.exists() {
                    println!(
                        "{}",
                        format!("Config already exists: {}", config_path.display()).yellow()
                    );
                } else {
                    let mut fresh = AppConfig::default();
                    fresh.save_to_file(&config_path)?;
                    println!(
                        "{}",
                        format!("✓ Wrote {}", config_path.display()).green()
                    );
                }
            }
            if show || !init {
                let rendered = toml::to_string_pretty(&config)
                    .context("Failed to render configuration")?;
                println!("{}", format!("# {}", config_path.display()).dimmed());
                println!("{}", rendered);
            }
        }
    }

    Ok(())
}

fn local_today(config: &AppConfig) -> NaiveDate {
    (Utc::now() + Duration::minutes(config.aggregator.utc_offset_minutes as i64)).date_naive()
}

fn open_store(config: &AppConfig) -> Result<SqliteMetricsStore> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
    }
    SqliteMetricsStore::open(&config.database_path)
        .map_err(VitalRsError::from)
        .with_context(|| format!("Failed to open database: {}", config.database_path.display()))
}

fn build_aggregator(
    config: &AppConfig,
    export: &Path,
) -> Result<DailyAggregator<InMemoryHealthSource, SqliteMetricsStore>> {
    let source = InMemoryHealthSource::from_file(export)?;
    let store = open_store(config)?;
    Ok(DailyAggregator::with_config(
        Arc::new(source),
        Arc::new(store),
        config.profile.clone(),
        config.scoring.clone(),
        config.aggregator.clone(),
    ))
}

fn print_record(record: &DailyRecord) {
    let strain_band = StrainCalculator::new().band(record.strain);
    println!("{}", format!("📅 {}", record.date).bold());
    println!(
        "  Strain:     {} ({})",
        format!("{:.1}", record.strain).cyan().bold(),
        strain_band.description()
    );

    match record.recovery {
        Some(score) => {
            let text = format!("{:.0}%", score);
            let colored = match RecoveryCalculator::new().band(score) {
                RecoveryBand::Green => text.green(),
                RecoveryBand::Yellow => text.yellow(),
                RecoveryBand::Red => text.red(),
            };
            println!("  Recovery:   {}", colored.bold());
        }
        None => println!("  Recovery:   {}", "not yet available".dimmed()),
    }

    if let Some(components) = &record.recovery_components {
        println!(
            "    HRV {}  RHR {}  Sleep {}  Resp {}  Load penalty {:.1}",
            opt(components.hrv, 0, ""),
            opt(components.resting_heart_rate, 0, ""),
            opt(components.sleep, 0, ""),
            opt(components.respiratory, 0, ""),
            components.load_penalty
        );
    }

    println!("  Sleep:      {}", opt(record.sleep_hours(), 1, " h"));
    println!("  HRV:        {}", opt(record.hrv_average, 0, " ms"));
    println!("  Resting HR: {}", opt(record.resting_heart_rate, 0, " bpm"));

    if let Some(stress) = &record.stress {
        println!(
            "  Stress:     avg {} / max {} ({} readings, {} near workouts)",
            opt(stress.average, 2, ""),
            opt(stress.max, 2, ""),
            stress.reading_count,
            stress.exercise_excluded
        );
    }

    let status = match record.acwr_status {
        AcwrStatus::Optimal => record.acwr_status.description().green(),
        AcwrStatus::Caution => record.acwr_status.description().yellow(),
        AcwrStatus::HighRisk => record.acwr_status.description().red(),
        AcwrStatus::Undertraining | AcwrStatus::Unknown => record.acwr_status.description().normal(),
    };
    println!("  ACWR:       {} {}", opt(record.acwr, 2, ""), status);

    for workout in &record.workouts {
        println!(
            "  🏃 {} {} min, strain {:.1}",
            workout.activity.display_name(),
            workout.duration().num_minutes(),
            workout.strain
        );
    }
}
