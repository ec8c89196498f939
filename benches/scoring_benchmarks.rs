use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vitalrs::heart_rate::HeartRateProfile;
use vitalrs::models::{ActivityType, Sample, WorkoutSummary};
use vitalrs::outlier::OutlierFilter;
use vitalrs::recovery::{RecoveryCalculator, RecoveryInputs};
use vitalrs::strain::StrainCalculator;
use vitalrs::stress::StressEstimator;

/// Benchmarks for the per-day scoring calculations
///
/// A day of one-second heart rate is about 86k samples, so the sizes
/// below cover a short workout up to a full day.

fn heart_rate_series(count: usize) -> Vec<Sample> {
    let start = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let wave = ((i as f64) / 120.0).sin() * 25.0;
            Sample::new(start + Duration::seconds(i as i64), 110.0 + wave)
        })
        .collect()
}

fn bench_outlier_filter(c: &mut Criterion) {
    let filter = OutlierFilter::new();
    let mut group = c.benchmark_group("Outlier Filter");

    for &size in &[7, 28, 365] {
        let mut values: Vec<f64> = (0..size).map(|i| 45.0 + (i % 11) as f64).collect();
        values.push(240.0);

        group.throughput(Throughput::Elements(values.len() as u64));
        group.bench_with_input(BenchmarkId::new("filter", size), &values, |b, values| {
            b.iter(|| filter.filter(black_box(values)));
        });
    }

    group.finish();
}

fn bench_workout_strain(c: &mut Criterion) {
    let calculator = StrainCalculator::new();
    let profile = HeartRateProfile::new(55.0, None, Some(35));
    let mut group = c.benchmark_group("Workout Strain");

    for &seconds in &[1_800, 7_200, 86_400] {
        let samples = heart_rate_series(seconds);

        group.throughput(Throughput::Elements(seconds as u64));
        group.bench_with_input(
            BenchmarkId::new("workout_strain", seconds),
            &samples,
            |b, samples| {
                b.iter(|| calculator.workout_strain(black_box(samples), &profile, None));
            },
        );
    }

    group.finish();
}

fn bench_recovery_score(c: &mut Criterion) {
    let calculator = RecoveryCalculator::new();
    let inputs = RecoveryInputs {
        hrv_current: Some(52.0),
        hrv_baseline: Some(48.0),
        hrv_std_dev: Some(4.5),
        rhr_current: Some(54.0),
        rhr_baseline: Some(56.0),
        rhr_std_dev: Some(2.0),
        sleep_duration_hours: Some(7.4),
        sleep_efficiency: Some(0.92),
        sleep_consistency: Some(0.8),
        recent_strain: Some(15.2),
        acute_strain: Some(11.0),
        chronic_strain: Some(9.5),
        respiratory_rate: Some(15.1),
        respiratory_baseline: Some(14.8),
    };

    c.bench_function("recovery_score", |b| {
        b.iter(|| calculator.score(black_box(&inputs)));
    });
}

fn bench_stress_summary(c: &mut Criterion) {
    let estimator = StressEstimator::new();
    let samples = heart_rate_series(86_400);
    let workout_start = samples[36_000].timestamp;
    let workouts = vec![WorkoutSummary {
        id: "bench".to_string(),
        activity: ActivityType::Cycling,
        start_time: workout_start,
        end_time: workout_start + Duration::minutes(45),
        duration_seconds: 45 * 60,
        distance: None,
        calories: 0.0,
        avg_heart_rate: None,
        max_heart_rate: None,
        strain: 10.0,
        heart_rate_intensity: None,
        zone_minutes: [0.0; 5],
    }];

    let mut group = c.benchmark_group("Stress");
    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("readings_full_day", |b| {
        b.iter(|| estimator.readings(black_box(&samples), 55.0, Some(50.0), Some(44.0), &workouts));
    });

    let readings = estimator.readings(&samples, 55.0, Some(50.0), Some(44.0), &workouts);
    group.bench_function("summarize_full_day", |b| {
        b.iter(|| estimator.summarize(black_box(&readings)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_outlier_filter,
    bench_workout_strain,
    bench_recovery_score,
    bench_stress_summary
);
criterion_main!(benches);
