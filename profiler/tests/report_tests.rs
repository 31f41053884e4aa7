use app_profiler::host::MemoryInfo;
use app_profiler::report::{linspace, round2};
use app_profiler::sampler::normalize_cpu;
use app_profiler::{RunReport, SeriesStats};
use std::time::Duration;

fn memory() -> MemoryInfo {
    MemoryInfo {
        total_gb: 32,
        available_gb: 20,
        used_gb: 12,
    }
}

#[test]
fn test_normalize_cpu_scales_by_core_capacity() {
    assert_eq!(normalize_cpu(50.0, 4), 12.5);
    assert_eq!(normalize_cpu(400.0, 4), 100.0);
    assert_eq!(normalize_cpu(0.0, 16), 0.0);
    assert_eq!(normalize_cpu(100.0, 1), 100.0);
}

#[test]
fn test_normalize_cpu_is_monotonic_and_bounded() {
    for cores in [1usize, 2, 4, 8, 64] {
        let capacity = cores as f64 * 100.0;
        let mut previous = -1.0;
        for step in 0..=20 {
            let raw = capacity * step as f64 / 20.0;
            let value = normalize_cpu(raw, cores);
            assert!((0.0..=100.0 + 1e-9).contains(&value));
            assert!(value >= previous);
            previous = value;
        }
    }
}

#[test]
fn test_series_stats() {
    let stats = SeriesStats::from_series(&[10.0, 30.0, 20.0]);
    assert_eq!(stats.max, 30.0);
    assert_eq!(stats.mean, 20.0);
}

#[test]
fn test_empty_series_is_a_single_zero_sample() {
    let stats = SeriesStats::from_series(&[]);
    assert_eq!(stats, SeriesStats { max: 0.0, mean: 0.0 });
}

#[test]
fn test_linspace() {
    assert!(linspace(0.0, 1.0, 0).is_empty());
    assert_eq!(linspace(0.0, 7.0, 1), vec![0.0]);
    assert_eq!(linspace(0.0, 10.0, 5), vec![0.0, 2.5, 5.0, 7.5, 10.0]);
}

#[test]
fn test_points_start_with_synthetic_origin() {
    let report = RunReport::new(
        vec![12.346, 50.0, 25.0, 10.0],
        vec![1.0, 2.0, 3.0, 4.0],
        Duration::from_secs(10),
        4,
        memory(),
        0,
    );
    assert_eq!(report.time_axis(), vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    assert_eq!(
        report.cpu_points(),
        vec![(0.0, 0.0), (2.5, 12.35), (5.0, 50.0), (7.5, 25.0), (10.0, 10.0)]
    );
    assert_eq!(report.mem_points()[0], (0.0, 0.0));
    assert_eq!(report.mem_points()[4], (10.0, 4.0));
}

#[test]
fn test_annotations() {
    let report = RunReport::new(
        vec![10.0, 20.0],
        vec![5.5, 7.25],
        Duration::from_millis(10_500),
        8,
        memory(),
        0,
    );
    assert_eq!(
        report.cpu_annotation(),
        "Number of CPU Cores: 8\nMax CPU Usage: 20 %\nAverage CPU Usage: 15 %"
    );
    assert_eq!(report.mem_annotation(), "Total Memory: 32 GB\nMax MEM usage: 7.25 %");
}

#[test]
fn test_round2() {
    assert_eq!(round2(1.005_1), 1.01);
    assert_eq!(round2(33.333_333), 33.33);
}
