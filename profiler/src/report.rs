//! Run summary handed to the charting sink

use crate::error::Result;
use crate::host::MemoryInfo;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub max: f64,
    pub mean: f64,
}

impl SeriesStats {
    /// An empty series is summarized as a single zero sample.
    pub fn from_series(series: &[f64]) -> Self {
        if series.is_empty() {
            return Self { max: 0.0, mean: 0.0 };
        }
        let max = series.iter().copied().fold(f64::MIN, f64::max);
        let mean = series.iter().sum::<f64>() / series.len() as f64;
        Self { max, mean }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub cpu_series: Vec<f64>,
    pub mem_series: Vec<f64>,
    pub elapsed: Duration,
    pub cpu_count: usize,
    pub memory: MemoryInfo,
    pub cpu_stats: SeriesStats,
    pub mem_stats: SeriesStats,
    pub skipped_descendants: u64,
}

impl RunReport {
    pub fn new(
        cpu_series: Vec<f64>,
        mem_series: Vec<f64>,
        elapsed: Duration,
        cpu_count: usize,
        memory: MemoryInfo,
        skipped_descendants: u64,
    ) -> Self {
        let cpu_stats = SeriesStats::from_series(&cpu_series);
        let mem_stats = SeriesStats::from_series(&mem_series);
        Self {
            cpu_series,
            mem_series,
            elapsed,
            cpu_count,
            memory,
            cpu_stats,
            mem_stats,
            skipped_descendants,
        }
    }

    /// Seconds for each plotted point, including the synthetic origin.
    pub fn time_axis(&self) -> Vec<f64> {
        linspace(0.0, self.elapsed.as_secs_f64(), self.cpu_series.len() + 1)
            .into_iter()
            .map(round2)
            .collect()
    }

    pub fn cpu_points(&self) -> Vec<(f64, f64)> {
        self.points(&self.cpu_series)
    }

    pub fn mem_points(&self) -> Vec<(f64, f64)> {
        self.points(&self.mem_series)
    }

    fn points(&self, series: &[f64]) -> Vec<(f64, f64)> {
        let values = std::iter::once(0.0).chain(series.iter().copied().map(round2));
        self.time_axis().into_iter().zip(values).collect()
    }

    pub fn cpu_annotation(&self) -> String {
        format!(
            "Number of CPU Cores: {}\nMax CPU Usage: {} %\nAverage CPU Usage: {} %",
            self.cpu_count,
            round2(self.cpu_stats.max),
            round2(self.cpu_stats.mean)
        )
    }

    pub fn mem_annotation(&self) -> String {
        format!(
            "Total Memory: {} GB\nMax MEM usage: {} %",
            self.memory.total_gb,
            round2(self.mem_stats.max)
        )
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Receives the finished run and renders it somewhere.
#[async_trait]
pub trait ChartSink: Send + Sync {
    /// Returns the paths of the artifacts written.
    async fn render(&self, report: &RunReport) -> Result<Vec<PathBuf>>;
}
