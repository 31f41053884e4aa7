//! Sampling loop that measures a process tree until the target exits

use crate::channel::{Publication, Publisher};
use crate::collector::{ProcessHandle, ProcessProbe};
use crate::error::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Aggregate CPU% as a share of total core capacity, scaled to 0-100.
pub fn normalize_cpu(raw_percent: f64, cpu_count: usize) -> f64 {
    raw_percent / (cpu_count.max(1) as f64 * 100.0) * 100.0
}

/// One sampling cycle's result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub cpu_percent_normalized: f64,
    pub mem_percent: f64,
    pub skipped_descendants: u32,
}

/// Series accumulated since monitoring started.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesBuffer {
    pub cpu: Vec<f64>,
    pub mem: Vec<f64>,
    pub skipped_descendants: u64,
}

impl SeriesBuffer {
    pub fn push(&mut self, snapshot: Snapshot) {
        self.cpu.push(snapshot.cpu_percent_normalized);
        self.mem.push(snapshot.mem_percent);
        self.skipped_descendants += u64::from(snapshot.skipped_descendants);
    }

    pub fn len(&self) -> usize {
        self.cpu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty()
    }
}

pub struct SampleCollector {
    probe: Arc<dyn ProcessProbe>,
    target: ProcessHandle,
    cpu_count: usize,
    interval: Duration,
}

impl SampleCollector {
    pub fn new(
        probe: Arc<dyn ProcessProbe>,
        target: ProcessHandle,
        cpu_count: usize,
        interval: Duration,
    ) -> Self {
        Self {
            probe,
            target,
            cpu_count,
            interval,
        }
    }

    /// Measure until the target exits, publishing the full series after
    /// every cycle. A measurement error on a target that is still alive
    /// publishes a failure and stops.
    pub async fn run(self, publisher: Publisher) {
        let pid = self.target.pid;
        let mut series = SeriesBuffer::default();
        info!("Collector started for pid {}", pid);

        while self.probe.exists(pid) {
            match self.sample_cycle().await {
                Ok(Some(snapshot)) => {
                    series.push(snapshot);
                    publisher.publish(Publication::Ok(series.clone()));
                    debug!(
                        "Cycle {}: cpu {:.2}%, mem {:.2}%",
                        series.len(),
                        snapshot.cpu_percent_normalized,
                        snapshot.mem_percent
                    );
                }
                Ok(None) => break,
                // The target can exit between the liveness check and a read
                Err(e) if e.is_measurement() && !self.probe.exists(pid) => {
                    debug!("Target {} exited mid-cycle: {}", pid, e);
                    break;
                }
                Err(e) => {
                    error!("Measurement failed for pid {}: {}", pid, e);
                    publisher.publish(Publication::Failed(e.to_string()));
                    return;
                }
            }
        }

        if !publisher.has_published() {
            publisher.publish(Publication::Ok(series.clone()));
        }
        info!("Target {} exited after {} cycles", pid, series.len());
    }

    /// One measure, sleep, measure-delta, aggregate pass. Returns `None` when
    /// the target exited during the interval.
    async fn sample_cycle(&self) -> Result<Option<Snapshot>> {
        let pid = self.target.pid;
        let descendants = self.probe.descendants(pid)?;

        self.probe.cpu_percent(pid)?;
        let mut primed = Vec::with_capacity(descendants.len());
        let mut skipped = 0u32;
        for &child in &descendants {
            match self.probe.cpu_percent(child) {
                Ok(_) => primed.push(child),
                Err(e) => {
                    debug!("Skipping descendant {}: {}", child, e);
                    skipped += 1;
                }
            }
        }

        tokio::time::sleep(self.interval).await;

        if !self.probe.exists(pid) {
            return Ok(None);
        }

        let mut child_cpu = 0.0;
        let mut child_mem = 0.0;
        for &child in &primed {
            if !self.probe.exists(child) {
                skipped += 1;
                continue;
            }
            let reading = self
                .probe
                .cpu_percent(child)
                .and_then(|cpu| Ok((cpu, self.probe.memory_percent(child)?)));
            match reading {
                Ok((cpu, mem)) => {
                    child_cpu += cpu;
                    child_mem += mem;
                }
                Err(e) => {
                    debug!("Skipping descendant {}: {}", child, e);
                    skipped += 1;
                }
            }
        }

        let total_cpu = self.probe.cpu_percent(pid)? + child_cpu;
        let total_mem = self.probe.memory_percent(pid)? + child_mem;

        if skipped > 0 {
            warn!("{} descendants of pid {} could not be measured", skipped, pid);
        }

        let mut active = primed;
        active.push(pid);
        self.probe.release(&active);

        Ok(Some(Snapshot {
            cpu_percent_normalized: normalize_cpu(total_cpu, self.cpu_count),
            mem_percent: total_mem,
            skipped_descendants: skipped,
        }))
    }
}
