//! In-memory probe, host and sinks shared by the integration tests
#![allow(dead_code)]

use app_profiler::error::{ProfilerError, Result};
use app_profiler::{ChartSink, MemoryInfo, ProcessProbe, RunReport, SystemInfoProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Value returned by a priming read. Any leak of it into a series is a bug.
pub const PRIMING_NOISE: f64 = 999.0;

#[derive(Debug, Clone, Copy)]
pub enum Lifetime {
    Forever,
    /// Exits right after this many priming reads.
    Primes(u32),
    /// Exits after this many completed cycles (counted on the memory read).
    Measurements(u32),
}

struct FakeProc {
    parent: Option<u32>,
    cpu: f64,
    mem: f64,
    lifetime: Lifetime,
    alive: bool,
    primed: bool,
    fail_measurement: bool,
}

#[derive(Default)]
pub struct FakeProbe {
    procs: Mutex<HashMap<u32, FakeProc>>,
    reads: AtomicUsize,
    tree_walks: AtomicUsize,
    kill_on_walk: Mutex<Option<(u32, usize)>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, pid: u32, parent: Option<u32>, cpu: f64, mem: f64, lifetime: Lifetime) {
        self.procs.lock().unwrap().insert(
            pid,
            FakeProc {
                parent,
                cpu,
                mem,
                lifetime,
                alive: true,
                primed: false,
                fail_measurement: false,
            },
        );
    }

    /// Make measurement reads of `pid` fail as if it vanished mid-read.
    pub fn fail_measurements(&self, pid: u32) {
        if let Some(p) = self.procs.lock().unwrap().get_mut(&pid) {
            p.fail_measurement = true;
        }
    }

    pub fn kill(&self, pid: u32) {
        if let Some(p) = self.procs.lock().unwrap().get_mut(&pid) {
            p.alive = false;
        }
    }

    /// Kill `pid` during the `walk`-th descendant lookup, before any of that
    /// cycle's cpu or memory reads.
    pub fn kill_on_tree_walk(&self, pid: u32, walk: usize) {
        *self.kill_on_walk.lock().unwrap() = Some((pid, walk));
    }

    /// Number of cpu and memory reads served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ProcessProbe for FakeProbe {
    fn exists(&self, pid: u32) -> bool {
        self.procs
            .lock()
            .unwrap()
            .get(&pid)
            .is_some_and(|p| p.alive)
    }

    fn descendants(&self, pid: u32) -> Result<Vec<u32>> {
        let walk = self.tree_walks.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((victim, at)) = *self.kill_on_walk.lock().unwrap() {
            if at == walk {
                self.kill(victim);
            }
        }
        let procs = self.procs.lock().unwrap();
        let mut result = Vec::new();
        let mut stack = vec![pid];
        while let Some(parent) = stack.pop() {
            let mut kids: Vec<u32> = procs
                .iter()
                .filter(|(_, p)| p.alive && p.parent == Some(parent))
                .map(|(&child, _)| child)
                .collect();
            kids.sort_unstable();
            stack.extend(&kids);
            result.extend(kids);
        }
        Ok(result)
    }

    fn cpu_percent(&self, pid: u32) -> Result<f64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut procs = self.procs.lock().unwrap();
        let p = procs
            .get_mut(&pid)
            .filter(|p| p.alive)
            .ok_or(ProfilerError::ProcessGone { pid })?;

        if !p.primed {
            p.primed = true;
            if let Lifetime::Primes(n) = &mut p.lifetime {
                *n -= 1;
                if *n == 0 {
                    p.alive = false;
                }
            }
            return Ok(PRIMING_NOISE);
        }

        p.primed = false;
        if p.fail_measurement {
            return Err(ProfilerError::ProcessGone { pid });
        }
        Ok(p.cpu)
    }

    fn memory_percent(&self, pid: u32) -> Result<f64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut procs = self.procs.lock().unwrap();
        let p = procs
            .get_mut(&pid)
            .filter(|p| p.alive)
            .ok_or(ProfilerError::ProcessGone { pid })?;

        let mem = p.mem;
        if let Lifetime::Measurements(n) = &mut p.lifetime {
            *n -= 1;
            if *n == 0 {
                p.alive = false;
            }
        }
        Ok(mem)
    }
}

pub struct FakeHost {
    pub cpus: usize,
    pub memory: MemoryInfo,
}

impl FakeHost {
    pub fn new(cpus: usize) -> Self {
        Self {
            cpus,
            memory: MemoryInfo {
                total_gb: 16,
                available_gb: 10,
                used_gb: 6,
            },
        }
    }
}

impl SystemInfoProvider for FakeHost {
    fn cpu_count(&self) -> usize {
        self.cpus
    }

    fn memory_info(&self) -> Result<MemoryInfo> {
        Ok(self.memory)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub reports: Mutex<Vec<RunReport>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

#[async_trait]
impl ChartSink for RecordingSink {
    async fn render(&self, report: &RunReport) -> Result<Vec<PathBuf>> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(Vec::new())
    }
}

pub struct FailingSink;

#[async_trait]
impl ChartSink for FailingSink {
    async fn render(&self, _report: &RunReport) -> Result<Vec<PathBuf>> {
        Err(ProfilerError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only output directory",
        )))
    }
}
