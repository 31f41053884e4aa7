//! Profiling session lifecycle: start the collector, later collect and report

use crate::channel::{mailbox, Publication, Subscriber};
use crate::collector::{LinuxProcessProbe, ProcessHandle, ProcessProbe};
use crate::config::SamplingConfig;
use crate::error::{ProfilerError, Result};
use crate::host::{HostInfo, SystemInfoProvider};
use crate::report::{ChartSink, RunReport};
use crate::sampler::{SampleCollector, SeriesBuffer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Reported,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Reported => "reported",
        };
        f.write_str(name)
    }
}

/// Owns the collector task and aborts it when dropped.
struct CollectorTask {
    handle: JoinHandle<()>,
}

impl CollectorTask {
    fn terminate(&self) {
        if !self.handle.is_finished() {
            debug!("Terminating collector task");
            self.handle.abort();
        }
    }
}

impl Drop for CollectorTask {
    fn drop(&mut self) {
        self.terminate();
    }
}

struct Running {
    started: Instant,
    subscriber: Subscriber,
    collector: CollectorTask,
}

pub struct Session {
    probe: Arc<dyn ProcessProbe>,
    host: Arc<dyn SystemInfoProvider>,
    interval: Duration,
    state: SessionState,
    running: Option<Running>,
}

impl Session {
    pub fn new(
        probe: Arc<dyn ProcessProbe>,
        host: Arc<dyn SystemInfoProvider>,
        interval: Duration,
    ) -> Self {
        Self {
            probe,
            host,
            interval,
            state: SessionState::Idle,
            running: None,
        }
    }

    /// Session backed by /proc for the local host.
    pub fn linux(config: &SamplingConfig) -> Result<Self> {
        let probe = LinuxProcessProbe::new()?;
        Ok(Self::new(
            Arc::new(probe),
            Arc::new(HostInfo::new()),
            config.interval(),
        ))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the collector task is still alive.
    pub fn is_collecting(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.collector.handle.is_finished())
    }

    /// Start profiling the calling process.
    pub fn start_profiling(&mut self) -> Result<()> {
        self.start_profiling_pid(ProcessHandle::current().pid)
    }

    /// Start profiling an arbitrary process tree rooted at `pid`.
    pub fn start_profiling_pid(&mut self, pid: u32) -> Result<()> {
        self.expect_state(SessionState::Idle)?;
        let started = Instant::now();

        let runtime = Handle::try_current().map_err(|e| {
            error!("Start profiling got error: {}", e);
            ProfilerError::Spawn(e.to_string())
        })?;
        if !self.probe.exists(pid) {
            error!("Start profiling got error: process {} not found", pid);
            return Err(ProfilerError::Spawn(format!("process {} not found", pid)));
        }

        let (publisher, subscriber) = mailbox();
        let collector = SampleCollector::new(
            Arc::clone(&self.probe),
            ProcessHandle::new(pid),
            self.host.cpu_count(),
            self.interval,
        );
        let handle = runtime.spawn(collector.run(publisher));

        self.running = Some(Running {
            started,
            subscriber,
            collector: CollectorTask { handle },
        });
        self.state = SessionState::Running;
        info!("Profiling started for pid {} every {:?}", pid, self.interval);
        Ok(())
    }

    /// Wait for the latest publication, summarize it and hand it to `sink`.
    ///
    /// The collector task is terminated on every path out of this function.
    pub async fn end_profiling(&mut self, sink: &dyn ChartSink) -> Result<RunReport> {
        self.expect_state(SessionState::Running)?;
        let Some(mut running) = self.running.take() else {
            return Err(ProfilerError::SessionState {
                expected: SessionState::Running,
                actual: self.state,
            });
        };
        self.state = SessionState::Reported;

        let result = self.report(&mut running, sink).await;
        running.collector.terminate();
        if let Err(e) = &result {
            error!("End profiling got error: {}", e);
        }
        result
    }

    async fn report(&self, running: &mut Running, sink: &dyn ChartSink) -> Result<RunReport> {
        let series = match running.subscriber.latest().await {
            Some(Publication::Ok(series)) => series,
            Some(Publication::Failed(descriptor)) => {
                return Err(ProfilerError::Collector(descriptor))
            }
            // Collector aborted before its first publication
            None => SeriesBuffer::default(),
        };
        let elapsed = running.started.elapsed();

        let report = RunReport::new(
            series.cpu,
            series.mem,
            elapsed,
            self.host.cpu_count(),
            self.host.memory_info()?,
            series.skipped_descendants,
        );
        info!(
            "Profiled {} samples over {:.2}s (max cpu {:.2}%, avg cpu {:.2}%, max mem {:.2}%)",
            report.cpu_series.len(),
            elapsed.as_secs_f64(),
            report.cpu_stats.max,
            report.cpu_stats.mean,
            report.mem_stats.max
        );

        sink.render(&report)
            .await
            .map_err(|e| ProfilerError::Report(e.to_string()))?;
        Ok(report)
    }

    /// Abort the collector if it is still running. Safe to call repeatedly.
    pub fn terminate_collector(&self) {
        if let Some(running) = &self.running {
            running.collector.terminate();
        }
    }

    fn expect_state(&self, expected: SessionState) -> Result<()> {
        if self.state != expected {
            return Err(ProfilerError::SessionState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }
}
