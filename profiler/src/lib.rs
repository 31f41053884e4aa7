//! App Profiler - CPU and memory sampling for a process tree
//!
//! A [`Session`] spawns a collector task that measures the target process and
//! all of its descendants at a fixed interval. When the session ends, the
//! latest series is summarized into a [`RunReport`] and handed to a
//! [`ChartSink`] which renders it.

pub mod channel;
pub mod chart;
pub mod collector;
pub mod config;
pub mod error;
pub mod host;
pub mod report;
pub mod sampler;
pub mod session;

pub use chart::SvgChartSink;
pub use collector::{LinuxProcessProbe, ProcessHandle, ProcessProbe};
pub use config::Config;
pub use error::{ProfilerError, Result};
pub use host::{server_profile, HostInfo, MemoryInfo, ServerProfile, SystemInfoProvider};
pub use report::{ChartSink, RunReport, SeriesStats};
pub use session::{Session, SessionState};
