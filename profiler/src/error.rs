//! Error types shared by the profiler library

use crate::session::SessionState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("Failed to spawn collector: {0}")]
    Spawn(String),

    #[error("Process {pid} is no longer available")]
    ProcessGone { pid: u32 },

    #[error("Measurement failed: {0}")]
    Measurement(String),

    #[error("Profiler got error: {0}")]
    Collector(String),

    #[error("Invalid parameter '{0}', available options: cpu, memory")]
    InvalidOption(String),

    #[error("Session is {actual}, expected {expected}")]
    SessionState {
        expected: SessionState,
        actual: SessionState,
    },

    #[error("Report generation failed: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProfilerError {
    /// True for failures raised while reading a process during a sampling cycle.
    pub fn is_measurement(&self) -> bool {
        matches!(self, Self::ProcessGone { .. } | Self::Measurement(_))
    }
}

pub type Result<T> = std::result::Result<T, ProfilerError>;
