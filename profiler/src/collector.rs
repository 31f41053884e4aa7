//! Process measurement probes (reads /proc on Linux)

pub mod linux;

pub use linux::LinuxProcessProbe;

use crate::error::Result;

/// Reference to an OS process that is observed, never owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle {
    pub pid: u32,
}

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }

    pub fn current() -> Self {
        Self::new(std::process::id())
    }
}

pub trait ProcessProbe: Send + Sync {
    /// Whether the process is still running (zombies count as gone).
    fn exists(&self, pid: u32) -> bool;

    /// Every process transitively spawned by `pid`.
    fn descendants(&self, pid: u32) -> Result<Vec<u32>>;

    /// CPU% since the previous call for the same pid. The first call only
    /// establishes a baseline and its value carries no information.
    fn cpu_percent(&self, pid: u32) -> Result<f64>;

    /// Resident memory as a percentage of physical RAM.
    fn memory_percent(&self, pid: u32) -> Result<f64>;

    /// Drop CPU baselines for pids not in `active`.
    fn release(&self, _active: &[u32]) {}
}
