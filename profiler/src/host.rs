//! Static host facts: logical CPU count and physical memory totals

use crate::error::{ProfilerError, Result};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::str::FromStr;

/// Physical memory in whole gigabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryInfo {
    pub total_gb: u64,
    pub available_gb: u64,
    pub used_gb: u64,
}

impl MemoryInfo {
    pub fn from_bytes(total: u64, available: u64, used: u64) -> Self {
        Self {
            total_gb: total >> 30,
            available_gb: available >> 30,
            used_gb: used >> 30,
        }
    }
}

pub trait SystemInfoProvider: Send + Sync {
    fn cpu_count(&self) -> usize;
    fn memory_info(&self) -> Result<MemoryInfo>;
}

/// Byte counts parsed from /proc/meminfo.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemInfoBytes {
    pub total: u64,
    pub free: u64,
    pub available: u64,
    pub buffers: u64,
    pub cached: u64,
}

impl MemInfoBytes {
    pub fn parse(content: &str) -> Self {
        let mut info = Self::default();
        let mut reclaimable = 0;
        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            let bytes = value.parse::<u64>().unwrap_or(0) * 1024;
            match key {
                "MemTotal:" => info.total = bytes,
                "MemFree:" => info.free = bytes,
                "MemAvailable:" => info.available = bytes,
                "Buffers:" => info.buffers = bytes,
                "Cached:" => info.cached = bytes,
                "SReclaimable:" => reclaimable = bytes,
                _ => {}
            }
        }
        info.cached += reclaimable;
        info
    }

    pub fn used(&self) -> u64 {
        self.total
            .checked_sub(self.free + self.buffers + self.cached)
            .unwrap_or_else(|| self.total.saturating_sub(self.available))
    }
}

pub fn read_meminfo() -> Result<MemInfoBytes> {
    let content = fs::read_to_string("/proc/meminfo")?;
    Ok(MemInfoBytes::parse(&content))
}

pub struct HostInfo {
    num_cpus: usize,
}

impl HostInfo {
    pub fn new() -> Self {
        let num_cpus = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) }.max(1) as usize;
        Self { num_cpus }
    }
}

impl Default for HostInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemInfoProvider for HostInfo {
    fn cpu_count(&self) -> usize {
        self.num_cpus
    }

    fn memory_info(&self) -> Result<MemoryInfo> {
        let mem = read_meminfo()?;
        Ok(MemoryInfo::from_bytes(mem.total, mem.available, mem.used()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOption {
    Cpu,
    Memory,
}

impl FromStr for ProfileOption {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(Self::Cpu),
            "memory" => Ok(Self::Memory),
            other => Err(ProfilerError::InvalidOption(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerProfile {
    All { cpu_count: usize, memory: MemoryInfo },
    Cpu(usize),
    Memory(MemoryInfo),
}

fn write_memory(f: &mut fmt::Formatter<'_>, m: &MemoryInfo) -> fmt::Result {
    writeln!(f, "Total Memory: {} GB", m.total_gb)?;
    writeln!(f, "Available Memory: {} GB", m.available_gb)?;
    write!(f, "Used Memory: {} GB", m.used_gb)
}

impl fmt::Display for ServerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All { cpu_count, memory } => {
                writeln!(f, "Number of CPU Cores: {}", cpu_count)?;
                write_memory(f, memory)
            }
            Self::Cpu(count) => write!(f, "Number of CPU Cores: {}", count),
            Self::Memory(memory) => write_memory(f, memory),
        }
    }
}

/// Query host facts. `None` returns everything; otherwise `"cpu"` or `"memory"`.
pub fn server_profile(
    host: &dyn SystemInfoProvider,
    option: Option<&str>,
) -> Result<ServerProfile> {
    // Validate before touching /proc so a bad option never yields partial data
    let option = option.map(str::parse::<ProfileOption>).transpose()?;
    match option {
        None => Ok(ServerProfile::All {
            cpu_count: host.cpu_count(),
            memory: host.memory_info()?,
        }),
        Some(ProfileOption::Cpu) => Ok(ServerProfile::Cpu(host.cpu_count())),
        Some(ProfileOption::Memory) => Ok(ServerProfile::Memory(host.memory_info()?)),
    }
}
