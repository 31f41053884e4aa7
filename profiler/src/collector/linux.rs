use super::ProcessProbe;
use crate::error::{ProfilerError, Result};
use crate::host;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

#[derive(Clone)]
struct CpuSample {
    total_ticks: u64, // utime + stime
    timestamp: Instant,
}

#[derive(Debug)]
struct ProcStat {
    state: char,
    ppid: u32,
    total_ticks: u64,
    rss_pages: u64,
}

pub struct LinuxProcessProbe {
    page_size: u64,
    clock_ticks: u64,
    total_memory_bytes: u64,
    cpu_samples: Mutex<HashMap<u32, CpuSample>>,
}

impl LinuxProcessProbe {
    pub fn new() -> Result<Self> {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) as u64 };
        let clock_ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) as u64 }.max(1);
        let total_memory_bytes = host::read_meminfo()?.total;
        Ok(Self {
            page_size,
            clock_ticks,
            total_memory_bytes,
            cpu_samples: Mutex::new(HashMap::new()),
        })
    }

    fn read_stat(pid: u32) -> Result<ProcStat> {
        let content = fs::read_to_string(format!("/proc/{}/stat", pid)).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ProfilerError::ProcessGone { pid }
            } else {
                ProfilerError::Io(e)
            }
        })?;
        Self::parse_stat(pid, &content)
    }

    // The command name may contain spaces or parentheses, so fields are
    // counted from the last ')'.
    fn parse_stat(pid: u32, content: &str) -> Result<ProcStat> {
        let malformed = || ProfilerError::Measurement(format!("malformed /proc/{}/stat", pid));
        let rest = content.rfind(')').map(|i| &content[i + 1..]).ok_or_else(malformed)?;
        let parts: Vec<&str> = rest.split_whitespace().collect();
        if parts.len() < 22 {
            return Err(malformed());
        }

        let field = |idx: usize| parts[idx].parse::<u64>().map_err(|_| malformed());
        let state = parts[0].chars().next().unwrap_or('?');
        let ppid = field(1)? as u32;
        let utime = field(11)?;
        let stime = field(12)?;
        let rss_pages = field(21)?;

        Ok(ProcStat {
            state,
            ppid,
            total_ticks: utime + stime,
            rss_pages,
        })
    }

    fn list_pids() -> Result<Vec<u32>> {
        let mut pids = Vec::new();
        for entry in fs::read_dir("/proc")?.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(pid) = name.parse::<u32>() {
                    pids.push(pid);
                }
            }
        }
        Ok(pids)
    }

    /// Remove stale CPU samples for processes that no longer exist
    pub fn cleanup_stale(&self, active_pids: &[u32]) {
        let mut samples = self.cpu_samples.lock().unwrap_or_else(PoisonError::into_inner);
        samples.retain(|pid, _| active_pids.contains(pid));
    }
}

impl ProcessProbe for LinuxProcessProbe {
    fn exists(&self, pid: u32) -> bool {
        match Self::read_stat(pid) {
            Ok(stat) => !matches!(stat.state, 'Z' | 'X' | 'x'),
            Err(_) => false,
        }
    }

    fn descendants(&self, pid: u32) -> Result<Vec<u32>> {
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for candidate in Self::list_pids()? {
            // Processes may exit while /proc is being walked
            if let Ok(stat) = Self::read_stat(candidate) {
                children.entry(stat.ppid).or_default().push(candidate);
            }
        }

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut stack = vec![pid];
        while let Some(parent) = stack.pop() {
            if let Some(kids) = children.get(&parent) {
                for &child in kids {
                    if child != pid && seen.insert(child) {
                        result.push(child);
                        stack.push(child);
                    }
                }
            }
        }
        Ok(result)
    }

    fn cpu_percent(&self, pid: u32) -> Result<f64> {
        let stat = Self::read_stat(pid)?;
        let now = Instant::now();

        let mut samples = self.cpu_samples.lock().unwrap_or_else(PoisonError::into_inner);
        let percent = match samples.get(&pid) {
            Some(prev) => {
                let tick_delta = stat.total_ticks.saturating_sub(prev.total_ticks);
                let time_delta = now.duration_since(prev.timestamp).as_secs_f64();
                if time_delta > 0.0 {
                    let cpu_seconds = tick_delta as f64 / self.clock_ticks as f64;
                    (cpu_seconds / time_delta) * 100.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        samples.insert(
            pid,
            CpuSample {
                total_ticks: stat.total_ticks,
                timestamp: now,
            },
        );
        Ok(percent)
    }

    fn memory_percent(&self, pid: u32) -> Result<f64> {
        let stat = Self::read_stat(pid)?;
        if self.total_memory_bytes == 0 {
            return Ok(0.0);
        }
        let rss_bytes = stat.rss_pages * self.page_size;
        Ok(rss_bytes as f64 / self.total_memory_bytes as f64 * 100.0)
    }

    fn release(&self, active: &[u32]) {
        self.cleanup_stale(active);
    }
}
