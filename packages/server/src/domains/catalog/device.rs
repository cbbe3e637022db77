//! Best-effort host probing for bundle recommendations.
//!
//! Everything here is advisory; the state machine never reads it. GPU data
//! comes from `nvidia-smi` when present, the rest from the OS.

use std::process::Command;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub gpu_name: Option<String>,
    pub gpu_count: u32,
    pub gpu_vram_gb: u32,
    pub cuda_available: bool,
    pub cpu_cores: u32,
    pub memory_gb: u64,
    pub disk_free_gb: u64,
}

fn detect_gpu() -> (Option<String>, u32, u32, bool) {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=name,memory.total", "--format=csv,noheader,nounits"])
        .output();

    let Ok(output) = output else {
        return (None, 0, 0, false);
    };
    if !output.status.success() {
        return (None, 0, 0, false);
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.is_empty() {
        return (None, 0, 0, false);
    }

    let gpu_name = lines[0]
        .split(',')
        .next()
        .map(|name| name.trim().to_string());
    let vram_mb = lines
        .iter()
        .filter_map(|line| line.split(',').nth(1))
        .filter_map(|field| field.trim().parse::<u32>().ok())
        .min()
        .unwrap_or(0);

    (gpu_name, lines.len() as u32, vram_mb / 1024, true)
}

fn detect_memory_gb() -> u64 {
    std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|contents| {
            contents.lines().find_map(|line| {
                line.strip_prefix("MemTotal:")
                    .and_then(|rest| rest.trim().split_whitespace().next())
                    .and_then(|kb| kb.parse::<u64>().ok())
            })
        })
        .map(|kb| kb / (1024 * 1024))
        .unwrap_or(0)
}

fn detect_disk_free_gb() -> u64 {
    let output = Command::new("df").args(["-k", "."]).output();
    let Ok(output) = output else { return 0 };
    if !output.status.success() {
        return 0;
    }

    let text = String::from_utf8_lossy(&output.stdout);
    text.lines()
        .nth(1)
        .and_then(|line| line.split_whitespace().nth(3))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb / (1024 * 1024))
        .unwrap_or(0)
}

pub fn detect_device_profile() -> DeviceProfile {
    let (gpu_name, gpu_count, gpu_vram_gb, cuda_available) = detect_gpu();

    DeviceProfile {
        gpu_name,
        gpu_count,
        gpu_vram_gb,
        cuda_available,
        cpu_cores: std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1),
        memory_gb: detect_memory_gb(),
        disk_free_gb: detect_disk_free_gb(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_never_panics_and_reports_at_least_one_core() {
        let profile = detect_device_profile();
        assert!(profile.cpu_cores >= 1);
    }
}
