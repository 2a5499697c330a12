//! Host system report.
//!
//! Answers "what machine am I flashing from?" before a destructive write:
//! OS, kernel, CPU and memory, collected through the HAL so the report is
//! testable and never shells out.

use anyhow::{Context, Result};
use bootforge_hal::{procfs, FlashHal};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisorReport {
    pub hostname: Option<String>,
    pub kernel_release: Option<String>,
    pub os_name: Option<String>,
    pub cpu_model: Option<String>,
    pub arch: String,
    pub mem_total_mb: Option<u64>,
    pub mem_available_mb: Option<u64>,
}

pub fn collect(hal: &dyn FlashHal) -> Result<AdvisorReport> {
    let meminfo = hal
        .proc_meminfo()
        .context("failed to read /proc/meminfo")?;
    let cpuinfo = hal
        .proc_cpuinfo()
        .context("failed to read /proc/cpuinfo")?;
    let os = hal.os_release().context("failed to read os-release")?;

    Ok(AdvisorReport {
        hostname: hal.hostname().unwrap_or_default(),
        kernel_release: hal.kernel_release().unwrap_or_default(),
        os_name: os.pretty_name.or(os.id),
        cpu_model: procfs::cpuinfo::parse_cpu_model(&cpuinfo),
        arch: std::env::consts::ARCH.to_string(),
        mem_total_mb: procfs::meminfo::parse_mem_total_kb(&meminfo).map(|kb| kb / 1024),
        mem_available_mb: procfs::meminfo::parse_mem_available_kb(&meminfo).map(|kb| kb / 1024),
    })
}

impl fmt::Display for AdvisorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unknown = "unknown".to_string();
        writeln!(f, "Host   : {}", self.hostname.as_ref().unwrap_or(&unknown))?;
        writeln!(
            f,
            "System : {} ({})",
            self.os_name.as_ref().unwrap_or(&unknown),
            self.arch
        )?;
        writeln!(
            f,
            "Kernel : {}",
            self.kernel_release.as_ref().unwrap_or(&unknown)
        )?;
        writeln!(
            f,
            "CPU    : {}",
            self.cpu_model.as_ref().unwrap_or(&unknown)
        )?;
        match (self.mem_total_mb, self.mem_available_mb) {
            (Some(total), Some(available)) => {
                writeln!(f, "RAM    : {} MiB total, {} MiB available", total, available)
            }
            (Some(total), None) => writeln!(f, "RAM    : {} MiB total", total),
            _ => writeln!(f, "RAM    : unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootforge_hal::FakeHal;

    #[test]
    fn collect_builds_a_full_report_from_the_fake_host() {
        let hal = FakeHal::new();
        let report = collect(&hal).unwrap();
        assert_eq!(report.hostname.as_deref(), Some("fake-host"));
        assert_eq!(report.cpu_model.as_deref(), Some("Fake Octane 3000"));
        assert_eq!(report.mem_total_mb, Some(7840));
        assert_eq!(report.os_name.as_deref(), Some("Fedora Linux 43"));
    }

    #[test]
    fn display_includes_the_key_lines() {
        let hal = FakeHal::new();
        let rendered = collect(&hal).unwrap().to_string();
        assert!(rendered.contains("Host   : fake-host"));
        assert!(rendered.contains("CPU    : Fake Octane 3000"));
        assert!(rendered.contains("MiB total"));
    }
}
