//! Structured block-device records from sysfs.
//!
//! Device discovery reads `/sys/block` attributes directly instead of parsing
//! the human-readable output of `lsblk`/`diskutil`, which changes between
//! versions and locales.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// One whole-disk block device as reported by sysfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDeviceInfo {
    pub name: String,
    pub dev_path: PathBuf,
    pub size_bytes: u64,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub removable: bool,
    pub read_only: bool,
}

/// Reads the block device size from `<sysfs dir>/size`.
///
/// The `size` file is expressed in 512-byte sectors.
pub fn block_device_size_bytes(sys_block_dev_dir: &Path) -> Result<u64> {
    let sectors_str = fs::read_to_string(sys_block_dev_dir.join("size"))?;
    let sectors: u64 = sectors_str.trim().parse()?;
    Ok(sectors.saturating_mul(512))
}

/// Scan `/sys/block` for whole-disk devices.
pub fn scan_block_devices() -> Result<Vec<BlockDeviceInfo>> {
    scan_block_devices_in(Path::new("/sys/block"), Path::new("/dev"))
}

/// Scan an arbitrary sysfs block root. Tests point this at a fixture tree.
pub fn scan_block_devices_in(sys_block_root: &Path, dev_root: &Path) -> Result<Vec<BlockDeviceInfo>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(sys_block_root)?.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if should_skip_block_device(&name) {
            continue;
        }
        let sysfs_path = sys_block_root.join(&name);
        let size_bytes = match block_device_size_bytes(&sysfs_path) {
            Ok(v) => v,
            Err(_) => continue,
        };
        if size_bytes == 0 {
            // No medium present (empty card readers report zero sectors).
            continue;
        }

        out.push(BlockDeviceInfo {
            dev_path: dev_root.join(&name),
            size_bytes,
            vendor: read_trimmed(sysfs_path.join("device/vendor")),
            model: read_trimmed(sysfs_path.join("device/model")),
            serial: read_trimmed(sysfs_path.join("device/serial")),
            removable: read_flag(sysfs_path.join("removable")),
            read_only: read_flag(sysfs_path.join("ro")),
            name,
        });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

fn read_trimmed(path: PathBuf) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_flag(path: PathBuf) -> bool {
    read_trimmed(path)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        == 1
}

fn should_skip_block_device(name: &str) -> bool {
    // Ephemeral / virtual devices are never flash targets.
    name.starts_with("loop")
        || name.starts_with("ram")
        || name.starts_with("zram")
        || name.starts_with("dm-")
        || name.starts_with("md")
        || name.starts_with("sr")
}
