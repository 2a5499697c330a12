//! Real Linux HAL implementation.

use crate::hal::block_ops::{BlockHandle, BlockOps};
use crate::hal::host_info_ops::{HostInfoOps, OsReleaseInfo};
use crate::sysfs::block::{self, BlockDeviceInfo};
use crate::{os_release, HalError, HalResult};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// HAL backed by the running Linux system.
///
/// All filesystem roots are overridable so tests can point the HAL at fixture
/// trees instead of the live machine.
#[derive(Debug, Clone)]
pub struct LinuxHal {
    sys_block_root: PathBuf,
    dev_root: PathBuf,
    proc_root: PathBuf,
    etc_root: PathBuf,
}

impl Default for LinuxHal {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxHal {
    pub fn new() -> Self {
        Self {
            sys_block_root: PathBuf::from("/sys/block"),
            dev_root: PathBuf::from("/dev"),
            proc_root: PathBuf::from("/proc"),
            etc_root: PathBuf::from("/etc"),
        }
    }

    pub fn with_roots(
        sys_block_root: impl Into<PathBuf>,
        dev_root: impl Into<PathBuf>,
        proc_root: impl Into<PathBuf>,
        etc_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sys_block_root: sys_block_root.into(),
            dev_root: dev_root.into(),
            proc_root: proc_root.into(),
            etc_root: etc_root.into(),
        }
    }

    fn read_proc(&self, rel: &str) -> HalResult<String> {
        Ok(fs::read_to_string(self.proc_root.join(rel))?)
    }

    fn read_proc_opt(&self, rel: &str) -> HalResult<Option<String>> {
        match fs::read_to_string(self.proc_root.join(rel)) {
            Ok(s) => {
                let trimmed = s.trim().to_string();
                Ok(if trimmed.is_empty() { None } else { Some(trimmed) })
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl BlockOps for LinuxHal {
    fn scan_block_devices(&self) -> HalResult<Vec<BlockDeviceInfo>> {
        block::scan_block_devices_in(&self.sys_block_root, &self.dev_root)
            .map_err(|err| HalError::Other(format!("sysfs scan failed: {err:#}")))
    }

    fn open_block_device(&self, dev_path: &Path) -> HalResult<Box<dyn BlockHandle>> {
        log::debug!("opening block device {} (O_EXCL)", dev_path.display());
        // O_EXCL on a block device makes the kernel refuse the open while any
        // partition of it is mounted, an extra backstop under the engine's own
        // mount checks.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_EXCL)
            .open(dev_path)
            .map_err(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    HalError::DeviceNotFound(dev_path.display().to_string())
                } else if err.raw_os_error() == Some(libc::EBUSY) {
                    HalError::DeviceBusy(dev_path.display().to_string())
                } else {
                    HalError::Io(err)
                }
            })?;
        Ok(Box::new(LinuxBlockHandle { file }))
    }
}

#[derive(Debug)]
struct LinuxBlockHandle {
    file: File,
}

impl Read for LinuxBlockHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for LinuxBlockHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for LinuxBlockHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl BlockHandle for LinuxBlockHandle {
    fn flush_device(&mut self) -> HalResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn capacity_bytes(&mut self) -> HalResult<u64> {
        // Block devices report len 0 through metadata; seek-to-end works for
        // both devices and regular files.
        let pos = self.file.stream_position()?;
        let end = self.file.seek(SeekFrom::End(0))?;
        self.file.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }
}

impl HostInfoOps for LinuxHal {
    fn hostname(&self) -> HalResult<Option<String>> {
        self.read_proc_opt("sys/kernel/hostname")
    }

    fn kernel_release(&self) -> HalResult<Option<String>> {
        self.read_proc_opt("sys/kernel/osrelease")
    }

    fn os_release(&self) -> HalResult<OsReleaseInfo> {
        let content = fs::read_to_string(self.etc_root.join("os-release")).unwrap_or_default();
        Ok(os_release::parse_os_release(&content))
    }

    fn proc_cpuinfo(&self) -> HalResult<String> {
        self.read_proc("cpuinfo")
    }

    fn proc_meminfo(&self) -> HalResult<String> {
        self.read_proc("meminfo")
    }

    fn proc_mountinfo(&self) -> HalResult<String> {
        self.read_proc("self/mountinfo")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_block_device_round_trips_through_a_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target.img");
        fs::write(&target, vec![0u8; 64]).unwrap();

        let hal = LinuxHal::new();
        let mut handle = hal.open_block_device(&target).unwrap();
        handle.write_all(b"bootforge").unwrap();
        handle.flush_device().unwrap();

        handle.seek(SeekFrom::Start(0)).unwrap();
        let mut back = [0u8; 9];
        handle.read_exact(&mut back).unwrap();
        assert_eq!(&back, b"bootforge");
        assert_eq!(handle.capacity_bytes().unwrap(), 64);
    }

    #[test]
    fn open_block_device_missing_is_device_not_found() {
        let hal = LinuxHal::new();
        let err = hal
            .open_block_device(Path::new("/nonexistent/bootforge-dev"))
            .unwrap_err();
        assert!(matches!(err, HalError::DeviceNotFound(_)));
    }

    #[test]
    fn host_info_reads_from_injected_roots() {
        let dir = tempdir().unwrap();
        let proc_root = dir.path().join("proc");
        let etc_root = dir.path().join("etc");
        fs::create_dir_all(proc_root.join("sys/kernel")).unwrap();
        fs::create_dir_all(&etc_root).unwrap();
        fs::write(proc_root.join("sys/kernel/hostname"), "forge-station\n").unwrap();
        fs::write(proc_root.join("meminfo"), "MemTotal: 4096 kB\n").unwrap();
        fs::write(etc_root.join("os-release"), "ID=fedora\n").unwrap();

        let hal = LinuxHal::with_roots(
            dir.path().join("sys/block"),
            dir.path().join("dev"),
            proc_root,
            etc_root,
        );
        assert_eq!(hal.hostname().unwrap().as_deref(), Some("forge-station"));
        assert!(hal.proc_meminfo().unwrap().contains("MemTotal"));
        assert_eq!(hal.os_release().unwrap().id.as_deref(), Some("fedora"));
        assert_eq!(hal.kernel_release().unwrap(), None);
    }
}
