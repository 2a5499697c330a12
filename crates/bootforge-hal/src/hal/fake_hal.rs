//! In-memory HAL for tests.
//!
//! `FakeHal` simulates a small machine: a set of block devices backed by
//! byte buffers, plus canned `/proc` and os-release content. Devices can be
//! configured to fail writes partway through or to corrupt read-back data,
//! which is how the engine's failure paths are exercised without hardware.

use crate::hal::block_ops::{BlockHandle, BlockOps};
use crate::hal::host_info_ops::{HostInfoOps, OsReleaseInfo};
use crate::sysfs::block::BlockDeviceInfo;
use crate::{HalError, HalResult};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Recorded HAL calls, for asserting on side effects in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ScanBlockDevices,
    OpenBlockDevice { dev_path: PathBuf },
}

/// One simulated block device.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    info: BlockDeviceInfo,
    data: Arc<Mutex<Vec<u8>>>,
    fail_write_after: Option<u64>,
    corrupt_read_at: Option<u64>,
}

impl FakeDevice {
    /// A removable device named `/dev/<name>`, zero-filled.
    pub fn removable(name: &str, size_bytes: u64) -> Self {
        Self::build(name, size_bytes, true)
    }

    /// A fixed (internal) device named `/dev/<name>`, zero-filled.
    pub fn fixed(name: &str, size_bytes: u64) -> Self {
        Self::build(name, size_bytes, false)
    }

    fn build(name: &str, size_bytes: u64, removable: bool) -> Self {
        Self {
            info: BlockDeviceInfo {
                name: name.to_string(),
                dev_path: PathBuf::from("/dev").join(name),
                size_bytes,
                vendor: Some("Fake".to_string()),
                model: Some("Flash Disk".to_string()),
                serial: None,
                removable,
                read_only: false,
            },
            data: Arc::new(Mutex::new(vec![0u8; size_bytes as usize])),
            fail_write_after: None,
            corrupt_read_at: None,
        }
    }

    /// Fail any write that would push the running total past `bytes`.
    pub fn with_fail_write_after(mut self, bytes: u64) -> Self {
        self.fail_write_after = Some(bytes);
        self
    }

    /// Flip one bit at `offset` in read-back data (device contents stay
    /// intact, simulating a marginal medium that reads back wrong).
    pub fn with_corrupt_read_at(mut self, offset: u64) -> Self {
        self.corrupt_read_at = Some(offset);
        self
    }

    pub fn dev_path(&self) -> &Path {
        &self.info.dev_path
    }
}

/// HAL over simulated devices and canned host info.
pub struct FakeHal {
    devices: Mutex<Vec<FakeDevice>>,
    mountinfo: Mutex<String>,
    meminfo: String,
    cpuinfo: String,
    os_release: OsReleaseInfo,
    operations: Mutex<Vec<Operation>>,
}

impl Default for FakeHal {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHal {
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(Vec::new()),
            // The simulated machine boots from an internal NVMe drive.
            mountinfo: Mutex::new(
                "36 28 0:31 / / rw,relatime - ext4 /dev/nvme0n1p2 rw\n\
                 37 28 0:32 / /boot rw,relatime - ext4 /dev/nvme0n1p1 rw\n"
                    .to_string(),
            ),
            meminfo: "MemTotal:        8028424 kB\nMemAvailable:    4196032 kB\n".to_string(),
            cpuinfo: "model name\t: Fake Octane 3000\n".to_string(),
            os_release: OsReleaseInfo {
                id: Some("fedora".to_string()),
                version_id: Some("43".to_string()),
                pretty_name: Some("Fedora Linux 43".to_string()),
            },
            operations: Mutex::new(Vec::new()),
        }
    }

    pub fn add_device(&self, device: FakeDevice) {
        if let Ok(mut devices) = self.devices.lock() {
            devices.push(device);
        }
    }

    /// Replace the canned mountinfo content.
    pub fn set_mountinfo(&self, content: impl Into<String>) {
        if let Ok(mut mountinfo) = self.mountinfo.lock() {
            *mountinfo = content.into();
        }
    }

    /// Current contents of a simulated device.
    pub fn device_contents(&self, name: &str) -> Option<Vec<u8>> {
        let devices = self.devices.lock().ok()?;
        let device = devices.iter().find(|d| d.info.name == name)?;
        let data = device.data.lock().ok()?;
        Some(data.clone())
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.operations
            .lock()
            .map(|ops| ops.clone())
            .unwrap_or_default()
    }

    fn record(&self, op: Operation) {
        if let Ok(mut ops) = self.operations.lock() {
            ops.push(op);
        }
    }
}

impl BlockOps for FakeHal {
    fn scan_block_devices(&self) -> HalResult<Vec<BlockDeviceInfo>> {
        self.record(Operation::ScanBlockDevices);
        let devices = self
            .devices
            .lock()
            .map_err(|_| HalError::Other("fake device table poisoned".to_string()))?;
        Ok(devices.iter().map(|d| d.info.clone()).collect())
    }

    fn open_block_device(&self, dev_path: &Path) -> HalResult<Box<dyn BlockHandle>> {
        self.record(Operation::OpenBlockDevice {
            dev_path: dev_path.to_path_buf(),
        });
        let devices = self
            .devices
            .lock()
            .map_err(|_| HalError::Other("fake device table poisoned".to_string()))?;
        let device = devices
            .iter()
            .find(|d| d.info.dev_path == dev_path)
            .ok_or_else(|| HalError::DeviceNotFound(dev_path.display().to_string()))?;
        Ok(Box::new(FakeBlockHandle {
            data: Arc::clone(&device.data),
            capacity: device.info.size_bytes,
            pos: 0,
            written: 0,
            fail_write_after: device.fail_write_after,
            corrupt_read_at: device.corrupt_read_at,
        }))
    }
}

#[derive(Debug)]
struct FakeBlockHandle {
    data: Arc<Mutex<Vec<u8>>>,
    capacity: u64,
    pos: u64,
    written: u64,
    fail_write_after: Option<u64>,
    corrupt_read_at: Option<u64>,
}

impl Read for FakeBlockHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self
            .data
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "fake device poisoned"))?;
        let start = self.pos.min(data.len() as u64) as usize;
        let end = (start + buf.len()).min(data.len());
        let n = end - start;
        buf[..n].copy_from_slice(&data[start..end]);
        drop(data);

        if let Some(offset) = self.corrupt_read_at {
            if offset >= self.pos && offset < self.pos + n as u64 {
                let idx = (offset - self.pos) as usize;
                buf[idx] ^= 0x01;
            }
        }
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for FakeBlockHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(limit) = self.fail_write_after {
            if self.written + buf.len() as u64 > limit {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "simulated device I/O failure",
                ));
            }
        }
        if self.pos + buf.len() as u64 > self.capacity {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "no space left on simulated device",
            ));
        }
        let mut data = self
            .data
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "fake device poisoned"))?;
        let start = self.pos as usize;
        data[start..start + buf.len()].copy_from_slice(buf);
        self.pos += buf.len() as u64;
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for FakeBlockHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.capacity as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of device",
            ));
        }
        self.pos = new_pos as u64;
        Ok(self.pos)
    }
}

impl BlockHandle for FakeBlockHandle {
    fn flush_device(&mut self) -> HalResult<()> {
        Ok(())
    }

    fn capacity_bytes(&mut self) -> HalResult<u64> {
        Ok(self.capacity)
    }
}

impl HostInfoOps for FakeHal {
    fn hostname(&self) -> HalResult<Option<String>> {
        Ok(Some("fake-host".to_string()))
    }

    fn kernel_release(&self) -> HalResult<Option<String>> {
        Ok(Some("6.9.0-fake".to_string()))
    }

    fn os_release(&self) -> HalResult<OsReleaseInfo> {
        Ok(self.os_release.clone())
    }

    fn proc_cpuinfo(&self) -> HalResult<String> {
        Ok(self.cpuinfo.clone())
    }

    fn proc_meminfo(&self) -> HalResult<String> {
        Ok(self.meminfo.clone())
    }

    fn proc_mountinfo(&self) -> HalResult<String> {
        self.mountinfo
            .lock()
            .map(|m| m.clone())
            .map_err(|_| HalError::Other("fake mountinfo poisoned".to_string()))
    }
}
