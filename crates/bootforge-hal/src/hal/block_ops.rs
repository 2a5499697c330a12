//! Raw block-device access.

use crate::sysfs::block::BlockDeviceInfo;
use crate::HalResult;
use std::fmt::Debug;
use std::io::{Read, Seek, Write};
use std::path::Path;

/// An exclusively-owned raw handle onto one block device (or a regular file
/// standing in for one in tests and CI).
///
/// A flash session writes sequentially from offset zero, flushes, then seeks
/// back and re-reads the written region for verification. The handle is owned
/// by exactly one session for its whole lifetime.
pub trait BlockHandle: Read + Write + Seek + Send + Debug {
    /// Flush so written data has reached the device, not just the page cache.
    fn flush_device(&mut self) -> HalResult<()>;

    /// Device capacity in bytes.
    fn capacity_bytes(&mut self) -> HalResult<u64>;
}

/// Block-device discovery and access.
pub trait BlockOps {
    /// Fresh snapshot of the machine's block devices.
    ///
    /// Never cached: external device state is authoritative, so each call
    /// re-reads the platform's device inventory.
    fn scan_block_devices(&self) -> HalResult<Vec<BlockDeviceInfo>>;

    /// Open a raw, exclusive read/write handle onto a device.
    fn open_block_device(&self, dev_path: &Path) -> HalResult<Box<dyn BlockHandle>>;
}
