//! BootForge hardware abstraction layer (HAL).
//!
//! Everything "world-touching" lives here: sysfs block-device scans, `/proc`
//! parsing, `/etc/os-release`, and raw block-device handles. The flash engine
//! only talks to the traits in this crate, so it runs against [`LinuxHal`] in
//! production and [`FakeHal`] in tests.

mod error;
pub mod hal;
pub mod os_release;
pub mod path;
pub mod procfs;
pub mod sysfs;

pub use error::{HalError, HalResult};
pub use hal::block_ops::{BlockHandle, BlockOps};
pub use hal::fake_hal::{FakeDevice, FakeHal, Operation};
pub use hal::host_info_ops::{HostInfoOps, OsReleaseInfo};
pub use hal::linux_hal::LinuxHal;
pub use sysfs::block::BlockDeviceInfo;

/// Complete HAL as seen by the flash engine.
pub trait FlashHal: BlockOps + HostInfoOps + Send + Sync {}

/// Automatically implement FlashHal for any type implementing the required traits.
impl<T> FlashHal for T where T: BlockOps + HostInfoOps + Send + Sync {}
