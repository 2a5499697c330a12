//! HAL trait definitions and implementations.
//!
//! This module defines the core traits for block-device and host-info access
//! and provides both real (LinuxHal) and fake (FakeHal) implementations.

pub mod block_ops;
pub mod fake_hal;
pub mod host_info_ops;
pub mod linux_hal;

pub use block_ops::{BlockHandle, BlockOps};
pub use fake_hal::{FakeDevice, FakeHal, Operation};
pub use host_info_ops::{HostInfoOps, OsReleaseInfo};
pub use linux_hal::LinuxHal;
