//! Candidate target devices.

use crate::errors::FlashError;
use bootforge_hal::{path as devpath, procfs, BlockDeviceInfo, FlashHal};
use log::debug;
use std::sync::Arc;

/// One candidate target, classified for the safety guard.
///
/// Built fresh on every listing and never cached across flashes: devices get
/// unplugged, so external device state is always authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Stable platform identifier (the `/dev` path).
    pub id: String,
    pub size_bytes: u64,
    pub label: String,
    pub is_removable: bool,
    /// Whether this device hosts the running operating system. Advisory input
    /// to the safety guard, not a substitute for it.
    pub is_system_volume: bool,
}

pub struct DeviceEnumerator {
    hal: Arc<dyn FlashHal>,
}

impl DeviceEnumerator {
    pub fn new(hal: Arc<dyn FlashHal>) -> Self {
        Self { hal }
    }

    /// Point-in-time snapshot of candidate devices. Two calls yield
    /// independent results.
    pub fn list(&self) -> Result<Vec<Device>, FlashError> {
        let infos = self
            .hal
            .scan_block_devices()
            .map_err(|err| FlashError::Enumeration(err.to_string()))?;
        let mountinfo = self
            .hal
            .proc_mountinfo()
            .map_err(|err| FlashError::Enumeration(format!("cannot read mount table: {err}")))?;
        let system_base = procfs::mountinfo::root_mount_source(&mountinfo)
            .and_then(|source| devpath::base_block_device(&source));
        debug!("system volume resolved to {:?}", system_base);

        Ok(infos
            .into_iter()
            .filter(|info| !info.read_only)
            .map(|info| {
                let id = info.dev_path.display().to_string();
                let is_system_volume = system_base.as_deref() == Some(id.as_str());
                Device {
                    label: label_for(&info),
                    size_bytes: info.size_bytes,
                    is_removable: info.removable,
                    is_system_volume,
                    id,
                }
            })
            .collect())
    }

    /// Re-resolve a device id to a fresh `Device`. Stale caller-held `Device`
    /// values are never trusted for destructive operations.
    pub fn resolve(&self, device_id: &str) -> Result<Device, FlashError> {
        self.list()?
            .into_iter()
            .find(|device| device.id == device_id)
            .ok_or_else(|| {
                FlashError::Enumeration(format!("device {device_id} is no longer present"))
            })
    }
}

fn label_for(info: &BlockDeviceInfo) -> String {
    match (&info.vendor, &info.model) {
        (Some(vendor), Some(model)) => format!("{} {}", vendor, model),
        (Some(vendor), None) => vendor.clone(),
        (None, Some(model)) => model.clone(),
        (None, None) => info.name.clone(),
    }
}
