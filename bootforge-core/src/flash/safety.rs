//! Pre-flight certification for destructive writes.
//!
//! Safety invariants are encoded in types: a write session will not start
//! without a [`CertificationToken`], only [`SafetyGuard::check`] can mint
//! one, and it is consumed by the session. Certification is never cached;
//! device state can change between listing and flashing, so every flash
//! re-certifies within the same call.

use crate::device::Device;
use crate::errors::FlashError;
use bootforge_hal::{procfs, FlashHal};
use log::info;
use std::path::Path;
use std::sync::Arc;

/// Caller-supplied proof that a human confirmed this exact device.
///
/// Single-use: moved into [`SafetyGuard::check`], never cloned. Binding the
/// token to one device id prevents a stale confirmation from an earlier
/// listing being applied to a different device after re-enumeration.
#[derive(Debug)]
pub struct ConfirmationToken {
    device_id: String,
}

impl ConfirmationToken {
    pub fn for_device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

/// Proof that the guard certified a device within the current call.
/// Not constructible outside this module; consumed by `WriteSession::run`.
#[derive(Debug)]
pub struct CertificationToken {
    device_id: String,
}

impl CertificationToken {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

pub struct SafetyGuard {
    hal: Arc<dyn FlashHal>,
}

impl SafetyGuard {
    pub fn new(hal: Arc<dyn FlashHal>) -> Self {
        Self { hal }
    }

    /// Gate a destructive write. Rules in order, all must pass:
    ///
    /// 1. the device does not host the running operating system and has no
    ///    mounted filesystems;
    /// 2. the device is large enough for the image;
    /// 3. the confirmation token names exactly this device.
    pub fn check(
        &self,
        device: &Device,
        image_bytes: u64,
        token: ConfirmationToken,
    ) -> Result<CertificationToken, FlashError> {
        if device.is_system_volume {
            return Err(FlashError::UnsafeTarget {
                device: device.id.clone(),
                reason: "hosts the running operating system".to_string(),
            });
        }

        let mountinfo = self.hal.proc_mountinfo().map_err(|err| {
            // Fail safe: if mounts cannot be inspected, the target is not
            // certifiable.
            FlashError::UnsafeTarget {
                device: device.id.clone(),
                reason: format!("cannot inspect mount table: {err}"),
            }
        })?;
        let mounted = procfs::mountinfo::mounted_under_device(&mountinfo, Path::new(&device.id));
        if !mounted.is_empty() {
            return Err(FlashError::UnsafeTarget {
                device: device.id.clone(),
                reason: format!("has mounted filesystems: {}", mounted.join(", ")),
            });
        }

        if device.size_bytes < image_bytes {
            return Err(FlashError::InsufficientSpace {
                device: device.id.clone(),
                device_bytes: device.size_bytes,
                image_bytes,
            });
        }

        if token.device_id() != device.id {
            return Err(FlashError::Unconfirmed {
                expected: device.id.clone(),
                confirmed: token.device_id().to_string(),
            });
        }

        info!(
            "🔒 Certified {} for writing ({} bytes)",
            device.id, image_bytes
        );
        Ok(CertificationToken {
            device_id: device.id.clone(),
        })
    }
}
