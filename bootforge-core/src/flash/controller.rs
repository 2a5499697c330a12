//! Flash orchestration facade.
//!
//! The controller is what UIs and the CLI call. It never trusts caller-held
//! `Device` values: every flash re-resolves the device id, re-runs the safety
//! guard, and only then opens the raw handle and drives a session.

use crate::device::Device;
use crate::device::DeviceEnumerator;
use crate::errors::FlashError;
use crate::flash::audit::{AuditEntry, AuditLog};
use crate::flash::cancel::CancelHandle;
use crate::flash::safety::{ConfirmationToken, SafetyGuard};
use crate::flash::session::{FlashResult, WriteSession, DEFAULT_CHUNK_SIZE};
use crate::image::{ImageDescriptor, ImageHandle};
use crate::progress::ProgressSender;
use bootforge_hal::{FlashHal, HalError};
use log::info;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Everything one flash needs, spelled out explicitly.
pub struct FlashRequest {
    pub device_id: String,
    pub image: ImageDescriptor,
    pub token: ConfirmationToken,
    pub chunk_size: usize,
    pub progress_tx: Option<ProgressSender>,
    pub cancel: CancelHandle,
}

impl FlashRequest {
    pub fn new(
        device_id: impl Into<String>,
        image: ImageDescriptor,
        token: ConfirmationToken,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            image,
            token,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_tx: None,
            cancel: CancelHandle::new(),
        }
    }
}

pub struct FlashController {
    hal: Arc<dyn FlashHal>,
    enumerator: DeviceEnumerator,
    guard: SafetyGuard,
    audit: Arc<AuditLog>,
    active: Arc<Mutex<HashSet<String>>>,
    next_session_id: AtomicU64,
}

impl FlashController {
    pub fn new(hal: Arc<dyn FlashHal>) -> Self {
        Self {
            enumerator: DeviceEnumerator::new(Arc::clone(&hal)),
            guard: SafetyGuard::new(Arc::clone(&hal)),
            hal,
            audit: Arc::new(AuditLog::new()),
            active: Arc::new(Mutex::new(HashSet::new())),
            next_session_id: AtomicU64::new(0),
        }
    }

    pub fn audit_log(&self) -> Arc<AuditLog> {
        Arc::clone(&self.audit)
    }

    /// Run one flash to its terminal state on the calling thread.
    ///
    /// Callers wanting concurrency give each device its own thread; sessions
    /// on distinct devices run independently. A second start on a device with
    /// a live session fails fast with `DeviceBusy` instead of queueing.
    /// Pre-flight failures return `Err` before any destructive action; once
    /// the session starts, failures surface through the terminal
    /// [`FlashResult`].
    pub fn start_flash(&self, request: FlashRequest) -> Result<FlashResult, FlashError> {
        let FlashRequest {
            device_id,
            image,
            token,
            chunk_size,
            progress_tx,
            cancel,
        } = request;

        let _slot = ActiveSlot::acquire(&self.active, &device_id)?;

        let device = self.enumerator.resolve(&device_id)?;
        let image_handle = ImageHandle::open(&image)?;
        let certification = self
            .guard
            .check(&device, image_handle.size_bytes(), token)?;
        let device_handle = self
            .hal
            .open_block_device(Path::new(&device.id))
            .map_err(|err| open_error(&device, err))?;

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "🚀 Starting session {} on {} ({})",
            session_id, device.id, device.label
        );
        let session = WriteSession::new(session_id, device, chunk_size, cancel, progress_tx);
        let result = session.run(image_handle, device_handle, certification);

        self.audit.append(AuditEntry::from_result(&result, &image));
        Ok(result)
    }
}

fn open_error(device: &Device, err: HalError) -> FlashError {
    match err {
        HalError::DeviceNotFound(_) => {
            FlashError::Enumeration(format!("device {} is no longer present", device.id))
        }
        HalError::DeviceBusy(_) => FlashError::UnsafeTarget {
            device: device.id.clone(),
            reason: "device is busy (mounted or in use)".to_string(),
        },
        HalError::Io(err) => FlashError::WriteIo {
            offset: 0,
            source: err,
        },
        other => FlashError::WriteIo {
            offset: 0,
            source: io::Error::new(io::ErrorKind::Other, other.to_string()),
        },
    }
}

/// Slot in the per-device lock table.
///
/// The table mutex is held only for the check-and-insert / remove, never
/// across the write itself.
struct ActiveSlot {
    table: Arc<Mutex<HashSet<String>>>,
    device_id: String,
}

impl ActiveSlot {
    fn acquire(table: &Arc<Mutex<HashSet<String>>>, device_id: &str) -> Result<Self, FlashError> {
        let mut slots = table
            .lock()
            .map_err(|_| FlashError::DeviceBusy(device_id.to_string()))?;
        if !slots.insert(device_id.to_string()) {
            return Err(FlashError::DeviceBusy(device_id.to_string()));
        }
        drop(slots);
        Ok(Self {
            table: Arc::clone(table),
            device_id: device_id.to_string(),
        })
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        if let Ok(mut slots) = self.table.lock() {
            slots.remove(&self.device_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageDescriptor;
    use bootforge_hal::FakeHal;
    use std::path::PathBuf;

    #[test]
    fn active_slot_is_released_on_drop() {
        let table = Arc::new(Mutex::new(HashSet::new()));
        {
            let _slot = ActiveSlot::acquire(&table, "/dev/sdb").unwrap();
            assert!(matches!(
                ActiveSlot::acquire(&table, "/dev/sdb"),
                Err(FlashError::DeviceBusy(_))
            ));
            // A different device is unaffected.
            let _other = ActiveSlot::acquire(&table, "/dev/sdc").unwrap();
        }
        assert!(ActiveSlot::acquire(&table, "/dev/sdb").is_ok());
    }

    #[test]
    fn failed_preflight_releases_the_device_slot() {
        let controller = FlashController::new(Arc::new(FakeHal::new()));
        let request = || {
            FlashRequest::new(
                "/dev/sdq",
                ImageDescriptor::File(PathBuf::from("/nonexistent.img")),
                ConfirmationToken::for_device("/dev/sdq"),
            )
        };
        // Device does not exist: enumeration error, not DeviceBusy, and the
        // slot must be free again for the retry.
        assert!(matches!(
            controller.start_flash(request()),
            Err(FlashError::Enumeration(_))
        ));
        assert!(matches!(
            controller.start_flash(request()),
            Err(FlashError::Enumeration(_))
        ));
    }
}
