//! Engine error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlashError {
    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    #[error("Image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("Image unreadable: {}: {source}", .path.display())]
    ImageUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Image size unknown: {} is not a regular file", .0.display())]
    SizeUnknown(PathBuf),

    #[error("Unsafe target {device}: {reason}")]
    UnsafeTarget { device: String, reason: String },

    #[error("Insufficient space on {device}: {device_bytes} bytes available, image needs {image_bytes}")]
    InsufficientSpace {
        device: String,
        device_bytes: u64,
        image_bytes: u64,
    },

    #[error("Confirmation does not name the target device (expected {expected}, got {confirmed})")]
    Unconfirmed { expected: String, confirmed: String },

    #[error("Device {0} already has an active flash session")]
    DeviceBusy(String),

    #[error("Write failed at byte {offset}: {source}")]
    WriteIo {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("Verification failed: device contents diverge from image ({bytes_compared} bytes compared)")]
    Verification { bytes_compared: u64 },
}
