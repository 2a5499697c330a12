//! The write session state machine.
//!
//! One session owns one device handle for its whole lifetime and drives it
//! `Pending -> Writing -> Verifying -> {Succeeded, Failed, Cancelled}`.
//! `run` consumes the session, so a finished session cannot be restarted;
//! retrying means re-enumerating, re-certifying and creating a new session.

use crate::device::Device;
use crate::errors::FlashError;
use crate::flash::cancel::CancelHandle;
use crate::flash::safety::CertificationToken;
use crate::image::ImageHandle;
use crate::progress::{ProgressEvent, ProgressSender, SessionState};
use bootforge_hal::{BlockHandle, HalError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Default write chunk size (1 MiB). Callers may override per request; the
/// right value depends on the medium, so it is never baked into the loop.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Number of chunks needed to cover `total_bytes`.
pub fn chunk_count(total_bytes: u64, chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    total_bytes.div_ceil(chunk_size as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

impl fmt::Display for FlashOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashOutcome::Succeeded => write!(f, "Succeeded"),
            FlashOutcome::Failed => write!(f, "Failed"),
            FlashOutcome::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Immutable record of one finished session. Produced exactly once.
#[derive(Debug)]
pub struct FlashResult {
    pub session_id: u64,
    pub device_id: String,
    pub outcome: FlashOutcome,
    pub bytes_written: u64,
    /// `Some(..)` only when verification ran to completion.
    pub checksum_match: Option<bool>,
    pub error_detail: Option<FlashError>,
}

impl FlashResult {
    pub fn is_success(&self) -> bool {
        self.outcome == FlashOutcome::Succeeded
    }
}

enum VerifyOutcome {
    Match,
    Mismatch,
    Cancelled,
}

pub struct WriteSession {
    session_id: u64,
    device: Device,
    chunk_size: usize,
    cancel: CancelHandle,
    progress_tx: Option<ProgressSender>,
    state: SessionState,
    bytes_written: u64,
    total_bytes: u64,
}

impl WriteSession {
    pub fn new(
        session_id: u64,
        device: Device,
        chunk_size: usize,
        cancel: CancelHandle,
        progress_tx: Option<ProgressSender>,
    ) -> Self {
        Self {
            session_id,
            device,
            chunk_size: if chunk_size == 0 {
                DEFAULT_CHUNK_SIZE
            } else {
                chunk_size
            },
            cancel,
            progress_tx,
            state: SessionState::Pending,
            bytes_written: 0,
            total_bytes: 0,
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to a terminal state.
    ///
    /// Requires a [`CertificationToken`] minted within the same control-flow
    /// call; consuming it here makes certified-then-written an invariant the
    /// compiler checks.
    pub fn run(
        mut self,
        mut image: ImageHandle,
        mut device_handle: Box<dyn BlockHandle>,
        certification: CertificationToken,
    ) -> FlashResult {
        self.total_bytes = image.size_bytes();
        if certification.device_id() != self.device.id {
            // Unreachable through FlashController; kept so a misuse still
            // yields exactly one terminal result instead of a silent write.
            let expected = self.device.id.clone();
            return self.finish(
                FlashOutcome::Failed,
                None,
                Some(FlashError::Unconfirmed {
                    expected,
                    confirmed: certification.device_id().to_string(),
                }),
            );
        }

        info!(
            "💾 Session {}: {} -> {} ({} bytes, {} chunks)",
            self.session_id,
            image.descriptor(),
            self.device.id,
            self.total_bytes,
            chunk_count(self.total_bytes, self.chunk_size)
        );
        self.set_state(SessionState::Writing);

        let mut digest = Sha256::new();
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            // Cooperative cancellation: observed between chunks only.
            if self.cancel.is_cancelled() {
                warn!(
                    "🛑 Session {}: cancelled after {} of {} bytes; device contents are incomplete",
                    self.session_id, self.bytes_written, self.total_bytes
                );
                return self.finish(FlashOutcome::Cancelled, None, None);
            }
            let n = match image.read_chunk(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => return self.finish(FlashOutcome::Failed, None, Some(err)),
            };
            if let Err(err) = device_handle.write_all(&buf[..n]) {
                let offset = self.bytes_written;
                return self.finish(
                    FlashOutcome::Failed,
                    None,
                    Some(FlashError::WriteIo {
                        offset,
                        source: err,
                    }),
                );
            }
            digest.update(&buf[..n]);
            self.bytes_written += n as u64;
            self.emit_progress();
        }

        if let Err(err) = device_handle.flush_device() {
            let offset = self.bytes_written;
            return self.finish(
                FlashOutcome::Failed,
                None,
                Some(FlashError::WriteIo {
                    offset,
                    source: hal_io(err),
                }),
            );
        }

        self.set_state(SessionState::Verifying);
        let expected = digest.finalize();
        match self.verify(&mut *device_handle, expected.as_slice()) {
            Ok(VerifyOutcome::Match) => {
                info!(
                    "✅ Session {}: verified {} bytes on {}",
                    self.session_id, self.bytes_written, self.device.id
                );
                self.finish(FlashOutcome::Succeeded, Some(true), None)
            }
            Ok(VerifyOutcome::Mismatch) => {
                let bytes_compared = self.bytes_written;
                self.finish(
                    FlashOutcome::Failed,
                    Some(false),
                    Some(FlashError::Verification { bytes_compared }),
                )
            }
            Ok(VerifyOutcome::Cancelled) => {
                warn!(
                    "🛑 Session {}: cancelled during verification; device contents are unverified",
                    self.session_id
                );
                self.finish(FlashOutcome::Cancelled, None, None)
            }
            Err(err) => self.finish(FlashOutcome::Failed, None, Some(err)),
        }
    }

    /// Re-read the written region and compare digests.
    fn verify(
        &mut self,
        device_handle: &mut dyn BlockHandle,
        expected: &[u8],
    ) -> Result<VerifyOutcome, FlashError> {
        device_handle
            .seek(SeekFrom::Start(0))
            .map_err(|err| FlashError::WriteIo {
                offset: 0,
                source: err,
            })?;

        let mut digest = Sha256::new();
        let mut remaining = self.bytes_written;
        let mut buf = vec![0u8; self.chunk_size];
        while remaining > 0 {
            if self.cancel.is_cancelled() {
                return Ok(VerifyOutcome::Cancelled);
            }
            let want = remaining.min(self.chunk_size as u64) as usize;
            device_handle
                .read_exact(&mut buf[..want])
                .map_err(|err| FlashError::WriteIo {
                    offset: self.bytes_written - remaining,
                    source: err,
                })?;
            digest.update(&buf[..want]);
            remaining -= want as u64;
        }
        Ok(if digest.finalize().as_slice() == expected {
            VerifyOutcome::Match
        } else {
            VerifyOutcome::Mismatch
        })
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.emit_progress();
    }

    fn emit_progress(&self) {
        if let Some(ref tx) = self.progress_tx {
            let _ = tx.send(ProgressEvent {
                session_id: self.session_id,
                bytes_written: self.bytes_written,
                total_bytes: self.total_bytes,
                state: self.state,
            });
        }
    }

    fn finish(
        mut self,
        outcome: FlashOutcome,
        checksum_match: Option<bool>,
        error_detail: Option<FlashError>,
    ) -> FlashResult {
        self.state = match outcome {
            FlashOutcome::Succeeded => SessionState::Succeeded,
            FlashOutcome::Failed => SessionState::Failed,
            FlashOutcome::Cancelled => SessionState::Cancelled,
        };
        self.emit_progress();
        if let Some(ref err) = error_detail {
            warn!("Session {}: {} ({})", self.session_id, outcome, err);
        }
        FlashResult {
            session_id: self.session_id,
            device_id: self.device.id,
            outcome,
            bytes_written: self.bytes_written,
            checksum_match,
            error_detail,
        }
    }
}

fn hal_io(err: HalError) -> io::Error {
    match err {
        HalError::Io(err) => err,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_matches_fixed_size_layouts() {
        // 4 GiB image, 1 MiB chunks.
        assert_eq!(chunk_count(4_294_967_296, 1_048_576), 4096);
        assert_eq!(chunk_count(10, 4), 3);
        assert_eq!(chunk_count(8, 4), 2);
        assert_eq!(chunk_count(0, 4), 0);
        assert_eq!(chunk_count(10, 0), 0);
    }

    #[test]
    fn new_sessions_start_pending_with_sane_chunk_size() {
        let device = Device {
            id: "/dev/sdb".to_string(),
            size_bytes: 1024,
            label: "stick".to_string(),
            is_removable: true,
            is_system_volume: false,
        };
        let session = WriteSession::new(7, device, 0, CancelHandle::new(), None);
        assert_eq!(session.session_id(), 7);
        assert_eq!(session.state(), SessionState::Pending);
    }
}
