//! Progress and state events emitted by write sessions.

use std::fmt;
use std::sync::mpsc::SyncSender;

/// Write-session lifecycle.
///
/// `Pending -> Writing -> Verifying -> {Succeeded, Failed, Cancelled}`.
/// Terminal states are final; a finished session cannot be restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Writing,
    Verifying,
    Succeeded,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Succeeded | SessionState::Failed | SessionState::Cancelled
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Pending => "Pending",
            SessionState::Writing => "Writing",
            SessionState::Verifying => "Verifying",
            SessionState::Succeeded => "Succeeded",
            SessionState::Failed => "Failed",
            SessionState::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One progress update for one session.
///
/// Delivery is FIFO per session; `bytes_written` never regresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub session_id: u64,
    pub bytes_written: u64,
    pub total_bytes: u64,
    pub state: SessionState,
}

impl ProgressEvent {
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            100.0
        } else {
            (self.bytes_written as f64 / self.total_bytes as f64) * 100.0
        }
    }
}

pub type ProgressSender = SyncSender<ProgressEvent>;
