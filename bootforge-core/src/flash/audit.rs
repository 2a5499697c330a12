//! Append-only audit records for completed sessions.
//!
//! The engine only produces the in-memory record; persistence (line-delimited
//! JSON, a database, whatever the collaborator wants) happens outside.

use crate::flash::session::{FlashOutcome, FlashResult};
use crate::image::ImageDescriptor;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp_unix_ms: u64,
    pub session_id: u64,
    pub device_id: String,
    pub image: String,
    pub outcome: FlashOutcome,
    pub bytes_written: u64,
}

impl AuditEntry {
    pub fn from_result(result: &FlashResult, image: &ImageDescriptor) -> Self {
        Self {
            timestamp_unix_ms: now_unix_ms(),
            session_id: result.session_id,
            device_id: result.device_id.clone(),
            image: image.to_string(),
            outcome: result.outcome,
            bytes_written: result.bytes_written,
        }
    }
}

/// In-memory append-only log. Entries are never mutated or removed.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, entry: AuditEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    /// Copy of the log, oldest first.
    pub fn snapshot(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(session_id: u64) -> AuditEntry {
        AuditEntry {
            timestamp_unix_ms: 1_700_000_000_000 + session_id,
            session_id,
            device_id: "/dev/sdb".to_string(),
            image: "file:/images/fedora.img".to_string(),
            outcome: FlashOutcome::Succeeded,
            bytes_written: 4096,
        }
    }

    #[test]
    fn append_preserves_order() {
        let log = AuditLog::new();
        log.append(entry(1));
        log.append(entry(2));
        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].session_id, 1);
        assert_eq!(snapshot[1].session_id, 2);
    }

    #[test]
    fn entries_serialize_as_single_json_lines() {
        let line = serde_json::to_string(&entry(3)).unwrap();
        assert!(!line.contains('\n'));
        let back: AuditEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(back, entry(3));
    }
}
