use bootforge_core::flash::{AuditEntry, FlashOutcome};
use bootforge_installer::history;
use tempfile::tempdir;

fn entry(session_id: u64, outcome: FlashOutcome) -> AuditEntry {
    AuditEntry {
        timestamp_unix_ms: 1_700_000_000_000 + session_id,
        session_id,
        device_id: "/dev/sdb".to_string(),
        image: "file:/images/fedora.img".to_string(),
        outcome,
        bytes_written: 1024 * session_id,
    }
}

#[test]
fn append_then_load_round_trips_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.jsonl");

    history::append(&path, &entry(1, FlashOutcome::Succeeded)).unwrap();
    history::append(&path, &entry(2, FlashOutcome::Cancelled)).unwrap();

    let entries = history::load(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], entry(1, FlashOutcome::Succeeded));
    assert_eq!(entries[1], entry(2, FlashOutcome::Cancelled));
}

#[test]
fn append_creates_missing_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state/logs/history.jsonl");
    history::append(&path, &entry(1, FlashOutcome::Succeeded)).unwrap();
    assert_eq!(history::load(&path).unwrap().len(), 1);
}

#[test]
fn missing_file_loads_as_empty_history() {
    let dir = tempdir().unwrap();
    let entries = history::load(&dir.path().join("absent.jsonl")).unwrap();
    assert!(entries.is_empty());
}

#[test]
fn corrupt_lines_are_reported_with_position() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    history::append(&path, &entry(1, FlashOutcome::Succeeded)).unwrap();
    std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .and_then(|mut f| std::io::Write::write_all(&mut f, b"not json\n"))
        .unwrap();

    let err = history::load(&path).unwrap_err();
    assert!(err.to_string().contains(":2"));
}
