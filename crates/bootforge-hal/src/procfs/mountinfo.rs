//! Parsing helpers for `/proc/self/mountinfo`.

use std::path::Path;

/// One parsed mountinfo line (the fields the engine cares about).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub mount_point: String,
    pub source: String,
}

/// Parse mountinfo content into entries.
///
/// Format per line: `<id> <parent> <maj:min> <root> <mount point> <opts...> - <fstype> <source> <superopts>`.
pub fn parse_mountinfo(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let (pre, post) = line.split_once(" - ")?;
            let mount_point = pre.split_whitespace().nth(4)?;
            let source = post.split_whitespace().nth(1)?;
            Some(MountEntry {
                mount_point: unescape_mount_path(mount_point),
                source: source.to_string(),
            })
        })
        .collect()
}

/// Mount points whose source device sits on `dev_path` (the whole disk or any
/// of its partitions).
pub fn mounted_under_device(mountinfo: &str, dev_path: &Path) -> Vec<String> {
    let prefix = dev_path.to_string_lossy().to_string();
    let mut mounts: Vec<String> = parse_mountinfo(mountinfo)
        .into_iter()
        .filter(|entry| entry.source.starts_with(&prefix))
        .map(|entry| entry.mount_point)
        .collect();
    mounts.sort();
    mounts.dedup();
    mounts
}

/// The source device of the `/` mount, if mountinfo reports one.
pub fn root_mount_source(mountinfo: &str) -> Option<String> {
    parse_mountinfo(mountinfo)
        .into_iter()
        .find(|entry| entry.mount_point == "/")
        .map(|entry| entry.source)
}

pub fn unescape_mount_path(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}
