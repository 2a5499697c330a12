//! Logging initialization.

use std::fs;
use std::path::PathBuf;

/// Initialize logging, appending to `log_file` when given and writable,
/// otherwise to stderr. Safe to call more than once (later calls are no-ops),
/// which keeps tests simple.
pub fn init_with(log_file: Option<PathBuf>) {
    use env_logger::Target;

    let target = log_file
        .and_then(|path| {
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .ok()
                .map(|file| Target::Pipe(Box::new(file)))
        })
        .unwrap_or(Target::Stderr);

    let _ = env_logger::Builder::from_default_env()
        .target(target)
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
