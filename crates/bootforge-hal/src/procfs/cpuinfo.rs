//! Parsing helpers for `/proc/cpuinfo`.

/// Best-effort CPU model string. x86 exposes `model name`; ARM boards often
/// only expose `Hardware` or `Processor`.
pub fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    for line in cpuinfo.lines() {
        let lower = line.to_ascii_lowercase();
        if let Some(v) = line.split_once(':').map(|(_, v)| v.trim()) {
            if (lower.starts_with("model name")
                || lower.starts_with("hardware")
                || lower.starts_with("processor"))
                && !v.is_empty()
            {
                return Some(v.to_string());
            }
        }
    }
    None
}
