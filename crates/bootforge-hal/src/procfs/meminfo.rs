//! Parsing helpers for `/proc/meminfo`.

fn parse_kb_field(meminfo: &str, field: &str) -> Option<u64> {
    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix(field) {
            return rest.split_whitespace().next()?.parse::<u64>().ok();
        }
    }
    None
}

pub fn parse_mem_total_kb(meminfo: &str) -> Option<u64> {
    parse_kb_field(meminfo, "MemTotal:")
}

pub fn parse_mem_available_kb(meminfo: &str) -> Option<u64> {
    parse_kb_field(meminfo, "MemAvailable:")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "MemTotal:        8028424 kB\n\
                          MemFree:          512340 kB\n\
                          MemAvailable:    4196032 kB\n";

    #[test]
    fn parses_total_and_available() {
        assert_eq!(parse_mem_total_kb(SAMPLE), Some(8028424));
        assert_eq!(parse_mem_available_kb(SAMPLE), Some(4196032));
    }

    #[test]
    fn missing_fields_yield_none() {
        assert_eq!(parse_mem_available_kb("MemTotal: 1 kB\n"), None);
    }
}
