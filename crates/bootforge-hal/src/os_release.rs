//! `/etc/os-release` parsing.

use crate::hal::host_info_ops::OsReleaseInfo;

pub fn parse_os_release(content: &str) -> OsReleaseInfo {
    let mut info = OsReleaseInfo {
        id: None,
        version_id: None,
        pretty_name: None,
    };
    for line in content.lines() {
        if let Some(v) = line.strip_prefix("ID=") {
            info.id = Some(unquote(v));
        } else if let Some(v) = line.strip_prefix("VERSION_ID=") {
            info.version_id = Some(unquote(v));
        } else if let Some(v) = line.strip_prefix("PRETTY_NAME=") {
            info.pretty_name = Some(unquote(v));
        }
    }
    info
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_fields() {
        let content = "NAME=\"Fedora Linux\"\nID=fedora\nVERSION_ID=43\nPRETTY_NAME=\"Fedora Linux 43 (KDE)\"\n";
        let info = parse_os_release(content);
        assert_eq!(info.id.as_deref(), Some("fedora"));
        assert_eq!(info.version_id.as_deref(), Some("43"));
        assert_eq!(info.pretty_name.as_deref(), Some("Fedora Linux 43 (KDE)"));
    }

    #[test]
    fn empty_content_yields_empty_info() {
        let info = parse_os_release("");
        assert!(info.id.is_none());
        assert!(info.pretty_name.is_none());
    }
}
