//! Block-device path helpers.

/// Reduce a device path to its whole-disk base device.
///
/// `/dev/sda1` -> `/dev/sda`, `/dev/nvme0n1p2` -> `/dev/nvme0n1`,
/// `/dev/mmcblk0p1` -> `/dev/mmcblk0`. Returns `None` for non-`/dev` paths.
pub fn base_block_device(device: &str) -> Option<String> {
    if !device.starts_with("/dev/") {
        return None;
    }
    let name = device.trim_start_matches("/dev/");
    let base = if name.starts_with("nvme") || name.starts_with("mmcblk") || name.starts_with("loop")
    {
        if let Some(idx) = name.rfind('p') {
            let suffix = &name[idx + 1..];
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
                name[..idx].to_string()
            } else {
                name.to_string()
            }
        } else {
            name.to_string()
        }
    } else {
        let trimmed = name.trim_end_matches(|c: char| c.is_ascii_digit());
        if trimmed.is_empty() {
            name.to_string()
        } else {
            trimmed.to_string()
        }
    };
    Some(format!("/dev/{}", base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scsi_partition_reduces_to_disk() {
        assert_eq!(base_block_device("/dev/sda1"), Some("/dev/sda".to_string()));
        assert_eq!(base_block_device("/dev/sdb"), Some("/dev/sdb".to_string()));
    }

    #[test]
    fn nvme_and_mmc_partitions_reduce_to_disk() {
        assert_eq!(
            base_block_device("/dev/nvme0n1p2"),
            Some("/dev/nvme0n1".to_string())
        );
        assert_eq!(
            base_block_device("/dev/mmcblk0p1"),
            Some("/dev/mmcblk0".to_string())
        );
    }

    #[test]
    fn non_dev_paths_are_rejected() {
        assert_eq!(base_block_device("sda1"), None);
    }
}
