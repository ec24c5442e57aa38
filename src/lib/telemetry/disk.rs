//! Mounted-filesystem usage via `sysinfo`.

use serde::Serialize;
use sysinfo::{DiskExt, System, SystemExt};
use tracing::*;

use crate::helper::format;

/// Filesystem types matching any of these substrings are pseudo/virtual and
/// never reported.
const PSEUDO_FS_MARKERS: [&str; 7] = [
    "tmpfs", "proc", "sysfs", "devfs", "overlay", "squash", "ramfs",
];

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DiskPartition {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub used_fraction: f64,
}

/// Used fraction with a divide-by-zero guard. Zero-capacity volumes are
/// filtered before this point, but the guard stays.
pub fn used_fraction(total_bytes: u64, used_bytes: u64) -> f64 {
    if total_bytes == 0 {
        return 0.0;
    }
    used_bytes as f64 / total_bytes as f64
}

fn is_pseudo_fs(fs_type: &str) -> bool {
    PSEUDO_FS_MARKERS
        .iter()
        .any(|marker| fs_type.contains(marker))
}

/// Enumerate mounted, real filesystems with nonzero capacity.
pub fn partitions() -> Vec<DiskPartition> {
    let mut system = System::new();
    system.refresh_disks_list();
    system.refresh_disks();

    system
        .disks()
        .iter()
        .filter_map(|disk| {
            let fs_type = String::from_utf8_lossy(disk.file_system()).to_string();
            let total_bytes = disk.total_space();
            if total_bytes == 0 || is_pseudo_fs(&fs_type) {
                return None;
            }

            let used_bytes = total_bytes.saturating_sub(disk.available_space());
            Some(DiskPartition {
                device: disk.name().to_string_lossy().to_string(),
                mount_point: disk.mount_point().to_string_lossy().to_string(),
                fs_type,
                total_bytes,
                used_bytes,
                used_fraction: used_fraction(total_bytes, used_bytes),
            })
        })
        .collect()
}

/// Usage of the partition mounted at `/`, as `(fraction, detail string)`.
pub fn root_summary(partitions: &[DiskPartition]) -> Option<(f64, String)> {
    let root = partitions.iter().find(|partition| partition.mount_point == "/");
    let Some(root) = root else {
        warn!("Failed to fetch main disk info.");
        return None;
    };

    let detail = format!(
        "{} / {}",
        format::bytes_string(root.used_bytes),
        format::bytes_string(root.total_bytes)
    );
    Some((root.used_fraction, detail))
}
