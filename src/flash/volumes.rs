//! Snapshots of the volumes mounted on the host.

use std::{collections::BTreeSet, path::PathBuf};

use crate::Result;

/// A set of mount points, compared between two snapshots to spot the volume
/// a keypad exposes once it is in bootloader mode.
pub type VolumeSet = BTreeSet<PathBuf>;

/// Lists the volumes currently mounted.
pub trait VolumeSource {
    fn snapshot(&self) -> Result<VolumeSet>;
}

/// The volumes of the running system: mount points from `/proc/mounts` on
/// Linux, entries of `/Volumes` on macOS, drive roots on Windows.
#[derive(Debug, Default, Copy, Clone)]
pub struct MountedVolumes;

impl VolumeSource for MountedVolumes {
    #[cfg(target_os = "linux")]
    fn snapshot(&self) -> Result<VolumeSet> {
        let mounts = std::fs::read_to_string("/proc/mounts")?;
        Ok(parse_mounts(&mounts))
    }

    #[cfg(target_os = "macos")]
    fn snapshot(&self) -> Result<VolumeSet> {
        let mut volumes = VolumeSet::new();
        for entry in std::fs::read_dir("/Volumes")? {
            volumes.insert(entry?.path());
        }
        Ok(volumes)
    }

    #[cfg(windows)]
    fn snapshot(&self) -> Result<VolumeSet> {
        Ok((b'A'..=b'Z')
            .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
            .filter(|root| root.exists())
            .collect())
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
    fn snapshot(&self) -> Result<VolumeSet> {
        Ok(VolumeSet::new())
    }
}

/// Extracts the mount points (second column) of a `/proc/mounts` table,
/// decoding the octal escapes used for blanks.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) fn parse_mounts(table: &str) -> VolumeSet {
    table
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(|mount_point| PathBuf::from(unescape(mount_point)))
        .collect()
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn unescape(field: &str) -> String {
    field
        .replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

// =============================================================================
// Unit Tests
// =============================================================================
