//! Display backlight over sysfs.
//!
//! The device node is the first entry under the backlight class tree with a
//! readable `max_brightness`. Percent is the canonical unit; the raw value is
//! derived per write and never read back once set.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::*;

/// Default sysfs tree.
pub const BACKLIGHT_ROOT: &str = "/sys/class/backlight";

/// `bl_power` values: 0 unblanks, 4 (FB_BLANK_POWERDOWN) blanks.
const BL_POWER_ON: &str = "0";
const BL_POWER_OFF: &str = "4";

#[derive(Debug, Clone)]
pub struct Backlight {
    path: PathBuf,
    max_raw: u32,
}

/// Map a percent to the hardware range.
///
/// Rounds to nearest, then floors a nonzero request to raw 1: several panel
/// drivers blank entirely on raw 0, and a user asking for 1% still expects a
/// lit screen. An explicit 0% maps to raw 0.
pub fn percent_to_raw(percent: u8, max_raw: u32) -> u32 {
    let raw = (percent.min(100) as f64 / 100.0 * max_raw as f64).round() as u32;
    if percent > 0 && raw == 0 {
        return 1;
    }
    raw
}

pub fn raw_to_percent(raw: u32, max_raw: u32) -> u8 {
    if max_raw == 0 {
        return 0;
    }
    (raw as f64 / max_raw as f64 * 100.0).round().min(100.0) as u8
}

impl Backlight {
    /// Find the first usable backlight device under `root`.
    pub fn discover(root: &Path) -> Option<Self> {
        let entries = std::fs::read_dir(root).ok()?;

        let mut candidates: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        candidates.sort();

        for path in candidates {
            let max_raw = std::fs::read_to_string(path.join("max_brightness"))
                .ok()
                .and_then(|content| content.trim().parse::<u32>().ok());
            if let Some(max_raw) = max_raw {
                if max_raw > 0 {
                    info!("Backlight device: {path:?} (max raw {max_raw})");
                    return Some(Self { path, max_raw });
                }
            }
        }

        warn!("No backlight device under {root:?}");
        None
    }

    pub fn max_raw(&self) -> u32 {
        self.max_raw
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_percent(&self) -> Option<u8> {
        let raw = std::fs::read_to_string(self.path.join("brightness"))
            .ok()?
            .trim()
            .parse::<u32>()
            .ok()?;
        Some(raw_to_percent(raw, self.max_raw))
    }

    pub fn set_percent(&self, percent: u8) -> Result<()> {
        let raw = percent_to_raw(percent, self.max_raw);
        std::fs::write(self.path.join("brightness"), raw.to_string())
            .context(format!("Failed writing brightness to {:?}", self.path))?;
        debug!("Brightness set to {percent}% (raw {raw})");
        Ok(())
    }

    /// Suspend or resume backlight power without touching the brightness
    /// value.
    pub fn set_power(&self, on: bool) -> Result<()> {
        let value = if on { BL_POWER_ON } else { BL_POWER_OFF };
        std::fs::write(self.path.join("bl_power"), value)
            .context(format!("Failed writing bl_power to {:?}", self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonzero_percent_never_maps_to_raw_zero() {
        // 1% of 40 rounds to 0; the floor keeps the panel lit
        assert_eq!(percent_to_raw(1, 40), 1);
        assert_eq!(percent_to_raw(1, 255), 3);
    }

    #[test]
    fn explicit_zero_percent_maps_to_raw_zero() {
        assert_eq!(percent_to_raw(0, 40), 0);
        assert_eq!(percent_to_raw(0, 255), 0);
    }

    #[test]
    fn mapping_rounds_to_nearest() {
        assert_eq!(percent_to_raw(50, 255), 128);
        assert_eq!(percent_to_raw(100, 255), 255);
        // 49% of 100 stays 49, no silent round-up
        assert_eq!(percent_to_raw(49, 100), 49);
    }

    #[test]
    fn percent_above_hundred_is_clamped() {
        assert_eq!(percent_to_raw(250, 100), 100);
    }

    #[test]
    fn raw_round_trip() {
        assert_eq!(raw_to_percent(128, 255), 50);
        assert_eq!(raw_to_percent(0, 255), 0);
        assert_eq!(raw_to_percent(10, 0), 0);
    }

    #[test]
    fn discovery_picks_first_usable_device() {
        let tree = tempfile::tempdir().unwrap();
        let bogus = tree.path().join("acpi_video1");
        std::fs::create_dir_all(&bogus).unwrap();
        std::fs::write(bogus.join("max_brightness"), "garbage\n").unwrap();

        let panel = tree.path().join("panel0-backlight");
        std::fs::create_dir_all(&panel).unwrap();
        std::fs::write(panel.join("max_brightness"), "255\n").unwrap();
        std::fs::write(panel.join("brightness"), "128\n").unwrap();

        let backlight = Backlight::discover(tree.path()).unwrap();
        assert_eq!(backlight.max_raw(), 255);
        assert_eq!(backlight.read_percent(), Some(50));
    }

    #[test]
    fn discovery_handles_empty_tree() {
        let tree = tempfile::tempdir().unwrap();
        assert!(Backlight::discover(tree.path()).is_none());
    }

    #[test]
    fn set_percent_writes_floored_raw() {
        let tree = tempfile::tempdir().unwrap();
        let panel = tree.path().join("panel0-backlight");
        std::fs::create_dir_all(&panel).unwrap();
        std::fs::write(panel.join("max_brightness"), "40\n").unwrap();
        std::fs::write(panel.join("brightness"), "0\n").unwrap();

        let backlight = Backlight::discover(tree.path()).unwrap();
        backlight.set_percent(1).unwrap();
        assert_eq!(std::fs::read_to_string(panel.join("brightness")).unwrap(), "1");

        backlight.set_percent(0).unwrap();
        assert_eq!(std::fs::read_to_string(panel.join("brightness")).unwrap(), "0");
    }
}
