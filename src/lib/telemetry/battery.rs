//! Battery state from the power-supply sysfs tree.
//!
//! The device node is the first subdirectory whose `type` file reads
//! `Battery`. Discovery runs once and the result is cached for the process
//! lifetime — including the "no battery" outcome, which is a valid terminal
//! state for bench-powered units, not an error.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::*;

/// Default sysfs tree.
pub const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

/// Charge state reported when no battery device exists.
pub const NO_BATTERY_STATE: &str = "No Battery";

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BatteryInfo {
    pub percent: u8,
    pub state: String,
    /// Volts, when the driver exposes `voltage_now`.
    pub voltage: Option<f64>,
    /// Degrees Celsius, when the driver exposes `temp`.
    pub temperature: Option<f64>,
    /// Full-capacity / design-capacity × 100, when the design value is known.
    pub health_percent: Option<f64>,
}

impl BatteryInfo {
    fn absent() -> Self {
        Self {
            state: NO_BATTERY_STATE.to_string(),
            ..Default::default()
        }
    }

    /// Stringly detail map for the snapshot; unknown health stays "unknown".
    pub fn detail(&self) -> Vec<(String, String)> {
        let mut detail = vec![("state".to_string(), self.state.clone())];
        if let Some(voltage) = self.voltage {
            detail.push(("voltage".to_string(), format!("{voltage:.2} V")));
        }
        if let Some(temperature) = self.temperature {
            detail.push(("temperature".to_string(), format!("{temperature:.1} °C")));
        }
        let health = match self.health_percent {
            Some(health) => format!("{health:.0}%"),
            None => "unknown".to_string(),
        };
        detail.push(("health".to_string(), health));
        detail
    }
}

/// One-shot battery-node resolver plus reader. Owned by the aggregator so the
/// tree root can be injected for tests.
#[derive(Debug)]
pub struct BatteryProbe {
    root: PathBuf,
    /// `None` = not probed yet; `Some(None)` = probed, no battery present.
    device: Option<Option<PathBuf>>,
}

impl BatteryProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            device: None,
        }
    }

    fn device(&mut self) -> Option<&Path> {
        if self.device.is_none() {
            let found = discover_battery(&self.root);
            match &found {
                Some(path) => info!("Battery device: {path:?}"),
                None => info!("No battery device under {:?}", self.root),
            }
            self.device = Some(found);
        }
        self.device.as_ref().unwrap().as_deref()
    }

    pub fn read(&mut self) -> BatteryInfo {
        let Some(device) = self.device() else {
            return BatteryInfo::absent();
        };
        let device = device.to_path_buf();
        read_battery(&device)
    }
}

fn discover_battery(root: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;

    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .collect();
    candidates.sort();

    candidates.into_iter().find(|path| {
        read_value(path, "type")
            .map(|kind| kind == "Battery")
            .unwrap_or(false)
    })
}

fn read_battery(device: &Path) -> BatteryInfo {
    let percent = read_value(device, "capacity")
        .and_then(|value| value.parse::<i64>().ok())
        .map(|value| value.clamp(0, 100) as u8)
        .unwrap_or(0);

    let state = read_value(device, "status").unwrap_or_else(|| "Unknown".to_string());

    // voltage_now is µV, temp is tenths of a degree
    let voltage = read_value(device, "voltage_now")
        .and_then(|value| value.parse::<f64>().ok())
        .map(|microvolts| microvolts / 1_000_000.0);
    let temperature = read_value(device, "temp")
        .and_then(|value| value.parse::<f64>().ok())
        .map(|tenths| tenths / 10.0);

    BatteryInfo {
        percent,
        state,
        voltage,
        temperature,
        health_percent: health_percent(device),
    }
}

/// Health from energy counters when present, charge counters otherwise.
/// Unknown when the design capacity is missing or zero.
fn health_percent(device: &Path) -> Option<f64> {
    for (full_file, design_file) in [
        ("energy_full", "energy_full_design"),
        ("charge_full", "charge_full_design"),
    ] {
        let full = read_value(device, full_file).and_then(|value| value.parse::<f64>().ok());
        let design = read_value(device, design_file).and_then(|value| value.parse::<f64>().ok());

        if let (Some(full), Some(design)) = (full, design) {
            if design > 0.0 {
                return Some(full / design * 100.0);
            }
        }
    }
    None
}

fn read_value(device: &Path, file: &str) -> Option<String> {
    std::fs::read_to_string(device.join(file))
        .ok()
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}
