use serde::Serialize;

use crate::wifi::types::{ConnectionDetail, WifiInventory};

use super::{battery::BatteryInfo, disk::DiskPartition, network::InterfaceInfo};

/// One immutable sampling result, published once per tick.
///
/// Every field is always present with a defaulted value so consumers read a
/// stable shape: a metric whose source failed this tick simply carries its
/// last-known or zero value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    /// Aggregate busy fraction, `[0, 1]`.
    pub cpu_total: f64,
    /// Per-core busy fractions, `[0, 1]` each.
    pub cpu_cores: Vec<f64>,

    /// Used-memory fraction, `[0, 1]`.
    pub mem_percent: f64,
    pub mem_detail: String,

    /// Root-filesystem used fraction, `[0, 1]`.
    pub disk_percent: f64,
    pub disk_detail: String,
    pub partitions: Vec<DiskPartition>,

    pub battery: BatteryInfo,

    pub load_1m: f64,
    pub temperature_c: f64,

    /// 60-sample FIFO series, oldest first.
    pub cpu_history: Vec<f64>,
    pub mem_history: Vec<f64>,
    pub rx_history: Vec<f64>,
    pub tx_history: Vec<f64>,

    pub rx_speed: String,
    pub tx_speed: String,
    pub interfaces: Vec<InterfaceInfo>,

    pub brightness_percent: u8,
    pub screen_on: bool,

    pub wifi: WifiInventory,
    pub connection_detail: Option<ConnectionDetail>,
}
