use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::sync::{
    broadcast::{Receiver, Sender},
    RwLock,
};
use tracing::*;

use crate::{cli, controls, helper::format, wifi};

use super::{
    battery::{BatteryProbe, POWER_SUPPLY_ROOT},
    cpu::{self, CpuTracker, PROC_STAT_PATH},
    disk,
    history::MetricHistory,
    memory::{self, PROC_MEMINFO_PATH},
    network::{self, RateTracker, PROC_NET_DEV_PATH},
    types::Snapshot,
};

/// Sampling cadence.
const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

const PROC_LOADAVG_PATH: &str = "/proc/loadavg";
const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

pub struct Manager {
    cpu: CpuTracker,
    net: RateTracker,
    battery: BatteryProbe,
    history: MetricHistory,
    snapshot: Snapshot,
    notifier: Sender<Snapshot>,
    pub process: Option<tokio::task::JoinHandle<()>>,

    stat_path: PathBuf,
    meminfo_path: PathBuf,
    net_dev_path: PathBuf,
}

impl Default for Manager {
    fn default() -> Self {
        Self::with_sources(
            Path::new(PROC_STAT_PATH),
            Path::new(PROC_MEMINFO_PATH),
            Path::new(PROC_NET_DEV_PATH),
            Path::new(POWER_SUPPLY_ROOT),
        )
    }
}

impl Manager {
    /// Build an aggregator against explicit counter sources. Production uses
    /// the kernel defaults; tests inject fake trees.
    pub fn with_sources(
        stat_path: &Path,
        meminfo_path: &Path,
        net_dev_path: &Path,
        power_supply_root: &Path,
    ) -> Self {
        let core_count = cpu::detect_core_count();
        debug!("Detected {core_count} logical cores");

        let (notifier, _receiver) = tokio::sync::broadcast::channel(16);

        let snapshot = Snapshot {
            cpu_cores: vec![0.0; core_count],
            ..Default::default()
        };

        Self {
            cpu: CpuTracker::new(core_count),
            net: RateTracker::default(),
            battery: BatteryProbe::new(power_supply_root),
            history: MetricHistory::default(),
            snapshot,
            notifier,
            process: None,
            stat_path: stat_path.to_path_buf(),
            meminfo_path: meminfo_path.to_path_buf(),
            net_dev_path: net_dev_path.to_path_buf(),
        }
    }

    /// One sampling pass. A failed read degrades its own metric to the
    /// last-known or zero value and never aborts the rest of the tick.
    pub fn sample(&mut self) {
        // Memory: an unreadable total keeps the previous values unchanged
        if let Some(counters) = memory::read(&self.meminfo_path) {
            if let Some(fraction) = counters.used_fraction() {
                self.snapshot.mem_percent = fraction;
                self.snapshot.mem_detail = counters.detail_string();
            }
        }

        // CPU: aggregate plus per-core, against the fixed slot count
        let samples = cpu::read_samples(&self.stat_path, self.cpu.slot_count());
        self.cpu.apply(&samples);
        self.snapshot.cpu_total = self.cpu.total();
        self.snapshot.cpu_cores = self.cpu.cores().to_vec();

        // Disk: every partition, and the root mount as the headline number
        let partitions = disk::partitions();
        if let Some((fraction, detail)) = disk::root_summary(&partitions) {
            self.snapshot.disk_percent = fraction;
            self.snapshot.disk_detail = detail;
        }
        self.snapshot.partitions = partitions;

        // Battery
        self.snapshot.battery = self.battery.read();

        // Compute histories are appended on every tick
        self.history
            .push_compute(self.snapshot.cpu_total, self.snapshot.mem_percent);

        // Network: the first read only establishes the baseline; a failed
        // read with an existing baseline appends zeros to keep alignment
        match network::read_totals(&self.net_dev_path) {
            Some(totals) => {
                if let Some((rx_kb, tx_kb)) = self.net.update(totals) {
                    self.history.push_network(rx_kb, tx_kb);
                    self.snapshot.rx_speed = format::speed_string(rx_kb);
                    self.snapshot.tx_speed = format::speed_string(tx_kb);
                }
            }
            None => {
                if self.net.has_baseline() {
                    self.history.push_network(0.0, 0.0);
                }
            }
        }

        self.snapshot.cpu_history = self.history.cpu();
        self.snapshot.mem_history = self.history.memory();
        self.snapshot.rx_history = self.history.rx();
        self.snapshot.tx_history = self.history.tx();

        // Interface inventory
        self.snapshot.interfaces = network::interfaces();

        self.snapshot.load_1m = read_load_1m(Path::new(PROC_LOADAVG_PATH));
        self.snapshot.temperature_c = read_temperature(Path::new(THERMAL_ZONE_PATH));
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

fn read_load_1m(path: &Path) -> f64 {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| {
            content
                .split_whitespace()
                .next()
                .and_then(|value| value.parse().ok())
        })
        .unwrap_or(0.0)
}

fn read_temperature(path: &Path) -> f64 {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| content.trim().parse::<f64>().ok())
        .map(|millidegrees| millidegrees / 1000.0)
        .unwrap_or(0.0)
}

lazy_static! {
    static ref MANAGER: Arc<RwLock<Manager>> = Default::default();
}

// Apply the CLI source overrides, should be done inside main
#[instrument(level = "debug")]
pub async fn init() {
    let mut manager = MANAGER.write().await;
    manager.battery = BatteryProbe::new(cli::manager::power_supply_root());
}

// Start the sampling loop, should be done inside main
#[instrument(level = "debug")]
pub async fn start() {
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(SAMPLE_INTERVAL);
        loop {
            interval.tick().await;
            tick_once().await;
        }
    });
    MANAGER.write().await.process = Some(handle);
}

/// Run one full tick against the singleton and publish the result.
pub async fn tick_once() -> Snapshot {
    // Device-control and WiFi state are folded in at publish time so the
    // snapshot always carries every field
    let wifi_inventory = wifi::manager::inventory().await;
    let connection_detail = wifi::manager::connection_detail().await;
    let brightness_percent = controls::manager::brightness_percent();
    let screen_on = controls::manager::is_screen_on();

    let mut manager = MANAGER.write().await;
    manager.sample();
    manager.snapshot.wifi = wifi_inventory;
    manager.snapshot.connection_detail = connection_detail;
    manager.snapshot.brightness_percent = brightness_percent;
    manager.snapshot.screen_on = screen_on;

    let snapshot = manager.snapshot.clone();
    let _ = manager.notifier.send(snapshot.clone());
    snapshot
}

pub async fn snapshot() -> Snapshot {
    MANAGER.read().await.snapshot.clone()
}

pub async fn subscribe() -> Receiver<Snapshot> {
    MANAGER.read().await.notifier.subscribe()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Totals go 1000 -> 1200 with idle 400 -> 440: 200 new ticks, 40 idle
    const STAT_TICK_1: &str = "\
cpu  600 0 0 400 0 0 0 0
cpu0 600 0 0 400 0 0 0 0
";
    const STAT_TICK_2: &str = "\
cpu  760 0 0 440 0 0 0 0
cpu0 760 0 0 440 0 0 0 0
";
    const MEMINFO: &str = "\
MemTotal:        1000000 kB
MemAvailable:     250000 kB
";
    const NET_DEV_TICK_1: &str = "\
header
header
eth0: 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
";
    const NET_DEV_TICK_2: &str = "\
header
header
eth0: 204800 0 0 0 0 0 0 0 102400 0 0 0 0 0 0 0
";

    fn write_sources(dir: &Path, stat: &str, meminfo: &str, net_dev: &str) {
        std::fs::write(dir.join("stat"), stat).unwrap();
        std::fs::write(dir.join("meminfo"), meminfo).unwrap();
        std::fs::write(dir.join("net_dev"), net_dev).unwrap();
    }

    fn manager_for(dir: &Path) -> Manager {
        Manager::with_sources(
            &dir.join("stat"),
            &dir.join("meminfo"),
            &dir.join("net_dev"),
            &dir.join("power_supply"),
        )
    }

    #[test]
    fn two_ticks_produce_rates_and_aligned_histories() {
        let tree = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tree.path().join("power_supply")).unwrap();

        write_sources(tree.path(), STAT_TICK_1, MEMINFO, NET_DEV_TICK_1);
        let mut manager = manager_for(tree.path());
        manager.sample();

        // First tick: baseline only for the network, no speed strings
        assert_eq!(manager.snapshot().rx_speed, "");
        assert!(manager.snapshot().rx_history.iter().all(|&v| v == 0.0));
        assert!((manager.snapshot().mem_percent - 0.75).abs() < 1e-9);

        write_sources(tree.path(), STAT_TICK_2, MEMINFO, NET_DEV_TICK_2);
        manager.sample();

        // diffTotal=200, diffIdle=40 -> 0.8 busy
        assert!((manager.snapshot().cpu_total - 0.8).abs() < 1e-9);
        // 204800 B received -> 200 KB; 102400 B sent -> 100 KB
        assert_eq!(manager.snapshot().rx_speed, "200.0 KB/s");
        assert_eq!(manager.snapshot().tx_speed, "100.0 KB/s");
        assert_eq!(*manager.snapshot().rx_history.last().unwrap(), 200.0);
        assert_eq!(*manager.snapshot().tx_history.last().unwrap(), 100.0);

        // No battery in the fake tree is a valid terminal state
        assert_eq!(manager.snapshot().battery.state, super::super::battery::NO_BATTERY_STATE);
    }

    #[test]
    fn missing_sources_degrade_without_aborting_the_tick() {
        let tree = tempfile::tempdir().unwrap();
        let mut manager = manager_for(tree.path());

        manager.sample();

        // Nothing was readable, every metric sits at its default
        assert_eq!(manager.snapshot().cpu_total, 0.0);
        assert_eq!(manager.snapshot().mem_percent, 0.0);
        // Histories still advanced exactly once for the compute series
        assert_eq!(manager.snapshot().cpu_history.len(), super::super::history::HISTORY_CAPACITY);
    }

    #[test]
    fn memory_keeps_previous_values_when_total_unreadable() {
        let tree = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tree.path().join("power_supply")).unwrap();

        write_sources(tree.path(), STAT_TICK_1, MEMINFO, NET_DEV_TICK_1);
        let mut manager = manager_for(tree.path());
        manager.sample();
        let detail = manager.snapshot().mem_detail.clone();

        write_sources(tree.path(), STAT_TICK_2, "MemFree: 10 kB\n", NET_DEV_TICK_2);
        manager.sample();

        assert!((manager.snapshot().mem_percent - 0.75).abs() < 1e-9);
        assert_eq!(manager.snapshot().mem_detail, detail);
    }
}
