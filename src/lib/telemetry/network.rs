//! Network byte counters from `/proc/net/dev` and interface enumeration.
//!
//! The counter file carries two header lines, then one line per interface:
//! ```text
//! Inter-|   Receive                            ...|  Transmit
//!  face |bytes    packets errs drop fifo frame ...|bytes    packets ...
//!   eth0: 8028505   12342    0    0    0     0 ...  2305620    9512 ...
//! ```
//! Receive bytes is the first field after the interface name, transmit bytes
//! the ninth. Some kernels print `name:12345` without a space, so the name
//! delimiter is normalized before splitting. Loopback, tunnel and bonding
//! interfaces are excluded so virtual traffic never inflates the totals.

use std::path::Path;

use cached::proc_macro::cached;
use serde::Serialize;

/// Default counter source.
pub const PROC_NET_DEV_PATH: &str = "/proc/net/dev";

/// Name prefixes whose traffic is not physical.
const EXCLUDED_PREFIXES: [&str; 3] = ["lo", "tun", "bond"];

/// Cumulative byte counters summed over all physical interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterTotals {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

fn is_physical(name: &str) -> bool {
    !EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

pub fn read_totals(path: &Path) -> Option<CounterTotals> {
    let content = std::fs::read_to_string(path).ok()?;
    Some(parse_totals(&content))
}

/// Sum the physical-interface counters of a `/proc/net/dev`-shaped file.
/// Malformed lines are skipped.
pub fn parse_totals(content: &str) -> CounterTotals {
    let mut totals = CounterTotals::default();

    for line in content.lines().skip(2) {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || !is_physical(name) {
            continue;
        }

        let fields: Vec<&str> = counters.split_whitespace().collect();
        if fields.len() < 9 {
            continue;
        }
        let (Ok(rx), Ok(tx)) = (fields[0].parse::<u64>(), fields[8].parse::<u64>()) else {
            continue;
        };

        totals.rx_bytes += rx;
        totals.tx_bytes += tx;
    }

    totals
}

/// Delta state for the byte counters. The baseline is `Option` on purpose:
/// "no sample yet" is distinct from "zero bytes", and the first observation
/// must establish the baseline without ever being reported as a rate.
#[derive(Debug, Default)]
pub struct RateTracker {
    baseline: Option<CounterTotals>,
}

impl RateTracker {
    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Fold one read into the tracker, returning `(rx, tx)` in KB per
    /// interval — or `None` on the baseline-establishing first call.
    pub fn update(&mut self, current: CounterTotals) -> Option<(f64, f64)> {
        let rates = self.baseline.map(|previous| {
            (
                current.rx_bytes.saturating_sub(previous.rx_bytes) as f64 / 1024.0,
                current.tx_bytes.saturating_sub(previous.tx_bytes) as f64 / 1024.0,
            )
        });

        self.baseline = Some(current);
        rates
    }
}

/// One enumerated network interface, with its bound addresses.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct InterfaceInfo {
    pub name: String,
    pub mac: String,
    pub is_up: bool,
    pub is_running: bool,
    pub addresses: Vec<String>,
}

impl InterfaceInfo {
    /// Wireless interfaces follow the predictable `wl*` kernel naming.
    pub fn is_wireless(&self) -> bool {
        self.name.starts_with("wl")
    }
}

/// Enumerate interfaces. Cached for a second: the sampling tick and the WiFi
/// connection enrichment both ask within the same window.
#[cached(time = 1)]
pub fn interfaces() -> Vec<InterfaceInfo> {
    pnet::datalink::interfaces()
        .iter()
        .map(|interface| InterfaceInfo {
            name: interface.name.clone(),
            mac: interface
                .mac
                .map(|mac| mac.to_string())
                .unwrap_or_default(),
            is_up: interface.is_up(),
            is_running: interface.is_running(),
            addresses: interface
                .ips
                .iter()
                .map(|ip_network| ip_network.ip().to_string())
                .collect(),
        })
        .collect()
}
