//! Parsing and reconciliation of terse network-manager output.
//!
//! Scan lines follow the canonical field contract
//! `SSID:SIGNAL:SECURITY:IN-USE:CHAN`; saved-connection lines follow
//! `NAME:TYPE:AUTOCONNECT`. The network name itself may contain the `:`
//! delimiter, so the fixed trailing fields are sliced from the right —
//! channel, then in-use, then security, then signal — and whatever remains
//! on the left is the name.

use std::collections::HashSet;

use super::types::{AccessPoint, WifiInventory};

/// Marker in the in-use field of the connected access point.
const IN_USE_MARKER: &str = "*";

/// Connection types accepted as wireless in the saved list.
const WIRELESS_TYPE_MARKER: &str = "wireless";

/// One raw scan line after field extraction, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    pub ssid: String,
    pub signal: i32,
    pub security: String,
    pub in_use: bool,
}

/// The cached saved-network identities, refreshed on startup and after any
/// successful mutating operation. Read-only input to classification.
#[derive(Debug, Clone, Default)]
pub struct SavedNetworks {
    names: HashSet<String>,
    auto_connect: HashSet<String>,
}

impl SavedNetworks {
    pub fn contains(&self, ssid: &str) -> bool {
        self.names.contains(ssid)
    }

    pub fn is_auto_connect(&self, ssid: &str) -> bool {
        self.auto_connect.contains(ssid)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Slice the trailing `:`-delimited field off a line.
fn rsplit_field(line: &str) -> Option<(&str, &str)> {
    line.rfind(':')
        .map(|index| (&line[..index], &line[index + 1..]))
}

/// Extract one scan record, walking the fixed trailing fields inward from
/// the right. Lines with too few fields, a non-numeric signal, or an empty
/// name are rejected.
pub fn parse_scan_line(line: &str) -> Option<ScanRecord> {
    let (rest, _channel) = rsplit_field(line)?;
    let (rest, in_use) = rsplit_field(rest)?;
    let (rest, security) = rsplit_field(rest)?;
    let (ssid, signal) = rsplit_field(rest)?;

    if ssid.is_empty() {
        return None;
    }
    let signal: i32 = signal.trim().parse().ok()?;

    Some(ScanRecord {
        ssid: ssid.to_string(),
        signal,
        security: security.trim().to_string(),
        in_use: in_use.trim() == IN_USE_MARKER,
    })
}

/// Parse a whole scan output, deduplicating by network name. Multi-band
/// duplicates keep only the first-seen entry.
pub fn parse_scan_output(output: &str) -> Vec<ScanRecord> {
    let mut seen = HashSet::new();
    output
        .lines()
        .filter_map(parse_scan_line)
        .filter(|record| seen.insert(record.ssid.clone()))
        .collect()
}

/// Extract one saved-connection record as `(name, auto_connect)`. Only
/// wireless profiles qualify; the name may contain the delimiter.
pub fn parse_saved_line(line: &str) -> Option<(String, bool)> {
    let (rest, auto_connect) = rsplit_field(line)?;
    let (name, connection_type) = rsplit_field(rest)?;

    if name.is_empty() || !connection_type.contains(WIRELESS_TYPE_MARKER) {
        return None;
    }

    Some((name.to_string(), auto_connect.trim() == "yes"))
}

pub fn parse_saved_output(output: &str) -> SavedNetworks {
    let mut saved = SavedNetworks::default();
    for (name, auto_connect) in output.lines().filter_map(parse_saved_line) {
        if auto_connect {
            saved.auto_connect.insert(name.clone());
        }
        saved.names.insert(name);
    }
    saved
}

/// Classify the deduplicated records against the saved cache and bucket them
/// into the three ordered groups. The signal sort is stable: ties keep
/// encounter order.
pub fn build_inventory(records: &[ScanRecord], saved: &SavedNetworks) -> WifiInventory {
    let mut inventory = WifiInventory::default();

    for record in records {
        let access_point = AccessPoint {
            ssid: record.ssid.clone(),
            signal: record.signal,
            secured: !record.security.is_empty(),
            security: record.security.clone(),
            connected: record.in_use,
            saved: saved.contains(&record.ssid),
            auto_connect: saved.is_auto_connect(&record.ssid),
        };

        if access_point.connected {
            inventory.connected.push(access_point);
        } else if access_point.saved {
            inventory.saved.push(access_point);
        } else {
            inventory.discovered.push(access_point);
        }
    }

    inventory
        .saved
        .sort_by(|a, b| b.signal.cmp(&a.signal));
    inventory
        .discovered
        .sort_by(|a, b| b.signal.cmp(&a.signal));

    inventory
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_line_basic_fields() {
        let record = parse_scan_line("HomeLab:87:WPA2:*:36").unwrap();
        assert_eq!(record.ssid, "HomeLab");
        assert_eq!(record.signal, 87);
        assert_eq!(record.security, "WPA2");
        assert!(record.in_use);
    }

    #[test]
    fn scan_line_name_may_contain_delimiter() {
        let record = parse_scan_line("cafe:au:lait:62:WPA1 WPA2::11").unwrap();
        assert_eq!(record.ssid, "cafe:au:lait");
        assert_eq!(record.signal, 62);
        assert_eq!(record.security, "WPA1 WPA2");
        assert!(!record.in_use);
    }

    #[test]
    fn scan_line_open_network_is_unsecured() {
        let record = parse_scan_line("Guest:40:::6").unwrap();
        assert_eq!(record.security, "");
        assert!(!record.in_use);
    }

    #[test]
    fn scan_line_rejects_empty_name_and_bad_signal() {
        assert_eq!(parse_scan_line(":87:WPA2::36"), None);
        assert_eq!(parse_scan_line("Net:strong:WPA2::36"), None);
        assert_eq!(parse_scan_line("not enough fields"), None);
    }

    #[test]
    fn scan_output_dedups_by_first_seen_name() {
        let output = "\
HomeLab:87:WPA2::36
HomeLab:45:WPA2::1
Guest:40:::6
";
        let records = parse_scan_output(output);
        assert_eq!(records.len(), 2);
        // The first-encountered signal survives, not the strongest
        assert_eq!(records[0].ssid, "HomeLab");
        assert_eq!(records[0].signal, 87);
    }

    #[test]
    fn saved_line_filters_to_wireless() {
        assert_eq!(
            parse_saved_line("HomeLab:802-11-wireless:yes"),
            Some(("HomeLab".to_string(), true))
        );
        assert_eq!(
            parse_saved_line("Office:802-11-wireless:no"),
            Some(("Office".to_string(), false))
        );
        assert_eq!(parse_saved_line("Wired connection 1:802-3-ethernet:yes"), None);
    }

    #[test]
    fn saved_name_may_contain_delimiter() {
        assert_eq!(
            parse_saved_line("lab:5ghz:802-11-wireless:yes"),
            Some(("lab:5ghz".to_string(), true))
        );
    }

    #[test]
    fn inventory_groups_and_orders() {
        let output = "\
Unknown:10:::6
SavedWeak:40:WPA2::1
Current:70:WPA2:*:36
SavedStrong:90:WPA2::11
";
        let records = parse_scan_output(output);
        let saved = parse_saved_output(
            "SavedWeak:802-11-wireless:yes\nSavedStrong:802-11-wireless:no\n",
        );

        let inventory = build_inventory(&records, &saved);
        let ordered = inventory.ordered();
        let names: Vec<&str> = ordered.iter().map(|ap| ap.ssid.as_str()).collect();
        assert_eq!(names, ["Current", "SavedStrong", "SavedWeak", "Unknown"]);

        assert_eq!(inventory.connected.len(), 1);
        assert!(inventory.connected[0].connected);
        assert!(inventory.saved[0].signal > inventory.saved[1].signal);
        assert!(inventory.saved.iter().all(|ap| ap.saved && !ap.connected));
        assert!(inventory.discovered.iter().all(|ap| !ap.saved));
    }

    #[test]
    fn inventory_signal_ties_keep_encounter_order() {
        let records = vec![
            ScanRecord {
                ssid: "first".into(),
                signal: 50,
                security: String::new(),
                in_use: false,
            },
            ScanRecord {
                ssid: "second".into(),
                signal: 50,
                security: String::new(),
                in_use: false,
            },
        ];

        let inventory = build_inventory(&records, &SavedNetworks::default());
        assert_eq!(inventory.discovered[0].ssid, "first");
        assert_eq!(inventory.discovered[1].ssid, "second");
    }

    #[test]
    fn auto_connect_subset_is_tracked() {
        let saved = parse_saved_output(
            "A:802-11-wireless:yes\nB:802-11-wireless:no\n",
        );
        assert!(saved.contains("A") && saved.is_auto_connect("A"));
        assert!(saved.contains("B") && !saved.is_auto_connect("B"));
        assert_eq!(saved.len(), 2);
    }
}
