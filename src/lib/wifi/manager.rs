use std::{collections::HashSet, sync::Arc, time::Duration};

use tokio::sync::{
    broadcast::{Receiver, Sender},
    RwLock,
};
use tracing::*;

use crate::{
    helper::command,
    telemetry::network,
};

use super::{
    parser::{self, SavedNetworks},
    types::{ConnectionDetail, OperationResult, WifiInventory, WifiOperation},
};

/// Re-scan cadence, independent of the 1 s sampling tick.
const SCAN_INTERVAL: Duration = Duration::from_secs(5);

/// The two boot-time queries may block their caller, but only this long.
const BOOT_QUERY_TIMEOUT: Duration = Duration::from_secs(1);

const NMCLI: &str = "nmcli";
const SCAN_FIELDS: &str = "SSID,SIGNAL,SECURITY,IN-USE,CHAN";
const SAVED_FIELDS: &str = "NAME,TYPE,AUTOCONNECT";

pub struct Manager {
    saved: SavedNetworks,
    inventory: WifiInventory,
    connection_detail: Option<ConnectionDetail>,
    radio_enabled: bool,
    /// Mutations currently in flight, keyed by kind and target. A second
    /// identical request is rejected instead of racing the first.
    in_flight: HashSet<(WifiOperation, String)>,
    results: Sender<OperationResult>,
    pub process: Option<tokio::task::JoinHandle<()>>,
}

impl Default for Manager {
    fn default() -> Self {
        let (results, _receiver) = tokio::sync::broadcast::channel(32);
        Self {
            saved: SavedNetworks::default(),
            inventory: WifiInventory::default(),
            connection_detail: None,
            radio_enabled: false,
            in_flight: HashSet::new(),
            results,
            process: None,
        }
    }
}

lazy_static! {
    static ref MANAGER: Arc<RwLock<Manager>> = Default::default();
}

// Run the synchronous boot queries, should be done inside main
#[instrument(level = "debug")]
pub async fn init() {
    match command::run_with_timeout(
        NMCLI,
        &["-t", "-f", SAVED_FIELDS, "connection", "show"],
        BOOT_QUERY_TIMEOUT,
    )
    .await
    {
        Ok(output) => {
            let saved = parser::parse_saved_output(&output.stdout);
            debug!("Loaded {} saved networks", saved.len());
            MANAGER.write().await.saved = saved;
        }
        Err(error) => warn!("Failed fetching saved networks: {error}"),
    }

    match command::run_with_timeout(NMCLI, &["radio", "wifi"], BOOT_QUERY_TIMEOUT).await {
        Ok(output) => {
            MANAGER.write().await.radio_enabled = output.stdout.trim() == "enabled";
        }
        Err(error) => warn!("Failed querying radio state: {error}"),
    }
}

// Start the periodic re-scan, should be done inside main
#[instrument(level = "debug")]
pub async fn start() {
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(SCAN_INTERVAL);
        loop {
            interval.tick().await;
            scan_cycle().await;
        }
    });
    MANAGER.write().await.process = Some(handle);
}

pub async fn inventory() -> WifiInventory {
    MANAGER.read().await.inventory.clone()
}

pub async fn connection_detail() -> Option<ConnectionDetail> {
    MANAGER.read().await.connection_detail.clone()
}

pub async fn is_radio_enabled() -> bool {
    MANAGER.read().await.radio_enabled
}

pub async fn subscribe_results() -> Receiver<OperationResult> {
    MANAGER.read().await.results.subscribe()
}

/// One scan pass: list access points, reconcile against the saved cache,
/// publish the three ordered groups and the connection detail.
#[instrument(level = "debug")]
pub async fn scan_cycle() {
    let output = match command::run(
        NMCLI,
        &["-t", "-f", SCAN_FIELDS, "device", "wifi", "list"],
    )
    .await
    {
        Ok(output) => output,
        Err(error) => {
            debug!("Scan failed: {error}");
            return;
        }
    };

    let records = parser::parse_scan_output(&output.stdout);

    let mut manager = MANAGER.write().await;
    let inventory = parser::build_inventory(&records, &manager.saved);
    manager.connection_detail = inventory
        .connected
        .first()
        .map(|access_point| enrich_connection(&access_point.ssid));
    manager.inventory = inventory;
}

/// Pair the connected network with the first wireless interface from the
/// most recent enumeration.
fn enrich_connection(ssid: &str) -> ConnectionDetail {
    let interface = network::interfaces()
        .into_iter()
        .find(|interface| interface.is_wireless())
        .unwrap_or_default();

    ConnectionDetail {
        ssid: ssid.to_string(),
        interface: interface.name,
        mac: interface.mac,
        addresses: interface.addresses,
    }
}

pub fn set_radio(enabled: bool) {
    let state = if enabled { "on" } else { "off" };
    spawn_operation(
        WifiOperation::Radio,
        state.to_string(),
        vec![
            "radio".to_string(),
            "wifi".to_string(),
            state.to_string(),
        ],
    );
}

pub fn connect(ssid: &str, password: Option<&str>) {
    let mut args = vec![
        "device".to_string(),
        "wifi".to_string(),
        "connect".to_string(),
        ssid.to_string(),
    ];
    if let Some(password) = password {
        args.push("password".to_string());
        args.push(password.to_string());
    }
    spawn_operation(WifiOperation::Connect, ssid.to_string(), args);
}

pub fn disconnect() {
    let interface = network::interfaces()
        .into_iter()
        .find(|interface| interface.is_wireless())
        .map(|interface| interface.name)
        .unwrap_or_else(|| "wlan0".to_string());

    spawn_operation(
        WifiOperation::Disconnect,
        interface.clone(),
        vec![
            "device".to_string(),
            "disconnect".to_string(),
            interface,
        ],
    );
}

pub fn forget(ssid: &str) {
    spawn_operation(
        WifiOperation::Forget,
        ssid.to_string(),
        vec![
            "connection".to_string(),
            "delete".to_string(),
            ssid.to_string(),
        ],
    );
}

pub fn set_auto_connect(ssid: &str, enabled: bool) {
    spawn_operation(
        WifiOperation::SetAutoConnect,
        ssid.to_string(),
        vec![
            "connection".to_string(),
            "modify".to_string(),
            ssid.to_string(),
            "connection.autoconnect".to_string(),
            (if enabled { "yes" } else { "no" }).to_string(),
        ],
    );
}

/// Run one mutating command in the background and emit one structured result
/// regardless of outcome. On success the saved cache is refreshed and a scan
/// is re-run before the result goes out.
fn spawn_operation(operation: WifiOperation, target: String, args: Vec<String>) {
    tokio::spawn(async move {
        {
            let mut manager = MANAGER.write().await;
            if !manager.in_flight.insert((operation, target.clone())) {
                warn!("{operation} already in flight for {target:?}");
                let _ = manager.results.send(OperationResult {
                    operation,
                    success: false,
                    message: format!("{operation} already in progress for {target:?}"),
                });
                return;
            }
        }

        let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
        let outcome = command::run(NMCLI, &args_ref).await;

        let result = match outcome {
            Ok(_) => {
                if operation == WifiOperation::Radio {
                    MANAGER.write().await.radio_enabled = target == "on";
                }
                refresh_saved().await;
                scan_cycle().await;
                OperationResult {
                    operation,
                    success: true,
                    message: format!("{operation} {target:?} succeeded"),
                }
            }
            Err(error) => OperationResult {
                operation,
                success: false,
                message: error.to_string(),
            },
        };

        let mut manager = MANAGER.write().await;
        manager.in_flight.remove(&(operation, target));
        info!("WiFi operation finished: {result:?}");
        let _ = manager.results.send(result);
    });
}

async fn refresh_saved() {
    match command::run(NMCLI, &["-t", "-f", SAVED_FIELDS, "connection", "show"]).await {
        Ok(output) => {
            MANAGER.write().await.saved = parser::parse_saved_output(&output.stdout);
        }
        Err(error) => warn!("Failed refreshing saved networks: {error}"),
    }
}
