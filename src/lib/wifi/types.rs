use serde::Serialize;

/// One access point as seen by the last scan, classified against the
/// saved-network cache. Identity is the network name: multi-band duplicates
/// were already collapsed by the parser.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AccessPoint {
    pub ssid: String,
    /// Higher is stronger.
    pub signal: i32,
    pub secured: bool,
    pub security: String,
    pub connected: bool,
    pub saved: bool,
    pub auto_connect: bool,
}

/// Scan result split into its three ordered groups.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct WifiInventory {
    /// Currently connected (at most one in practice, modeled as a list).
    pub connected: Vec<AccessPoint>,
    /// Saved but not connected, strongest signal first.
    pub saved: Vec<AccessPoint>,
    /// Neither connected nor saved, strongest signal first.
    pub discovered: Vec<AccessPoint>,
}

impl WifiInventory {
    /// The three groups concatenated, connected group first.
    pub fn ordered(&self) -> Vec<AccessPoint> {
        [&self.connected[..], &self.saved[..], &self.discovered[..]].concat()
    }
}

/// Interface-level detail for the currently connected network.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ConnectionDetail {
    pub ssid: String,
    pub interface: String,
    pub mac: String,
    pub addresses: Vec<String>,
}

/// The mutating operations the manager can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WifiOperation {
    Radio,
    Connect,
    Disconnect,
    Forget,
    SetAutoConnect,
}

impl std::fmt::Display for WifiOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Radio => write!(f, "radio"),
            Self::Connect => write!(f, "connect"),
            Self::Disconnect => write!(f, "disconnect"),
            Self::Forget => write!(f, "forget"),
            Self::SetAutoConnect => write!(f, "set_auto_connect"),
        }
    }
}

/// One structured result per mutating operation, emitted regardless of
/// outcome.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OperationResult {
    pub operation: WifiOperation,
    pub success: bool,
    pub message: String,
}
