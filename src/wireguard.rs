//! WireGuard runtime status, parsed from `wg show <iface> dump`.
//!
//! Dump shape: the first line describes the interface
//! (`private-key \t public-key \t listen-port \t fwmark`), every further
//! line is one peer (`public-key \t preshared-key \t endpoint \t
//! allowed-ips \t latest-handshake \t rx \t tx \t keepalive`), with an
//! extra reserved column on newer kernels. Keys are treated as opaque
//! strings; the private and preshared columns never leave this module.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::cmd;

const CMD_BUDGET: Duration = Duration::from_secs(2);

/// Peer records shorter than this are dropped as truncated.
const PEER_FIELDS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct WgStatus {
    pub running: bool,
    pub interface: Option<WgInterface>,
    pub peers: Vec<WgPeer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WgInterface {
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WgPeer {
    #[serde(rename = "peer")]
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_ips: Option<String>,
    /// Epoch seconds of the last completed handshake; absent when the peer
    /// has never connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_handshake: Option<u64>,
    /// Seconds since that handshake. Negative under clock skew; reported
    /// as-is so the anomaly stays visible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handshake_age_sec: Option<i64>,
    pub transfer_rx: u64,
    pub transfer_tx: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_keepalive: Option<u32>,
}

/// What `/api/vpn` reports. `kind` is `"wireguard"` whenever either probe
/// path answered, `"unknown"` when the host has no way to tell.
#[derive(Debug, Clone, Serialize)]
pub struct VpnStatus {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iface: Option<String>,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<WgInterface>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<WgPeer>>,
}

/// Parses a dump captured at `now_epoch_sec`. Pure and total: any input
/// yields a status, and one malformed peer line is dropped without
/// affecting its neighbors.
pub fn parse_dump(raw: &str, now_epoch_sec: i64) -> WgStatus {
    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    let Some((first, peer_lines)) = lines.split_first() else {
        return WgStatus {
            running: false,
            interface: None,
            peers: Vec::new(),
        };
    };

    let fields: Vec<&str> = first.split('\t').collect();
    let interface = WgInterface {
        public_key: fields.get(1).copied().unwrap_or_default().to_string(),
        listen_port: fields.get(2).and_then(|p| parse_numeric::<u16>(p)),
    };

    let peers = peer_lines
        .iter()
        .filter_map(|line| parse_peer(line, now_epoch_sec))
        .collect();

    WgStatus {
        running: true,
        interface: Some(interface),
        peers,
    }
}

fn parse_peer(line: &str, now_epoch_sec: i64) -> Option<WgPeer> {
    let f: Vec<&str> = line.split('\t').collect();
    if f.len() < PEER_FIELDS {
        return None;
    }
    // Handshake 0 means "never"; keepalive 0 (or "off") means disabled.
    let latest_handshake = parse_numeric::<u64>(f[4]).filter(|&hs| hs > 0);
    Some(WgPeer {
        public_key: f[0].to_string(),
        endpoint: optional_field(f[2]),
        allowed_ips: optional_field(f[3]),
        latest_handshake,
        handshake_age_sec: latest_handshake.map(|hs| now_epoch_sec - hs as i64),
        transfer_rx: parse_numeric::<u64>(f[5]).unwrap_or(0),
        transfer_tx: parse_numeric::<u64>(f[6]).unwrap_or(0),
        persistent_keepalive: parse_numeric::<u32>(f[7]).filter(|&k| k > 0),
    })
}

/// `(none)` is the dump's spelling of "absent".
fn optional_field(token: &str) -> Option<String> {
    if token == "(none)" {
        None
    } else {
        Some(token.to_string())
    }
}

/// Numeric only when nonempty, pure ASCII digits and within the target
/// width; everything else is absent.
fn parse_numeric<T: std::str::FromStr>(token: &str) -> Option<T> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Snapshot of the daemon state for one interface. The dump gives the full
/// picture; when it is unavailable the systemd unit state at least says
/// whether the tunnel is up, and with no systemctl either the host reports
/// `"unknown"`.
pub async fn collect(iface: &str) -> VpnStatus {
    // wg needs root; deployments grant the service user NOPASSWD sudo for
    // exactly this invocation.
    let dump = cmd::capture_stdout(
        "sudo",
        &["/usr/bin/wg", "show", iface, "dump"],
        CMD_BUDGET,
    )
    .await;

    if let Some(raw) = dump.filter(|raw| !raw.trim().is_empty()) {
        let status = parse_dump(&raw, Utc::now().timestamp());
        return VpnStatus {
            kind: "wireguard",
            iface: Some(iface.to_string()),
            running: status.running,
            interface: status.interface,
            peers: Some(status.peers),
        };
    }

    debug!("wg dump unavailable for {}, falling back to unit state", iface);
    let unit = format!("wg-quick@{iface}.service");
    match cmd::run("systemctl", &["is-active", &unit], CMD_BUDGET).await {
        Some(output) => {
            let state = String::from_utf8_lossy(&output.stdout);
            VpnStatus {
                kind: "wireguard",
                iface: Some(iface.to_string()),
                running: state.trim() == "active",
                interface: None,
                peers: Some(Vec::new()),
            }
        }
        None => VpnStatus {
            kind: "unknown",
            iface: None,
            running: false,
            interface: None,
            peers: None,
        },
    }
}
