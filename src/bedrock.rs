//! Unconnected RakNet ping for Bedrock-family game servers.
//!
//! One UNCONNECTED_PING datagram goes out, one UNCONNECTED_PONG comes back
//! carrying a `;`-separated status string. Servers disagree on how many
//! status fields they send, so every decoded field is optional and carries
//! an explicit default.

use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::time;
use tracing::debug;

const UNCONNECTED_PING: u8 = 0x01;
const UNCONNECTED_PONG: u8 = 0x1c;

/// RakNet offline-message marker. A pong that does not contain it verbatim
/// is not a status reply.
const MAGIC: [u8; 16] = [
    0x00, 0xff, 0xff, 0x00, 0xfe, 0xfe, 0xfe, 0xfe, 0xfd, 0xfd, 0xfd, 0xfd, 0x12, 0x34, 0x56,
    0x78,
];

const DEFAULT_MOTD: &str = "Minecraft Bedrock";
const DEFAULT_VERSION: &str = "Bedrock";

/// Status replies are well under one datagram; anything longer is truncated.
const MAX_PONG_SIZE: usize = 2048;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BedrockStatus {
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The pong carries no player names; present but empty whenever a full
    /// status string was decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_players: Option<u32>,
}

impl BedrockStatus {
    pub fn offline() -> Self {
        Self {
            online: false,
            motd: None,
            version: None,
            players: None,
            player_count: None,
            max_players: None,
        }
    }

    /// A reply arrived but carried no parseable status payload.
    fn reachable() -> Self {
        Self {
            online: true,
            ..Self::offline()
        }
    }

    /// Used when the ping goes unanswered but the supervisor reports the
    /// server process as running.
    pub fn assumed_online() -> Self {
        Self {
            online: true,
            motd: Some(DEFAULT_MOTD.to_string()),
            version: Some(DEFAULT_VERSION.to_string()),
            players: Some(Vec::new()),
            player_count: Some(0),
            max_players: Some(0),
        }
    }
}

/// Ping layout: message id, u64 send-time millis, the 16-byte magic, u64
/// client GUID. 33 bytes total, all integers big-endian.
fn build_ping(now_millis: u64, client_guid: u64) -> Bytes {
    let mut buf = BytesMut::with_capacity(33);
    buf.put_u8(UNCONNECTED_PING);
    buf.put_u64(now_millis);
    buf.put_slice(&MAGIC);
    buf.put_u64(client_guid);
    buf.freeze()
}

/// Decodes an UNCONNECTED_PONG. The status string sits after the magic:
/// `edition;motd;protocol;version;online;max;...`. Only indices 1, 3, 4
/// and 5 are consumed; everything else (including the u16 length prefix
/// some servers emit, which lands in index 0) is ignored.
fn parse_pong(data: &[u8]) -> BedrockStatus {
    if data.first() != Some(&UNCONNECTED_PONG) {
        return BedrockStatus::offline();
    }
    let Some(at) = data.windows(MAGIC.len()).position(|w| w == MAGIC) else {
        // Something answered on the port, but not with this protocol.
        return BedrockStatus::reachable();
    };
    let payload = String::from_utf8_lossy(&data[at + MAGIC.len()..]);
    let payload = payload.trim_end_matches('\0');
    let fields: Vec<&str> = payload.split(';').collect();

    BedrockStatus {
        online: true,
        motd: Some(field_or(&fields, 1, DEFAULT_MOTD)),
        version: Some(field_or(&fields, 3, DEFAULT_VERSION)),
        players: Some(Vec::new()),
        player_count: Some(numeric_field(&fields, 4)),
        max_players: Some(numeric_field(&fields, 5)),
    }
}

fn field_or(fields: &[&str], index: usize, default: &str) -> String {
    fields
        .get(index)
        .map_or_else(|| default.to_string(), |s| (*s).to_string())
}

/// Count fields are not trusted: anything that is not pure ASCII digits
/// (or does not fit in a u32) collapses to 0.
fn numeric_field(fields: &[&str], index: usize) -> u32 {
    match fields.get(index) {
        Some(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().unwrap_or(0)
        }
        _ => 0,
    }
}

/// Sends one ping and waits up to `timeout` for one pong. Never fails;
/// errors and silence both degrade to the offline status.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> BedrockStatus {
    match exchange(host, port, timeout).await {
        Ok(status) => status,
        Err(e) => {
            debug!("bedrock ping to {}:{} failed: {}", host, port, e);
            BedrockStatus::offline()
        }
    }
}

async fn exchange(host: &str, port: u16, timeout: Duration) -> io::Result<BedrockStatus> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let now_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let ping = build_ping(now_millis, rand::random::<u64>());
    socket.send_to(&ping, (host, port)).await?;

    let mut buf = [0u8; MAX_PONG_SIZE];
    match time::timeout(timeout, socket.recv_from(&mut buf)).await {
        Ok(received) => {
            let (len, _) = received?;
            Ok(parse_pong(&buf[..len]))
        }
        Err(_) => Ok(BedrockStatus::offline()),
    }
}
