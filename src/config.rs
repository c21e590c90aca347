use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Every section and field has a default, so a partial file (or no file at
/// all) still yields a runnable configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub listen: SocketAddr,
    pub minecraft: MinecraftConfig,
    pub wireguard: WireguardConfig,
    pub logs: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8000)),
            minecraft: MinecraftConfig::default(),
            wireguard: WireguardConfig::default(),
            logs: LogConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MinecraftConfig {
    pub host: String,
    pub port: u16,
    /// Docker container name used for the supervisor fallback.
    pub container: String,
    pub timeout_ms: u64,
}

impl Default for MinecraftConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 19132,
            container: "bedrock".to_string(),
            timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WireguardConfig {
    pub interface: String,
}

impl Default for WireguardConfig {
    fn default() -> Self {
        Self {
            interface: "wg0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub owncloud_log: PathBuf,
    pub backup_summary: PathBuf,
    pub backup_history: PathBuf,
    /// How many lines the tail readers scan before the display cap.
    pub max_lines: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            owncloud_log: PathBuf::from("/var/www/owncloud/data/owncloud.log"),
            backup_summary: PathBuf::from("/var/log/vps-backup.json"),
            backup_history: PathBuf::from("/var/log/vps-backup-history.jsonl"),
            max_lines: 50,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let cfg: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(cfg)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
